//! Error taxonomy for the engine's own responsibilities: database-index
//! validation, configuration loading, and wrapping the layers it composes.
//! Command-level errors (`WRONGTYPE`, syntax errors, ...) are
//! [`corekv_primitives::CommandError`] and pass through unchanged — this
//! type exists for the things only the engine can fail at.

use corekv_durability::DurabilityError;
use corekv_primitives::CommandError;
use corekv_txn::transaction::TxError;
use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors raised by the engine layer.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// `SELECT`/an internal db index named a database outside
    /// `0..config.dbnum`. Per §8, this must fail without changing which
    /// database the caller is addressing.
    #[error("DB index is out of range")]
    DbIndexOutOfRange,
    /// A command-level error surfaced by `corekv-primitives`.
    #[error(transparent)]
    Command(#[from] CommandError),
    /// A `MULTI`/`WATCH` protocol error.
    #[error(transparent)]
    Transaction(#[from] TxError),
    /// A snapshot or append-only-log failure.
    #[error(transparent)]
    Durability(#[from] DurabilityError),
    /// The TOML configuration file was missing a required value or
    /// couldn't be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
    /// Underlying file I/O outside the durability crate's own errors (e.g.
    /// renaming a rewrite's temp file, reading the config file).
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}
