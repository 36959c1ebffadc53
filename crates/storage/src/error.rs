//! Errors raised by the keyspace layer itself (as opposed to value-level
//! errors, which are `corekv_core::CoreError`).

use thiserror::Error;

/// Result alias used throughout `corekv-storage`.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by [`crate::database::Database`] operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The requested logical database index is outside `0..dbnum`.
    #[error("DB index is out of range")]
    DbIndexOutOfRange,

    /// A value-level error bubbled up from `corekv-core`.
    #[error(transparent)]
    Core(#[from] corekv_core::CoreError),
}
