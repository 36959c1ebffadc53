//! Client-visible command errors, distinct from the internal error types
//! of the storage/durability layers: these are the ones a dispatcher
//! turns directly into a wire-level error reply.

use corekv_core::CoreError;
use thiserror::Error;

/// Result alias for command implementations.
pub type Result<T> = std::result::Result<T, CommandError>;

/// An error a command implementation can return to its caller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The stored value's type doesn't match what the command expects.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// An argument that should have been an integer wasn't.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// An argument that should have been a float wasn't.
    #[error("value is not a valid float")]
    NotAFloat,

    /// A malformed score/lex range bound.
    #[error("min or max is not a float")]
    InvalidRangeItem,

    /// An index/offset argument fell outside the value's domain.
    #[error("index out of range")]
    IndexOutOfRange,

    /// Malformed or contradictory command arguments.
    #[error("syntax error")]
    SyntaxError,

    /// `INCR`/`INCRBY` would overflow `i64`.
    #[error("increment or decrement would overflow")]
    IncrementOverflow,

    /// `SETRANGE`/`APPEND`/similar would exceed the configured string size
    /// limit (`proto_max_bulk_len`, 512MB by default).
    #[error("string exceeds maximum allowed size")]
    StringTooLarge,
}

impl From<CoreError> for CommandError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::WrongType => CommandError::WrongType,
            CoreError::NotAnInteger => CommandError::NotAnInteger,
            CoreError::NotAFloat => CommandError::NotAFloat,
            CoreError::InvalidRangeItem => CommandError::InvalidRangeItem,
            CoreError::IndexOutOfRange => CommandError::IndexOutOfRange,
            CoreError::SyntaxError => CommandError::SyntaxError,
        }
    }
}
