//! Error taxonomy for the keyspace/value layer.
//!
//! Mirrors the split between client-visible command errors and internal
//! failures: `CoreError` covers the type/encoding layer itself (wrong
//! type, malformed numeric literals, range-syntax errors). Persistence
//! and command-dispatch errors live in their own crates' error enums.

use thiserror::Error;

/// Result alias used throughout `corekv-core`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the value/encoding layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The stored value's type does not match the operation's expected type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// A value could not be parsed as the integer the command requires.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// A value could not be parsed as the float the command requires.
    #[error("value is not a valid float")]
    NotAFloat,

    /// A score/lex range token was syntactically invalid.
    #[error("min or max is not a float")]
    InvalidRangeItem,

    /// An index, offset, or cursor argument was out of the type's domain.
    #[error("index out of range")]
    IndexOutOfRange,

    /// A generic syntax error in command arguments.
    #[error("syntax error")]
    SyntaxError,
}

impl CoreError {
    /// True if this is the wrong-type error produced by type-checking a
    /// stored value, as opposed to an error in the caller-supplied arguments.
    pub fn is_wrong_type(&self) -> bool {
        matches!(self, CoreError::WrongType)
    }

    /// True if the error stems from malformed numeric input (`NotAnInteger`,
    /// `NotAFloat`, `InvalidRangeItem`).
    pub fn is_malformed_number(&self) -> bool {
        matches!(
            self,
            CoreError::NotAnInteger | CoreError::NotAFloat | CoreError::InvalidRangeItem
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrong_type_message_matches_redis_wire_format() {
        assert!(CoreError::WrongType.to_string().starts_with("WRONGTYPE"));
        assert!(CoreError::WrongType.is_wrong_type());
    }

    #[test]
    fn other_variants_are_not_wrong_type() {
        assert!(!CoreError::NotAnInteger.is_wrong_type());
        assert!(!CoreError::SyntaxError.is_wrong_type());
    }

    #[test]
    fn malformed_number_classification() {
        assert!(CoreError::NotAnInteger.is_malformed_number());
        assert!(CoreError::NotAFloat.is_malformed_number());
        assert!(CoreError::InvalidRangeItem.is_malformed_number());
        assert!(!CoreError::IndexOutOfRange.is_malformed_number());
    }
}
