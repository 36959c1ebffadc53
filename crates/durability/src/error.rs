//! Error taxonomy for the durability layer (§7's "corruption on load" and
//! "persistence errors" categories).

use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, DurabilityError>;

/// Errors raised by the snapshot codec or the append-only log.
#[derive(Debug, thiserror::Error)]
pub enum DurabilityError {
    /// Underlying file I/O failure.
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
    /// The snapshot header's version field isn't one this codec knows.
    #[error("unrecognized snapshot version {0}")]
    UnknownVersion(String),
    /// The snapshot's trailing CRC-64 didn't match the computed digest.
    #[error("snapshot checksum mismatch: expected {expected:#x}, computed {computed:#x}")]
    ChecksumMismatch {
        /// Digest stored in the file's footer.
        expected: u64,
        /// Digest computed while reading the body.
        computed: u64,
    },
    /// A type tag or opcode byte wasn't one the codec recognizes.
    #[error("unknown type tag {0:#x}")]
    UnknownTypeTag(u8),
    /// The file ended before a value/record was fully read.
    #[error("truncated {0}")]
    Truncated(&'static str),
    /// A length-prefixed value claimed more bytes than remained.
    #[error("corrupt length prefix")]
    BadLength,
    /// LZF decompression produced a length different from the declared
    /// uncompressed size, or encountered an invalid back-reference.
    #[error("corrupt lzf-compressed string")]
    BadCompression,
    /// An AOF record couldn't be parsed as the inline array-of-bulk-strings
    /// protocol.
    #[error("malformed AOF record: {0}")]
    MalformedRecord(String),
    /// A client was left in `MULTI` at end-of-file during AOF load — per
    /// §4.7, this is always fatal, independent of `aof_load_truncated`.
    #[error("AOF ended with an open MULTI block")]
    UnclosedMultiAtEof,
}

impl DurabilityError {
    /// True for errors that represent on-disk corruption rather than a
    /// transient I/O failure — these abort the load per §7 unless the
    /// specific truncation relaxation (`aof_load_truncated`) applies.
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            DurabilityError::UnknownVersion(_)
                | DurabilityError::ChecksumMismatch { .. }
                | DurabilityError::UnknownTypeTag(_)
                | DurabilityError::Truncated(_)
                | DurabilityError::BadLength
                | DurabilityError::BadCompression
                | DurabilityError::MalformedRecord(_)
                | DurabilityError::UnclosedMultiAtEof
        )
    }
}
