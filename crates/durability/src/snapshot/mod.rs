//! The RDB-style point-in-time snapshot codec (§4.6): header, a flat
//! sequence of type-tagged records, and a checksummed footer.

pub mod crc64;
pub mod format;
mod lzf;
mod reader;
mod writer;

pub use reader::read_snapshot;
pub use writer::write_snapshot;

/// `REDIS` + 4-digit version, written at the start of every snapshot.
pub const HEADER: &[u8; 9] = b"REDIS0001";
