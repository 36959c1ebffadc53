//! The append-only log (§4.7): text-protocol command records, a
//! buffered/fsynced writer, a loader that canonicalizes `SELECT` into a
//! per-record db index, and the background-rewrite minimal-reconstruction
//! pipeline (§4.8).

pub mod command;
mod reader;
mod rewrite;
mod writer;

pub use reader::{load, AofRecord};
pub use rewrite::{rename_into_place, write_rewrite_file, REWRITE_ITEMS_PER_CMD};
pub use writer::AofWriter;
