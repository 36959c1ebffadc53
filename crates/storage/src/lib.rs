//! The per-database keyspace: the `(key -> value)` dictionary, its
//! expiration deadlines, write-version counters for `WATCH`, and the
//! reverse-binary cursor scan that backs `SCAN`/`KEYS`.
//!
//! A [`database::Database`] does not know about encodings, transactions,
//! durability, or pub/sub — those live in sibling crates and compose on
//! top of the plain `get`/`set`/`delete`/`scan` surface here.

#![warn(missing_docs)]

pub mod database;
pub mod error;
pub mod keytable;

pub use database::{Database, ExpireAuthority};
pub use error::{Result, StorageError};
pub use keytable::KeyTable;
