//! # corekv
//!
//! An embeddable, in-memory key/value data store: a typed keyspace
//! (strings, lists, sets, hashes, sorted sets), lazy and active expiration,
//! a skiplist-backed sorted-set index, and a durability layer combining a
//! point-in-time snapshot with an append-only log and its background
//! rewrite.
//!
//! # Crate layout
//!
//! | Crate | Responsibility |
//! |-------|----------------|
//! | `corekv-core` | Value types ([`RObject`]), encoding thresholds, error taxonomy, glob/range parsing |
//! | `corekv-index` | The skiplist sorted-set index |
//! | `corekv-storage` | A single logical [`Database`]: keyspace, expiration, watch versions |
//! | `corekv-primitives` | One function per command, over a `Database` |
//! | `corekv-txn` | `MULTI`/`EXEC`/`WATCH` and publish/subscribe routing |
//! | `corekv-durability` | The snapshot codec, append-only log, and rewrite pipeline |
//! | `corekv-engine` | The composed [`Server`]: `N` databases, background scheduling, configuration |
//!
//! Command dispatch — parsing a wire protocol and routing a command name
//! to the right `corekv-primitives` function — is left to the embedding
//! application; this crate provides the typed keyspace and its durability
//! underneath that layer.
//!
//! # Quick start
//!
//! ```no_run
//! use corekv_engine::{Config, Server};
//! use corekv_primitives::string;
//!
//! fn main() -> corekv_engine::Result<()> {
//!     let server = Server::open(Config::default(), "./data", 0)?;
//!     server.with_database(0, |db| string::set(db, b"greeting", b"hello".to_vec(), 0))?;
//!     Ok(())
//! }
//! ```

pub use corekv_core::*;
pub use corekv_durability as durability;
pub use corekv_engine::*;
pub use corekv_index as index;
pub use corekv_primitives as primitives;
pub use corekv_storage::{Database, ExpireAuthority};
pub use corekv_txn as txn;
