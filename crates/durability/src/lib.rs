//! Persistence for a `corekv` keyspace: the RDB-style snapshot codec
//! (§4.6), the append-only log (§4.7), and the minimal-reconstruction
//! rewrite pipeline shared by both background paths (§4.8/§4.9).
//!
//! Neither half of this crate dispatches commands — the AOF loader hands
//! back db-tagged argument vectors rather than executing them, and the
//! rewrite pipeline only ever reads a [`corekv_storage::Database`]. Command
//! execution, background scheduling, and the parent/child lifecycle that
//! drives a rewrite all live in the embedding engine.

pub mod aof;
pub mod config;
pub mod error;
pub mod mode;
pub mod snapshot;

pub use config::{AofConfig, AofState, SnapshotConfig};
pub use error::{DurabilityError, Result};
pub use mode::FsyncPolicy;
