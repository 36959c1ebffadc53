//! The optimistic-transaction primitive (`MULTI`/`EXEC`/`WATCH`) and the
//! publish/subscribe router.
//!
//! Both live in one crate because neither owns keyspace state: a
//! [`transaction::WatchTable`] only tracks which clients are watching which
//! `(database, key)` pairs so the engine can mark them dirty on mutation,
//! and [`pubsub::PubSub`] only tracks channel/pattern subscriber lists so
//! the engine can fan a `PUBLISH` out to the right client ids. Dispatching
//! the actual queued commands, and delivering the actual pub/sub frames
//! over a socket, are the embedding engine's job — this crate is command-
//! and transport-agnostic.

#![warn(missing_docs)]

pub mod pubsub;
pub mod transaction;

pub use pubsub::{ClientId, ClientPubSubState, PubSub, PublishResult};
pub use transaction::{ClientTxnState, ExecOutcome, TxError, WatchKey, WatchTable};
