//! The `corekv` server: the composition root that turns `corekv-storage`'s
//! single-database keyspace, `corekv-durability`'s snapshot/AOF codecs, and
//! `corekv-txn`'s transaction/pub-sub primitives into the multi-database
//! server a client actually talks to.
//!
//! This crate owns the global mutable state — `N` logical databases, the
//! dirty counter, the live AOF writer, the watch and subscription tables —
//! and the background scheduler that drives the active-expire cycle and
//! the fork-free snapshot/rewrite substitute (§9). It does not parse a
//! wire protocol or provide a full per-command dispatch table: that is the
//! embedding application's job, built on top of [`Server`] and
//! `corekv-primitives`.

#![warn(missing_docs)]

pub mod background;
pub mod client;
pub mod config;
pub mod error;
pub mod notify;
pub mod server;

pub use background::{BackgroundScheduler, BackpressureError, SchedulerStats, TaskPriority};
pub use client::{QueuedCommand, Session};
pub use config::Config;
pub use error::{EngineError, Result};
pub use notify::{NoopSink, Notification, NotificationSink};
pub use server::Server;
