//! Per-connection session state: the selected database, the `MULTI` queue,
//! and the pub/sub subscriptions, all scoped to one [`ClientId`].
//!
//! Command dispatch itself is out of scope (§1) — a `Session` only tracks
//! the state a dispatcher needs consulted and updated around each command,
//! the same way `corekv-txn` keeps transaction state generic over the
//! queued-command representation.

use corekv_txn::transaction::ClientTxnState;
use corekv_txn::{ClientId, ClientPubSubState};

/// A queued `MULTI` command: its raw argument vector, exactly as the
/// caller would have dispatched it immediately outside a transaction.
pub type QueuedCommand = Vec<Vec<u8>>;

/// One client's server-side session state.
pub struct Session {
    /// Opaque id used to key [`corekv_txn::transaction::WatchTable`] and
    /// [`corekv_txn::pubsub::PubSub`] registrations.
    pub id: ClientId,
    /// The database index most recently selected via `SELECT`.
    pub current_db: usize,
    /// `MULTI`/`EXEC`/`WATCH` state.
    pub txn: ClientTxnState<QueuedCommand>,
    /// Channel/pattern subscriptions.
    pub pubsub: ClientPubSubState,
}

impl Session {
    /// A freshly connected client, addressing database 0 with no pending
    /// transaction or subscriptions.
    pub fn new(id: ClientId) -> Self {
        Session {
            id,
            current_db: 0,
            txn: ClientTxnState::new(),
            pubsub: ClientPubSubState::default(),
        }
    }

    /// True while in "subscribe mode" (at least one channel or pattern
    /// subscription is active) — per §3.5, such a client may only issue
    /// `(P)SUBSCRIBE`, `(P)UNSUBSCRIBE`, and a small allowlist of other
    /// commands.
    pub fn in_subscribe_mode(&self) -> bool {
        self.pubsub.subscription_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_session_addresses_database_zero() {
        let session = Session::new(1);
        assert_eq!(session.current_db, 0);
        assert!(!session.txn.in_multi());
        assert!(!session.in_subscribe_mode());
    }

    #[test]
    fn subscribe_mode_tracks_subscription_count() {
        let mut session = Session::new(1);
        session.pubsub.channels_subscribed.insert(b"news".to_vec());
        assert!(session.in_subscribe_mode());
    }
}
