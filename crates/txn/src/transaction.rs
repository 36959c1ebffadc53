//! Per-client transaction queue (`MULTI`/`EXEC`/`DISCARD`) and the
//! cross-database `WATCH` invalidation index.
//!
//! §3.4 of the spec models each client as a queue of pending commands plus
//! three flags (`IN_MULTI`, `DIRTY_WATCH`, `DIRTY_QUEUE`). This module keeps
//! that state generic over the command representation `C` — the embedding
//! engine decides what a "queued command" looks like (an enum, a boxed
//! closure, an argument vector); all this crate needs to know is how many
//! are queued and when to hand them back.

use rustc_hash::FxHashMap as HashMap;
use rustc_hash::FxHashSet as HashSet;
use std::collections::hash_map::Entry;

/// A `(database index, key)` pair identifying a watchable keyspace entry.
pub type WatchKey = (usize, Vec<u8>);

/// Errors raised while building up or discharging a transaction.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TxError {
    /// `MULTI` called while already inside a transaction.
    #[error("MULTI calls can not be nested")]
    NestedMulti,
    /// `WATCH` called after `MULTI` — watches only make sense before
    /// queuing begins, since queued commands haven't executed yet.
    #[error("WATCH inside MULTI is not allowed")]
    WatchInsideMulti,
    /// `EXEC`/`DISCARD` called without a preceding `MULTI`.
    #[error("EXEC without MULTI")]
    NoMultiInProgress,
}

/// What `EXEC` should do, decided purely from the client's flags — the
/// caller still has to actually run the commands for the `Commands` case.
#[derive(Debug)]
pub enum ExecOutcome<C> {
    /// A watched key changed since `WATCH`; the transaction is abandoned
    /// without running anything. Replies as a nil array.
    AbortedDirtyWatch,
    /// A command failed to queue (bad arity/syntax/permission). Replies
    /// with `EXECABORT`.
    AbortedDirtyQueue,
    /// Clean to run, in queued order.
    Commands(Vec<C>),
}

/// One client's `MULTI` state: whether it's open, what's queued, and which
/// keys it's watching (kept here so `DISCARD`/`EXEC` can hand the list back
/// to [`WatchTable::unwatch_all`] for cleanup).
pub struct ClientTxnState<C> {
    in_multi: bool,
    dirty_watch: bool,
    dirty_queue: bool,
    queued: Vec<C>,
    watched: Vec<WatchKey>,
}

impl<C> Default for ClientTxnState<C> {
    fn default() -> Self {
        ClientTxnState {
            in_multi: false,
            dirty_watch: false,
            dirty_queue: false,
            queued: Vec::new(),
            watched: Vec::new(),
        }
    }
}

impl<C> ClientTxnState<C> {
    /// A client with no pending transaction or watches.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `MULTI` has been called and `EXEC`/`DISCARD` hasn't.
    pub fn in_multi(&self) -> bool {
        self.in_multi
    }

    /// Number of commands currently queued.
    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    /// `WATCH key`, recording `(db, key)` against this client. Errors if
    /// called while a transaction is open — matching the spec's "WATCH
    /// inside MULTI is an error".
    pub fn watch(&mut self, db: usize, key: &[u8]) -> Result<(), TxError> {
        if self.in_multi {
            return Err(TxError::WatchInsideMulti);
        }
        self.watched.push((db, key.to_vec()));
        Ok(())
    }

    /// `UNWATCH`: clears the watch list and returns it so the caller can
    /// remove this client from [`WatchTable`]. Does not touch `MULTI` state.
    pub fn unwatch(&mut self) -> Vec<WatchKey> {
        std::mem::take(&mut self.watched)
    }

    /// `MULTI`. Errors on nested `MULTI`.
    pub fn multi(&mut self) -> Result<(), TxError> {
        if self.in_multi {
            return Err(TxError::NestedMulti);
        }
        self.in_multi = true;
        Ok(())
    }

    /// Queues `cmd` for the pending transaction. Callers only call this once
    /// the command has been validated as queueable; on a queue-time parse,
    /// arity or permission error, call [`Self::mark_dirty_queue`] instead
    /// (the erroring command itself is never queued).
    pub fn queue(&mut self, cmd: C) {
        self.queued.push(cmd);
    }

    /// Marks `DIRTY_QUEUE` — set when a command fails to queue. `EXEC` will
    /// abort with `EXECABORT` rather than running anything.
    pub fn mark_dirty_queue(&mut self) {
        self.dirty_queue = true;
    }

    /// Marks `DIRTY_WATCH` — set by [`WatchTable::touch_key`] when a
    /// watched key is mutated. `EXEC` will abort with a nil-array reply.
    pub fn mark_dirty_watch(&mut self) {
        self.dirty_watch = true;
    }

    /// `DISCARD`: clears `queued`, `watched` and both dirty flags, ending
    /// the transaction. Returns the watch list for [`WatchTable`] cleanup.
    pub fn discard(&mut self) -> Vec<WatchKey> {
        self.in_multi = false;
        self.dirty_queue = false;
        self.dirty_watch = false;
        self.queued.clear();
        std::mem::take(&mut self.watched)
    }

    /// `EXEC`. Requires `IN_MULTI`; always clears the transaction state
    /// (flags, queue, watch list) regardless of outcome, per the spec:
    /// "Otherwise watches are cleared" applies even to the abort paths,
    /// since the watches have already served their purpose.
    ///
    /// Returns the queued commands (and the watch list to unregister) on
    /// success, or a `TxError::NoMultiInProgress` if `MULTI` was never
    /// called.
    pub fn exec(&mut self) -> Result<(ExecOutcome<C>, Vec<WatchKey>), TxError> {
        if !self.in_multi {
            return Err(TxError::NoMultiInProgress);
        }
        self.in_multi = false;
        let watched = std::mem::take(&mut self.watched);
        let outcome = if self.dirty_watch {
            self.dirty_watch = false;
            self.dirty_queue = false;
            self.queued.clear();
            ExecOutcome::AbortedDirtyWatch
        } else if self.dirty_queue {
            self.dirty_queue = false;
            self.queued.clear();
            ExecOutcome::AbortedDirtyQueue
        } else {
            ExecOutcome::Commands(std::mem::take(&mut self.queued))
        };
        Ok((outcome, watched))
    }
}

/// The global registry behind `WATCH`: for every `(db, key)` pair watched
/// by at least one client, the set of watching client ids.
///
/// Per §4.10, a successful mutation of a watched key — including
/// `FLUSHDB`/`FLUSHALL`, which touch every key in the flushed database —
/// calls `touch_key`/`touch_db` to mark every watcher dirty. The caller
/// (which owns the per-client [`ClientTxnState`]s) is responsible for
/// actually flipping `dirty_watch` on each returned client id.
#[derive(Default)]
pub struct WatchTable {
    watchers: HashMap<WatchKey, HashSet<u64>>,
}

impl WatchTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `client` as watching `(db, key)`.
    pub fn watch(&mut self, client: u64, db: usize, key: &[u8]) {
        self.watchers
            .entry((db, key.to_vec()))
            .or_default()
            .insert(client);
    }

    /// Removes `client` from every `(db, key)` pair in `keys` — the list
    /// returned by [`ClientTxnState::unwatch`]/`discard`/`exec`.
    pub fn unwatch_all(&mut self, client: u64, keys: &[WatchKey]) {
        for key in keys {
            if let Entry::Occupied(mut e) = self.watchers.entry(key.clone()) {
                e.get_mut().remove(&client);
                if e.get().is_empty() {
                    e.remove();
                }
            }
        }
    }

    /// A key in `db` was mutated (or deleted). Returns the client ids that
    /// were watching it — the caller marks each one's `dirty_watch`. The
    /// watch registration itself is left in place; it's cleared only when
    /// the client's own `EXEC`/`DISCARD`/`UNWATCH` runs, matching the
    /// spec's "then for each queued command ... execute it normally" — a
    /// client can be touched multiple times before its own `EXEC`.
    pub fn touch_key(&mut self, db: usize, key: &[u8]) -> Vec<u64> {
        self.watchers
            .get(&(db, key.to_vec()))
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    /// `FLUSHDB`/`FLUSHALL` on `db`: returns every client watching any key
    /// in that database, deduplicated.
    pub fn touch_db(&mut self, db: usize) -> Vec<u64> {
        let mut touched = HashSet::default();
        for ((d, _), clients) in self.watchers.iter() {
            if *d == db {
                touched.extend(clients.iter().copied());
            }
        }
        touched.into_iter().collect()
    }

    /// Number of distinct keys with at least one watcher, for diagnostics.
    pub fn watched_key_count(&self) -> usize {
        self.watchers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_then_nested_multi_errors() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        tx.multi().unwrap();
        assert_eq!(tx.multi(), Err(TxError::NestedMulti));
    }

    #[test]
    fn watch_inside_multi_errors() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        tx.multi().unwrap();
        assert_eq!(tx.watch(0, b"k"), Err(TxError::WatchInsideMulti));
    }

    #[test]
    fn exec_without_multi_errors() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        assert_eq!(tx.exec().unwrap_err(), TxError::NoMultiInProgress);
    }

    #[test]
    fn clean_exec_returns_queued_commands_in_order() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        tx.multi().unwrap();
        tx.queue(1);
        tx.queue(2);
        let (outcome, _) = tx.exec().unwrap();
        match outcome {
            ExecOutcome::Commands(cmds) => assert_eq!(cmds, vec![1, 2]),
            _ => panic!("expected clean exec"),
        }
        assert!(!tx.in_multi());
    }

    #[test]
    fn dirty_queue_aborts_with_execabort_and_clears_state() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        tx.multi().unwrap();
        tx.queue(1);
        tx.mark_dirty_queue();
        let (outcome, _) = tx.exec().unwrap();
        assert!(matches!(outcome, ExecOutcome::AbortedDirtyQueue));
        assert_eq!(tx.queued_len(), 0);
    }

    #[test]
    fn dirty_watch_aborts_with_nil_array() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        tx.watch(0, b"k").unwrap();
        tx.multi().unwrap();
        tx.queue(1);
        tx.mark_dirty_watch();
        let (outcome, watched) = tx.exec().unwrap();
        assert!(matches!(outcome, ExecOutcome::AbortedDirtyWatch));
        assert_eq!(watched, vec![(0, b"k".to_vec())]);
    }

    #[test]
    fn discard_clears_queue_and_watches() {
        let mut tx: ClientTxnState<u8> = ClientTxnState::new();
        tx.watch(0, b"k").unwrap();
        tx.multi().unwrap();
        tx.queue(1);
        let watched = tx.discard();
        assert_eq!(watched, vec![(0, b"k".to_vec())]);
        assert_eq!(tx.queued_len(), 0);
        assert!(!tx.in_multi());
    }

    #[test]
    fn touch_key_reports_watchers_without_clearing_registration() {
        let mut table = WatchTable::new();
        table.watch(1, 0, b"k");
        table.watch(2, 0, b"k");
        let mut touched = table.touch_key(0, b"k");
        touched.sort();
        assert_eq!(touched, vec![1, 2]);
        // still registered until the client's own EXEC/DISCARD/UNWATCH
        assert_eq!(table.touch_key(0, b"k").len(), 2);
    }

    #[test]
    fn unwatch_all_removes_empty_entries() {
        let mut table = WatchTable::new();
        table.watch(1, 0, b"k");
        assert_eq!(table.watched_key_count(), 1);
        table.unwatch_all(1, &[(0, b"k".to_vec())]);
        assert_eq!(table.watched_key_count(), 0);
    }

    #[test]
    fn touch_db_finds_every_key_in_that_database() {
        let mut table = WatchTable::new();
        table.watch(1, 0, b"a");
        table.watch(2, 0, b"b");
        table.watch(3, 1, b"a");
        let mut touched = table.touch_db(0);
        touched.sort();
        assert_eq!(touched, vec![1, 2]);
    }
}
