//! A single logical database: the keyspace dictionary, its expiration
//! table, and the per-key write-version counter `WATCH` compares against.
//!
//! A `corekv` server holds `N` independent [`Database`] instances (`SELECT`
//! switches which one a connection addresses); nothing here is aware of
//! that fan-out, which is the embedding engine's job.

use crate::keytable::KeyTable;
use corekv_core::RObject;

/// Whether this process is the authority for expiring keys.
///
/// A primary deletes a key the instant it is found to be expired — on a
/// lazy lookup or during the active expire cycle — and is responsible for
/// propagating that deletion to followers/the AOF. A follower never
/// deletes expired keys on its own: it hides them from reads (so clients
/// observe the same expiry deadline everywhere) but waits for the
/// primary's synthetic `DEL` to actually remove the entry, so replicated
/// state converges on the primary's decision rather than racing clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpireAuthority {
    /// This instance deletes expired keys and propagates the deletion.
    Primary,
    /// This instance defers deletion to an upstream primary.
    Follower,
}

/// One logical database: keyspace, expiration deadlines, and write
/// versions for `WATCH`.
pub struct Database {
    dict: KeyTable<RObject>,
    expires: KeyTable<i64>,
    versions: KeyTable<u64>,
    access: KeyTable<i64>,
    rng_state: usize,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// An empty database.
    pub fn new() -> Self {
        Database {
            dict: KeyTable::new(),
            expires: KeyTable::new(),
            versions: KeyTable::new(),
            access: KeyTable::new(),
            rng_state: 0,
        }
    }

    /// Number of live keys, including ones not yet lazily expired.
    pub fn len(&self) -> usize {
        self.dict.len()
    }

    /// True if the database holds no keys.
    pub fn is_empty(&self) -> bool {
        self.dict.is_empty()
    }

    /// Checks whether `key` has expired, and if so applies
    /// [`ExpireAuthority`]'s rule: a primary deletes it and reports the
    /// deletion (for AOF/replication propagation); a follower merely
    /// treats it as absent for this call without mutating state.
    ///
    /// Returns `true` if the key should be treated as expired/absent by
    /// the caller.
    pub fn expire_if_needed(&mut self, key: &[u8], now_ms: i64, authority: ExpireAuthority) -> bool {
        let deadline = match self.expires.get(key) {
            Some(d) => *d,
            None => return false,
        };
        if deadline > now_ms {
            return false;
        }
        if authority == ExpireAuthority::Primary {
            self.dict.remove(key);
            self.expires.remove(key);
            self.access.remove(key);
            self.bump_version(key);
            tracing::debug!(key = ?String::from_utf8_lossy(key), "lazy expire");
        }
        true
    }

    /// Read-only lookup, honoring lazy expiration.
    pub fn lookup_for_read(
        &mut self,
        key: &[u8],
        now_ms: i64,
        authority: ExpireAuthority,
    ) -> Option<&RObject> {
        if self.expire_if_needed(key, now_ms, authority) {
            return None;
        }
        if self.dict.contains(key) {
            self.record_access(key, now_ms);
        }
        self.dict.get(key)
    }

    /// Mutable lookup for a write command, honoring lazy expiration.
    pub fn lookup_for_write(
        &mut self,
        key: &[u8],
        now_ms: i64,
        authority: ExpireAuthority,
    ) -> Option<&mut RObject> {
        if self.expire_if_needed(key, now_ms, authority) {
            return None;
        }
        if self.dict.contains(key) {
            self.record_access(key, now_ms);
        }
        self.dict.get_mut(key)
    }

    /// True if `key` exists and is not expired.
    pub fn contains(&mut self, key: &[u8], now_ms: i64, authority: ExpireAuthority) -> bool {
        !self.expire_if_needed(key, now_ms, authority) && self.dict.contains(key)
    }

    /// Raw dictionary access bypassing expiry checks — used by RDB load
    /// and other paths that already know the key is live.
    pub fn dict_get(&self, key: &[u8]) -> Option<&RObject> {
        self.dict.get(key)
    }

    /// Mutable raw dictionary access, bypassing expiry checks.
    pub fn dict_get_mut(&mut self, key: &[u8]) -> Option<&mut RObject> {
        self.dict.get_mut(key)
    }

    /// Overwrites (or inserts) `key` with `value` and clears any TTL on
    /// it, matching plain `SET`'s semantics. Bumps the write version and
    /// stamps the access clock used by `OBJECT IDLETIME`.
    pub fn set_fresh(&mut self, key: Vec<u8>, value: RObject, now_ms: i64) -> Option<RObject> {
        self.expires.remove(&key);
        self.bump_version(&key);
        self.access.insert(key.clone(), now_ms);
        self.dict.insert(key, value)
    }

    /// Inserts `key` with `value` without touching any existing TTL —
    /// used by type-mutating commands (`LPUSH`, `SADD`, ...) that must
    /// not clear a previously set expiration. Bumps the write version and
    /// stamps the access clock.
    pub fn insert_preserving_ttl(&mut self, key: Vec<u8>, value: RObject, now_ms: i64) -> Option<RObject> {
        self.bump_version(&key);
        self.access.insert(key.clone(), now_ms);
        self.dict.insert(key, value)
    }

    /// Updates the access clock for `key` without otherwise touching it —
    /// used by read paths (`lookup_for_read`/`lookup_for_write`) so
    /// `OBJECT IDLETIME` reflects both reads and writes, matching real
    /// Redis's LRU clock.
    fn record_access(&mut self, key: &[u8], now_ms: i64) {
        self.access.insert(key.to_vec(), now_ms);
    }

    /// Milliseconds since `key` was last read or written, for `OBJECT
    /// IDLETIME`. `None` if the key doesn't exist. A key that has never
    /// gone through a lookup or a fresh write (e.g. reconstructed purely
    /// via RDB/AOF replay) reads as idle since `now_ms`.
    pub fn idle_ms(&self, key: &[u8], now_ms: i64) -> Option<i64> {
        if !self.dict.contains(key) {
            return None;
        }
        Some(now_ms - self.access.get(key).copied().unwrap_or(now_ms))
    }

    /// Removes `key` entirely (value and any TTL). Returns the removed
    /// value if present.
    pub fn delete(&mut self, key: &[u8]) -> Option<RObject> {
        self.expires.remove(key);
        self.access.remove(key);
        let removed = self.dict.remove(key);
        if removed.is_some() {
            self.bump_version(key);
        }
        removed
    }

    /// Sets `key`'s expiration to the absolute millisecond timestamp
    /// `when_ms`. The key must already exist; callers check that first
    /// (matching `EXPIRE`'s "0 if key does not exist" contract).
    pub fn set_expire_at(&mut self, key: &[u8], when_ms: i64) {
        self.expires.insert(key.to_vec(), when_ms);
    }

    /// Removes any TTL on `key`. Returns `true` if one was set.
    pub fn persist(&mut self, key: &[u8]) -> bool {
        self.expires.remove(key).is_some()
    }

    /// The absolute expiration deadline for `key`, if any, in
    /// milliseconds since the epoch.
    pub fn expire_at_ms(&self, key: &[u8]) -> Option<i64> {
        self.expires.get(key).copied()
    }

    /// Current write-version counter for `key`, used by `WATCH` to detect
    /// concurrent modification. Keys that have never been written read as
    /// version `0`.
    pub fn watch_version(&self, key: &[u8]) -> u64 {
        self.versions.get(key).copied().unwrap_or(0)
    }

    /// Bumps `key`'s write-version without touching its value or TTL —
    /// used after an in-place mutation of an aggregate value (e.g.
    /// inserting into an already-hashtable-encoded set) that doesn't go
    /// through `insert_preserving_ttl`.
    pub fn touch(&mut self, key: &[u8]) {
        self.bump_version(key);
    }

    fn bump_version(&mut self, key: &[u8]) {
        let next = self.versions.get(key).copied().unwrap_or(0) + 1;
        self.versions.insert(key.to_vec(), next);
    }

    /// An arbitrary live key, for `RANDOMKEY`. Does not itself perform
    /// expiry checks on the returned key — callers should run it back
    /// through `lookup_for_read` if a definite answer is required, since
    /// a key may have just expired.
    pub fn random_key(&mut self) -> Option<Vec<u8>> {
        self.rng_state = self.rng_state.wrapping_add(0x9E3779B1);
        self.dict.random_key(self.rng_state).map(|k| k.to_vec())
    }

    /// Removes every key and every expiration, resetting the database.
    pub fn flush(&mut self) {
        self.dict.clear();
        self.expires.clear();
        self.versions.clear();
        self.access.clear();
    }

    /// Runs one bounded active-expire pass: samples keys with a TTL and
    /// deletes any that are already expired, up to `sample_limit` keys
    /// inspected. Returns the keys actually deleted, which the caller
    /// (the engine's background cycle) propagates as synthetic `DEL`s to
    /// the AOF and to followers. A no-op for a [`ExpireAuthority::Follower`].
    pub fn active_expire_cycle(
        &mut self,
        now_ms: i64,
        sample_limit: usize,
        authority: ExpireAuthority,
    ) -> Vec<Vec<u8>> {
        if authority != ExpireAuthority::Primary {
            return Vec::new();
        }
        let mut expired = Vec::new();
        let candidates: Vec<Vec<u8>> = self
            .expires
            .iter()
            .take(sample_limit)
            .map(|(k, _)| k.to_vec())
            .collect();
        for key in candidates {
            if self.expire_if_needed(&key, now_ms, authority) {
                expired.push(key);
            }
        }
        expired
    }

    /// Full iterator over live `(key, value)` pairs, ignoring expiry —
    /// used by the RDB snapshot writer, which checks expiry itself so it
    /// can write `EXPIRETIME_MS` records.
    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &RObject)> {
        self.dict.iter()
    }

    /// Scans one bucket of the keyspace starting at `cursor`, per the
    /// `SCAN` cursor contract. See [`KeyTable::scan`].
    pub fn scan(&self, cursor: u64, mut visit: impl FnMut(&[u8], &RObject)) -> u64 {
        self.dict.scan(cursor, |k, v| visit(k, v))
    }
}
