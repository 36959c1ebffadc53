//! Type-agnostic key management: expiration, introspection, renaming,
//! and keyspace iteration (`KEYS`, `RANDOMKEY`, `SCAN`).

use crate::command_error::{CommandError, Result};
use corekv_core::{glob_match, DataType};
use corekv_storage::{Database, ExpireAuthority};

/// `TYPE key`
pub fn key_type(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Option<DataType> {
    db.lookup_for_read(key, now_ms, authority).map(|obj| obj.type_name())
}

/// `EXISTS key`
pub fn exists(db: &mut Database, key: &[u8], now_ms: i64, authority: ExpireAuthority) -> bool {
    db.contains(key, now_ms, authority)
}

/// `DEL key...`. Returns the number of keys actually removed.
pub fn del(db: &mut Database, keys: &[Vec<u8>], now_ms: i64, authority: ExpireAuthority) -> usize {
    keys.iter()
        .filter(|k| {
            db.expire_if_needed(k, now_ms, authority);
            db.delete(k).is_some()
        })
        .count()
}

/// `EXPIRE`/`PEXPIRE`/`EXPIREAT`/`PEXPIREAT key when_ms`: sets an
/// absolute millisecond deadline. Returns `false` if the key doesn't
/// exist (no expiration set). Callers translate their command's
/// relative/seconds argument into `when_ms` before calling this.
pub fn expire_at(
    db: &mut Database,
    key: &[u8],
    when_ms: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> bool {
    if !db.contains(key, now_ms, authority) {
        return false;
    }
    if when_ms <= now_ms {
        db.delete(key);
    } else {
        db.set_expire_at(key, when_ms);
    }
    true
}

/// `PERSIST key`. Returns `true` if a TTL was present and removed.
pub fn persist(db: &mut Database, key: &[u8], now_ms: i64, authority: ExpireAuthority) -> bool {
    if !db.contains(key, now_ms, authority) {
        return false;
    }
    db.persist(key)
}

/// `TTL key` in whole seconds, `PTTL key` in milliseconds via
/// `millis = false`/`true`. Returns `None` if the key doesn't exist,
/// `Some(-1)`-equivalent handled by the caller (no TTL set is
/// represented here as `Some(None)`... instead we return a three-way
/// enum-free signal via `Option<Option<i64>>`: outer `None` = no such
/// key, inner `None` = no TTL.
pub fn ttl_ms(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Option<Option<i64>> {
    if !db.contains(key, now_ms, authority) {
        return None;
    }
    Some(db.expire_at_ms(key).map(|deadline| (deadline - now_ms).max(0)))
}

/// `RENAME key newkey`. Errors if `key` doesn't exist.
pub fn rename(
    db: &mut Database,
    key: &[u8],
    newkey: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<()> {
    if db.expire_if_needed(key, now_ms, authority) || !db.contains(key, now_ms, authority) {
        return Err(CommandError::IndexOutOfRange);
    }
    let ttl = db.expire_at_ms(key);
    let value = db.delete(key).ok_or(CommandError::IndexOutOfRange)?;
    db.delete(newkey);
    db.set_fresh(newkey.to_vec(), value, now_ms);
    if let Some(deadline) = ttl {
        db.set_expire_at(newkey, deadline);
    }
    Ok(())
}

/// `RENAMENX key newkey`: only renames if `newkey` doesn't already
/// exist. Returns `false` without renaming if it does.
pub fn renamenx(
    db: &mut Database,
    key: &[u8],
    newkey: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    if db.contains(newkey, now_ms, authority) {
        return Ok(false);
    }
    rename(db, key, newkey, now_ms, authority)?;
    Ok(true)
}

/// `KEYS pattern`: every live key whose name matches the glob pattern.
/// Scans the whole keyspace, so callers should prefer `SCAN` in
/// latency-sensitive paths.
pub fn keys(db: &mut Database, pattern: &[u8], now_ms: i64, authority: ExpireAuthority) -> Vec<Vec<u8>> {
    let candidates: Vec<Vec<u8>> = db.iter().map(|(k, _)| k.to_vec()).collect();
    candidates
        .into_iter()
        .filter(|k| glob_match(pattern, k) && !db.expire_if_needed(k, now_ms, authority))
        .collect()
}

/// `RANDOMKEY`. Returns `None` if the database is empty, re-checking
/// expiry on the sampled key since it may have just lapsed.
pub fn randomkey(db: &mut Database, now_ms: i64, authority: ExpireAuthority) -> Option<Vec<u8>> {
    loop {
        let candidate = db.random_key()?;
        if !db.expire_if_needed(&candidate, now_ms, authority) {
            return Some(candidate);
        }
    }
}

/// `OBJECT ENCODING key`
pub fn object_encoding(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Option<&'static str> {
    db.lookup_for_read(key, now_ms, authority).map(|obj| obj.encoding_name())
}

/// `OBJECT REFCOUNT key`. There's no value sharing in this store — every
/// key owns its own `RObject` — so any live key simply reports `1`.
pub fn object_refcount(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Option<i64> {
    db.contains(key, now_ms, authority).then_some(1)
}

/// `OBJECT IDLETIME key`: seconds since `key` was last read or written.
pub fn object_idletime(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Option<i64> {
    if db.expire_if_needed(key, now_ms, authority) {
        return None;
    }
    db.idle_ms(key, now_ms).map(|ms| ms / 1000)
}

/// `DBSIZE`: the number of keys in the database, including ones that
/// have lapsed but not yet been lazily or actively expired.
pub fn dbsize(db: &Database) -> usize {
    db.len()
}

/// `SCAN cursor [MATCH pattern] [COUNT count]`. Applies the pattern and
/// expiry filter on top of [`Database::scan`]'s one-bucket-per-call
/// cursor; `count` is advisory and only changes how many buckets this
/// call visits, not correctness.
pub fn scan(
    db: &mut Database,
    cursor: u64,
    pattern: Option<&[u8]>,
    count: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> (u64, Vec<Vec<u8>>) {
    let mut matched = Vec::new();
    let mut next = cursor;
    let visits = count.max(1);
    for _ in 0..visits {
        let mut batch = Vec::new();
        next = db.scan(next, |k, _| batch.push(k.to_vec()));
        for k in batch {
            if pattern.map_or(true, |p| glob_match(p, &k)) {
                matched.push(k);
            }
        }
        if next == 0 {
            break;
        }
    }
    matched.retain(|k| !db.expire_if_needed(k, now_ms, authority));
    (next, matched)
}
