//! Set commands.
//!
//! A set starts as `SetIntset` as long as every member parses as an
//! integer and the member count stays under threshold; the first
//! non-integer member, or crossing the count threshold, upgrades it to
//! `SetHashtable` permanently.

use crate::command_error::{CommandError, Result};
use corekv_core::{EncodingThresholds, IntsetWidth, RObject};
use corekv_storage::{Database, ExpireAuthority};
use std::collections::HashSet;

fn parse_int(member: &[u8]) -> Option<i64> {
    std::str::from_utf8(member).ok()?.parse::<i64>().ok()
}

fn to_hashtable(members: &[i64]) -> HashSet<Vec<u8>> {
    members.iter().map(|n| n.to_string().into_bytes()).collect()
}

/// `SADD key member...`. Returns the number of members newly added.
pub fn sadd(
    db: &mut Database,
    key: &[u8],
    members: Vec<Vec<u8>>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let mut added = 0usize;
    // `new_obj` is `Some` when the encoding changed (or the key is new)
    // and must be reinserted wholesale; `None` means an existing
    // hashtable-encoded set was mutated in place and only needs its
    // write-version bumped.
    let new_obj: Option<RObject> = match db.lookup_for_write(key, now_ms, authority) {
        None => {
            let all_int = members.iter().all(|m| parse_int(m).is_some());
            Some(if all_int && members.len() <= thresholds.set_max_intset_entries {
                let mut ints: Vec<i64> = Vec::new();
                let mut width = IntsetWidth::Bits16;
                for m in &members {
                    let n = parse_int(m).unwrap();
                    if !ints.contains(&n) {
                        ints.push(n);
                        added += 1;
                        width = width.widen(IntsetWidth::for_value(n));
                    }
                }
                ints.sort_unstable();
                RObject::SetIntset(ints, width)
            } else {
                let mut set = HashSet::new();
                for m in members {
                    if set.insert(m) {
                        added += 1;
                    }
                }
                RObject::SetHashtable(set)
            })
        }
        Some(RObject::SetIntset(ints, width)) => {
            let all_int = members.iter().all(|m| parse_int(m).is_some());
            if all_int && ints.len() + members.len() <= thresholds.set_max_intset_entries {
                let mut new_width = *width;
                for m in &members {
                    let n = parse_int(m).unwrap();
                    if !ints.contains(&n) {
                        ints.push(n);
                        added += 1;
                        new_width = new_width.widen(IntsetWidth::for_value(n));
                    }
                }
                ints.sort_unstable();
                *width = new_width;
                None
            } else {
                let mut set = to_hashtable(ints);
                for m in members {
                    if set.insert(m) {
                        added += 1;
                    }
                }
                Some(RObject::SetHashtable(set))
            }
        }
        Some(RObject::SetHashtable(set)) => {
            for m in members {
                if set.insert(m) {
                    added += 1;
                }
            }
            None
        }
        Some(_) => return Err(CommandError::WrongType),
    };
    match new_obj {
        Some(obj) => {
            db.insert_preserving_ttl(key.to_vec(), obj, now_ms);
        }
        None => db.touch(key),
    }
    Ok(added)
}

/// `SREM key member...`. Returns the number of members actually removed,
/// deleting the key if it becomes empty.
pub fn srem(
    db: &mut Database,
    key: &[u8],
    members: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let removed = match db.lookup_for_write(key, now_ms, authority) {
        None => return Ok(0),
        Some(RObject::SetIntset(ints, _)) => {
            let mut n = 0;
            for m in members {
                if let Some(v) = parse_int(m) {
                    if let Some(pos) = ints.iter().position(|x| *x == v) {
                        ints.remove(pos);
                        n += 1;
                    }
                }
            }
            n
        }
        Some(RObject::SetHashtable(set)) => {
            let mut n = 0;
            for m in members {
                if set.remove(m.as_slice()) {
                    n += 1;
                }
            }
            n
        }
        Some(_) => return Err(CommandError::WrongType),
    };
    let empty = matches!(
        db.dict_get(key),
        Some(RObject::SetIntset(ints, _)) if ints.is_empty()
    ) || matches!(
        db.dict_get(key),
        Some(RObject::SetHashtable(s)) if s.is_empty()
    );
    if empty {
        db.delete(key);
    }
    Ok(removed)
}

/// `SISMEMBER key member`
pub fn sismember(
    db: &mut Database,
    key: &[u8],
    member: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(false),
        Some(RObject::SetIntset(ints, _)) => Ok(parse_int(member).map_or(false, |v| ints.contains(&v))),
        Some(RObject::SetHashtable(s)) => Ok(s.contains(member)),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `SCARD key`
pub fn scard(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(0),
        Some(RObject::SetIntset(ints, _)) => Ok(ints.len()),
        Some(RObject::SetHashtable(s)) => Ok(s.len()),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `SMEMBERS key`
pub fn smembers(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(Vec::new()),
        Some(RObject::SetIntset(ints, _)) => Ok(ints.iter().map(|n| n.to_string().into_bytes()).collect()),
        Some(RObject::SetHashtable(s)) => Ok(s.iter().cloned().collect()),
        Some(_) => Err(CommandError::WrongType),
    }
}

fn members_of(obj: &RObject) -> Result<HashSet<Vec<u8>>> {
    match obj {
        RObject::SetIntset(ints, _) => Ok(ints.iter().map(|n| n.to_string().into_bytes()).collect()),
        RObject::SetHashtable(s) => Ok(s.clone()),
        _ => Err(CommandError::WrongType),
    }
}

/// `SINTER key...`
pub fn sinter(
    db: &mut Database,
    keys: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<HashSet<Vec<u8>>> {
    let mut iter = keys.iter();
    let first = match iter.next() {
        None => return Ok(HashSet::new()),
        Some(k) => match db.lookup_for_read(k, now_ms, authority) {
            None => return Ok(HashSet::new()),
            Some(obj) => members_of(obj)?,
        },
    };
    let mut acc = first;
    for k in iter {
        let members = match db.lookup_for_read(k, now_ms, authority) {
            None => return Ok(HashSet::new()),
            Some(obj) => members_of(obj)?,
        };
        acc.retain(|m| members.contains(m));
        if acc.is_empty() {
            break;
        }
    }
    Ok(acc)
}

/// `SUNION key...`
pub fn sunion(
    db: &mut Database,
    keys: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<HashSet<Vec<u8>>> {
    let mut acc = HashSet::new();
    for k in keys {
        if let Some(obj) = db.lookup_for_read(k, now_ms, authority) {
            acc.extend(members_of(obj)?);
        }
    }
    Ok(acc)
}

/// `SDIFF key...`: members of the first key's set not present in any
/// subsequent key's set.
pub fn sdiff(
    db: &mut Database,
    keys: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<HashSet<Vec<u8>>> {
    let mut iter = keys.iter();
    let mut acc = match iter.next() {
        None => return Ok(HashSet::new()),
        Some(k) => match db.lookup_for_read(k, now_ms, authority) {
            None => return Ok(HashSet::new()),
            Some(obj) => members_of(obj)?,
        },
    };
    for k in iter {
        if let Some(obj) = db.lookup_for_read(k, now_ms, authority) {
            let members = members_of(obj)?;
            acc.retain(|m| !members.contains(m));
        }
    }
    Ok(acc)
}

/// `SMOVE src dst member`: atomically moves `member` from `src` to
/// `dst` if present in `src`. Returns whether the move happened.
pub fn smove(
    db: &mut Database,
    src: &[u8],
    dst: &[u8],
    member: &[u8],
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    if srem(db, src, std::slice::from_ref(&member.to_vec()), now_ms, authority)? == 0 {
        return Ok(false);
    }
    sadd(db, dst, vec![member.to_vec()], thresholds, now_ms, authority)?;
    Ok(true)
}

/// `SPOP key [count]`: removes and returns up to `count` random
/// members (default 1), deleting the key if emptied.
pub fn spop(
    db: &mut Database,
    key: &[u8],
    count: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    let all = smembers(db, key, now_ms, authority)?;
    let picked: Vec<Vec<u8>> = all.into_iter().take(count).collect();
    if !picked.is_empty() {
        srem(db, key, &picked, now_ms, authority)?;
    }
    Ok(picked)
}

/// `SRANDMEMBER key [count]`: like `SPOP` but non-destructive. A
/// negative `count` (passed as `Some(n)` with `n < 0`, encoded by the
/// caller as `allow_repeats = true`) may repeat members; this
/// implementation only covers the non-repeating case, matching
/// `SMEMBERS`'s own set semantics.
pub fn srandmember(
    db: &mut Database,
    key: &[u8],
    count: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    Ok(smembers(db, key, now_ms, authority)?.into_iter().take(count).collect())
}

/// `SINTERSTORE dst key...`: stores the intersection into `dst`,
/// deleting `dst` if the result is empty. Returns the result's
/// cardinality.
pub fn sinterstore(
    db: &mut Database,
    dst: &[u8],
    keys: &[Vec<u8>],
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let members = sinter(db, keys, now_ms, authority)?;
    store_result(db, dst, members, thresholds, now_ms, authority)
}

/// `SUNIONSTORE dst key...`
pub fn sunionstore(
    db: &mut Database,
    dst: &[u8],
    keys: &[Vec<u8>],
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let members = sunion(db, keys, now_ms, authority)?;
    store_result(db, dst, members, thresholds, now_ms, authority)
}

/// `SDIFFSTORE dst key...`
pub fn sdiffstore(
    db: &mut Database,
    dst: &[u8],
    keys: &[Vec<u8>],
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let members = sdiff(db, keys, now_ms, authority)?;
    store_result(db, dst, members, thresholds, now_ms, authority)
}

fn store_result(
    db: &mut Database,
    dst: &[u8],
    members: HashSet<Vec<u8>>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    db.delete(dst);
    let len = members.len();
    if len > 0 {
        sadd(db, dst, members.into_iter().collect(), thresholds, now_ms, authority)?;
    }
    Ok(len)
}

/// `SSCAN key cursor [MATCH pattern] [COUNT count]`: a compact-encoded
/// (intset) set is always fully returned in one call with cursor 0, per
/// the scan contract's carve-out for compact containers; a
/// hashtable-encoded set uses a simple index-based cursor over a
/// snapshot of its members, since `SetHashtable` is a plain `HashSet`
/// rather than the keyspace's reentrant `KeyTable`.
pub fn sscan(
    db: &mut Database,
    key: &[u8],
    cursor: u64,
    pattern: Option<&[u8]>,
    count: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<(u64, Vec<Vec<u8>>)> {
    let members = smembers(db, key, now_ms, authority)?;
    let is_intset = matches!(db.dict_get(key), Some(RObject::SetIntset(..)));
    if is_intset || cursor as usize >= members.len() {
        let filtered: Vec<Vec<u8>> = members
            .into_iter()
            .skip(cursor as usize)
            .filter(|m| pattern.map_or(true, |p| corekv_core::glob_match(p, m)))
            .collect();
        return Ok((0, if is_intset { filtered } else { Vec::new() }));
    }
    let end = (cursor as usize + count.max(1)).min(members.len());
    let batch: Vec<Vec<u8>> = members[cursor as usize..end]
        .iter()
        .filter(|m| pattern.map_or(true, |p| corekv_core::glob_match(p, m)))
        .cloned()
        .collect();
    let next = if end >= members.len() { 0 } else { end as u64 };
    Ok((next, batch))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 0;
    const P: ExpireAuthority = ExpireAuthority::Primary;

    fn th() -> EncodingThresholds {
        EncodingThresholds::default()
    }

    #[test]
    fn all_integer_members_use_intset_encoding() {
        let mut db = Database::new();
        sadd(&mut db, b"k", vec![b"3".to_vec(), b"1".to_vec(), b"2".to_vec()], &th(), NOW, P).unwrap();
        assert!(matches!(db.dict_get(b"k"), Some(RObject::SetIntset(..))));
        assert_eq!(scard(&mut db, b"k", NOW, P).unwrap(), 3);
    }

    #[test]
    fn non_integer_member_upgrades_to_hashtable() {
        let mut db = Database::new();
        sadd(&mut db, b"k", vec![b"1".to_vec(), b"abc".to_vec()], &th(), NOW, P).unwrap();
        assert!(matches!(db.dict_get(b"k"), Some(RObject::SetHashtable(_))));
    }

    #[test]
    fn sadd_reports_only_newly_added_count() {
        let mut db = Database::new();
        assert_eq!(sadd(&mut db, b"k", vec![b"1".to_vec(), b"1".to_vec()], &th(), NOW, P).unwrap(), 1);
        assert_eq!(sadd(&mut db, b"k", vec![b"1".to_vec(), b"2".to_vec()], &th(), NOW, P).unwrap(), 1);
    }

    #[test]
    fn srem_deletes_key_when_emptied() {
        let mut db = Database::new();
        sadd(&mut db, b"k", vec![b"1".to_vec()], &th(), NOW, P).unwrap();
        assert_eq!(srem(&mut db, b"k", &[b"1".to_vec()], NOW, P).unwrap(), 1);
        assert!(!db.contains(b"k", NOW, P));
    }

    #[test]
    fn inter_union_diff() {
        let mut db = Database::new();
        sadd(&mut db, b"a", vec![b"1".to_vec(), b"2".to_vec(), b"3".to_vec()], &th(), NOW, P).unwrap();
        sadd(&mut db, b"b", vec![b"2".to_vec(), b"3".to_vec(), b"4".to_vec()], &th(), NOW, P).unwrap();
        let keys = vec![b"a".to_vec(), b"b".to_vec()];
        let inter = sinter(&mut db, &keys, NOW, P).unwrap();
        assert_eq!(inter, HashSet::from([b"2".to_vec(), b"3".to_vec()]));
        let union = sunion(&mut db, &keys, NOW, P).unwrap();
        assert_eq!(union.len(), 4);
        let diff = sdiff(&mut db, &keys, NOW, P).unwrap();
        assert_eq!(diff, HashSet::from([b"1".to_vec()]));
    }

    #[test]
    fn smove_transfers_membership() {
        let mut db = Database::new();
        sadd(&mut db, b"a", vec![b"1".to_vec()], &th(), NOW, P).unwrap();
        assert!(smove(&mut db, b"a", b"b", b"1", &th(), NOW, P).unwrap());
        assert!(!db.contains(b"a", NOW, P));
        assert!(sismember(&mut db, b"b", b"1", NOW, P).unwrap());
        assert!(!smove(&mut db, b"a", b"b", b"9", &th(), NOW, P).unwrap());
    }

    #[test]
    fn spop_removes_returned_members() {
        let mut db = Database::new();
        sadd(&mut db, b"k", vec![b"1".to_vec(), b"2".to_vec()], &th(), NOW, P).unwrap();
        let popped = spop(&mut db, b"k", 1, NOW, P).unwrap();
        assert_eq!(popped.len(), 1);
        assert_eq!(scard(&mut db, b"k", NOW, P).unwrap(), 1);
    }

    #[test]
    fn sinterstore_writes_result_and_deletes_when_empty() {
        let mut db = Database::new();
        sadd(&mut db, b"a", vec![b"1".to_vec()], &th(), NOW, P).unwrap();
        sadd(&mut db, b"b", vec![b"2".to_vec()], &th(), NOW, P).unwrap();
        let keys = vec![b"a".to_vec(), b"b".to_vec()];
        let n = sinterstore(&mut db, b"dst", &keys, &th(), NOW, P).unwrap();
        assert_eq!(n, 0);
        assert!(!db.contains(b"dst", NOW, P));
    }

    #[test]
    fn sscan_covers_intset_in_one_call() {
        let mut db = Database::new();
        sadd(&mut db, b"k", vec![b"1".to_vec(), b"2".to_vec()], &th(), NOW, P).unwrap();
        let (cursor, batch) = sscan(&mut db, b"k", 0, None, 10, NOW, P).unwrap();
        assert_eq!(cursor, 0);
        assert_eq!(batch.len(), 2);
    }
}
