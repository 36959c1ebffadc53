//! Sorted set commands.
//!
//! `ZsetZiplist` keeps `(member, score)` pairs in score order inside a
//! flat `Vec` — insertion is linear but cheap for small sets. Crossing
//! either threshold upgrades permanently to `ZsetSkiplist`, whose
//! [`corekv_core::ZSet`] pairs a skip list (for ordered/ranked access)
//! with a `member -> score` map (for O(1) `ZSCORE`).

use crate::command_error::{CommandError, Result};
use corekv_core::{EncodingThresholds, LexRange, RObject, RangeLimit, ScoreRange, ZSet};
use corekv_storage::{Database, ExpireAuthority};

fn ziplist_insert(entries: &mut Vec<(Vec<u8>, f64)>, member: Vec<u8>, score: f64) -> bool {
    match entries.iter().position(|(m, _)| *m == member) {
        Some(pos) => {
            entries[pos].1 = score;
            let (m, s) = entries.remove(pos);
            let idx = entries
                .iter()
                .position(|(_, es)| *es > s)
                .unwrap_or(entries.len());
            entries.insert(idx, (m, s));
            false
        }
        None => {
            let idx = entries
                .iter()
                .position(|(_, es)| *es > score)
                .unwrap_or(entries.len());
            entries.insert(idx, (member, score));
            true
        }
    }
}

fn to_skiplist(entries: &[(Vec<u8>, f64)]) -> ZSet {
    let mut z = ZSet::new();
    for (m, s) in entries {
        z.insert(m.clone(), *s);
    }
    z
}

/// `ZADD key score member [score member ...]`. Returns the number of
/// members newly added (not counting score updates to existing ones).
pub fn zadd(
    db: &mut Database,
    key: &[u8],
    pairs: Vec<(f64, Vec<u8>)>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let mut added = 0usize;
    let new_obj: Option<RObject> = match db.lookup_for_write(key, now_ms, authority) {
        None => {
            let mut entries: Vec<(Vec<u8>, f64)> = Vec::new();
            for (score, member) in &pairs {
                if ziplist_insert(&mut entries, member.clone(), *score) {
                    added += 1;
                }
            }
            let over = entries.len() > thresholds.zset_max_ziplist_entries
                || entries.iter().any(|(m, _)| m.len() > thresholds.zset_max_ziplist_value);
            Some(if over {
                RObject::ZsetSkiplist(to_skiplist(&entries))
            } else {
                RObject::ZsetZiplist(entries)
            })
        }
        Some(RObject::ZsetZiplist(entries)) => {
            for (score, member) in &pairs {
                if ziplist_insert(entries, member.clone(), *score) {
                    added += 1;
                }
            }
            let over = entries.len() > thresholds.zset_max_ziplist_entries
                || entries.iter().any(|(m, _)| m.len() > thresholds.zset_max_ziplist_value);
            if over {
                Some(RObject::ZsetSkiplist(to_skiplist(entries)))
            } else {
                None
            }
        }
        Some(RObject::ZsetSkiplist(z)) => {
            for (score, member) in pairs {
                if z.insert(member, score) {
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

/// `ZINCRBY key delta member`. Returns the member's new score.
pub fn zincrby(
    db: &mut Database,
    key: &[u8],
    delta: f64,
    member: Vec<u8>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<f64> {
    let current = zscore(db, key, &member, now_ms, authority)?.unwrap_or(0.0);
    let next = current + delta;
    if !next.is_finite() {
        return Err(CommandError::NotAFloat);
    }
    zadd(db, key, vec![(next, member)], thresholds, now_ms, authority)?;
    Ok(next)
}

/// `ZSCORE key member`
pub fn zscore(
    db: &mut Database,
    key: &[u8],
    member: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<f64>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(None),
        Some(RObject::ZsetZiplist(entries)) => Ok(entries.iter().find(|(m, _)| m == member).map(|(_, s)| *s)),
        Some(RObject::ZsetSkiplist(z)) => Ok(z.score(member)),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `ZREM key member...`. Returns the number removed, deleting the key
/// if it becomes empty.
pub fn zrem(
    db: &mut Database,
    key: &[u8],
    members: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let removed = match db.lookup_for_write(key, now_ms, authority) {
        None => return Ok(0),
        Some(RObject::ZsetZiplist(entries)) => {
            let mut n = 0;
            for m in members {
                if let Some(pos) = entries.iter().position(|(em, _)| em == m) {
                    entries.remove(pos);
                    n += 1;
                }
            }
            n
        }
        Some(RObject::ZsetSkiplist(z)) => {
            let mut n = 0;
            for m in members {
                if z.remove(m) {
                    n += 1;
                }
            }
            n
        }
        Some(_) => return Err(CommandError::WrongType),
    };
    let empty = matches!(db.dict_get(key), Some(RObject::ZsetZiplist(e)) if e.is_empty())
        || matches!(db.dict_get(key), Some(RObject::ZsetSkiplist(z)) if z.is_empty());
    if empty {
        db.delete(key);
    }
    Ok(removed)
}

/// `ZCARD key`
pub fn zcard(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(0),
        Some(RObject::ZsetZiplist(e)) => Ok(e.len()),
        Some(RObject::ZsetSkiplist(z)) => Ok(z.len() as usize),
        Some(_) => Err(CommandError::WrongType),
    }
}

fn ordered_pairs(obj: &RObject) -> Result<Vec<(Vec<u8>, f64)>> {
    match obj {
        RObject::ZsetZiplist(e) => Ok(e.clone()),
        RObject::ZsetSkiplist(z) => Ok(z.iter().map(|(m, s)| (m.to_vec(), s)).collect()),
        _ => Err(CommandError::WrongType),
    }
}

/// `ZRANK key member` (ascending) or `ZREVRANK` (`reverse = true`).
pub fn zrank(
    db: &mut Database,
    key: &[u8],
    member: &[u8],
    reverse: bool,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<u64>> {
    let obj = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(None),
        Some(obj) => obj,
    };
    let pairs = ordered_pairs(obj)?;
    let pos = pairs.iter().position(|(m, _)| m == member);
    Ok(pos.map(|p| {
        if reverse {
            (pairs.len() - 1 - p) as u64
        } else {
            p as u64
        }
    }))
}

/// `ZRANGE key start stop` (ascending) or `ZREVRANGE` (`reverse = true`);
/// negative-index-aware, inclusive.
pub fn zrange(
    db: &mut Database,
    key: &[u8],
    start: i64,
    stop: i64,
    reverse: bool,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<(Vec<u8>, f64)>> {
    let obj = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(Vec::new()),
        Some(obj) => obj,
    };
    let mut pairs = ordered_pairs(obj)?;
    if reverse {
        pairs.reverse();
    }
    let len = pairs.len() as i64;
    if len == 0 {
        return Ok(Vec::new());
    }
    let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
    let s = norm(start);
    let e = norm(stop).min(len - 1);
    if s > e || s >= len {
        return Ok(Vec::new());
    }
    Ok(pairs.into_iter().skip(s as usize).take((e - s + 1) as usize).collect())
}

/// `ZRANGEBYSCORE`/`ZREVRANGEBYSCORE key min max [LIMIT offset count]`.
pub fn zrangebyscore(
    db: &mut Database,
    key: &[u8],
    range: &ScoreRange,
    limit: &RangeLimit,
    reverse: bool,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<(Vec<u8>, f64)>> {
    let obj = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(Vec::new()),
        Some(obj) => obj,
    };
    let mut pairs: Vec<(Vec<u8>, f64)> = ordered_pairs(obj)?
        .into_iter()
        .filter(|(_, s)| range.contains(*s))
        .collect();
    if reverse {
        pairs.reverse();
    }
    Ok(apply_limit(pairs, limit))
}

/// `ZRANGEBYLEX`/`ZREVRANGEBYLEX key min max [LIMIT offset count]`.
/// Only meaningful when every member has equal score (the lexicographic
/// ordering contract callers are responsible for upholding).
pub fn zrangebylex(
    db: &mut Database,
    key: &[u8],
    range: &LexRange,
    limit: &RangeLimit,
    reverse: bool,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    let obj = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(Vec::new()),
        Some(obj) => obj,
    };
    let mut members: Vec<Vec<u8>> = ordered_pairs(obj)?
        .into_iter()
        .map(|(m, _)| m)
        .filter(|m| range.contains(m))
        .collect();
    if reverse {
        members.reverse();
    }
    Ok(apply_limit(members, limit))
}

fn apply_limit<T>(items: Vec<T>, limit: &RangeLimit) -> Vec<T> {
    let rest: Vec<T> = items.into_iter().skip(limit.offset).collect();
    match limit.count {
        Some(n) => rest.into_iter().take(n).collect(),
        None => rest,
    }
}

/// `ZCOUNT key min max`: the number of members whose score falls in
/// `range`, without materializing them.
pub fn zcount(
    db: &mut Database,
    key: &[u8],
    range: &ScoreRange,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let obj = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(0),
        Some(obj) => obj,
    };
    Ok(ordered_pairs(obj)?.into_iter().filter(|(_, s)| range.contains(*s)).count())
}

/// `ZLEXCOUNT key min max`. Only meaningful when every member shares a
/// score, same precondition as `ZRANGEBYLEX`.
pub fn zlexcount(
    db: &mut Database,
    key: &[u8],
    range: &LexRange,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let obj = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(0),
        Some(obj) => obj,
    };
    Ok(ordered_pairs(obj)?.into_iter().filter(|(m, _)| range.contains(m)).count())
}

/// `ZREMRANGEBYRANK key start stop`: removes members by ascending rank,
/// negative-index-aware and inclusive, deleting the key if emptied.
/// Returns the number removed.
pub fn zremrangebyrank(
    db: &mut Database,
    key: &[u8],
    start: i64,
    stop: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let kept_and_removed = {
        let obj = match db.lookup_for_read(key, now_ms, authority) {
            None => return Ok(0),
            Some(obj) => obj,
        };
        let pairs = ordered_pairs(obj)?;
        let len = pairs.len() as i64;
        if len == 0 {
            return Ok(0);
        }
        let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
        let s = norm(start);
        let e = norm(stop).min(len - 1);
        if s > e || s >= len {
            None
        } else {
            let members_to_remove: Vec<Vec<u8>> = pairs[s as usize..=(e as usize)]
                .iter()
                .map(|(m, _)| m.clone())
                .collect();
            Some(members_to_remove)
        }
    };
    match kept_and_removed {
        None => Ok(0),
        Some(members) => zrem(db, key, &members, now_ms, authority),
    }
}

/// `ZREMRANGEBYSCORE key min max`. Returns the number removed.
pub fn zremrangebyscore(
    db: &mut Database,
    key: &[u8],
    range: &ScoreRange,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let members: Vec<Vec<u8>> = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(0),
        Some(obj) => ordered_pairs(obj)?
            .into_iter()
            .filter(|(_, s)| range.contains(*s))
            .map(|(m, _)| m)
            .collect(),
    };
    zrem(db, key, &members, now_ms, authority)
}

/// `ZREMRANGEBYLEX key min max`. Returns the number removed.
pub fn zremrangebylex(
    db: &mut Database,
    key: &[u8],
    range: &LexRange,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let members: Vec<Vec<u8>> = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(0),
        Some(obj) => ordered_pairs(obj)?
            .into_iter()
            .filter(|(m, _)| range.contains(m))
            .map(|(m, _)| m)
            .collect(),
    };
    zrem(db, key, &members, now_ms, authority)
}

/// How `ZUNIONSTORE`/`ZINTERSTORE` combine a member's score across the
/// input sets it appears in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    /// Add the (weighted) scores together — the default.
    Sum,
    /// Keep the lowest (weighted) score.
    Min,
    /// Keep the highest (weighted) score.
    Max,
}

impl Aggregate {
    fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            Aggregate::Sum => a + b,
            Aggregate::Min => a.min(b),
            Aggregate::Max => a.max(b),
        }
    }
}

fn weighted_members(
    db: &mut Database,
    key: &[u8],
    weight: f64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<(Vec<u8>, f64)>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(Vec::new()),
        Some(obj) => Ok(ordered_pairs(obj)?
            .into_iter()
            .map(|(m, s)| (m, s * weight))
            .collect()),
    }
}

/// `ZUNIONSTORE dst numkeys key [key ...] [WEIGHTS w...] [AGGREGATE a]`.
/// `weights` must either be empty (all `1.0`) or match `keys` in length.
/// Stores into `dst` (always as the general `ZsetSkiplist` encoding,
/// since the result's member count is rarely known in advance) and
/// returns its cardinality.
pub fn zunionstore(
    db: &mut Database,
    dst: &[u8],
    keys: &[Vec<u8>],
    weights: &[f64],
    aggregate: Aggregate,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let mut acc: Vec<(Vec<u8>, f64)> = Vec::new();
    for (i, key) in keys.iter().enumerate() {
        let weight = weights.get(i).copied().unwrap_or(1.0);
        for (member, score) in weighted_members(db, key, weight, now_ms, authority)? {
            match acc.iter_mut().find(|(m, _)| *m == member) {
                Some(slot) => slot.1 = aggregate.combine(slot.1, score),
                None => acc.push((member, score)),
            }
        }
    }
    store_zset_result(db, dst, acc, now_ms, authority)
}

/// `ZINTERSTORE dst numkeys key [key ...] [WEIGHTS w...] [AGGREGATE a]`.
/// Only members present in every input set survive.
pub fn zinterstore(
    db: &mut Database,
    dst: &[u8],
    keys: &[Vec<u8>],
    weights: &[f64],
    aggregate: Aggregate,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    if keys.is_empty() {
        return store_zset_result(db, dst, Vec::new(), now_ms, authority);
    }
    let first_weight = weights.first().copied().unwrap_or(1.0);
    let mut acc: Vec<(Vec<u8>, f64)> = weighted_members(db, &keys[0], first_weight, now_ms, authority)?;
    for (i, key) in keys.iter().enumerate().skip(1) {
        let weight = weights.get(i).copied().unwrap_or(1.0);
        let members = weighted_members(db, key, weight, now_ms, authority)?;
        acc.retain_mut(|(member, score)| match members.iter().find(|(m, _)| m == member) {
            Some((_, other_score)) => {
                *score = aggregate.combine(*score, *other_score);
                true
            }
            None => false,
        });
    }
    store_zset_result(db, dst, acc, now_ms, authority)
}

fn store_zset_result(
    db: &mut Database,
    dst: &[u8],
    members: Vec<(Vec<u8>, f64)>,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    db.delete(dst);
    let len = members.len();
    if len > 0 {
        db.set_fresh(dst.to_vec(), RObject::ZsetSkiplist(to_skiplist(&members)), now_ms);
    }
    let _ = authority;
    Ok(len)
}

/// `ZSCAN key cursor [MATCH pattern] [COUNT count]`. As with `HSCAN`, a
/// ziplist-encoded zset is returned whole in one call; a skiplist-encoded
/// one uses an index-based cursor over a snapshot of its ordered pairs.
pub fn zscan(
    db: &mut Database,
    key: &[u8],
    cursor: u64,
    pattern: Option<&[u8]>,
    count: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<(u64, Vec<(Vec<u8>, f64)>)> {
    let (pairs, is_ziplist) = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok((0, Vec::new())),
        Some(obj @ RObject::ZsetZiplist(_)) => (ordered_pairs(obj)?, true),
        Some(obj @ RObject::ZsetSkiplist(_)) => (ordered_pairs(obj)?, false),
        Some(_) => return Err(CommandError::WrongType),
    };
    if is_ziplist || cursor as usize >= pairs.len() {
        let filtered: Vec<(Vec<u8>, f64)> = pairs
            .into_iter()
            .skip(cursor as usize)
            .filter(|(m, _)| pattern.map_or(true, |p| corekv_core::glob_match(p, m)))
            .collect();
        return Ok((0, if is_ziplist { filtered } else { Vec::new() }));
    }
    let end = (cursor as usize + count.max(1)).min(pairs.len());
    let batch: Vec<(Vec<u8>, f64)> = pairs[cursor as usize..end]
        .iter()
        .filter(|(m, _)| pattern.map_or(true, |p| corekv_core::glob_match(p, m)))
        .cloned()
        .collect();
    let next = if end >= pairs.len() { 0 } else { end as u64 };
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
    fn zadd_keeps_ziplist_sorted_by_score() {
        let mut db = Database::new();
        zadd(&mut db, b"k", vec![(3.0, b"c".to_vec()), (1.0, b"a".to_vec()), (2.0, b"b".to_vec())], &th(), NOW, P).unwrap();
        let range = zrange(&mut db, b"k", 0, -1, false, NOW, P).unwrap();
        assert_eq!(
            range,
            vec![(b"a".to_vec(), 1.0), (b"b".to_vec(), 2.0), (b"c".to_vec(), 3.0)]
        );
    }

    #[test]
    fn exceeding_threshold_upgrades_to_skiplist() {
        let mut db = Database::new();
        let tight = EncodingThresholds {
            zset_max_ziplist_entries: 1,
            ..th()
        };
        zadd(&mut db, b"k", vec![(1.0, b"a".to_vec())], &tight, NOW, P).unwrap();
        assert!(matches!(db.dict_get(b"k"), Some(RObject::ZsetZiplist(_))));
        zadd(&mut db, b"k", vec![(2.0, b"b".to_vec())], &tight, NOW, P).unwrap();
        assert!(matches!(db.dict_get(b"k"), Some(RObject::ZsetSkiplist(_))));
        assert_eq!(zscore(&mut db, b"k", b"a", NOW, P).unwrap(), Some(1.0));
    }

    #[test]
    fn zadd_updating_score_does_not_count_as_added() {
        let mut db = Database::new();
        assert_eq!(zadd(&mut db, b"k", vec![(1.0, b"a".to_vec())], &th(), NOW, P).unwrap(), 1);
        assert_eq!(zadd(&mut db, b"k", vec![(5.0, b"a".to_vec())], &th(), NOW, P).unwrap(), 0);
        assert_eq!(zscore(&mut db, b"k", b"a", NOW, P).unwrap(), Some(5.0));
    }

    #[test]
    fn zincrby_accumulates() {
        let mut db = Database::new();
        assert_eq!(zincrby(&mut db, b"k", 5.0, b"a".to_vec(), &th(), NOW, P).unwrap(), 5.0);
        assert_eq!(zincrby(&mut db, b"k", -2.0, b"a".to_vec(), &th(), NOW, P).unwrap(), 3.0);
    }

    #[test]
    fn zrangebyscore_respects_limit() {
        let mut db = Database::new();
        zadd(
            &mut db,
            b"k",
            vec![(1.0, b"a".to_vec()), (2.0, b"b".to_vec()), (3.0, b"c".to_vec())],
            &th(),
            NOW,
            P,
        )
        .unwrap();
        let range = ScoreRange::parse("-inf", "+inf").unwrap();
        let limit = RangeLimit { offset: 1, count: Some(1) };
        let got = zrangebyscore(&mut db, b"k", &range, &limit, false, NOW, P).unwrap();
        assert_eq!(got, vec![(b"b".to_vec(), 2.0)]);
    }

    #[test]
    fn zrank_and_zrevrank() {
        let mut db = Database::new();
        zadd(&mut db, b"k", vec![(1.0, b"a".to_vec()), (2.0, b"b".to_vec())], &th(), NOW, P).unwrap();
        assert_eq!(zrank(&mut db, b"k", b"b", false, NOW, P).unwrap(), Some(1));
        assert_eq!(zrank(&mut db, b"k", b"b", true, NOW, P).unwrap(), Some(0));
    }

    #[test]
    fn zrem_deletes_key_when_emptied() {
        let mut db = Database::new();
        zadd(&mut db, b"k", vec![(1.0, b"a".to_vec())], &th(), NOW, P).unwrap();
        assert_eq!(zrem(&mut db, b"k", &[b"a".to_vec()], NOW, P).unwrap(), 1);
        assert!(!db.contains(b"k", NOW, P));
    }

    #[test]
    fn zcount_counts_members_within_score_range() {
        let mut db = Database::new();
        zadd(
            &mut db,
            b"k",
            vec![(1.0, b"a".to_vec()), (2.0, b"b".to_vec()), (3.0, b"c".to_vec())],
            &th(),
            NOW,
            P,
        )
        .unwrap();
        let range = ScoreRange::parse("(1", "3").unwrap();
        assert_eq!(zcount(&mut db, b"k", &range, NOW, P).unwrap(), 2);
        assert_eq!(zcount(&mut db, b"missing", &range, NOW, P).unwrap(), 0);
    }

    #[test]
    fn zlexcount_counts_members_within_lex_range() {
        let mut db = Database::new();
        zadd(
            &mut db,
            b"k",
            vec![(0.0, b"a".to_vec()), (0.0, b"b".to_vec()), (0.0, b"c".to_vec())],
            &th(),
            NOW,
            P,
        )
        .unwrap();
        let range = LexRange::parse(b"[a", b"[b").unwrap();
        assert_eq!(zlexcount(&mut db, b"k", &range, NOW, P).unwrap(), 2);
    }

    #[test]
    fn zremrangebyrank_removes_the_lowest_scoring_members() {
        let mut db = Database::new();
        zadd(
            &mut db,
            b"k",
            vec![(1.0, b"a".to_vec()), (2.0, b"b".to_vec()), (3.0, b"c".to_vec())],
            &th(),
            NOW,
            P,
        )
        .unwrap();
        assert_eq!(zremrangebyrank(&mut db, b"k", 0, 0, NOW, P).unwrap(), 1);
        let range = zrange(&mut db, b"k", 0, -1, false, NOW, P).unwrap();
        assert_eq!(range, vec![(b"b".to_vec(), 2.0), (b"c".to_vec(), 3.0)]);
    }

    #[test]
    fn zremrangebyscore_deletes_key_when_everything_removed() {
        let mut db = Database::new();
        zadd(&mut db, b"k", vec![(1.0, b"a".to_vec())], &th(), NOW, P).unwrap();
        let range = ScoreRange::parse("-inf", "+inf").unwrap();
        assert_eq!(zremrangebyscore(&mut db, b"k", &range, NOW, P).unwrap(), 1);
        assert!(!db.contains(b"k", NOW, P));
    }

    #[test]
    fn zremrangebylex_removes_matching_members() {
        let mut db = Database::new();
        zadd(
            &mut db,
            b"k",
            vec![(0.0, b"a".to_vec()), (0.0, b"b".to_vec())],
            &th(),
            NOW,
            P,
        )
        .unwrap();
        let range = LexRange::parse(b"[a", b"[a").unwrap();
        assert_eq!(zremrangebylex(&mut db, b"k", &range, NOW, P).unwrap(), 1);
        assert_eq!(zcard(&mut db, b"k", NOW, P).unwrap(), 1);
    }

    #[test]
    fn zunionstore_sums_weighted_scores_by_default() {
        let mut db = Database::new();
        zadd(&mut db, b"a", vec![(1.0, b"x".to_vec())], &th(), NOW, P).unwrap();
        zadd(&mut db, b"b", vec![(2.0, b"x".to_vec()), (3.0, b"y".to_vec())], &th(), NOW, P).unwrap();
        let n = zunionstore(
            &mut db,
            b"dst",
            &[b"a".to_vec(), b"b".to_vec()],
            &[],
            Aggregate::Sum,
            NOW,
            P,
        )
        .unwrap();
        assert_eq!(n, 2);
        assert_eq!(zscore(&mut db, b"dst", b"x", NOW, P).unwrap(), Some(3.0));
        assert_eq!(zscore(&mut db, b"dst", b"y", NOW, P).unwrap(), Some(3.0));
    }

    #[test]
    fn zinterstore_only_keeps_members_in_every_set() {
        let mut db = Database::new();
        zadd(&mut db, b"a", vec![(1.0, b"x".to_vec()), (1.0, b"y".to_vec())], &th(), NOW, P).unwrap();
        zadd(&mut db, b"b", vec![(2.0, b"x".to_vec())], &th(), NOW, P).unwrap();
        let n = zinterstore(
            &mut db,
            b"dst",
            &[b"a".to_vec(), b"b".to_vec()],
            &[],
            Aggregate::Max,
            NOW,
            P,
        )
        .unwrap();
        assert_eq!(n, 1);
        assert_eq!(zscore(&mut db, b"dst", b"x", NOW, P).unwrap(), Some(2.0));
    }

    #[test]
    fn zscan_paginates_a_skiplist_encoded_zset() {
        let mut db = Database::new();
        let tight = EncodingThresholds { zset_max_ziplist_entries: 0, ..th() };
        zadd(
            &mut db,
            b"k",
            vec![(1.0, b"a".to_vec()), (2.0, b"b".to_vec()), (3.0, b"c".to_vec())],
            &tight,
            NOW,
            P,
        )
        .unwrap();
        assert!(matches!(db.dict_get(b"k"), Some(RObject::ZsetSkiplist(_))));
        let (cursor, batch) = zscan(&mut db, b"k", 0, None, 2, NOW, P).unwrap();
        assert_eq!(batch.len(), 2);
        assert_ne!(cursor, 0);
        let (cursor, batch) = zscan(&mut db, b"k", cursor, None, 2, NOW, P).unwrap();
        assert_eq!(cursor, 0);
        assert_eq!(batch.len(), 1);
    }
}
