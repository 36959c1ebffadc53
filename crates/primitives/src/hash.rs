//! Hash commands.
//!
//! `HashZiplist` stores field/value pairs as a flat `Vec` (linear lookup,
//! but cheap to allocate and iterate for small hashes); crossing either
//! threshold upgrades permanently to `HashHashtable`'s `HashMap`.

use crate::command_error::{CommandError, Result};
use corekv_core::{EncodingThresholds, RObject};
use corekv_storage::{Database, ExpireAuthority};
use std::collections::HashMap;

fn to_map(entries: &[(Vec<u8>, Vec<u8>)]) -> HashMap<Vec<u8>, Vec<u8>> {
    entries.iter().cloned().collect()
}

/// `HSET key field value [field value ...]`. Returns the number of
/// fields newly created (as opposed to updated).
pub fn hset(
    db: &mut Database,
    key: &[u8],
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let mut created = 0usize;
    let new_obj: Option<RObject> = match db.lookup_for_write(key, now_ms, authority) {
        None => {
            let over = pairs.len() > thresholds.hash_max_ziplist_entries
                || pairs
                    .iter()
                    .any(|(f, v)| f.len() > thresholds.hash_max_ziplist_value || v.len() > thresholds.hash_max_ziplist_value);
            created = pairs.len();
            Some(if over {
                RObject::HashHashtable(pairs.into_iter().collect())
            } else {
                RObject::HashZiplist(pairs)
            })
        }
        Some(RObject::HashZiplist(entries)) => {
            for (f, v) in &pairs {
                match entries.iter_mut().find(|(ef, _)| ef == f) {
                    Some(slot) => slot.1 = v.clone(),
                    None => {
                        entries.push((f.clone(), v.clone()));
                        created += 1;
                    }
                }
            }
            let over = entries.len() > thresholds.hash_max_ziplist_entries
                || entries
                    .iter()
                    .any(|(f, v)| f.len() > thresholds.hash_max_ziplist_value || v.len() > thresholds.hash_max_ziplist_value);
            if over {
                Some(RObject::HashHashtable(to_map(entries)))
            } else {
                None
            }
        }
        Some(RObject::HashHashtable(map)) => {
            for (f, v) in pairs {
                if map.insert(f, v).is_none() {
                    created += 1;
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
    Ok(created)
}

/// `HSETNX key field value`: sets only if `field` is absent. Returns
/// `true` if it was set.
pub fn hsetnx(
    db: &mut Database,
    key: &[u8],
    field: Vec<u8>,
    value: Vec<u8>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    if hget(db, key, &field, now_ms, authority)?.is_some() {
        return Ok(false);
    }
    hset(db, key, vec![(field, value)], thresholds, now_ms, authority)?;
    Ok(true)
}

/// `HGET key field`
pub fn hget(
    db: &mut Database,
    key: &[u8],
    field: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<Vec<u8>>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(None),
        Some(RObject::HashZiplist(entries)) => {
            Ok(entries.iter().find(|(f, _)| f == field).map(|(_, v)| v.clone()))
        }
        Some(RObject::HashHashtable(map)) => Ok(map.get(field).cloned()),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `HDEL key field...`. Returns the number of fields removed, deleting
/// the key entirely if it becomes empty.
pub fn hdel(
    db: &mut Database,
    key: &[u8],
    fields: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let removed = match db.lookup_for_write(key, now_ms, authority) {
        None => return Ok(0),
        Some(RObject::HashZiplist(entries)) => {
            let mut n = 0;
            for f in fields {
                if let Some(pos) = entries.iter().position(|(ef, _)| ef == f) {
                    entries.remove(pos);
                    n += 1;
                }
            }
            n
        }
        Some(RObject::HashHashtable(map)) => {
            let mut n = 0;
            for f in fields {
                if map.remove(f.as_slice()).is_some() {
                    n += 1;
                }
            }
            n
        }
        Some(_) => return Err(CommandError::WrongType),
    };
    let empty = matches!(db.dict_get(key), Some(RObject::HashZiplist(e)) if e.is_empty())
        || matches!(db.dict_get(key), Some(RObject::HashHashtable(m)) if m.is_empty());
    if empty {
        db.delete(key);
    }
    Ok(removed)
}

/// `HEXISTS key field`
pub fn hexists(
    db: &mut Database,
    key: &[u8],
    field: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    Ok(hget(db, key, field, now_ms, authority)?.is_some())
}

/// `HLEN key`
pub fn hlen(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(0),
        Some(RObject::HashZiplist(e)) => Ok(e.len()),
        Some(RObject::HashHashtable(m)) => Ok(m.len()),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `HGETALL key`
pub fn hgetall(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(Vec::new()),
        Some(RObject::HashZiplist(e)) => Ok(e.clone()),
        Some(RObject::HashHashtable(m)) => Ok(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect()),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `HKEYS key`
pub fn hkeys(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    Ok(hgetall(db, key, now_ms, authority)?.into_iter().map(|(f, _)| f).collect())
}

/// `HVALS key`
pub fn hvals(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    Ok(hgetall(db, key, now_ms, authority)?.into_iter().map(|(_, v)| v).collect())
}

/// `HINCRBY key field delta`
pub fn hincrby(
    db: &mut Database,
    key: &[u8],
    field: &[u8],
    delta: i64,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<i64> {
    let cur = match hget(db, key, field, now_ms, authority)? {
        None => 0,
        Some(v) => std::str::from_utf8(&v)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandError::NotAnInteger)?,
    };
    let next = cur.checked_add(delta).ok_or(CommandError::IncrementOverflow)?;
    hset(
        db,
        key,
        vec![(field.to_vec(), next.to_string().into_bytes())],
        thresholds,
        now_ms,
        authority,
    )?;
    Ok(next)
}

/// `HINCRBYFLOAT key field delta`
pub fn hincrbyfloat(
    db: &mut Database,
    key: &[u8],
    field: &[u8],
    delta: f64,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<f64> {
    let cur = match hget(db, key, field, now_ms, authority)? {
        None => 0.0,
        Some(v) => std::str::from_utf8(&v)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or(CommandError::NotAFloat)?,
    };
    let next = cur + delta;
    if !next.is_finite() {
        return Err(CommandError::NotAFloat);
    }
    let mut s = format!("{:.17}", next);
    while s.contains('.') && s.ends_with('0') {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    hset(db, key, vec![(field.to_vec(), s.into_bytes())], thresholds, now_ms, authority)?;
    Ok(next)
}

/// `HMSET key field value [field value ...]`: like `HSET` but discards
/// the created-count, matching the command's `OK`-only reply.
pub fn hmset(
    db: &mut Database,
    key: &[u8],
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<()> {
    hset(db, key, pairs, thresholds, now_ms, authority)?;
    Ok(())
}

/// `HMGET key field...`: `None` per field that is absent.
pub fn hmget(
    db: &mut Database,
    key: &[u8],
    fields: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Option<Vec<u8>>>> {
    fields.iter().map(|f| hget(db, key, f, now_ms, authority)).collect()
}

/// `HSCAN key cursor [MATCH pattern] [COUNT count]`. As with `SSCAN`, a
/// `HashZiplist`-encoded hash returns everything in one call; a
/// `HashHashtable`-encoded one uses an index-based cursor over a
/// snapshot of its entries.
pub fn hscan(
    db: &mut Database,
    key: &[u8],
    cursor: u64,
    pattern: Option<&[u8]>,
    count: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<(u64, Vec<(Vec<u8>, Vec<u8>)>)> {
    let entries = hgetall(db, key, now_ms, authority)?;
    let is_ziplist = matches!(db.dict_get(key), Some(RObject::HashZiplist(_)));
    if is_ziplist || cursor as usize >= entries.len() {
        let filtered: Vec<(Vec<u8>, Vec<u8>)> = entries
            .into_iter()
            .skip(cursor as usize)
            .filter(|(f, _)| pattern.map_or(true, |p| corekv_core::glob_match(p, f)))
            .collect();
        return Ok((0, if is_ziplist { filtered } else { Vec::new() }));
    }
    let end = (cursor as usize + count.max(1)).min(entries.len());
    let batch: Vec<(Vec<u8>, Vec<u8>)> = entries[cursor as usize..end]
        .iter()
        .filter(|(f, _)| pattern.map_or(true, |p| corekv_core::glob_match(p, f)))
        .cloned()
        .collect();
    let next = if end >= entries.len() { 0 } else { end as u64 };
    Ok((next, batch))
}
