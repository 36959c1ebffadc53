//! List commands.
//!
//! `ListCompact` and `ListGeneric` share the same `VecDeque<Vec<u8>>`
//! representation — only the variant tag differs — since a doubly-linked
//! deque is already the general encoding's natural shape; the "compact"
//! variant exists purely so `OBJECT ENCODING` reports `ziplist` while the
//! list stays under the configured entry-count/value-size thresholds.

use crate::command_error::{CommandError, Result};
use corekv_core::{EncodingThresholds, RObject};
use corekv_storage::{Database, ExpireAuthority};
use std::collections::VecDeque;

fn as_list(obj: &RObject) -> Result<&VecDeque<Vec<u8>>> {
    match obj {
        RObject::ListCompact(l) | RObject::ListGeneric(l) => Ok(l),
        _ => Err(CommandError::WrongType),
    }
}

fn rewrap(list: VecDeque<Vec<u8>>, thresholds: &EncodingThresholds) -> RObject {
    let over_count = list.len() > thresholds.list_max_ziplist_entries;
    let over_value = list
        .iter()
        .any(|v| v.len() > thresholds.list_max_ziplist_value);
    if over_count || over_value {
        RObject::ListGeneric(list)
    } else {
        RObject::ListCompact(list)
    }
}

/// `LPUSH`/`RPUSH`. `at_head` selects which end. Returns the resulting
/// length. A value already in `ListGeneric` encoding never downgrades
/// back to `ListCompact` even if it shrinks below threshold again.
pub fn push(
    db: &mut Database,
    key: &[u8],
    values: Vec<Vec<u8>>,
    at_head: bool,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let (mut list, was_generic) = match db.lookup_for_write(key, now_ms, authority) {
        None => (VecDeque::new(), false),
        Some(RObject::ListCompact(l)) => (std::mem::take(l), false),
        Some(RObject::ListGeneric(l)) => (std::mem::take(l), true),
        Some(_) => return Err(CommandError::WrongType),
    };
    for v in values {
        if at_head {
            list.push_front(v);
        } else {
            list.push_back(v);
        }
    }
    let len = list.len();
    let obj = if was_generic {
        RObject::ListGeneric(list)
    } else {
        rewrap(list, thresholds)
    };
    db.insert_preserving_ttl(key.to_vec(), obj, now_ms);
    Ok(len)
}

/// `LPUSHX`/`RPUSHX`: only push if the key already exists as a list.
/// Returns `None` if the key didn't exist.
pub fn pushx(
    db: &mut Database,
    key: &[u8],
    values: Vec<Vec<u8>>,
    at_head: bool,
    thresholds: &EncodingThresholds,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<usize>> {
    if !db.contains(key, now_ms, authority) {
        return Ok(None);
    }
    push(db, key, values, at_head, thresholds, now_ms, authority).map(Some)
}

/// `LPOP`/`RPOP`. Removes and returns the element from the requested end,
/// deleting the key if the list becomes empty.
pub fn pop(
    db: &mut Database,
    key: &[u8],
    from_head: bool,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<Vec<u8>>> {
    let popped = match db.lookup_for_write(key, now_ms, authority) {
        None => return Ok(None),
        Some(RObject::ListCompact(l)) | Some(RObject::ListGeneric(l)) => {
            if from_head {
                l.pop_front()
            } else {
                l.pop_back()
            }
        }
        Some(_) => return Err(CommandError::WrongType),
    };
    if matches!(db.dict_get(key), Some(RObject::ListCompact(l)) | Some(RObject::ListGeneric(l)) if l.is_empty())
    {
        db.delete(key);
    }
    Ok(popped)
}

/// `LLEN key`
pub fn llen(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(0),
        Some(obj) => Ok(as_list(obj)?.len()),
    }
}

fn normalize_index(idx: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let i = if idx < 0 { len + idx } else { idx };
    if i < 0 || i >= len {
        None
    } else {
        Some(i as usize)
    }
}

/// `LINDEX key index`
pub fn lindex(
    db: &mut Database,
    key: &[u8],
    index: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<Vec<u8>>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(None),
        Some(obj) => {
            let list = as_list(obj)?;
            Ok(normalize_index(index, list.len()).map(|i| list[i].clone()))
        }
    }
}

/// `LSET key index value`
pub fn lset(
    db: &mut Database,
    key: &[u8],
    index: i64,
    value: Vec<u8>,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<()> {
    match db.lookup_for_write(key, now_ms, authority) {
        None => Err(CommandError::IndexOutOfRange),
        Some(RObject::ListCompact(l)) | Some(RObject::ListGeneric(l)) => {
            let i = normalize_index(index, l.len()).ok_or(CommandError::IndexOutOfRange)?;
            l[i] = value;
            Ok(())
        }
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `LRANGE key start stop`: inclusive, negative-index-aware.
pub fn lrange(
    db: &mut Database,
    key: &[u8],
    start: i64,
    stop: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<Vec<u8>>> {
    let list = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(Vec::new()),
        Some(obj) => as_list(obj)?,
    };
    let len = list.len() as i64;
    if len == 0 {
        return Ok(Vec::new());
    }
    let norm = |i: i64| if i < 0 { (len + i).max(0) } else { i };
    let s = norm(start);
    let e = norm(stop).min(len - 1);
    if s > e || s >= len {
        return Ok(Vec::new());
    }
    Ok(list.iter().skip(s as usize).take((e - s + 1) as usize).cloned().collect())
}

/// `LTRIM key start stop`: keeps only the in-range slice, deleting the
/// key entirely if the result is empty.
pub fn ltrim(
    db: &mut Database,
    key: &[u8],
    start: i64,
    stop: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<()> {
    let kept = lrange(db, key, start, stop, now_ms, authority)?;
    match db.lookup_for_write(key, now_ms, authority) {
        None => Ok(()),
        Some(RObject::ListCompact(_)) | Some(RObject::ListGeneric(_)) => {
            if kept.is_empty() {
                db.delete(key);
            } else {
                db.insert_preserving_ttl(key.to_vec(), RObject::ListGeneric(kept.into()), now_ms);
            }
            Ok(())
        }
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `LREM key count value`: `count > 0` removes from head, `count < 0`
/// from tail, `count == 0` removes all occurrences. Returns the number
/// removed.
pub fn lrem(
    db: &mut Database,
    key: &[u8],
    count: i64,
    value: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let list = match db.lookup_for_write(key, now_ms, authority) {
        None => return Ok(0),
        Some(RObject::ListCompact(l)) | Some(RObject::ListGeneric(l)) => l,
        Some(_) => return Err(CommandError::WrongType),
    };
    let limit = if count == 0 { usize::MAX } else { count.unsigned_abs() as usize };
    let mut removed = 0;
    if count < 0 {
        let mut i = list.len();
        while i > 0 && removed < limit {
            i -= 1;
            if list[i] == value {
                list.remove(i);
                removed += 1;
            }
        }
    } else {
        let mut i = 0;
        while i < list.len() && removed < limit {
            if list[i] == value {
                list.remove(i);
                removed += 1;
            } else {
                i += 1;
            }
        }
    }
    if list.is_empty() {
        db.delete(key);
    }
    Ok(removed)
}

/// `LINSERT key BEFORE|AFTER pivot value`. Returns `-1` if `pivot` was
/// not found, `0` if the key doesn't exist, else the new length.
pub fn linsert(
    db: &mut Database,
    key: &[u8],
    before: bool,
    pivot: &[u8],
    value: Vec<u8>,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<i64> {
    let list = match db.lookup_for_write(key, now_ms, authority) {
        None => return Ok(0),
        Some(RObject::ListCompact(l)) | Some(RObject::ListGeneric(l)) => l,
        Some(_) => return Err(CommandError::WrongType),
    };
    match list.iter().position(|v| v == pivot) {
        None => Ok(-1),
        Some(pos) => {
            let idx = if before { pos } else { pos + 1 };
            list.insert(idx, value);
            Ok(list.len() as i64)
        }
    }
}
