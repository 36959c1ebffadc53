//! The canonical Redis string command surface.
//!
//! Every string value is stored as `RObject::StrInt` when it parses as an
//! `i64` within `i64`'s range and `RObject::StrRaw` otherwise. Commands
//! that mutate a string (`APPEND`, `SETRANGE`, `SETBIT`) always produce
//! `StrRaw`, matching Redis's rule that int-encoded strings are
//! immutable in place — any write materializes the raw bytes first.

use crate::command_error::{CommandError, Result};
use corekv_core::RObject;
use corekv_storage::{Database, ExpireAuthority};

fn as_bytes(obj: &RObject) -> Result<Vec<u8>> {
    match obj {
        RObject::StrInt(n) => Ok(n.to_string().into_bytes()),
        RObject::StrRaw(b) => Ok(b.clone()),
        _ => Err(CommandError::WrongType),
    }
}

fn make_string(bytes: Vec<u8>) -> RObject {
    match std::str::from_utf8(&bytes).ok().and_then(|s| s.parse::<i64>().ok()) {
        Some(n) if n.to_string().as_bytes() == bytes.as_slice() => RObject::StrInt(n),
        _ => RObject::StrRaw(bytes),
    }
}

/// `SET key value`
pub fn set(db: &mut Database, key: &[u8], value: Vec<u8>, now_ms: i64) {
    db.set_fresh(key.to_vec(), make_string(value), now_ms);
}

/// `SETNX key value`: sets only if `key` does not already exist. Returns
/// `true` if the set happened.
pub fn setnx(
    db: &mut Database,
    key: &[u8],
    value: Vec<u8>,
    now_ms: i64,
    authority: ExpireAuthority,
) -> bool {
    if db.contains(key, now_ms, authority) {
        return false;
    }
    db.set_fresh(key.to_vec(), make_string(value), now_ms);
    true
}

/// `MSET key value [key value ...]`: always succeeds, overwriting any
/// existing keys.
pub fn mset(db: &mut Database, pairs: Vec<(Vec<u8>, Vec<u8>)>, now_ms: i64) {
    for (key, value) in pairs {
        db.set_fresh(key, make_string(value), now_ms);
    }
}

/// `MSETNX key value [key value ...]`: sets every pair only if none of the
/// keys already exist. Returns `false` (setting nothing) if any did.
pub fn msetnx(
    db: &mut Database,
    pairs: Vec<(Vec<u8>, Vec<u8>)>,
    now_ms: i64,
    authority: ExpireAuthority,
) -> bool {
    if pairs.iter().any(|(key, _)| db.contains(key, now_ms, authority)) {
        return false;
    }
    for (key, value) in pairs {
        db.set_fresh(key, make_string(value), now_ms);
    }
    true
}

/// `MGET key [key ...]`: `None` per key that's absent or not a string.
pub fn mget(
    db: &mut Database,
    keys: &[Vec<u8>],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Vec<Option<Vec<u8>>> {
    keys.iter()
        .map(|key| match db.lookup_for_read(key, now_ms, authority) {
            Some(obj) => as_bytes(obj).ok(),
            None => None,
        })
        .collect()
}

/// `GET key`
pub fn get(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<Vec<u8>>> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(None),
        Some(obj) => as_bytes(obj).map(Some),
    }
}

/// `GETSET key value`: sets the new value and returns the previous one.
pub fn getset(
    db: &mut Database,
    key: &[u8],
    value: Vec<u8>,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Option<Vec<u8>>> {
    let prev = match db.lookup_for_read(key, now_ms, authority) {
        None => None,
        Some(obj) => Some(as_bytes(obj)?),
    };
    db.set_fresh(key.to_vec(), make_string(value), now_ms);
    Ok(prev)
}

/// `STRLEN key`
pub fn strlen(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(0),
        Some(obj) => Ok(as_bytes(obj)?.len()),
    }
}

/// `APPEND key value`: returns the resulting length.
pub fn append(
    db: &mut Database,
    key: &[u8],
    value: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let mut bytes = match db.lookup_for_write(key, now_ms, authority) {
        None => Vec::new(),
        Some(obj) => as_bytes(obj)?,
    };
    bytes.extend_from_slice(value);
    let len = bytes.len();
    db.insert_preserving_ttl(key.to_vec(), RObject::StrRaw(bytes), now_ms);
    Ok(len)
}

/// `GETRANGE key start end`: negative indices count from the end,
/// inclusive on both ends, clamped into bounds, matching `GETRANGE`.
pub fn getrange(
    db: &mut Database,
    key: &[u8],
    start: i64,
    end: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<Vec<u8>> {
    let bytes = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(Vec::new()),
        Some(obj) => as_bytes(obj)?,
    };
    let len = bytes.len() as i64;
    if len == 0 {
        return Ok(Vec::new());
    }
    let norm = |i: i64| -> i64 {
        if i < 0 {
            (len + i).max(0)
        } else {
            i
        }
    };
    let s = norm(start).min(len - 1);
    let e = norm(end).min(len - 1);
    if s > e || s >= len {
        return Ok(Vec::new());
    }
    Ok(bytes[s as usize..=(e as usize)].to_vec())
}

/// `SETRANGE key offset value`: zero-pads if `offset` extends past the
/// current length. Returns the resulting length.
pub fn setrange(
    db: &mut Database,
    key: &[u8],
    offset: usize,
    value: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<usize> {
    let mut bytes = match db.lookup_for_write(key, now_ms, authority) {
        None => Vec::new(),
        Some(obj) => as_bytes(obj)?,
    };
    if value.is_empty() {
        return Ok(bytes.len());
    }
    let needed = offset + value.len();
    if bytes.len() < needed {
        bytes.resize(needed, 0);
    }
    bytes[offset..offset + value.len()].copy_from_slice(value);
    let len = bytes.len();
    db.insert_preserving_ttl(key.to_vec(), RObject::StrRaw(bytes), now_ms);
    Ok(len)
}

/// `SETBIT key offset bit`: returns the previous bit value.
pub fn setbit(
    db: &mut Database,
    key: &[u8],
    offset: usize,
    bit: bool,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    let mut bytes = match db.lookup_for_write(key, now_ms, authority) {
        None => Vec::new(),
        Some(obj) => as_bytes(obj)?,
    };
    let byte_idx = offset / 8;
    let bit_idx = 7 - (offset % 8);
    if bytes.len() <= byte_idx {
        bytes.resize(byte_idx + 1, 0);
    }
    let prev = (bytes[byte_idx] >> bit_idx) & 1 == 1;
    if bit {
        bytes[byte_idx] |= 1 << bit_idx;
    } else {
        bytes[byte_idx] &= !(1 << bit_idx);
    }
    db.insert_preserving_ttl(key.to_vec(), RObject::StrRaw(bytes), now_ms);
    Ok(prev)
}

/// `GETBIT key offset`
pub fn getbit(
    db: &mut Database,
    key: &[u8],
    offset: usize,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<bool> {
    let bytes = match db.lookup_for_read(key, now_ms, authority) {
        None => return Ok(false),
        Some(obj) => as_bytes(obj)?,
    };
    let byte_idx = offset / 8;
    if byte_idx >= bytes.len() {
        return Ok(false);
    }
    let bit_idx = 7 - (offset % 8);
    Ok((bytes[byte_idx] >> bit_idx) & 1 == 1)
}

fn current_int(
    db: &mut Database,
    key: &[u8],
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<i64> {
    match db.lookup_for_read(key, now_ms, authority) {
        None => Ok(0),
        Some(RObject::StrInt(n)) => Ok(*n),
        Some(RObject::StrRaw(b)) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(CommandError::NotAnInteger),
        Some(_) => Err(CommandError::WrongType),
    }
}

/// `INCRBY key delta`
pub fn incrby(
    db: &mut Database,
    key: &[u8],
    delta: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<i64> {
    let cur = current_int(db, key, now_ms, authority)?;
    let next = cur.checked_add(delta).ok_or(CommandError::IncrementOverflow)?;
    db.insert_preserving_ttl(key.to_vec(), RObject::StrInt(next), now_ms);
    Ok(next)
}

/// `DECRBY key delta`
pub fn decrby(
    db: &mut Database,
    key: &[u8],
    delta: i64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<i64> {
    let cur = current_int(db, key, now_ms, authority)?;
    let next = cur.checked_sub(delta).ok_or(CommandError::IncrementOverflow)?;
    db.insert_preserving_ttl(key.to_vec(), RObject::StrInt(next), now_ms);
    Ok(next)
}

/// `INCRBYFLOAT key delta`
pub fn incrbyfloat(
    db: &mut Database,
    key: &[u8],
    delta: f64,
    now_ms: i64,
    authority: ExpireAuthority,
) -> Result<f64> {
    let cur = match db.lookup_for_read(key, now_ms, authority) {
        None => 0.0,
        Some(RObject::StrInt(n)) => *n as f64,
        Some(RObject::StrRaw(b)) => std::str::from_utf8(b)
            .ok()
            .and_then(|s| s.parse::<f64>().ok())
            .ok_or(CommandError::NotAFloat)?,
        Some(_) => return Err(CommandError::WrongType),
    };
    let next = cur + delta;
    if !next.is_finite() {
        return Err(CommandError::IncrementOverflow);
    }
    db.insert_preserving_ttl(key.to_vec(), make_string(format_float(next)), now_ms);
    Ok(next)
}

fn format_float(f: f64) -> Vec<u8> {
    let mut s = format!("{:.17}", f);
    while s.contains('.') && (s.ends_with('0')) {
        s.pop();
    }
    if s.ends_with('.') {
        s.pop();
    }
    s.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const P: ExpireAuthority = ExpireAuthority::Primary;

    #[test]
    fn set_and_get_round_trip() {
        let mut db = Database::new();
        set(&mut db, b"k", b"hello".to_vec(), NOW);
        assert_eq!(get(&mut db, b"k", NOW, P).unwrap(), Some(b"hello".to_vec()));
    }

    #[test]
    fn numeric_strings_use_int_encoding() {
        let mut db = Database::new();
        set(&mut db, b"k", b"123".to_vec(), NOW);
        assert!(matches!(db.dict_get(b"k"), Some(RObject::StrInt(123))));
    }

    #[test]
    fn get_against_wrong_type_errors() {
        let mut db = Database::new();
        db.set_fresh(b"k".to_vec(), RObject::ListCompact(Default::default()), NOW);
        assert_eq!(get(&mut db, b"k", NOW, P), Err(CommandError::WrongType));
    }

    #[test]
    fn append_materializes_raw_encoding() {
        let mut db = Database::new();
        set(&mut db, b"k", b"12".to_vec(), NOW);
        let len = append(&mut db, b"k", b"3", NOW, P).unwrap();
        assert_eq!(len, 3);
        assert_eq!(get(&mut db, b"k", NOW, P).unwrap(), Some(b"123".to_vec()));
    }

    #[test]
    fn setrange_zero_pads_past_current_length() {
        let mut db = Database::new();
        set(&mut db, b"k", b"ab".to_vec(), NOW);
        setrange(&mut db, b"k", 5, b"cd", NOW, P).unwrap();
        assert_eq!(
            get(&mut db, b"k", NOW, P).unwrap(),
            Some(b"ab\0\0\0cd".to_vec())
        );
    }

    #[test]
    fn getrange_handles_negative_indices() {
        let mut db = Database::new();
        set(&mut db, b"k", b"hello world".to_vec(), NOW);
        assert_eq!(
            getrange(&mut db, b"k", -5, -1, NOW, P).unwrap(),
            b"world".to_vec()
        );
    }

    #[test]
    fn incrby_on_missing_key_starts_at_zero() {
        let mut db = Database::new();
        assert_eq!(incrby(&mut db, b"k", 5, NOW, P).unwrap(), 5);
        assert_eq!(incrby(&mut db, b"k", -2, NOW, P).unwrap(), 3);
    }

    #[test]
    fn incrby_on_non_numeric_string_errors() {
        let mut db = Database::new();
        set(&mut db, b"k", b"abc".to_vec(), NOW);
        assert_eq!(incrby(&mut db, b"k", 1, NOW, P), Err(CommandError::NotAnInteger));
    }

    #[test]
    fn incrby_overflow_is_rejected() {
        let mut db = Database::new();
        set(&mut db, b"k", i64::MAX.to_string().into_bytes(), NOW);
        assert_eq!(incrby(&mut db, b"k", 1, NOW, P), Err(CommandError::IncrementOverflow));
    }

    #[test]
    fn setnx_only_sets_when_absent() {
        let mut db = Database::new();
        assert!(setnx(&mut db, b"k", b"1".to_vec(), NOW, P));
        assert!(!setnx(&mut db, b"k", b"2".to_vec(), NOW, P));
        assert_eq!(get(&mut db, b"k", NOW, P).unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn setbit_and_getbit_round_trip() {
        let mut db = Database::new();
        assert!(!setbit(&mut db, b"k", 7, true, NOW, P).unwrap());
        assert!(getbit(&mut db, b"k", 7, NOW, P).unwrap());
        assert!(!getbit(&mut db, b"k", 6, NOW, P).unwrap());
    }

    #[test]
    fn mset_overwrites_every_pair() {
        let mut db = Database::new();
        mset(
            &mut db,
            vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())],
            NOW,
        );
        assert_eq!(get(&mut db, b"a", NOW, P).unwrap(), Some(b"1".to_vec()));
        assert_eq!(get(&mut db, b"b", NOW, P).unwrap(), Some(b"2".to_vec()));
    }

    #[test]
    fn msetnx_refuses_if_any_key_already_exists() {
        let mut db = Database::new();
        set(&mut db, b"a", b"1".to_vec(), NOW);
        assert!(!msetnx(
            &mut db,
            vec![(b"a".to_vec(), b"x".to_vec()), (b"c".to_vec(), b"y".to_vec())],
            NOW,
            P
        ));
        assert!(get(&mut db, b"c", NOW, P).unwrap().is_none());

        assert!(msetnx(
            &mut db,
            vec![(b"c".to_vec(), b"y".to_vec()), (b"d".to_vec(), b"z".to_vec())],
            NOW,
            P
        ));
        assert_eq!(get(&mut db, b"c", NOW, P).unwrap(), Some(b"y".to_vec()));
    }

    #[test]
    fn mget_returns_none_for_missing_and_wrong_type_keys() {
        let mut db = Database::new();
        set(&mut db, b"a", b"1".to_vec(), NOW);
        db.set_fresh(b"list".to_vec(), RObject::ListCompact(Default::default()), NOW);
        let got = mget(&mut db, &[b"a".to_vec(), b"missing".to_vec(), b"list".to_vec()], NOW, P);
        assert_eq!(got, vec![Some(b"1".to_vec()), None, None]);
    }
}
