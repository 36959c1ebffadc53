//! Snapshot deserialization: validates the header, replays each record
//! into a freshly constructed [`Database`] per logical index, and checks
//! the trailing CRC-64 against the body that precedes it.

use super::{crc64, format};
use crate::error::{DurabilityError, Result};
use corekv_core::{IntsetWidth, RObject, ZSet};
use corekv_storage::Database;
use std::collections::{HashMap, HashSet, VecDeque};

fn classify_string(bytes: Vec<u8>) -> RObject {
    if let Ok(s) = std::str::from_utf8(&bytes) {
        if let Ok(n) = s.parse::<i64>() {
            if n.to_string() == s {
                return RObject::StrInt(n);
            }
        }
    }
    RObject::StrRaw(bytes)
}

fn read_value_body(type_tag: u8, data: &[u8], pos: &mut usize) -> Result<RObject> {
    match type_tag {
        format::TYPE_STRING => Ok(classify_string(format::read_string(data, pos)?)),
        format::TYPE_LIST_COMPACT => {
            let buf = format::read_string(data, pos)?;
            Ok(RObject::ListCompact(format::unpack_list_compact(&buf)?))
        }
        format::TYPE_LIST_GENERAL => {
            let count = expect_len(data, pos)?;
            let mut list = VecDeque::with_capacity(count as usize);
            for _ in 0..count {
                list.push_back(format::read_string(data, pos)?);
            }
            Ok(RObject::ListGeneric(list))
        }
        format::TYPE_SET_COMPACT => {
            let buf = format::read_string(data, pos)?;
            let ints = format::unpack_set_compact(&buf)?;
            let width = ints
                .iter()
                .fold(IntsetWidth::Bits16, |acc, &v| acc.widen(IntsetWidth::for_value(v)));
            Ok(RObject::SetIntset(ints, width))
        }
        format::TYPE_SET_GENERAL => {
            let count = expect_len(data, pos)?;
            let mut set = HashSet::with_capacity(count as usize);
            for _ in 0..count {
                set.insert(format::read_string(data, pos)?);
            }
            Ok(RObject::SetHashtable(set))
        }
        format::TYPE_HASH_COMPACT | format::TYPE_HASH_ZIPMAP_LEGACY => {
            let buf = format::read_string(data, pos)?;
            Ok(RObject::HashZiplist(format::unpack_hash_compact(&buf)?))
        }
        format::TYPE_HASH_GENERAL => {
            let count = expect_len(data, pos)?;
            let mut map = HashMap::with_capacity(count as usize);
            for _ in 0..count {
                let field = format::read_string(data, pos)?;
                let value = format::read_string(data, pos)?;
                map.insert(field, value);
            }
            Ok(RObject::HashHashtable(map))
        }
        format::TYPE_ZSET_COMPACT => {
            let buf = format::read_string(data, pos)?;
            Ok(RObject::ZsetZiplist(format::unpack_zset_compact(&buf)?))
        }
        format::TYPE_ZSET_GENERAL => {
            let count = expect_len(data, pos)?;
            let mut zset = ZSet::new();
            for _ in 0..count {
                let member = format::read_string(data, pos)?;
                let score = format::read_score(data, pos)?;
                zset.insert(member, score);
            }
            Ok(RObject::ZsetSkiplist(zset))
        }
        other => Err(DurabilityError::UnknownTypeTag(other)),
    }
}

fn expect_len(data: &[u8], pos: &mut usize) -> Result<u64> {
    match format::read_len(data, pos)? {
        format::LenPrefix::Len(l) => Ok(l),
        format::LenPrefix::Encoded(_) => Err(DurabilityError::BadLength),
    }
}

/// Loads a snapshot image into `num_databases` freshly constructed
/// [`Database`]s, indexed by the `SELECT_DB` record's database number.
///
/// While loading, expirations are taken at face value rather than fired:
/// a key past its deadline is still inserted with its stored TTL, exactly
/// as persisted. The caller's next lazy/active expire pass reaps it
/// normally, matching the "loading flag suppresses expiration" rule.
pub fn read_snapshot(data: &[u8], num_databases: usize, now_ms: i64) -> Result<Vec<Database>> {
    if data.len() < 9 || &data[0..5] != b"REDIS" {
        return Err(DurabilityError::UnknownVersion("missing REDIS header".into()));
    }
    let version = std::str::from_utf8(&data[5..9])
        .map_err(|_| DurabilityError::UnknownVersion("non-utf8 version field".into()))?;
    if version != "0001" {
        return Err(DurabilityError::UnknownVersion(version.to_string()));
    }

    let mut databases: Vec<Database> = (0..num_databases).map(|_| Database::new()).collect();
    let mut current_db = 0usize;
    let mut pos = 9usize;

    loop {
        let opcode = *data
            .get(pos)
            .ok_or(DurabilityError::Truncated("record opcode"))?;
        match opcode {
            format::OPCODE_EOF => {
                let crc_start = pos;
                pos += 1;
                let crc_bytes = data
                    .get(pos..pos + 8)
                    .ok_or(DurabilityError::Truncated("footer checksum"))?;
                let stored = u64::from_le_bytes(crc_bytes.try_into().unwrap());
                if stored != 0 {
                    let computed = crc64::checksum(&data[..crc_start]);
                    if computed != stored {
                        return Err(DurabilityError::ChecksumMismatch {
                            expected: stored,
                            computed,
                        });
                    }
                }
                break;
            }
            format::OPCODE_SELECTDB => {
                pos += 1;
                let index = expect_len(data, &mut pos)? as usize;
                if index >= databases.len() {
                    return Err(DurabilityError::MalformedRecord(format!(
                        "SELECT_DB index {index} out of range"
                    )));
                }
                current_db = index;
            }
            format::OPCODE_EXPIRETIME_MS => {
                pos += 1;
                let bytes = data
                    .get(pos..pos + 8)
                    .ok_or(DurabilityError::Truncated("expiretime_ms"))?;
                pos += 8;
                let when_ms = i64::from_le_bytes(bytes.try_into().unwrap());
                let tag = *data.get(pos).ok_or(DurabilityError::Truncated("type tag"))?;
                pos += 1;
                let key = format::read_string(data, &mut pos)?;
                let value = read_value_body(tag, data, &mut pos)?;
                databases[current_db].set_fresh(key.clone(), value, now_ms);
                databases[current_db].set_expire_at(&key, when_ms);
            }
            tag => {
                pos += 1;
                let key = format::read_string(data, &mut pos)?;
                let value = read_value_body(tag, data, &mut pos)?;
                databases[current_db].set_fresh(key, value, now_ms);
            }
        }
    }

    Ok(databases)
}

#[cfg(test)]
mod tests {
    use super::super::writer::write_snapshot;
    use super::*;
    use crate::config::SnapshotConfig;
    use std::collections::VecDeque;

    #[test]
    fn round_trips_a_mixed_database() {
        let mut db = Database::new();
        db.set_fresh(b"str".to_vec(), RObject::StrInt(123), 0);
        db.set_fresh(
            b"list".to_vec(),
            RObject::ListCompact(VecDeque::from([b"a".to_vec(), b"b".to_vec()])),
            0,
        );
        db.set_fresh(b"ttl".to_vec(), RObject::StrRaw(b"bye".to_vec()), 0);
        db.set_expire_at(b"ttl", 9_999_999_999_999);

        let cfg = SnapshotConfig::default();
        let image = write_snapshot(&[Database::new(), db], cfg);
        let loaded = read_snapshot(&image, 2, 0).unwrap();

        assert_eq!(loaded[1].dict_get(b"str").unwrap().len(), 1);
        match loaded[1].dict_get(b"str") {
            Some(RObject::StrInt(123)) => {}
            other => panic!("expected StrInt(123), got {other:?}"),
        }
        match loaded[1].dict_get(b"list") {
            Some(RObject::ListCompact(l)) => {
                assert_eq!(l, &VecDeque::from([b"a".to_vec(), b"b".to_vec()]))
            }
            other => panic!("expected ListCompact, got {other:?}"),
        }
        assert_eq!(loaded[1].expire_at_ms(b"ttl"), Some(9_999_999_999_999));
    }

    #[test]
    fn rejects_unrecognized_version() {
        let mut bad = b"REDIS9999".to_vec();
        bad.push(format::OPCODE_EOF);
        bad.extend_from_slice(&0u64.to_le_bytes());
        assert!(matches!(
            read_snapshot(&bad, 1, 0),
            Err(DurabilityError::UnknownVersion(_))
        ));
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let db = {
            let mut d = Database::new();
            d.set_fresh(b"k".to_vec(), RObject::StrInt(1), 0);
            d
        };
        let mut image = write_snapshot(&[db], SnapshotConfig::default());
        let last = image.len() - 1;
        image[last] ^= 0xFF;
        assert!(matches!(
            read_snapshot(&image, 1, 0),
            Err(DurabilityError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn select_db_out_of_range_is_malformed() {
        let mut db = Database::new();
        db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 0);
        let image = write_snapshot(&[Database::new(), db], SnapshotConfig::default());
        assert!(matches!(
            read_snapshot(&image, 1, 0),
            Err(DurabilityError::MalformedRecord(_))
        ));
    }
}
