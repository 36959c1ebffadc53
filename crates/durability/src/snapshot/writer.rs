//! Snapshot serialization: walks each database's live keyspace and emits
//! the header, one `SELECT_DB`/`EXPIRETIME_MS`/type-tagged-record run per
//! non-empty database, and the checksummed footer.

use super::{crc64, format};
use crate::config::SnapshotConfig;
use corekv_core::RObject;
use corekv_storage::Database;

fn type_tag(value: &RObject) -> u8 {
    match value {
        RObject::StrInt(_) | RObject::StrRaw(_) => format::TYPE_STRING,
        RObject::ListCompact(_) => format::TYPE_LIST_COMPACT,
        RObject::ListGeneric(_) => format::TYPE_LIST_GENERAL,
        RObject::SetIntset(..) => format::TYPE_SET_COMPACT,
        RObject::SetHashtable(_) => format::TYPE_SET_GENERAL,
        RObject::HashZiplist(_) => format::TYPE_HASH_COMPACT,
        RObject::HashHashtable(_) => format::TYPE_HASH_GENERAL,
        RObject::ZsetZiplist(_) => format::TYPE_ZSET_COMPACT,
        RObject::ZsetSkiplist(_) => format::TYPE_ZSET_GENERAL,
    }
}

fn write_value_body(out: &mut Vec<u8>, value: &RObject, compress: bool) {
    match value {
        RObject::StrInt(n) => format::write_string(out, n.to_string().as_bytes(), compress),
        RObject::StrRaw(bytes) => format::write_string(out, bytes, compress),
        RObject::ListCompact(list) => {
            let packed = format::pack_list_compact(list);
            format::write_string(out, &packed, compress);
        }
        RObject::ListGeneric(list) => {
            format::write_len(out, list.len() as u64);
            for item in list {
                format::write_string(out, item, compress);
            }
        }
        RObject::SetIntset(ints, _) => {
            let packed = format::pack_set_compact(ints);
            format::write_string(out, &packed, compress);
        }
        RObject::SetHashtable(set) => {
            format::write_len(out, set.len() as u64);
            for member in set {
                format::write_string(out, member, compress);
            }
        }
        RObject::HashZiplist(entries) => {
            let packed = format::pack_hash_compact(entries);
            format::write_string(out, &packed, compress);
        }
        RObject::HashHashtable(map) => {
            format::write_len(out, map.len() as u64);
            for (field, value) in map {
                format::write_string(out, field, compress);
                format::write_string(out, value, compress);
            }
        }
        RObject::ZsetZiplist(entries) => {
            let packed = format::pack_zset_compact(entries);
            format::write_string(out, &packed, compress);
        }
        RObject::ZsetSkiplist(zset) => {
            format::write_len(out, zset.len() as u64);
            for (member, score) in zset.iter() {
                format::write_string(out, member, compress);
                format::write_score(out, score);
            }
        }
    }
}

/// Serializes `databases` (indexed by logical database number) into a
/// complete snapshot image, picking the most compact string/integer
/// representation as it goes. Empty databases are skipped entirely.
pub fn write_snapshot(databases: &[Database], cfg: SnapshotConfig) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(super::HEADER);

    for (index, db) in databases.iter().enumerate() {
        if db.is_empty() {
            continue;
        }
        body.push(format::OPCODE_SELECTDB);
        format::write_len(&mut body, index as u64);

        for (key, value) in db.iter() {
            if let Some(when_ms) = db.expire_at_ms(key) {
                body.push(format::OPCODE_EXPIRETIME_MS);
                body.extend_from_slice(&when_ms.to_le_bytes());
            }
            body.push(type_tag(value));
            format::write_string(&mut body, key, cfg.compression);
            write_value_body(&mut body, value, cfg.compression);
        }
    }

    let crc = if cfg.checksum { crc64::checksum(&body) } else { 0 };
    body.push(format::OPCODE_EOF);
    body.extend_from_slice(&crc.to_le_bytes());
    body
}
