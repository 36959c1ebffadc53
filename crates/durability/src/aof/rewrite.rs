//! Background rewrite's minimal-reconstruction pipeline (§4.8), adapted
//! to the fork-free design: rather than a forked child draining a diff
//! pipe, the engine takes a single-lock-acquisition snapshot of its
//! databases and hands it to [`write_rewrite_file`] on a dedicated
//! thread, then [`rename_into_place`] to publish it.

use super::command;
use crate::error::{DurabilityError, Result};
use corekv_core::RObject;
use corekv_storage::Database;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Maximum members/pairs batched into one `RPUSH`/`SADD`/`ZADD`/`HMSET`
/// during a rewrite.
pub const REWRITE_ITEMS_PER_CMD: usize = 64;

fn chunk_flat(cmd: &'static [u8], key: &[u8], items: Vec<Vec<u8>>) -> Vec<Vec<Vec<u8>>> {
    if items.is_empty() {
        return Vec::new();
    }
    items
        .chunks(REWRITE_ITEMS_PER_CMD)
        .map(|chunk| {
            let mut args = vec![cmd.to_vec(), key.to_vec()];
            args.extend_from_slice(chunk);
            args
        })
        .collect()
}

fn chunk_pairs(key: &[u8], items: Vec<(Vec<u8>, Vec<u8>)>) -> Vec<Vec<Vec<u8>>> {
    if items.is_empty() {
        return Vec::new();
    }
    items
        .chunks(REWRITE_ITEMS_PER_CMD)
        .map(|chunk| {
            let mut args = vec![b"HMSET".to_vec(), key.to_vec()];
            for (field, value) in chunk {
                args.push(field.clone());
                args.push(value.clone());
            }
            args
        })
        .collect()
}

fn chunk_zadd(key: &[u8], items: Vec<(Vec<u8>, f64)>) -> Vec<Vec<Vec<u8>>> {
    if items.is_empty() {
        return Vec::new();
    }
    items
        .chunks(REWRITE_ITEMS_PER_CMD)
        .map(|chunk| {
            let mut args = vec![b"ZADD".to_vec(), key.to_vec()];
            for (member, score) in chunk {
                args.push(score.to_string().into_bytes());
                args.push(member.clone());
            }
            args
        })
        .collect()
}

/// The minimal command sequence that reconstructs `value` at `key`,
/// batched at [`REWRITE_ITEMS_PER_CMD`] elements per command.
fn commands_for_value(key: &[u8], value: &RObject) -> Vec<Vec<Vec<u8>>> {
    match value {
        RObject::StrInt(n) => vec![vec![b"SET".to_vec(), key.to_vec(), n.to_string().into_bytes()]],
        RObject::StrRaw(bytes) => vec![vec![b"SET".to_vec(), key.to_vec(), bytes.clone()]],
        RObject::ListCompact(list) | RObject::ListGeneric(list) => {
            chunk_flat(b"RPUSH", key, list.iter().cloned().collect())
        }
        RObject::SetIntset(ints, _) => chunk_flat(
            b"SADD",
            key,
            ints.iter().map(|n| n.to_string().into_bytes()).collect(),
        ),
        RObject::SetHashtable(set) => chunk_flat(b"SADD", key, set.iter().cloned().collect()),
        RObject::HashZiplist(pairs) => chunk_pairs(key, pairs.clone()),
        RObject::HashHashtable(map) => {
            chunk_pairs(key, map.iter().map(|(f, v)| (f.clone(), v.clone())).collect())
        }
        RObject::ZsetZiplist(entries) => chunk_zadd(key, entries.clone()),
        RObject::ZsetSkiplist(zset) => {
            chunk_zadd(key, zset.iter().map(|(m, s)| (m.to_vec(), s)).collect())
        }
    }
}

/// Writes a minimal log equivalent to `databases` to `path`: one
/// `SELECT` per non-empty database, then each key's reconstruction
/// commands and (if set) a trailing `PEXPIREAT`.
pub fn write_rewrite_file(path: &Path, databases: &[Database]) -> Result<()> {
    let mut buf = Vec::new();
    for (index, db) in databases.iter().enumerate() {
        if db.is_empty() {
            continue;
        }
        buf.extend_from_slice(&command::encode(&command::select_record(index)));
        for (key, value) in db.iter() {
            for cmd in commands_for_value(key, value) {
                buf.extend_from_slice(&command::encode(&cmd));
            }
            if let Some(when_ms) = db.expire_at_ms(key) {
                buf.extend_from_slice(&command::encode(&[
                    b"PEXPIREAT".to_vec(),
                    key.to_vec(),
                    when_ms.to_string().into_bytes(),
                ]));
            }
        }
    }
    let mut file = File::create(path).map_err(DurabilityError::Io)?;
    file.write_all(&buf).map_err(DurabilityError::Io)?;
    file.sync_all().map_err(DurabilityError::Io)?;
    Ok(())
}

/// Atomically publishes a finished rewrite by renaming `temp_path` over
/// `live_path`.
pub fn rename_into_place(temp_path: &Path, live_path: &Path) -> Result<()> {
    std::fs::rename(temp_path, live_path).map_err(DurabilityError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aof::reader;
    use crate::config::AofConfig;
    use std::collections::VecDeque;
    use tempfile::tempdir;

    #[test]
    fn rewrite_file_reconstructs_all_keys() {
        let mut db = Database::new();
        db.set_fresh(b"s".to_vec(), RObject::StrInt(7), 0);
        db.set_fresh(
            b"l".to_vec(),
            RObject::ListGeneric(VecDeque::from([b"a".to_vec(), b"b".to_vec()])),
            0,
        );
        db.set_fresh(b"ttl".to_vec(), RObject::StrRaw(b"x".to_vec()), 0);
        db.set_expire_at(b"ttl", 5000);

        let dir = tempdir().unwrap();
        let path = dir.path().join("rewrite.aof");
        write_rewrite_file(&path, &[db]).unwrap();

        let records = reader::load(&path, &AofConfig::default()).unwrap();
        assert!(records.iter().any(|r| r.args[0] == b"SET" && r.args[1] == b"s"));
        assert!(records.iter().any(|r| r.args[0] == b"RPUSH" && r.args[1] == b"l"));
        assert!(records.iter().any(|r| r.args[0] == b"PEXPIREAT" && r.args[1] == b"ttl"));
    }

    #[test]
    fn large_list_is_batched_across_commands() {
        let mut list = VecDeque::new();
        for i in 0..200 {
            list.push_back(i.to_string().into_bytes());
        }
        let commands = chunk_flat(b"RPUSH", b"k", list.into_iter().collect());
        assert_eq!(commands.len(), 4); // ceil(200/64)
        assert_eq!(commands[0].len(), 2 + REWRITE_ITEMS_PER_CMD);
    }

    #[test]
    fn rename_into_place_publishes_the_file() {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("temp.aof");
        let live = dir.path().join("live.aof");
        std::fs::write(&temp, b"data").unwrap();
        rename_into_place(&temp, &live).unwrap();
        assert!(!temp.exists());
        assert_eq!(std::fs::read(&live).unwrap(), b"data");
    }
}
