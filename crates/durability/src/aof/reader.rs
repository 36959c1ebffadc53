//! Append-only log loading (§4.7 load path): parses every record, folds
//! `SELECT` into a per-record database index rather than surfacing it as
//! a record of its own, and enforces the truncated-tail and
//! unclosed-`MULTI` rules.
//!
//! Actually dispatching a record against a keyspace is the embedding
//! engine's job (command dispatch is out of scope for this crate); this
//! only produces the ordered, db-tagged argument vectors for the engine
//! to replay through its own command table.

use super::command;
use crate::config::AofConfig;
use crate::error::{DurabilityError, Result};
use std::fs::OpenOptions;
use std::path::Path;

/// One replayable record: the logical database it targets and its
/// (already canonicalized, since canonicalization happens at append time)
/// argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AofRecord {
    /// Database index in effect when this command was appended.
    pub db: usize,
    /// Command name and arguments.
    pub args: Vec<Vec<u8>>,
}

/// Loads every record from the log at `path`, in order.
///
/// A parse failure on the final record is tolerated when
/// `cfg.load_truncated` is set: the file is truncated at the last fully
/// parsed offset and loading stops there rather than failing outright.
/// A log that ends with an open `MULTI` block is always fatal,
/// independent of that setting.
pub fn load(path: &Path, cfg: &AofConfig) -> Result<Vec<AofRecord>> {
    let data = std::fs::read(path).map_err(DurabilityError::Io)?;
    let mut pos = 0usize;
    let mut current_db = 0usize;
    let mut in_multi = false;
    let mut out = Vec::new();

    loop {
        let before = pos;
        match command::decode(&data, &mut pos) {
            Ok(None) => break,
            Ok(Some(args)) => {
                let name = args
                    .first()
                    .map(|b| b.to_ascii_uppercase())
                    .unwrap_or_default();
                match name.as_slice() {
                    b"SELECT" if args.len() == 2 => {
                        if let Some(idx) = std::str::from_utf8(&args[1])
                            .ok()
                            .and_then(|s| s.parse::<usize>().ok())
                        {
                            current_db = idx;
                        }
                        continue;
                    }
                    b"MULTI" => in_multi = true,
                    b"EXEC" | b"DISCARD" => in_multi = false,
                    _ => {}
                }
                out.push(AofRecord {
                    db: current_db,
                    args,
                });
            }
            Err(e) if cfg.load_truncated && e.is_corruption() => {
                tracing::warn!(offset = before, error = %e, "truncating AOF tail at last valid record");
                let file = OpenOptions::new()
                    .write(true)
                    .open(path)
                    .map_err(DurabilityError::Io)?;
                file.set_len(before as u64).map_err(DurabilityError::Io)?;
                break;
            }
            Err(e) => return Err(e),
        }
    }

    if in_multi {
        return Err(DurabilityError::UnclosedMultiAtEof);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AofState;
    use crate::mode::FsyncPolicy;
    use std::fs;
    use tempfile::tempdir;

    fn cfg(load_truncated: bool) -> AofConfig {
        AofConfig {
            state: AofState::On,
            fsync: FsyncPolicy::No,
            load_truncated,
            ..AofConfig::default()
        }
    }

    #[test]
    fn loads_select_tagged_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.aof");
        let mut buf = Vec::new();
        buf.extend_from_slice(&command::encode(&command::select_record(2)));
        buf.extend_from_slice(&command::encode(&[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]));
        fs::write(&path, &buf).unwrap();

        let records = load(&path, &cfg(false)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].db, 2);
        assert_eq!(records[0].args, vec![b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
    }

    #[test]
    fn unclosed_multi_at_eof_is_fatal_regardless_of_truncated_setting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.aof");
        let mut buf = Vec::new();
        buf.extend_from_slice(&command::encode(&[b"MULTI".to_vec()]));
        buf.extend_from_slice(&command::encode(&[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]));
        fs::write(&path, &buf).unwrap();

        assert!(matches!(
            load(&path, &cfg(true)),
            Err(DurabilityError::UnclosedMultiAtEof)
        ));
        assert!(matches!(
            load(&path, &cfg(false)),
            Err(DurabilityError::UnclosedMultiAtEof)
        ));
    }

    #[test]
    fn multi_exec_block_closes_cleanly() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.aof");
        let mut buf = Vec::new();
        buf.extend_from_slice(&command::encode(&[b"MULTI".to_vec()]));
        buf.extend_from_slice(&command::encode(&[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]));
        buf.extend_from_slice(&command::encode(&[b"EXEC".to_vec()]));
        fs::write(&path, &buf).unwrap();

        let records = load(&path, &cfg(false)).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn truncated_tail_is_dropped_when_load_truncated_is_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.aof");
        let mut buf = command::encode(&[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
        let good_len = buf.len();
        buf.extend_from_slice(b"*2\r\n$3\r\nfoo"); // dangling partial record
        fs::write(&path, &buf).unwrap();

        let records = load(&path, &cfg(true)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(fs::metadata(&path).unwrap().len(), good_len as u64);
    }

    #[test]
    fn truncated_tail_is_fatal_without_load_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("t.aof");
        let mut buf = command::encode(&[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
        buf.extend_from_slice(b"*2\r\n$3\r\nfoo");
        fs::write(&path, &buf).unwrap();

        assert!(load(&path, &cfg(false)).is_err());
    }
}
