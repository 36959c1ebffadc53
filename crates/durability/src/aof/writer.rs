//! The live append-only log writer (§4.7 write pipeline): buffers
//! encoded commands in memory, flushes them with a single `write()`,
//! handles a partial write by truncating back to the pre-flush size, and
//! fsyncs per the configured [`FsyncPolicy`].

use super::command;
use crate::config::AofConfig;
use crate::error::{DurabilityError, Result};
use crate::mode::FsyncPolicy;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Appends commands to a log file, one flush per call to [`flush`].
pub struct AofWriter {
    file: File,
    path: PathBuf,
    buffer: Vec<u8>,
    current_db: Option<usize>,
    cfg: AofConfig,
    last_fsync_ms: i64,
    rewrite_active: bool,
}

impl AofWriter {
    /// Opens (creating if needed) the log at `path` for appending.
    pub fn open(path: impl AsRef<Path>, cfg: AofConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(DurabilityError::Io)?;
        Ok(AofWriter {
            file,
            path,
            buffer: Vec::new(),
            current_db: None,
            cfg,
            last_fsync_ms: 0,
            rewrite_active: false,
        })
    }

    /// Path this writer is appending to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queues `args` (targeting logical database `db`) for the next
    /// flush, emitting an implicit `SELECT` first if `db` differs from
    /// the last command written, and applying the `EXPIRE`-family /
    /// `SETEX`-family canonicalization.
    pub fn append(&mut self, db: usize, args: &[Vec<u8>], now_ms: i64) {
        if self.current_db != Some(db) {
            self.buffer
                .extend_from_slice(&command::encode(&command::select_record(db)));
            self.current_db = Some(db);
        }
        for record in command::rewrite_for_log(args, now_ms) {
            self.buffer.extend_from_slice(&command::encode(&record));
        }
    }

    /// Queues an entire transaction's applied write commands at once,
    /// bracketing them with a synthetic `MULTI`/`EXEC` pair per §4.10 so the
    /// replayed log re-applies the whole block atomically. Matches real
    /// behavior: the `MULTI` is only emitted once a write command actually
    /// shows up (a read-only transaction leaves no trace at all), and `EXEC`
    /// only follows if `MULTI` was emitted.
    pub fn append_transaction(&mut self, db: usize, commands: &[Vec<Vec<u8>>], now_ms: i64) {
        let mut opened = false;
        for args in commands {
            if !opened {
                self.append(db, &[b"MULTI".to_vec()], now_ms);
                opened = true;
            }
            self.append(db, args, now_ms);
        }
        if opened {
            self.append(db, &[b"EXEC".to_vec()], now_ms);
        }
    }

    /// Flushes the in-memory buffer with a single `write()`. A full write
    /// clears the buffer and, under [`FsyncPolicy::Always`], fsyncs
    /// immediately. A partial write truncates the file back to its
    /// pre-flush size; under `Always` this is a fatal error, otherwise
    /// the unwritten tail is kept in the buffer for the next flush.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let start_len = self.file.metadata().map_err(DurabilityError::Io)?.len();

        let write_result = write_once(&mut self.file, &self.buffer);
        match write_result {
            Ok(n) if n == self.buffer.len() => {
                self.buffer.clear();
                if self.cfg.fsync == FsyncPolicy::Always && !self.fsync_suspended() {
                    self.file.sync_data().map_err(DurabilityError::Io)?;
                }
                Ok(())
            }
            Ok(n) => {
                self.file
                    .set_len(start_len)
                    .map_err(DurabilityError::Io)?;
                self.file
                    .seek(SeekFrom::Start(start_len))
                    .map_err(DurabilityError::Io)?;
                if self.cfg.fsync.fsync_failure_is_fatal() {
                    return Err(DurabilityError::Io(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "partial AOF write under always-fsync",
                    )));
                }
                self.buffer.drain(..n);
                Ok(())
            }
            Err(e) => {
                let _ = self.file.set_len(start_len);
                Err(DurabilityError::Io(e))
            }
        }
    }

    /// Called once per second by the engine's background loop; fsyncs if
    /// the policy is [`FsyncPolicy::EverySec`] and a second has elapsed
    /// since the last fsync, unless a rewrite is in progress and
    /// `aof_no_fsync_on_rewrite` is set.
    pub fn tick_fsync(&mut self, now_ms: i64) -> Result<()> {
        if self.cfg.fsync != FsyncPolicy::EverySec || self.fsync_suspended() {
            return Ok(());
        }
        if now_ms - self.last_fsync_ms >= 1000 {
            self.file.sync_data().map_err(DurabilityError::Io)?;
            self.last_fsync_ms = now_ms;
        }
        Ok(())
    }

    /// Marks a background rewrite as in progress or finished, so
    /// `aof_no_fsync_on_rewrite` can suspend fsyncs for its duration.
    pub fn set_rewrite_active(&mut self, active: bool) {
        self.rewrite_active = active;
    }

    fn fsync_suspended(&self) -> bool {
        self.rewrite_active && self.cfg.no_fsync_on_rewrite
    }
}

fn write_once(file: &mut File, buf: &[u8]) -> io::Result<usize> {
    let mut written = 0;
    while written < buf.len() {
        match file.write(&buf[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AofState;
    use std::fs;
    use tempfile::tempdir;

    fn cfg(policy: FsyncPolicy) -> AofConfig {
        AofConfig {
            state: AofState::On,
            fsync: policy,
            ..AofConfig::default()
        }
    }

    #[test]
    fn append_and_flush_writes_selectdb_and_command() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.aof");
        let mut writer = AofWriter::open(&path, cfg(FsyncPolicy::No)).unwrap();
        writer.append(0, &[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()], 0);
        writer.flush().unwrap();

        let contents = fs::read(&path).unwrap();
        let mut pos = 0;
        let first = command::decode(&contents, &mut pos).unwrap().unwrap();
        assert_eq!(first, command::select_record(0));
        let second = command::decode(&contents, &mut pos).unwrap().unwrap();
        assert_eq!(second, vec![b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
    }

    #[test]
    fn select_only_emitted_on_db_change() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.aof");
        let mut writer = AofWriter::open(&path, cfg(FsyncPolicy::No)).unwrap();
        writer.append(0, &[b"SET".to_vec(), b"a".to_vec(), b"1".to_vec()], 0);
        writer.append(0, &[b"SET".to_vec(), b"b".to_vec(), b"2".to_vec()], 0);
        writer.flush().unwrap();

        let contents = fs::read(&path).unwrap();
        let mut pos = 0;
        let mut select_count = 0;
        while let Some(record) = command::decode(&contents, &mut pos).unwrap() {
            if record[0] == b"SELECT" {
                select_count += 1;
            }
        }
        assert_eq!(select_count, 1);
    }

    #[test]
    fn append_transaction_brackets_writes_with_multi_exec() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.aof");
        let mut writer = AofWriter::open(&path, cfg(FsyncPolicy::No)).unwrap();
        writer.append_transaction(
            0,
            &[
                vec![b"INCR".to_vec(), b"x".to_vec()],
                vec![b"INCR".to_vec(), b"x".to_vec()],
            ],
            0,
        );
        writer.flush().unwrap();

        let contents = fs::read(&path).unwrap();
        let mut pos = 0;
        command::decode(&contents, &mut pos).unwrap(); // SELECT
        let multi = command::decode(&contents, &mut pos).unwrap().unwrap();
        assert_eq!(multi, vec![b"MULTI".to_vec()]);
        command::decode(&contents, &mut pos).unwrap();
        command::decode(&contents, &mut pos).unwrap();
        let exec = command::decode(&contents, &mut pos).unwrap().unwrap();
        assert_eq!(exec, vec![b"EXEC".to_vec()]);
    }

    #[test]
    fn append_transaction_with_no_commands_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.aof");
        let mut writer = AofWriter::open(&path, cfg(FsyncPolicy::No)).unwrap();
        writer.append_transaction(0, &[], 0);
        writer.flush().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn expire_family_is_rewritten_before_hitting_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.aof");
        let mut writer = AofWriter::open(&path, cfg(FsyncPolicy::No)).unwrap();
        writer.append(0, &[b"EXPIRE".to_vec(), b"k".to_vec(), b"5".to_vec()], 1000);
        writer.flush().unwrap();

        let contents = fs::read(&path).unwrap();
        let mut pos = 0;
        command::decode(&contents, &mut pos).unwrap(); // SELECT
        let rewritten = command::decode(&contents, &mut pos).unwrap().unwrap();
        assert_eq!(rewritten[0], b"PEXPIREAT");
        assert_eq!(rewritten[2], b"6000");
    }
}
