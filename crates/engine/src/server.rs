//! The server composition root: `N` logical databases, the background
//! scheduler driving the active-expire cycle and snapshot/rewrite
//! triggers, and the glue wiring `corekv-durability`'s persistence onto
//! `corekv-storage`'s keyspace and `corekv-txn`'s transaction/pub-sub
//! state (§9: "global mutable state ... owned by the command executor").
//!
//! Load and replay only ever need to understand the closed vocabulary of
//! commands the durability layer itself can produce — `SET`, `RPUSH`,
//! `SADD`, `HMSET`, `ZADD`, `PEXPIREAT`, `SELECT` — since that's exactly
//! what `write_rewrite_file` and the AOF's own canonicalization emit.
//! Dispatching the full command surface a client can type stays the job
//! of whatever sits in front of this crate.

use crate::config::Config;
use crate::error::{EngineError, Result};
use corekv_durability::aof::{self, AofRecord, AofWriter};
use corekv_durability::snapshot;
use corekv_primitives::{hash, keyspace, list, set, string, zset};
use corekv_storage::{Database, ExpireAuthority};
use corekv_txn::{PubSub, WatchTable};
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

struct ServerState {
    databases: Vec<Database>,
    pubsub: PubSub,
    watches: WatchTable,
    aof: Option<AofWriter>,
    dirty: u64,
    dirty_since_save: u64,
    last_save_unix_secs: i64,
    rewrite_in_progress: bool,
}

/// The composed `corekv` server: owns every database, the durability
/// writers, and the pub/sub and watch registries behind them.
pub struct Server {
    state: Mutex<ServerState>,
    config: Config,
    data_dir: PathBuf,
    /// A primary deletes expired keys and propagates the deletion; a
    /// follower only hides them. Fixed for the process lifetime — a role
    /// change is a restart, matching how `corekv-storage` models it.
    pub authority: ExpireAuthority,
}

fn snapshot_path(data_dir: &Path, config: &Config) -> PathBuf {
    data_dir.join(&config.save_file_name)
}

fn aof_path(data_dir: &Path, config: &Config) -> PathBuf {
    data_dir.join(&config.aof_file_name)
}

/// Applies one replayed record — from either the append-only log or a
/// rewrite file — against `db`. Unrecognized command names are ignored
/// rather than treated as corruption, since a forward-compatible log
/// might carry a command this build doesn't produce itself but can
/// safely skip (e.g. one appended by a newer version).
fn apply_replay_record(db: &mut Database, args: &[Vec<u8>], thresholds: &corekv_core::EncodingThresholds, now_ms: i64) {
    let Some(name) = args.first() else { return };
    let name = name.to_ascii_uppercase();
    let rest = &args[1..];
    match name.as_slice() {
        b"SET" if rest.len() == 2 => {
            string::set(db, &rest[0], rest[1].clone(), now_ms);
        }
        b"RPUSH" if rest.len() >= 2 => {
            let _ = list::push(db, &rest[0], rest[1..].to_vec(), false, thresholds, now_ms, ExpireAuthority::Primary);
        }
        b"SADD" if rest.len() >= 2 => {
            let _ = set::sadd(db, &rest[0], rest[1..].to_vec(), thresholds, now_ms, ExpireAuthority::Primary);
        }
        b"HMSET" if rest.len() >= 3 && rest[1..].len() % 2 == 0 => {
            let pairs = rest[1..]
                .chunks_exact(2)
                .map(|c| (c[0].clone(), c[1].clone()))
                .collect();
            let _ = hash::hmset(db, &rest[0], pairs, thresholds, now_ms, ExpireAuthority::Primary);
        }
        b"ZADD" if rest.len() >= 3 && rest[1..].len() % 2 == 0 => {
            let pairs: Option<Vec<(f64, Vec<u8>)>> = rest[1..]
                .chunks_exact(2)
                .map(|c| {
                    std::str::from_utf8(&c[0])
                        .ok()
                        .and_then(|s| s.parse::<f64>().ok())
                        .map(|score| (score, c[1].clone()))
                })
                .collect();
            if let Some(pairs) = pairs {
                let _ = zset::zadd(db, &rest[0], pairs, thresholds, now_ms, ExpireAuthority::Primary);
            }
        }
        b"PEXPIREAT" if rest.len() == 2 => {
            if let Some(when_ms) = std::str::from_utf8(&rest[1]).ok().and_then(|s| s.parse::<i64>().ok()) {
                keyspace::expire_at(db, &rest[0], when_ms, now_ms, ExpireAuthority::Primary);
            }
        }
        _ => {}
    }
}

impl Server {
    /// Opens (or creates) a server rooted at `data_dir`: ensures the
    /// directory exists, writes a default `corekv.toml` if one isn't
    /// already there, loads whichever of the AOF/snapshot is authoritative
    /// per `config`, and opens the live AOF writer if enabled.
    ///
    /// Real Redis startup precedence applies: if the AOF is enabled and
    /// its file exists, it is replayed and the RDB snapshot (if any) is
    /// ignored, since the AOF is always the more complete record.
    pub fn open(config: Config, data_dir: impl Into<PathBuf>, now_ms: i64) -> Result<Self> {
        let data_dir = data_dir.into();
        std::fs::create_dir_all(&data_dir)?;

        let aof_cfg = config.aof_config().map_err(EngineError::Config)?;
        let thresholds = config.encoding_thresholds();
        let mut databases: Vec<Database> = (0..config.dbnum).map(|_| Database::new()).collect();

        let log_path = aof_path(&data_dir, &config);
        if aof_cfg.state != corekv_durability::AofState::Off && log_path.exists() {
            let records: Vec<AofRecord> = aof::load(&log_path, &aof_cfg)?;
            for record in records {
                if let Some(db) = databases.get_mut(record.db) {
                    apply_replay_record(db, &record.args, &thresholds, now_ms);
                }
            }
        } else {
            let dump_path = snapshot_path(&data_dir, &config);
            if dump_path.exists() {
                let bytes = std::fs::read(&dump_path)?;
                databases = snapshot::read_snapshot(&bytes, config.dbnum, now_ms)?;
            }
        }

        let aof = if aof_cfg.state != corekv_durability::AofState::Off {
            Some(AofWriter::open(&log_path, aof_cfg)?)
        } else {
            None
        };

        Ok(Server {
            state: Mutex::new(ServerState {
                databases,
                pubsub: PubSub::new(),
                watches: WatchTable::new(),
                aof,
                dirty: 0,
                dirty_since_save: 0,
                last_save_unix_secs: 0,
                rewrite_in_progress: false,
            }),
            config,
            data_dir,
            authority: ExpireAuthority::Primary,
        })
    }

    /// The configuration this server was opened with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The per-type encoding thresholds implied by this server's config —
    /// what every `corekv-primitives` call site needs passed in.
    pub fn thresholds(&self) -> corekv_core::EncodingThresholds {
        self.config.encoding_thresholds()
    }

    /// Runs `f` against database `index` under the server's single lock,
    /// returning [`EngineError::DbIndexOutOfRange`] without touching
    /// anything if `index` is out of bounds — matching §8's "SELECT out
    /// of range fails without changing db" guarantee.
    pub fn with_database<T>(&self, index: usize, f: impl FnOnce(&mut Database) -> T) -> Result<T> {
        let mut state = self.state.lock();
        let db = state.databases.get_mut(index).ok_or(EngineError::DbIndexOutOfRange)?;
        Ok(f(db))
    }

    /// Records a write against database `index` in the append-only log (a
    /// no-op if AOF isn't enabled) and bumps the dirty counters used by
    /// `save_points` and `INFO`-style introspection.
    pub fn record_write(&self, index: usize, args: &[Vec<u8>], now_ms: i64) -> Result<()> {
        let mut state = self.state.lock();
        state.dirty += 1;
        state.dirty_since_save += 1;
        if let Some(writer) = &mut state.aof {
            writer.append(index, args, now_ms);
            writer.flush()?;
        }
        Ok(())
    }

    /// Records an `EXEC`'d transaction's applied write commands as one
    /// `MULTI`/.../`EXEC` block (§4.10), so replaying the log re-applies it
    /// atomically instead of as a loose sequence of individually-applied
    /// writes. Callers only pass the commands that actually wrote
    /// something — a transaction with no write commands records nothing.
    pub fn record_transaction(&self, index: usize, commands: &[Vec<Vec<u8>>], now_ms: i64) -> Result<()> {
        let mut state = self.state.lock();
        if commands.is_empty() {
            return Ok(());
        }
        state.dirty += commands.len() as u64;
        state.dirty_since_save += commands.len() as u64;
        if let Some(writer) = &mut state.aof {
            writer.append_transaction(index, commands, now_ms);
            writer.flush()?;
        }
        Ok(())
    }

    /// Marks every client watching `(db, key)` dirty. Callers call this
    /// after a mutation has actually landed.
    pub fn touch_watchers(&self, db: usize, key: &[u8]) -> Vec<u64> {
        self.state.lock().watches.touch_key(db, key)
    }

    /// Direct access to the pub/sub router for `PUBLISH`/`SUBSCRIBE`
    /// dispatch — returns the recipient ids; delivering frames to them is
    /// the caller's job.
    pub fn publish(&self, channel: &[u8]) -> corekv_txn::PublishResult {
        self.state.lock().pubsub.publish(channel)
    }

    /// The number of writes since the server started (`rdb_changes_since_last_save`).
    pub fn dirty(&self) -> u64 {
        self.state.lock().dirty
    }

    /// Whether any of the configured `save_points` are due, given
    /// `now_secs` and the writes since the last successful save.
    pub fn save_due(&self, now_secs: i64) -> bool {
        let state = self.state.lock();
        if state.dirty_since_save == 0 {
            return false;
        }
        self.config
            .save_points
            .iter()
            .any(|(seconds, changes)| {
                state.dirty_since_save >= *changes && now_secs - state.last_save_unix_secs >= *seconds as i64
            })
    }

    /// Runs one active-expire pass over every database, per the
    /// configured `active_expire_sample_limit`. Expired keys are
    /// propagated to the AOF as synthetic `DEL`s, matching §7's
    /// "expiration generates a synthetic DELETE for AOF/replication".
    pub fn active_expire_cycle(&self, now_ms: i64) {
        let mut state = self.state.lock();
        let limit = self.config.active_expire_sample_limit;
        let authority = self.authority;
        for index in 0..state.databases.len() {
            let expired = state.databases[index].active_expire_cycle(now_ms, limit, authority);
            for key in expired {
                if let Some(writer) = &mut state.aof {
                    writer.append(index, &[b"DEL".to_vec(), key], now_ms);
                }
            }
        }
        if let Some(writer) = &mut state.aof {
            let _ = writer.flush();
        }
    }

    /// Called once per background tick: fsyncs the AOF under
    /// [`corekv_durability::FsyncPolicy::EverySec`] if a second has
    /// elapsed.
    pub fn tick_fsync(&self, now_ms: i64) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(writer) = &mut state.aof {
            writer.tick_fsync(now_ms)?;
        }
        Ok(())
    }

    /// Clones every database's live contents under a single lock
    /// acquisition — the fork-free substitute for a real `fork(2)`'s
    /// copy-on-write snapshot (§9).
    fn snapshot_databases(state: &ServerState, now_ms: i64) -> Vec<Database> {
        state
            .databases
            .iter()
            .map(|db| {
                let mut clone = Database::new();
                for (key, value) in db.iter() {
                    clone.set_fresh(key.to_vec(), value.clone(), now_ms);
                    if let Some(when_ms) = db.expire_at_ms(key) {
                        clone.set_expire_at(key, when_ms);
                    }
                }
                clone
            })
            .collect()
    }

    /// `SAVE`/`BGSAVE`'s body: takes a point-in-time snapshot under a
    /// single lock acquisition, writes it to a sibling temp file, then
    /// `rename(2)`s it over the live dump file. Resets the dirty-since-save
    /// counter on success.
    pub fn save(&self, now_secs: i64) -> Result<()> {
        let snapshot_cfg = self.config.snapshot_config();
        let databases = {
            let state = self.state.lock();
            Self::snapshot_databases(&state, now_secs * 1000)
        };
        let image = snapshot::write_snapshot(&databases, snapshot_cfg);
        let live_path = snapshot_path(&self.data_dir, &self.config);
        let temp_path = self.data_dir.join(format!("temp-{}.rdb", std::process::id()));
        std::fs::write(&temp_path, &image)?;
        std::fs::rename(&temp_path, &live_path)?;

        let mut state = self.state.lock();
        state.dirty_since_save = 0;
        state.last_save_unix_secs = now_secs;
        Ok(())
    }

    /// `BGREWRITEAOF`'s body: builds a minimal-reconstruction log from a
    /// single-lock-acquisition snapshot on a dedicated thread's caller,
    /// then folds in whatever the live writer accumulated while that was
    /// happening before publishing the result — the fork-free substitute
    /// for a forked child draining a diff pipe (§4.8, §9).
    ///
    /// Only one rewrite may be in flight at a time; a second call while
    /// one is running is a no-op.
    pub fn rewrite_aof(&self, now_ms: i64) -> Result<()> {
        let (databases, old_len, live_path) = {
            let mut state = self.state.lock();
            if state.rewrite_in_progress {
                return Ok(());
            }
            state.rewrite_in_progress = true;
            let live_path = aof_path(&self.data_dir, &self.config);
            if let Some(writer) = &mut state.aof {
                writer.set_rewrite_active(true);
                writer.flush()?;
            }
            let old_len = std::fs::metadata(&live_path).map(|m| m.len()).unwrap_or(0);
            (Self::snapshot_databases(&state, now_ms), old_len, live_path)
        };

        let temp_path = self
            .data_dir
            .join(format!("temp-rewriteaof-bg-{}.aof", std::process::id()));
        let result = aof::write_rewrite_file(&temp_path, &databases);

        let mut state = self.state.lock();
        let outcome = result.and_then(|()| {
            if let Some(writer) = &mut state.aof {
                writer.flush()?;
                let current_len = std::fs::metadata(&live_path)?.len();
                if current_len > old_len {
                    let mut source = std::fs::File::open(&live_path)?;
                    source.seek(SeekFrom::Start(old_len))?;
                    let mut residual = Vec::new();
                    source.read_to_end(&mut residual)?;
                    let mut dest = OpenOptions::new().append(true).open(&temp_path)?;
                    dest.write_all(&residual)?;
                    dest.sync_all()?;
                }
                aof::rename_into_place(&temp_path, &live_path)?;
                *writer = AofWriter::open(&live_path, self.config.aof_config().map_err(EngineError::Config)?)?;
                writer.set_rewrite_active(false);
            } else {
                aof::rename_into_place(&temp_path, &live_path)?;
            }
            Ok(())
        });
        state.rewrite_in_progress = false;
        outcome
    }

    /// `DBSIZE` against database `index`.
    pub fn dbsize(&self, index: usize) -> Result<usize> {
        self.with_database(index, |db| keyspace::dbsize(db))
    }

    /// `MOVE key db`: relocates `key` from `src` to `dst`, refusing if it's
    /// absent from `src`, already present in `dst`, or `src == dst`.
    /// Needs both databases locked at once, which is why this lives on
    /// `Server` rather than `corekv-primitives::keyspace` — a single
    /// [`Database`] can't see its siblings.
    pub fn move_key(&self, src: usize, dst: usize, key: &[u8], now_ms: i64) -> Result<bool> {
        if src == dst {
            return Ok(false);
        }
        let mut state = self.state.lock();
        if dst >= state.databases.len() {
            return Err(EngineError::DbIndexOutOfRange);
        }
        let authority = self.authority;
        if !state.databases[src].contains(key, now_ms, authority) {
            return Ok(false);
        }
        if state.databases[dst].contains(key, now_ms, authority) {
            return Ok(false);
        }
        let ttl = state.databases[src].expire_at_ms(key);
        let Some(value) = state.databases[src].delete(key) else {
            return Ok(false);
        };
        state.databases[dst].set_fresh(key.to_vec(), value, now_ms);
        if let Some(deadline) = ttl {
            state.databases[dst].set_expire_at(key, deadline);
        }
        Ok(true)
    }

    /// `FLUSHDB`: wipes database `index` and returns the ids of every
    /// client watching a key in it, so the caller can mark their
    /// transactions dirty the same way `touch_watchers` does for a single
    /// key.
    pub fn flushdb(&self, index: usize) -> Result<Vec<u64>> {
        let mut state = self.state.lock();
        if index >= state.databases.len() {
            return Err(EngineError::DbIndexOutOfRange);
        }
        state.databases[index].flush();
        Ok(state.watches.touch_db(index))
    }

    /// `FLUSHALL`: `flushdb` across every database, returning the union of
    /// touched client ids.
    pub fn flushall(&self) -> Result<Vec<u64>> {
        let mut state = self.state.lock();
        let mut touched = Vec::new();
        for index in 0..state.databases.len() {
            state.databases[index].flush();
            touched.extend(state.watches.touch_db(index));
        }
        Ok(touched)
    }

    /// `LASTSAVE`: the unix timestamp of the most recent successful `SAVE`
    /// or `BGSAVE`, or `0` if this server hasn't saved yet.
    pub fn lastsave(&self) -> i64 {
        self.state.lock().last_save_unix_secs
    }

    /// `SHUTDOWN [NOSAVE|SAVE]`. Honors the configured save points unless
    /// `NOSAVE` is given, flushes the AOF, then returns — actually exiting
    /// the process is the caller's job, matching how this crate never
    /// touches process lifecycle on its own.
    pub fn shutdown(&self, save: bool, now_secs: i64) -> Result<()> {
        if save {
            self.save(now_secs)?;
        }
        let mut state = self.state.lock();
        if let Some(writer) = &mut state.aof {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corekv_core::RObject;
    use tempfile::tempdir;

    fn open(config: Config, dir: &Path) -> Server {
        Server::open(config, dir, 1_000).unwrap()
    }

    #[test]
    fn a_fresh_server_has_dbnum_empty_databases() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        for i in 0..16 {
            server.with_database(i, |db| assert!(db.is_empty())).unwrap();
        }
        assert!(server.with_database(16, |_| ()).is_err());
    }

    #[test]
    fn save_then_reopen_restores_the_keyspace() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| db.set_fresh(b"k".to_vec(), RObject::StrRaw(b"v".to_vec()), 1_000))
            .unwrap();
        server.save(1_000).unwrap();

        let reopened = open(Config::default(), dir.path());
        reopened
            .with_database(0, |db| match db.dict_get(b"k") {
                Some(RObject::StrRaw(bytes)) => assert_eq!(bytes, b"v"),
                other => panic!("unexpected {other:?}"),
            })
            .unwrap();
    }

    #[test]
    fn aof_enabled_writes_survive_a_restart() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.aof_state = "on".to_string();
        config.aof_fsync = "no".to_string();
        let server = open(config.clone(), dir.path());

        server
            .with_database(0, |db| string::set(db, b"a", b"1".to_vec(), 1_000))
            .unwrap();
        server.record_write(0, &[b"SET".to_vec(), b"a".to_vec(), b"1".to_vec()], 1_000).unwrap();

        let reopened = open(config, dir.path());
        reopened
            .with_database(0, |db| match db.dict_get(b"a") {
                Some(RObject::StrInt(n)) => assert_eq!(*n, 1),
                other => panic!("unexpected {other:?}"),
            })
            .unwrap();
    }

    #[test]
    fn aof_takes_precedence_over_an_existing_snapshot() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.aof_state = "on".to_string();
        config.aof_fsync = "no".to_string();
        let server = open(config.clone(), dir.path());
        server
            .with_database(0, |db| string::set(db, b"only_in_snapshot", b"x".to_vec(), 1_000))
            .unwrap();
        server.save(1_000).unwrap();
        server
            .with_database(0, |db| string::set(db, b"only_in_aof", b"y".to_vec(), 1_000))
            .unwrap();
        server
            .record_write(0, &[b"SET".to_vec(), b"only_in_aof".to_vec(), b"y".to_vec()], 1_000)
            .unwrap();

        let reopened = open(config, dir.path());
        reopened
            .with_database(0, |db| {
                assert!(db.dict_get(b"only_in_snapshot").is_none());
                assert!(db.dict_get(b"only_in_aof").is_some());
            })
            .unwrap();
    }

    #[test]
    fn rewrite_aof_produces_a_replayable_minimal_log() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.aof_state = "on".to_string();
        config.aof_fsync = "no".to_string();
        let server = open(config.clone(), dir.path());
        server
            .with_database(0, |db| string::set(db, b"counter", b"42".to_vec(), 1_000))
            .unwrap();
        server
            .record_write(0, &[b"SET".to_vec(), b"counter".to_vec(), b"42".to_vec()], 1_000)
            .unwrap();

        server.rewrite_aof(1_000).unwrap();

        let reopened = open(config, dir.path());
        reopened
            .with_database(0, |db| match db.dict_get(b"counter") {
                Some(RObject::StrInt(n)) => assert_eq!(*n, 42),
                other => panic!("unexpected {other:?}"),
            })
            .unwrap();
    }

    #[test]
    fn active_expire_cycle_only_touches_primary_authority() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| {
                db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000);
                db.set_expire_at(b"k", 1);
            })
            .unwrap();
        server.active_expire_cycle(1_000);
        server.with_database(0, |db| assert!(db.dict_get(b"k").is_none())).unwrap();
    }

    #[test]
    fn dbsize_reflects_the_targeted_database() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        assert_eq!(server.dbsize(0).unwrap(), 1);
        assert_eq!(server.dbsize(1).unwrap(), 0);
        assert!(server.dbsize(99).is_err());
    }

    #[test]
    fn move_key_relocates_between_databases_and_refuses_conflicts() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        assert!(server.move_key(0, 1, b"k", 1_000).unwrap());
        server.with_database(0, |db| assert!(db.dict_get(b"k").is_none())).unwrap();
        server
            .with_database(1, |db| assert!(matches!(db.dict_get(b"k"), Some(RObject::StrInt(1)))))
            .unwrap();

        server
            .with_database(0, |db| db.set_fresh(b"j".to_vec(), RObject::StrInt(2), 1_000))
            .unwrap();
        assert!(!server.move_key(0, 0, b"j", 1_000).unwrap());
        assert!(!server.move_key(5, 1, b"missing", 1_000).unwrap());
    }

    #[test]
    fn flushdb_empties_only_the_targeted_database() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        server
            .with_database(1, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        server.flushdb(0).unwrap();
        assert_eq!(server.dbsize(0).unwrap(), 0);
        assert_eq!(server.dbsize(1).unwrap(), 1);
    }

    #[test]
    fn flushall_empties_every_database() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        server
            .with_database(1, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        server.flushall().unwrap();
        assert_eq!(server.dbsize(0).unwrap(), 0);
        assert_eq!(server.dbsize(1).unwrap(), 0);
    }

    #[test]
    fn lastsave_tracks_the_most_recent_save() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        assert_eq!(server.lastsave(), 0);
        server.save(42).unwrap();
        assert_eq!(server.lastsave(), 42);
    }

    #[test]
    fn shutdown_with_save_persists_the_keyspace() {
        let dir = tempdir().unwrap();
        let server = open(Config::default(), dir.path());
        server
            .with_database(0, |db| db.set_fresh(b"k".to_vec(), RObject::StrInt(1), 1_000))
            .unwrap();
        server.shutdown(true, 1_000).unwrap();

        let reopened = open(Config::default(), dir.path());
        reopened
            .with_database(0, |db| assert!(matches!(db.dict_get(b"k"), Some(RObject::StrInt(1)))))
            .unwrap();
    }
}
