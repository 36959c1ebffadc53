//! Server configuration via `corekv.toml` (§6.5).
//!
//! A config file in the data directory, created with commented defaults on
//! first open. To change a setting, edit the file and restart — the same
//! model Redis itself uses for `redis.conf`.

use corekv_core::EncodingThresholds;
use corekv_durability::{AofConfig, AofState, FsyncPolicy, SnapshotConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed in the server's data directory.
pub const CONFIG_FILE_NAME: &str = "corekv.toml";

fn default_dbnum() -> usize {
    16
}
fn default_ziplist_entries() -> usize {
    128
}
fn default_ziplist_value() -> usize {
    64
}
fn default_intset_entries() -> usize {
    512
}
fn default_true() -> bool {
    true
}
fn default_aof_fsync() -> String {
    "everysec".to_string()
}
fn default_active_expire_sample_limit() -> usize {
    20
}

/// Server configuration loaded from `corekv.toml`.
///
/// # Example
///
/// ```toml
/// dbnum = 16
///
/// [snapshot]
/// rdb_compression = true
/// rdb_checksum = true
///
/// [aof]
/// aof_state = "off"
/// aof_fsync = "everysec"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Number of logical databases `SELECT` can address (`dbnum`).
    #[serde(default = "default_dbnum")]
    pub dbnum: usize,

    /// Max entries for a compact list before it upgrades to the general
    /// encoding (`list_max_ziplist_entries`).
    #[serde(default = "default_ziplist_entries")]
    pub list_max_ziplist_entries: usize,
    /// Max single-element size for a compact list (`list_max_ziplist_value`).
    #[serde(default = "default_ziplist_value")]
    pub list_max_ziplist_value: usize,
    /// Max integer members for a compact set before it upgrades
    /// (`set_max_intset_entries`).
    #[serde(default = "default_intset_entries")]
    pub set_max_intset_entries: usize,
    /// Max entries for a compact hash (`hash_max_ziplist_entries`).
    #[serde(default = "default_ziplist_entries")]
    pub hash_max_ziplist_entries: usize,
    /// Max field/value size for a compact hash (`hash_max_ziplist_value`).
    #[serde(default = "default_ziplist_value")]
    pub hash_max_ziplist_value: usize,
    /// Max entries for a compact zset (`zset_max_ziplist_entries`).
    #[serde(default = "default_ziplist_entries")]
    pub zset_max_ziplist_entries: usize,
    /// Max member size for a compact zset (`zset_max_ziplist_value`).
    #[serde(default = "default_ziplist_value")]
    pub zset_max_ziplist_value: usize,

    /// `rdb_compression`: LZF-compress snapshot strings over 20 bytes.
    #[serde(default = "default_true")]
    pub rdb_compression: bool,
    /// `rdb_checksum`: compute/verify the snapshot's trailing CRC-64.
    #[serde(default = "default_true")]
    pub rdb_checksum: bool,
    /// File name for the point-in-time snapshot, relative to the data
    /// directory.
    #[serde(default = "default_save_file_name")]
    pub save_file_name: String,
    /// `save <seconds> <changes>` points: auto-snapshot once `changes`
    /// writes have landed within `seconds`, checked once per background
    /// tick. Empty disables automatic snapshotting.
    #[serde(default = "default_save_points")]
    pub save_points: Vec<(u64, u64)>,

    /// `appendonly`/`aof_state`: `"off"`, `"on"`, or `"waiting-rewrite"`.
    #[serde(default = "default_aof_state")]
    pub aof_state: String,
    /// `aof_fsync`: `"always"`, `"everysec"`, or `"no"`.
    #[serde(default = "default_aof_fsync")]
    pub aof_fsync: String,
    /// `aof_rewrite_incremental_fsync`, in bytes.
    #[serde(default = "default_rewrite_incremental_fsync_bytes")]
    pub aof_rewrite_incremental_fsync_bytes: u64,
    /// `aof_load_truncated`: tolerate a truncated AOF tail on load.
    #[serde(default)]
    pub aof_load_truncated: bool,
    /// `aof_no_fsync_on_rewrite`: suspend fsyncs while a rewrite runs.
    #[serde(default)]
    pub aof_no_fsync_on_rewrite: bool,
    /// File name for the append-only log, relative to the data directory.
    #[serde(default = "default_aof_file_name")]
    pub aof_file_name: String,

    /// Keys sampled per active-expire-cycle pass, per database.
    #[serde(default = "default_active_expire_sample_limit")]
    pub active_expire_sample_limit: usize,
}

fn default_save_file_name() -> String {
    "dump.rdb".to_string()
}
fn default_aof_file_name() -> String {
    "appendonly.aof".to_string()
}
fn default_aof_state() -> String {
    "off".to_string()
}
fn default_rewrite_incremental_fsync_bytes() -> u64 {
    32 * 1024 * 1024
}
fn default_save_points() -> Vec<(u64, u64)> {
    vec![(900, 1), (300, 10), (60, 10000)]
}

impl Default for Config {
    fn default() -> Self {
        Config {
            dbnum: default_dbnum(),
            list_max_ziplist_entries: default_ziplist_entries(),
            list_max_ziplist_value: default_ziplist_value(),
            set_max_intset_entries: default_intset_entries(),
            hash_max_ziplist_entries: default_ziplist_entries(),
            hash_max_ziplist_value: default_ziplist_value(),
            zset_max_ziplist_entries: default_ziplist_entries(),
            zset_max_ziplist_value: default_ziplist_value(),
            rdb_compression: true,
            rdb_checksum: true,
            save_file_name: default_save_file_name(),
            save_points: default_save_points(),
            aof_state: default_aof_state(),
            aof_fsync: default_aof_fsync(),
            aof_rewrite_incremental_fsync_bytes: default_rewrite_incremental_fsync_bytes(),
            aof_load_truncated: false,
            aof_no_fsync_on_rewrite: false,
            aof_file_name: default_aof_file_name(),
            active_expire_sample_limit: default_active_expire_sample_limit(),
        }
    }
}

impl Config {
    /// The per-type encoding thresholds this config implies, for
    /// `corekv_primitives`' upgrade checks.
    pub fn encoding_thresholds(&self) -> EncodingThresholds {
        EncodingThresholds {
            list_max_ziplist_entries: self.list_max_ziplist_entries,
            list_max_ziplist_value: self.list_max_ziplist_value,
            set_max_intset_entries: self.set_max_intset_entries,
            hash_max_ziplist_entries: self.hash_max_ziplist_entries,
            hash_max_ziplist_value: self.hash_max_ziplist_value,
            zset_max_ziplist_entries: self.zset_max_ziplist_entries,
            zset_max_ziplist_value: self.zset_max_ziplist_value,
        }
    }

    /// The snapshot codec's configuration.
    pub fn snapshot_config(&self) -> SnapshotConfig {
        SnapshotConfig {
            compression: self.rdb_compression,
            checksum: self.rdb_checksum,
        }
    }

    /// Parses `aof_fsync` into a [`FsyncPolicy`].
    ///
    /// # Errors
    /// Returns an error if the value isn't `"always"`, `"everysec"`, or `"no"`.
    pub fn fsync_policy(&self) -> Result<FsyncPolicy, String> {
        match self.aof_fsync.as_str() {
            "always" => Ok(FsyncPolicy::Always),
            "everysec" => Ok(FsyncPolicy::EverySec),
            "no" => Ok(FsyncPolicy::No),
            other => Err(format!(
                "invalid aof_fsync '{other}' in corekv.toml: expected \"always\", \"everysec\" or \"no\""
            )),
        }
    }

    /// Parses `aof_state` into an [`AofState`].
    ///
    /// # Errors
    /// Returns an error if the value isn't `"off"`, `"on"`, or
    /// `"waiting-rewrite"`.
    pub fn aof_state_value(&self) -> Result<AofState, String> {
        match self.aof_state.as_str() {
            "off" => Ok(AofState::Off),
            "on" => Ok(AofState::On),
            "waiting-rewrite" => Ok(AofState::WaitingRewrite),
            other => Err(format!(
                "invalid aof_state '{other}' in corekv.toml: expected \"off\", \"on\" or \"waiting-rewrite\""
            )),
        }
    }

    /// The append-only log's full configuration, derived from the
    /// individual `aof_*` fields.
    ///
    /// # Errors
    /// Propagates [`Self::fsync_policy`]'s and [`Self::aof_state_value`]'s
    /// validation errors.
    pub fn aof_config(&self) -> Result<AofConfig, String> {
        Ok(AofConfig {
            state: self.aof_state_value()?,
            fsync: self.fsync_policy()?,
            rewrite_incremental_fsync_bytes: self.aof_rewrite_incremental_fsync_bytes,
            load_truncated: self.aof_load_truncated,
            no_fsync_on_rewrite: self.aof_no_fsync_on_rewrite,
        })
    }

    /// The default config file content, with explanatory comments.
    pub fn default_toml() -> &'static str {
        r#"# corekv server configuration
#
# Number of logical databases addressable via SELECT.
dbnum = 16

# Compact-encoding upgrade thresholds. A key's compact encoding is
# replaced by its general encoding, one-way, once either limit is crossed.
list_max_ziplist_entries = 128
list_max_ziplist_value = 64
set_max_intset_entries = 512
hash_max_ziplist_entries = 128
hash_max_ziplist_value = 64
zset_max_ziplist_entries = 128
zset_max_ziplist_value = 64

# Point-in-time snapshot (§4.6).
rdb_compression = true
rdb_checksum = true
save_file_name = "dump.rdb"
# save <seconds> <changes>: snapshot automatically once this many writes
# have landed within this many seconds. Empty disables automatic saving.
save_points = [[900, 1], [300, 10], [60, 10000]]

# Append-only log (§4.7). aof_state: "off", "on", or "waiting-rewrite".
aof_state = "off"
# aof_fsync: "always", "everysec", or "no".
aof_fsync = "everysec"
aof_rewrite_incremental_fsync_bytes = 33554432
aof_load_truncated = false
aof_no_fsync_on_rewrite = false
aof_file_name = "appendonly.aof"

# Keys sampled per database on each active-expire-cycle background pass.
active_expire_sample_limit = 20
"#
    }

    /// Reads and parses the config at `path`, eagerly validating
    /// `aof_fsync`/`aof_state`.
    ///
    /// # Errors
    /// Returns an error if the file can't be read, doesn't parse as TOML,
    /// or names an unrecognized `aof_fsync`/`aof_state` value.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file '{}': {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| format!("failed to parse config file '{}': {e}", path.display()))?;
        config.fsync_policy()?;
        config.aof_state_value()?;
        Ok(config)
    }

    /// Writes the default config file if `path` doesn't already exist.
    ///
    /// # Errors
    /// Propagates the underlying I/O error as a formatted string.
    pub fn write_default_if_missing(path: &Path) -> Result<(), String> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())
                .map_err(|e| format!("failed to write default config file '{}': {e}", path.display()))?;
        }
        Ok(())
    }

    /// Serializes this config to TOML and writes it to `path`.
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails.
    pub fn write_to_file(&self, path: &Path) -> Result<(), String> {
        let content = toml::to_string_pretty(self).map_err(|e| format!("failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("failed to write config file '{}': {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_has_documented_redis_3_0_values() {
        let config = Config::default();
        assert_eq!(config.dbnum, 16);
        assert_eq!(config.set_max_intset_entries, 512);
        assert!(matches!(config.fsync_policy().unwrap(), FsyncPolicy::EverySec));
        assert!(matches!(config.aof_state_value().unwrap(), AofState::Off));
    }

    #[test]
    fn default_toml_parses_and_round_trips() {
        let config: Config = toml::from_str(Config::default_toml()).unwrap();
        assert_eq!(config.dbnum, 16);
        assert_eq!(config.save_points, vec![(900, 1), (300, 10), (60, 10000)]);
    }

    #[test]
    fn invalid_aof_fsync_is_rejected() {
        let config: Config = toml::from_str("aof_fsync = \"turbo\"").unwrap();
        assert!(config.fsync_policy().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.dbnum, 16);
        assert_eq!(config.zset_max_ziplist_value, 64);
    }

    #[test]
    fn write_default_then_load_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        Config::write_default_if_missing(&path).unwrap();
        assert!(path.exists());

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.dbnum, 16);
    }

    #[test]
    fn write_default_does_not_overwrite_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "dbnum = 4\n").unwrap();

        Config::write_default_if_missing(&path).unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.dbnum, 4);
    }

    #[test]
    fn aof_config_derives_from_individual_fields() {
        let mut config = Config::default();
        config.aof_state = "on".to_string();
        config.aof_load_truncated = true;
        let aof = config.aof_config().unwrap();
        assert!(matches!(aof.state, AofState::On));
        assert!(aof.load_truncated);
    }
}
