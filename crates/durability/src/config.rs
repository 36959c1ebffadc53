//! Durability-layer configuration (the subset of §6.5 this crate owns).

use crate::mode::FsyncPolicy;

/// Whether the append-only log is in use, matching `aof_state`'s
/// three-way lifecycle (off / on / waiting for a rewrite to finish before
/// the first real write lands).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AofState {
    /// AOF persistence is disabled.
    Off,
    /// AOF persistence is active.
    On,
    /// AOF was just enabled; a rewrite is producing the initial file
    /// before writes are appended to it.
    WaitingRewrite,
}

/// Configuration for the append-only log and its background rewrite.
#[derive(Debug, Clone)]
pub struct AofConfig {
    /// `aof_state`.
    pub state: AofState,
    /// `aof_fsync`.
    pub fsync: FsyncPolicy,
    /// `aof_rewrite_incremental_fsync`: fsync every 32MB written during a
    /// rewrite, to avoid a single huge fsync stalling the child.
    pub rewrite_incremental_fsync_bytes: u64,
    /// `aof_load_truncated`: tolerate a truncated tail record on load by
    /// discarding it instead of aborting.
    pub load_truncated: bool,
    /// `aof_no_fsync_on_rewrite`: suspend the parent's fsync policy while
    /// a rewrite child is active, to avoid contending with the child's
    /// disk I/O.
    pub no_fsync_on_rewrite: bool,
}

impl Default for AofConfig {
    fn default() -> Self {
        AofConfig {
            state: AofState::Off,
            fsync: FsyncPolicy::EverySec,
            rewrite_incremental_fsync_bytes: 32 * 1024 * 1024,
            load_truncated: false,
            no_fsync_on_rewrite: false,
        }
    }
}

/// Configuration for the RDB-style point-in-time snapshot.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotConfig {
    /// `rdb_compression`: LZF-compress strings longer than 20 bytes.
    pub compression: bool,
    /// `rdb_checksum`: compute/verify the trailing CRC-64.
    pub checksum: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        SnapshotConfig {
            compression: true,
            checksum: true,
        }
    }
}
