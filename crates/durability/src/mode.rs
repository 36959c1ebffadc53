//! The append-only log's fsync policy (§4.7, `aof_fsync` in §6.5).

/// When the AOF writer calls `fsync` on the log file descriptor.
///
/// This is independent of *whether* the AOF is buffered/flushed — a
/// `write()` happens once per event-loop iteration regardless of policy
/// (§4.7 step 2); `FsyncPolicy` only decides when the durable-on-disk
/// guarantee catches up to that write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsyncPolicy {
    /// fsync after every flush. Safest, slowest: a write is never
    /// acknowledged to the client as durable before it's on disk.
    Always,
    /// fsync once per second from a background thread. If a background
    /// fsync is already in flight, a newly due one may be postponed by up
    /// to two seconds total, after which it is forced synchronously on the
    /// writer thread (§4.7).
    EverySec,
    /// Never fsync explicitly; rely on the OS to flush dirty pages on its
    /// own schedule. Fastest, weakest durability guarantee.
    No,
}

impl Default for FsyncPolicy {
    fn default() -> Self {
        FsyncPolicy::EverySec
    }
}

impl FsyncPolicy {
    /// `true` for the policy that makes a failed fsync fatal to the write
    /// path rather than retryable (§4.7 step 2, §7).
    pub fn fsync_failure_is_fatal(&self) -> bool {
        matches!(self, FsyncPolicy::Always)
    }
}
