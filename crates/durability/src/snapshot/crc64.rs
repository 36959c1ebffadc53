//! CRC-64 digest over the snapshot body, written as the footer's integrity
//! check (§4.6). Zero when checksums are disabled, matching the
//! `rdb_checksum off` behavior.

use crc::{Crc, CRC_64_XZ};

static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// Computes the running CRC-64 of `data`.
pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Incremental digest, used by the writer to fold in each record as it's
/// written rather than buffering the whole file.
pub struct Digest {
    inner: crc::Digest<'static, u64>,
}

impl Digest {
    /// A fresh digest over no bytes.
    pub fn new() -> Self {
        Digest {
            inner: CRC64.digest(),
        }
    }

    /// Folds `bytes` into the running digest.
    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    /// Finalizes and returns the CRC-64 value.
    pub fn finalize(self) -> u64 {
        self.inner.finalize()
    }
}

impl Default for Digest {
    fn default() -> Self {
        Self::new()
    }
}
