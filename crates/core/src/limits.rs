//! Per-type encoding upgrade thresholds.
//!
//! Each compact encoding (list/set/hash/zset) upgrades to its general
//! encoding once a key's element count or any individual element's size
//! crosses a configured threshold. The upgrade is one-way: a key never
//! downgrades back to a compact encoding after shrinking.
//!
//! Defaults match the documented Redis 3.0 configuration directives of
//! the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodingThresholds {
    /// Max entries for `ListCompact` before upgrading to `ListGeneric`.
    pub list_max_ziplist_entries: usize,
    /// Max bytes for any single list entry before upgrading to `ListGeneric`.
    pub list_max_ziplist_value: usize,

    /// Max integer members for `SetIntset` before upgrading to `SetHashtable`.
    pub set_max_intset_entries: usize,

    /// Max entries for `HashZiplist` before upgrading to `HashHashtable`.
    pub hash_max_ziplist_entries: usize,
    /// Max bytes for any single hash field or value before upgrading.
    pub hash_max_ziplist_value: usize,

    /// Max entries for `ZsetZiplist` before upgrading to `ZsetSkiplist`.
    pub zset_max_ziplist_entries: usize,
    /// Max bytes for any single zset member before upgrading.
    pub zset_max_ziplist_value: usize,
}

impl Default for EncodingThresholds {
    fn default() -> Self {
        EncodingThresholds {
            list_max_ziplist_entries: 128,
            list_max_ziplist_value: 64,
            set_max_intset_entries: 512,
            hash_max_ziplist_entries: 128,
            hash_max_ziplist_value: 64,
            zset_max_ziplist_entries: 128,
            zset_max_ziplist_value: 64,
        }
    }
}

impl EncodingThresholds {
    /// Thresholds of `0`/`1` entries so tests can exercise the general
    /// encoding without constructing thousands of elements.
    pub fn always_upgrade() -> Self {
        EncodingThresholds {
            list_max_ziplist_entries: 0,
            list_max_ziplist_value: 0,
            set_max_intset_entries: 0,
            hash_max_ziplist_entries: 0,
            hash_max_ziplist_value: 0,
            zset_max_ziplist_entries: 0,
            zset_max_ziplist_value: 0,
        }
    }
}
