//! The stored value type: a tagged union of Redis's five data types, each
//! carrying one of its two possible encodings.
//!
//! Rather than a single struct with a type tag and a separate encoding
//! tag, `RObject` gives every (type, encoding) pair its own variant. This
//! keeps the encoding-specific payload type (e.g. `VecDeque<Vec<u8>>` vs.
//! a skip list) in the type system instead of behind a runtime check, and
//! it makes an inconsistent state (e.g. a "set" that is internally a hash
//! map of numbers to strings) unrepresentable.

use corekv_index::SkipList;
use std::collections::{HashMap, HashSet, VecDeque};

/// The logical Redis data type a value holds, irrespective of its current
/// encoding. Returned by `RObject::type_name` for `TYPE`/`OBJECT ENCODING`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Strings, including integer-encoded strings.
    String,
    /// Linked lists of strings.
    List,
    /// Unordered collections of unique strings.
    Set,
    /// Field/value string maps.
    Hash,
    /// Score-ordered unique-member collections.
    ZSet,
}

impl DataType {
    /// The lowercase name reported by the `TYPE` command.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::List => "list",
            DataType::Set => "set",
            DataType::Hash => "hash",
            DataType::ZSet => "zset",
        }
    }
}

/// A hash member mapped to its score, kept in lockstep with a
/// [`SkipList`] so `ZSCORE` doesn't require a skip-list walk.
#[derive(Debug, Clone, Default)]
pub struct ZSet {
    members: HashMap<Vec<u8>, f64>,
    order: SkipList,
}

impl ZSet {
    /// An empty sorted set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the set has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Current score of `member`, if present.
    pub fn score(&self, member: &[u8]) -> Option<f64> {
        self.members.get(member).copied()
    }

    /// Inserts or updates `member` with `score`. Returns `true` if the
    /// member was newly added (as opposed to re-scored).
    pub fn insert(&mut self, member: Vec<u8>, score: f64) -> bool {
        match self.members.get(&member).copied() {
            Some(old) if old == score => false,
            Some(old) => {
                self.order.remove(&member, old);
                self.order.insert(member.clone(), score);
                self.members.insert(member, score);
                false
            }
            None => {
                self.order.insert(member.clone(), score);
                self.members.insert(member, score);
                true
            }
        }
    }

    /// Removes `member`. Returns `true` if it was present.
    pub fn remove(&mut self, member: &[u8]) -> bool {
        match self.members.remove(member) {
            Some(score) => {
                self.order.remove(member, score);
                true
            }
            None => false,
        }
    }

    /// Zero-based ascending rank of `member`, if present.
    pub fn rank(&self, member: &[u8]) -> Option<u64> {
        let score = self.score(member)?;
        self.order.rank(member, score)
    }

    /// Forward (ascending-score) iterator over `(member, score)`.
    pub fn iter(&self) -> corekv_index::Iter<'_> {
        self.order.iter()
    }

    /// Reverse (descending-score) iterator over `(member, score)`.
    pub fn iter_rev(&self) -> corekv_index::IterRev<'_> {
        self.order.iter_rev()
    }

    /// Member/score at the given zero-based ascending rank.
    pub fn by_rank(&self, rank: u64) -> Option<(&[u8], f64)> {
        self.order.by_rank(rank)
    }

    /// First member at or after `min` in score order, entry point for
    /// range scans.
    pub fn first_at_or_after(&self, min: f64, exclusive: bool) -> Option<(&[u8], f64)> {
        self.order.first_at_or_after(min, exclusive)
    }
}

/// The integer width an intset is currently encoded at, tracked only for
/// `OBJECT ENCODING` introspection — the in-memory representation here is
/// always a plain `Vec<i64>` regardless of the reported width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntsetWidth {
    /// Every member fits in an `i16`.
    Bits16,
    /// Every member fits in an `i32`.
    Bits32,
    /// At least one member requires a full `i64`.
    Bits64,
}

impl IntsetWidth {
    /// The narrowest width that can represent `value`.
    pub fn for_value(value: i64) -> Self {
        if value >= i16::MIN as i64 && value <= i16::MAX as i64 {
            IntsetWidth::Bits16
        } else if value >= i32::MIN as i64 && value <= i32::MAX as i64 {
            IntsetWidth::Bits32
        } else {
            IntsetWidth::Bits64
        }
    }

    /// The wider of `self` and `other`, matching intset's never-narrow
    /// upgrade rule.
    pub fn widen(self, other: Self) -> Self {
        use IntsetWidth::*;
        match (self, other) {
            (Bits64, _) | (_, Bits64) => Bits64,
            (Bits32, _) | (_, Bits32) => Bits32,
            _ => Bits16,
        }
    }
}

/// A stored value: one variant per (type, encoding) pair.
#[derive(Debug, Clone)]
pub enum RObject {
    /// A string small enough, and purely numeric enough, to be stored as
    /// a parsed `i64` rather than raw bytes.
    StrInt(i64),
    /// A general string value.
    StrRaw(Vec<u8>),

    /// A list small enough that every element is under the per-entry
    /// size threshold: backed by the same `VecDeque` as the general
    /// encoding, since no separate compact representation is needed
    /// beyond staying under the thresholds that trigger upgrade.
    ListCompact(VecDeque<Vec<u8>>),
    /// A list that has crossed the entry-count or entry-size threshold.
    ListGeneric(VecDeque<Vec<u8>>),

    /// A set whose members are all valid integers and within the
    /// intset entry-count threshold.
    SetIntset(Vec<i64>, IntsetWidth),
    /// A set containing at least one non-integer member, or one that has
    /// crossed the intset entry-count threshold.
    SetHashtable(HashSet<Vec<u8>>),

    /// A hash small enough that every field/value stays under threshold.
    HashZiplist(Vec<(Vec<u8>, Vec<u8>)>),
    /// A hash that has crossed the entry-count or entry-size threshold.
    HashHashtable(HashMap<Vec<u8>, Vec<u8>>),

    /// A sorted set small enough to stay under threshold: kept as a
    /// flat, score-sorted vector rather than a skip list.
    ZsetZiplist(Vec<(Vec<u8>, f64)>),
    /// A sorted set that has crossed the entry-count or member-size
    /// threshold, backed by the skip-list + hash-map pair.
    ZsetSkiplist(ZSet),
}

impl RObject {
    /// The logical data type, independent of encoding.
    pub fn type_name(&self) -> DataType {
        match self {
            RObject::StrInt(_) | RObject::StrRaw(_) => DataType::String,
            RObject::ListCompact(_) | RObject::ListGeneric(_) => DataType::List,
            RObject::SetIntset(..) | RObject::SetHashtable(_) => DataType::Set,
            RObject::HashZiplist(_) | RObject::HashHashtable(_) => DataType::Hash,
            RObject::ZsetZiplist(_) | RObject::ZsetSkiplist(_) => DataType::ZSet,
        }
    }

    /// The encoding name reported by `OBJECT ENCODING`.
    pub fn encoding_name(&self) -> &'static str {
        match self {
            RObject::StrInt(_) => "int",
            RObject::StrRaw(_) => "raw",
            RObject::ListCompact(_) => "ziplist",
            RObject::ListGeneric(_) => "linkedlist",
            RObject::SetIntset(..) => "intset",
            RObject::SetHashtable(_) => "hashtable",
            RObject::HashZiplist(_) => "ziplist",
            RObject::HashHashtable(_) => "hashtable",
            RObject::ZsetZiplist(_) => "ziplist",
            RObject::ZsetSkiplist(_) => "skiplist",
        }
    }

    /// Number of elements held by aggregate types. Strings return `1`,
    /// matching how Redis reports `OBJECT REFCOUNT`/cardinality checks
    /// uniformly across types in debug tooling.
    pub fn len(&self) -> usize {
        match self {
            RObject::StrInt(_) | RObject::StrRaw(_) => 1,
            RObject::ListCompact(l) | RObject::ListGeneric(l) => l.len(),
            RObject::SetIntset(s, _) => s.len(),
            RObject::SetHashtable(s) => s.len(),
            RObject::HashZiplist(h) => h.len(),
            RObject::HashHashtable(h) => h.len(),
            RObject::ZsetZiplist(z) => z.len(),
            RObject::ZsetSkiplist(z) => z.len(),
        }
    }
}
