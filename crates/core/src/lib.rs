//! Value types, error taxonomy, glob matching and range literals shared by
//! every layer of the corekv keyspace engine.
//!
//! This crate has no notion of a "database" or "key" — it defines the
//! building blocks: [`RObject`], the tagged union of value-plus-encoding
//! pairs; [`EncodingThresholds`], the configurable points at which a
//! compact encoding upgrades to its general counterpart; the error
//! taxonomy raised by value-level operations; and the pattern/range
//! literal parsers the command layer needs (`KEYS` globs, `ZRANGEBYSCORE`
//! and `ZRANGEBYLEX` bounds).

#![warn(missing_docs)]

pub mod error;
pub mod glob;
pub mod limits;
pub mod range;
pub mod value;

pub use error::{CoreError, Result};
pub use glob::{glob_match, glob_match_str};
pub use limits::EncodingThresholds;
pub use range::{LexBound, LexRange, RangeLimit, ScoreBound, ScoreRange};
pub use value::{DataType, IntsetWidth, RObject, ZSet};
