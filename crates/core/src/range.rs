//! Range-specification literals for `ZRANGEBYSCORE`/`ZRANGEBYLEX` and their
//! reversed counterparts.
//!
//! Scores accept `+inf`/`-inf` and an optional leading `(` to make the
//! bound exclusive. Lex bounds use `-`/`+` for unbounded and a leading
//! `[`/`(` on a literal for inclusive/exclusive; lex ranges are only
//! well-defined when every member in the set compares equal by score, a
//! precondition the caller is responsible for, not this parser.

use crate::error::{CoreError, Result};
use std::cmp::Ordering;

/// A parsed score-range bound (`ZRANGEBYSCORE`/`ZREVRANGEBYSCORE`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    /// The numeric bound. Infinite for `+inf`/`-inf` tokens.
    pub value: f64,
    /// Whether the bound excludes `value` itself.
    pub exclusive: bool,
}

impl ScoreBound {
    /// Parses a single score-range token, e.g. `"(5"`, `"-inf"`, `"3.14"`.
    pub fn parse(token: &str) -> Result<Self> {
        let (exclusive, rest) = match token.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, token),
        };
        let value = match rest {
            "+inf" | "inf" => f64::INFINITY,
            "-inf" => f64::NEG_INFINITY,
            other => other.parse::<f64>().map_err(|_| CoreError::InvalidRangeItem)?,
        };
        Ok(ScoreBound { value, exclusive })
    }

    /// True if `score` satisfies this bound acting as a lower bound.
    pub fn satisfied_as_min(&self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    /// True if `score` satisfies this bound acting as an upper bound.
    pub fn satisfied_as_max(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

/// A closed, half-open or fully unbounded score range, pre-validated so
/// that `min <= max` under score ordering (empty ranges are legal and
/// simply yield no matches).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: ScoreBound,
    pub max: ScoreBound,
}

impl ScoreRange {
    /// Parses a `(min, max)` token pair.
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        Ok(ScoreRange {
            min: ScoreBound::parse(min)?,
            max: ScoreBound::parse(max)?,
        })
    }

    /// True if `score` falls within `[min, max]` honoring exclusivity.
    pub fn contains(&self, score: f64) -> bool {
        self.min.satisfied_as_min(score) && self.max.satisfied_as_max(score)
    }
}

/// A parsed lex-range bound (`ZRANGEBYLEX`/`ZREVRANGEBYLEX`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexBound {
    /// `-`: unbounded on the low side.
    NegInfinity,
    /// `+`: unbounded on the high side.
    PosInfinity,
    /// A literal member bound, inclusive or exclusive.
    Literal { value: Vec<u8>, exclusive: bool },
}

impl LexBound {
    /// Parses a single lex-range token, e.g. `"[abc"`, `"(abc"`, `"-"`, `"+"`.
    pub fn parse(token: &[u8]) -> Result<Self> {
        match token {
            b"-" => Ok(LexBound::NegInfinity),
            b"+" => Ok(LexBound::PosInfinity),
            _ => {
                let (exclusive, rest): (bool, &[u8]) = match token.first() {
                    Some(b'[') => (false, &token[1..]),
                    Some(b'(') => (true, &token[1..]),
                    _ => return Err(CoreError::InvalidRangeItem),
                };
                Ok(LexBound::Literal {
                    value: rest.to_vec(),
                    exclusive,
                })
            }
        }
    }

    fn satisfied_as_min(&self, member: &[u8]) -> bool {
        match self {
            LexBound::NegInfinity => true,
            LexBound::PosInfinity => false,
            LexBound::Literal { value, exclusive } => match member.cmp(value.as_slice()) {
                Ordering::Greater => true,
                Ordering::Equal => !exclusive,
                Ordering::Less => false,
            },
        }
    }

    fn satisfied_as_max(&self, member: &[u8]) -> bool {
        match self {
            LexBound::NegInfinity => false,
            LexBound::PosInfinity => true,
            LexBound::Literal { value, exclusive } => match member.cmp(value.as_slice()) {
                Ordering::Less => true,
                Ordering::Equal => !exclusive,
                Ordering::Greater => false,
            },
        }
    }
}

/// A lexicographic range for members that all share the same score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexRange {
    pub min: LexBound,
    pub max: LexBound,
}

impl LexRange {
    /// Parses a `(min, max)` lex-range token pair.
    pub fn parse(min: &[u8], max: &[u8]) -> Result<Self> {
        Ok(LexRange {
            min: LexBound::parse(min)?,
            max: LexBound::parse(max)?,
        })
    }

    /// True if `member` falls within this range.
    pub fn contains(&self, member: &[u8]) -> bool {
        self.min.satisfied_as_min(member) && self.max.satisfied_as_max(member)
    }
}

/// `LIMIT offset count` clause shared by the range-by-score/lex commands.
/// `count` of `-1` means "no limit", matching the command's own convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeLimit {
    pub offset: usize,
    pub count: Option<usize>,
}

impl RangeLimit {
    /// No `LIMIT` clause was supplied: every matching member is returned.
    pub fn unbounded() -> Self {
        RangeLimit {
            offset: 0,
            count: None,
        }
    }
}

impl Default for RangeLimit {
    fn default() -> Self {
        Self::unbounded()
    }
}
