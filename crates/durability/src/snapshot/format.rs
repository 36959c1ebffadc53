//! Binary primitives for the snapshot format (§4.6): the two-high-bit
//! length prefix, the encoded-value sub-types (small integers and LZF
//! strings), opcode/type-tag bytes, and the flat packers used for the
//! "single encoded byte-string" a compact-encoded value is written as.

use super::lzf;
use crate::error::{DurabilityError, Result};
use std::collections::VecDeque;

/// `SELECT_DB` record opcode.
pub const OPCODE_SELECTDB: u8 = 0xFE;
/// `EXPIRETIME_MS` record opcode.
pub const OPCODE_EXPIRETIME_MS: u8 = 0xFC;
/// Footer opcode, followed by the CRC-64 digest.
pub const OPCODE_EOF: u8 = 0xFF;

/// String, general and compact encoding.
pub const TYPE_STRING: u8 = 0;
/// Doubly linked list general encoding.
pub const TYPE_LIST_GENERAL: u8 = 1;
/// Hash-table set general encoding.
pub const TYPE_SET_GENERAL: u8 = 2;
/// Skip-list zset general encoding.
pub const TYPE_ZSET_GENERAL: u8 = 3;
/// Hash-table hash general encoding.
pub const TYPE_HASH_GENERAL: u8 = 4;
/// Packed contiguous list compact encoding.
pub const TYPE_LIST_COMPACT: u8 = 10;
/// Sorted integer array set compact encoding.
pub const TYPE_SET_COMPACT: u8 = 11;
/// Packed contiguous hash compact encoding.
pub const TYPE_HASH_COMPACT: u8 = 12;
/// Packed contiguous zset compact encoding.
pub const TYPE_ZSET_COMPACT: u8 = 13;
/// Legacy zipmap hash tag — read as [`TYPE_HASH_COMPACT`], never written.
pub const TYPE_HASH_ZIPMAP_LEGACY: u8 = 9;

const ENC_INT8: u8 = 0;
const ENC_INT16: u8 = 1;
const ENC_INT32: u8 = 2;
const ENC_LZF: u8 = 3;

/// Sentinel score bytes for non-finite zset scores.
const SCORE_NAN: u8 = 253;
const SCORE_POS_INF: u8 = 254;
const SCORE_NEG_INF: u8 = 255;

/// Result of decoding a length-prefix byte (or byte sequence).
pub enum LenPrefix {
    /// A plain length.
    Len(u64),
    /// An encoded-value marker; the low 6 bits select the sub-type.
    Encoded(u8),
}

/// Writes `len` using the 6-/14-/32-bit length prefix scheme.
pub fn write_len(out: &mut Vec<u8>, len: u64) {
    if len < 64 {
        out.push(len as u8);
    } else if len < 16384 {
        out.push(0x40 | ((len >> 8) as u8));
        out.push((len & 0xFF) as u8);
    } else {
        out.push(0x80);
        out.extend_from_slice(&(len as u32).to_be_bytes());
    }
}

/// Reads a length prefix starting at `*pos`, advancing it past the bytes
/// consumed.
pub fn read_len(data: &[u8], pos: &mut usize) -> Result<LenPrefix> {
    let b0 = *data
        .get(*pos)
        .ok_or(DurabilityError::Truncated("length prefix"))?;
    *pos += 1;
    match b0 >> 6 {
        0b00 => Ok(LenPrefix::Len((b0 & 0x3F) as u64)),
        0b01 => {
            let b1 = *data
                .get(*pos)
                .ok_or(DurabilityError::Truncated("14-bit length"))?;
            *pos += 1;
            Ok(LenPrefix::Len((((b0 & 0x3F) as u64) << 8) | b1 as u64))
        }
        0b10 => {
            let bytes = data
                .get(*pos..*pos + 4)
                .ok_or(DurabilityError::Truncated("32-bit length"))?;
            *pos += 4;
            Ok(LenPrefix::Len(u32::from_be_bytes(bytes.try_into().unwrap()) as u64))
        }
        _ => Ok(LenPrefix::Encoded(b0 & 0x3F)),
    }
}

/// Writes a byte-string using the most compact applicable form: an
/// integer-encoded marker if it round-trips through decimal as an 8/16/32
/// bit integer, an LZF-compressed marker if `compress` is set and the
/// input is both long enough and actually shrinks, or a plain
/// length-prefixed raw string otherwise.
pub fn write_string(out: &mut Vec<u8>, bytes: &[u8], compress: bool) {
    if let Ok(s) = std::str::from_utf8(bytes) {
        if let Ok(n) = s.parse::<i64>() {
            if n.to_string() == s {
                if (i8::MIN as i64..=i8::MAX as i64).contains(&n) {
                    out.push(0xC0 | ENC_INT8);
                    out.push(n as i8 as u8);
                    return;
                } else if (i16::MIN as i64..=i16::MAX as i64).contains(&n) {
                    out.push(0xC0 | ENC_INT16);
                    out.extend_from_slice(&(n as i16).to_le_bytes());
                    return;
                } else if (i32::MIN as i64..=i32::MAX as i64).contains(&n) {
                    out.push(0xC0 | ENC_INT32);
                    out.extend_from_slice(&(n as i32).to_le_bytes());
                    return;
                }
            }
        }
    }
    if compress && bytes.len() > 20 {
        if let Some(compressed) = lzf::compress(bytes) {
            out.push(0xC0 | ENC_LZF);
            write_len(out, compressed.len() as u64);
            write_len(out, bytes.len() as u64);
            out.extend_from_slice(&compressed);
            return;
        }
    }
    write_len(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

/// Reads one encoded byte-string, decompressing or decoding an integer
/// marker as needed.
pub fn read_string(data: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    match read_len(data, pos)? {
        LenPrefix::Len(len) => {
            let len = len as usize;
            let bytes = data
                .get(*pos..*pos + len)
                .ok_or(DurabilityError::BadLength)?;
            *pos += len;
            Ok(bytes.to_vec())
        }
        LenPrefix::Encoded(sub) => match sub {
            ENC_INT8 => {
                let b = *data.get(*pos).ok_or(DurabilityError::Truncated("int8"))? as i8;
                *pos += 1;
                Ok((b as i64).to_string().into_bytes())
            }
            ENC_INT16 => {
                let bytes = data
                    .get(*pos..*pos + 2)
                    .ok_or(DurabilityError::Truncated("int16"))?;
                *pos += 2;
                let v = i16::from_le_bytes(bytes.try_into().unwrap());
                Ok((v as i64).to_string().into_bytes())
            }
            ENC_INT32 => {
                let bytes = data
                    .get(*pos..*pos + 4)
                    .ok_or(DurabilityError::Truncated("int32"))?;
                *pos += 4;
                let v = i32::from_le_bytes(bytes.try_into().unwrap());
                Ok((v as i64).to_string().into_bytes())
            }
            ENC_LZF => {
                let complen = match read_len(data, pos)? {
                    LenPrefix::Len(l) => l as usize,
                    LenPrefix::Encoded(_) => return Err(DurabilityError::BadLength),
                };
                let uncomplen = match read_len(data, pos)? {
                    LenPrefix::Len(l) => l as usize,
                    LenPrefix::Encoded(_) => return Err(DurabilityError::BadLength),
                };
                let compressed = data
                    .get(*pos..*pos + complen)
                    .ok_or(DurabilityError::BadLength)?;
                *pos += complen;
                lzf::decompress(compressed, uncomplen).ok_or(DurabilityError::BadCompression)
            }
            other => Err(DurabilityError::UnknownTypeTag(0xC0 | other)),
        },
    }
}

/// Writes a zset score as length-prefixed decimal text, or a sentinel
/// byte for NaN/+inf/-inf.
pub fn write_score(out: &mut Vec<u8>, score: f64) {
    if score.is_nan() {
        out.push(SCORE_NAN);
    } else if score == f64::INFINITY {
        out.push(SCORE_POS_INF);
    } else if score == f64::NEG_INFINITY {
        out.push(SCORE_NEG_INF);
    } else {
        let text = score.to_string();
        write_len(out, text.len() as u64);
        out.extend_from_slice(text.as_bytes());
    }
}

/// Reads a zset score written by [`write_score`].
pub fn read_score(data: &[u8], pos: &mut usize) -> Result<f64> {
    match data.get(*pos) {
        Some(&SCORE_NAN) => {
            *pos += 1;
            Ok(f64::NAN)
        }
        Some(&SCORE_POS_INF) => {
            *pos += 1;
            Ok(f64::INFINITY)
        }
        Some(&SCORE_NEG_INF) => {
            *pos += 1;
            Ok(f64::NEG_INFINITY)
        }
        _ => {
            let len = match read_len(data, pos)? {
                LenPrefix::Len(l) => l as usize,
                LenPrefix::Encoded(_) => return Err(DurabilityError::BadLength),
            };
            let bytes = data
                .get(*pos..*pos + len)
                .ok_or(DurabilityError::BadLength)?;
            *pos += len;
            let text =
                std::str::from_utf8(bytes).map_err(|_| DurabilityError::BadLength)?;
            text.parse::<f64>().map_err(|_| DurabilityError::BadLength)
        }
    }
}

/// Packs a compact-encoded list into its raw backing buffer: an element
/// count followed by length-prefixed elements.
pub fn pack_list_compact(entries: &VecDeque<Vec<u8>>) -> Vec<u8> {
    let mut buf = Vec::new();
    write_len(&mut buf, entries.len() as u64);
    for e in entries {
        write_len(&mut buf, e.len() as u64);
        buf.extend_from_slice(e);
    }
    buf
}

/// Inverse of [`pack_list_compact`].
pub fn unpack_list_compact(buf: &[u8]) -> Result<VecDeque<Vec<u8>>> {
    let mut pos = 0;
    let count = expect_len(buf, &mut pos)?;
    let mut out = VecDeque::with_capacity(count as usize);
    for _ in 0..count {
        out.push_back(read_raw(buf, &mut pos)?);
    }
    Ok(out)
}

/// Packs a compact-encoded hash (adjacent field/value pairs).
pub fn pack_hash_compact(entries: &[(Vec<u8>, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_len(&mut buf, entries.len() as u64);
    for (f, v) in entries {
        write_len(&mut buf, f.len() as u64);
        buf.extend_from_slice(f);
        write_len(&mut buf, v.len() as u64);
        buf.extend_from_slice(v);
    }
    buf
}

/// Inverse of [`pack_hash_compact`].
pub fn unpack_hash_compact(buf: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
    let mut pos = 0;
    let count = expect_len(buf, &mut pos)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let f = read_raw(buf, &mut pos)?;
        let v = read_raw(buf, &mut pos)?;
        out.push((f, v));
    }
    Ok(out)
}

/// Packs a compact-encoded zset (adjacent member/score pairs), reusing the
/// same decimal-text score format as the general encoding.
pub fn pack_zset_compact(entries: &[(Vec<u8>, f64)]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_len(&mut buf, entries.len() as u64);
    for (m, s) in entries {
        write_len(&mut buf, m.len() as u64);
        buf.extend_from_slice(m);
        write_score(&mut buf, *s);
    }
    buf
}

/// Inverse of [`pack_zset_compact`].
pub fn unpack_zset_compact(buf: &[u8]) -> Result<Vec<(Vec<u8>, f64)>> {
    let mut pos = 0;
    let count = expect_len(buf, &mut pos)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let m = read_raw(buf, &mut pos)?;
        let s = read_score(buf, &mut pos)?;
        out.push((m, s));
    }
    Ok(out)
}

/// Packs a compact intset: a count followed by raw little-endian `i64`s in
/// sorted order. The concrete integer width reported by `OBJECT ENCODING`
/// is recomputed on load from the values rather than stored.
pub fn pack_set_compact(ints: &[i64]) -> Vec<u8> {
    let mut buf = Vec::new();
    write_len(&mut buf, ints.len() as u64);
    for v in ints {
        buf.extend_from_slice(&v.to_le_bytes());
    }
    buf
}

/// Inverse of [`pack_set_compact`].
pub fn unpack_set_compact(buf: &[u8]) -> Result<Vec<i64>> {
    let mut pos = 0;
    let count = expect_len(buf, &mut pos)?;
    let mut out = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let bytes = buf
            .get(pos..pos + 8)
            .ok_or(DurabilityError::Truncated("intset element"))?;
        out.push(i64::from_le_bytes(bytes.try_into().unwrap()));
        pos += 8;
    }
    Ok(out)
}

fn expect_len(buf: &[u8], pos: &mut usize) -> Result<u64> {
    match read_len(buf, pos)? {
        LenPrefix::Len(l) => Ok(l),
        LenPrefix::Encoded(_) => Err(DurabilityError::BadLength),
    }
}

fn read_raw(buf: &[u8], pos: &mut usize) -> Result<Vec<u8>> {
    let len = expect_len(buf, pos)? as usize;
    let bytes = buf.get(*pos..*pos + len).ok_or(DurabilityError::BadLength)?;
    *pos += len;
    Ok(bytes.to_vec())
}
