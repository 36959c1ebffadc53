//! The inline text protocol records are written in
//! (`*<argc>\r\n$<len>\r\n<bytes>\r\n …`), and the canonicalizing rewrites
//! applied before a command reaches the log (§4.7).

use crate::error::{DurabilityError, Result};

/// Encodes one command as an array of bulk strings.
pub fn encode(args: &[Vec<u8>]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        out.extend_from_slice(arg);
        out.extend_from_slice(b"\r\n");
    }
    out
}

/// Decodes one command starting at `*pos`, advancing it past the record.
/// Returns `Ok(None)` if `data` ends exactly at `*pos` (clean EOF); any
/// other short read is [`DurabilityError::MalformedRecord`] so a genuinely
/// truncated tail can be told apart from end-of-file by the caller.
pub fn decode(data: &[u8], pos: &mut usize) -> Result<Option<Vec<Vec<u8>>>> {
    if *pos >= data.len() {
        return Ok(None);
    }
    let line_end = find_crlf(data, *pos)?;
    if data[*pos] != b'*' {
        return Err(DurabilityError::MalformedRecord(format!(
            "expected '*', found {:?}",
            data[*pos] as char
        )));
    }
    let argc: usize = parse_ascii_usize(&data[*pos + 1..line_end])?;
    *pos = line_end + 2;

    let mut args = Vec::with_capacity(argc);
    for _ in 0..argc {
        let len_line_end = find_crlf(data, *pos)?;
        if data[*pos] != b'$' {
            return Err(DurabilityError::MalformedRecord(format!(
                "expected '$', found {:?}",
                data[*pos] as char
            )));
        }
        let len: usize = parse_ascii_usize(&data[*pos + 1..len_line_end])?;
        let body_start = len_line_end + 2;
        let body_end = body_start
            .checked_add(len)
            .ok_or_else(|| DurabilityError::MalformedRecord("bulk length overflow".into()))?;
        let bytes = data
            .get(body_start..body_end)
            .ok_or(DurabilityError::Truncated("bulk string body"))?;
        if data.get(body_end..body_end + 2) != Some(b"\r\n") {
            return Err(DurabilityError::Truncated("bulk string trailer"));
        }
        args.push(bytes.to_vec());
        *pos = body_end + 2;
    }
    Ok(Some(args))
}

fn find_crlf(data: &[u8], start: usize) -> Result<usize> {
    let rest = data.get(start..).ok_or(DurabilityError::Truncated("record line"))?;
    let offset = rest
        .windows(2)
        .position(|w| w == b"\r\n")
        .ok_or(DurabilityError::Truncated("record line"))?;
    Ok(start + offset)
}

fn parse_ascii_usize(bytes: &[u8]) -> Result<usize> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| DurabilityError::MalformedRecord("non-numeric length".into()))
}

fn to_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}

/// Rewrites `args` into its canonical, replay-deterministic form(s)
/// (§4.7): `EXPIRE`/`PEXPIRE`/`EXPIREAT` become a single `PEXPIREAT`;
/// `SETEX`/`PSETEX` become a `SET` followed by a `PEXPIREAT`. Anything
/// else is returned unchanged as the sole element.
pub fn rewrite_for_log(args: &[Vec<u8>], now_ms: i64) -> Vec<Vec<Vec<u8>>> {
    let Some(cmd) = args.first() else {
        return vec![args.to_vec()];
    };
    let upper = cmd.to_ascii_uppercase();

    match upper.as_slice() {
        b"EXPIRE" | b"PEXPIRE" | b"EXPIREAT" if args.len() == 3 => {
            let Some(n) = to_i64(&args[2]) else {
                return vec![args.to_vec()];
            };
            let abs_ms = match upper.as_slice() {
                b"EXPIRE" => now_ms + n * 1000,
                b"PEXPIRE" => now_ms + n,
                b"EXPIREAT" => n * 1000,
                _ => unreachable!(),
            };
            vec![vec![
                b"PEXPIREAT".to_vec(),
                args[1].clone(),
                abs_ms.to_string().into_bytes(),
            ]]
        }
        b"SETEX" | b"PSETEX" if args.len() == 4 => {
            let Some(n) = to_i64(&args[2]) else {
                return vec![args.to_vec()];
            };
            let abs_ms = if upper == b"SETEX" {
                now_ms + n * 1000
            } else {
                now_ms + n
            };
            vec![
                vec![b"SET".to_vec(), args[1].clone(), args[3].clone()],
                vec![
                    b"PEXPIREAT".to_vec(),
                    args[1].clone(),
                    abs_ms.to_string().into_bytes(),
                ],
            ]
        }
        _ => vec![args.to_vec()],
    }
}

/// Builds a `SELECT <db>` record.
pub fn select_record(db: usize) -> Vec<Vec<u8>> {
    vec![b"SELECT".to_vec(), db.to_string().into_bytes()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_round_trip() {
        let args = vec![b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()];
        let encoded = encode(&args);
        let mut pos = 0;
        let decoded = decode(&encoded, &mut pos).unwrap().unwrap();
        assert_eq!(decoded, args);
        assert_eq!(pos, encoded.len());
    }

    #[test]
    fn decode_at_exact_eof_is_none() {
        let mut pos = 0;
        assert!(decode(&[], &mut pos).unwrap().is_none());
    }

    #[test]
    fn decode_reports_truncated_tail() {
        let full = encode(&[b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
        let truncated = &full[..full.len() - 3];
        let mut pos = 0;
        assert!(decode(truncated, &mut pos).is_err());
    }

    #[test]
    fn expire_rewrites_to_pexpireat() {
        let args = vec![b"EXPIRE".to_vec(), b"k".to_vec(), b"10".to_vec()];
        let rewritten = rewrite_for_log(&args, 1_000);
        assert_eq!(rewritten.len(), 1);
        assert_eq!(rewritten[0][0], b"PEXPIREAT");
        assert_eq!(rewritten[0][2], b"11000");
    }

    #[test]
    fn expireat_treats_argument_as_absolute_seconds() {
        let args = vec![b"EXPIREAT".to_vec(), b"k".to_vec(), b"5".to_vec()];
        let rewritten = rewrite_for_log(&args, 999_999);
        assert_eq!(rewritten[0][2], b"5000");
    }

    #[test]
    fn setex_rewrites_to_set_plus_pexpireat() {
        let args = vec![b"SETEX".to_vec(), b"k".to_vec(), b"10".to_vec(), b"v".to_vec()];
        let rewritten = rewrite_for_log(&args, 2_000);
        assert_eq!(rewritten.len(), 2);
        assert_eq!(rewritten[0], vec![b"SET".to_vec(), b"k".to_vec(), b"v".to_vec()]);
        assert_eq!(rewritten[1][0], b"PEXPIREAT");
        assert_eq!(rewritten[1][2], b"12000");
    }

    #[test]
    fn other_commands_pass_through_verbatim() {
        let args = vec![b"LPUSH".to_vec(), b"k".to_vec(), b"v".to_vec()];
        assert_eq!(rewrite_for_log(&args, 0), vec![args]);
    }
}
