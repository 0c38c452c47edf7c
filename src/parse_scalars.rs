//! YAML 1.1 scalar syntax: integers in every base, floats, timestamps and `!!binary` data.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use regex::Regex;

/// Floats written the plain way. Special values go through the word table instead.
static PLAIN_FLOAT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(\.[0-9]+|[0-9]+(\.[0-9]*)?)([eE][-+]?[0-9]+)?$").ok()
});

fn parse_digits_u128(digits: &str, radix: u32) -> Option<u128> {
    let mut val: u128 = 0;
    let mut saw = false;
    for b in digits.as_bytes() {
        let d = match *b {
            b'0'..=b'9' => (b - b'0') as u32,
            b'a'..=b'f' => 10 + (b - b'a') as u32,
            b'A'..=b'F' => 10 + (b - b'A') as u32,
            _ => return None,
        };
        if d >= radix {
            return None;
        }
        val = val.checked_mul(radix as u128)?;
        val = val.checked_add(d as u128)?;
        saw = true;
    }
    if saw { Some(val) } else { None }
}

/// Split the base prefix off: `0x` hex, `0o` or a bare leading `0` octal, `0b` binary.
fn split_radix(digits: &str) -> (u32, &str) {
    if let Some(r) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, r)
    } else if let Some(r) = digits.strip_prefix("0o").or_else(|| digits.strip_prefix("0O")) {
        (8, r)
    } else if let Some(r) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        (2, r)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    }
}

/// Parse a signed integer literal in any base. Underscores must already be stripped.
///
/// The width is decided by the magnitude: a literal that fits `i64` is an `i64` whatever its
/// base, so `-0b101` is `-5`.
pub(crate) fn parse_i64(plain: &str) -> Option<i64> {
    let (neg, rest) = match plain.strip_prefix('+') {
        Some(r) => (false, r),
        None => match plain.strip_prefix('-') {
            Some(r) => (true, r),
            None => (false, plain),
        },
    };
    let (radix, digits) = split_radix(rest);
    let mag = i128::try_from(parse_digits_u128(digits, radix)?).ok()?;
    let val = if neg { mag.checked_neg()? } else { mag };
    i64::try_from(val).ok()
}

/// Parse an unsigned integer literal in any base; signs are not accepted.
pub(crate) fn parse_u64(plain: &str) -> Option<u64> {
    let (radix, digits) = split_radix(plain);
    u64::try_from(parse_digits_u128(digits, radix)?).ok()
}

/// Whether the literal looks like a plain decimal float.
pub(crate) fn is_plain_float(plain: &str) -> bool {
    PLAIN_FLOAT.as_ref().is_some_and(|re| re.is_match(plain))
}

/// Parse a timestamp in one of the accepted layouts:
///
/// * `YYYY-M-D`
/// * `YYYY-M-DTh:m:s[.fraction][Z|±hh[:mm]]`, also with a lowercase `t`
/// * `YYYY-M-D h:m:s[.fraction]`, taken as UTC
///
/// Month, day, hour, minute and second take one or two digits; the fraction up to nine.
pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    // Every layout starts with exactly four year digits and a dash.
    let bytes = s.as_bytes();
    let year_len = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
    if year_len != 4 || bytes.get(4) != Some(&b'-') {
        return None;
    }

    let mut cursor = Cursor { s: bytes, pos: 0 };
    let year = cursor.number(4, 4)? as i32;
    cursor.expect(b'-')?;
    let month = cursor.number(1, 2)?;
    cursor.expect(b'-')?;
    let day = cursor.number(1, 2)?;
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let utc = FixedOffset::east_opt(0)?;

    let separator = match cursor.peek() {
        None => return utc.from_local_datetime(&date.and_time(NaiveTime::MIN)).single(),
        Some(c @ (b'T' | b't' | b' ')) => c,
        Some(_) => return None,
    };
    cursor.pos += 1;

    let hour = cursor.number(1, 2)?;
    cursor.expect(b':')?;
    let minute = cursor.number(1, 2)?;
    cursor.expect(b':')?;
    let second = cursor.number(1, 2)?;
    let mut nanos = 0;
    if cursor.peek() == Some(b'.') {
        cursor.pos += 1;
        let start = cursor.pos;
        let fraction = cursor.number(1, 9)?;
        let digits = cursor.pos - start;
        nanos = fraction * 10u32.pow(9 - digits as u32);
    }
    let time = NaiveTime::from_hms_nano_opt(hour, minute, second, nanos)?;

    let offset = if separator == b' ' {
        utc
    } else {
        match cursor.peek() {
            None => utc,
            Some(b'Z') => {
                cursor.pos += 1;
                utc
            }
            Some(sign @ (b'+' | b'-')) => {
                cursor.pos += 1;
                let hours = cursor.number(2, 2)? as i32;
                let minutes = if cursor.peek() == Some(b':') {
                    cursor.pos += 1;
                    cursor.number(2, 2)? as i32
                } else {
                    0
                };
                let seconds = hours * 3600 + minutes * 60;
                FixedOffset::east_opt(if sign == b'-' { -seconds } else { seconds })?
            }
            Some(_) => return None,
        }
    };
    if cursor.peek().is_some() {
        return None;
    }
    offset.from_local_datetime(&date.and_time(time)).single()
}

struct Cursor<'a> {
    s: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn peek(&self) -> Option<u8> {
        self.s.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> Option<()> {
        (self.peek()? == c).then(|| self.pos += 1)
    }

    /// Read between `min` and `max` decimal digits.
    fn number(&mut self, min: usize, max: usize) -> Option<u32> {
        let start = self.pos;
        let mut value = 0u32;
        while self.pos - start < max {
            match self.peek() {
                Some(c @ b'0'..=b'9') => {
                    value = value * 10 + u32::from(c - b'0');
                    self.pos += 1;
                }
                _ => break,
            }
        }
        (self.pos - start >= min).then_some(value)
    }
}

/// Decode `!!binary` content: standard base64, line breaks ignored.
pub(crate) fn decode_binary(text: &str) -> Option<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect();
    STANDARD.decode(compact.as_bytes()).ok()
}
