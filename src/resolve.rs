//! Implicit typing of scalars following the YAML 1.1 type repository.
//!
//! [`resolve`] turns a tag and a literal into a resolved tag and a typed value. Untagged
//! plain scalars are typed from their text; explicitly tagged ones are checked against the
//! tag.

use chrono::{DateTime, FixedOffset};

use crate::error::Error;
use crate::parse_scalars::{is_plain_float, parse_i64, parse_timestamp, parse_u64};
use crate::tags::{
    TAG_BINARY, TAG_BOOL, TAG_FLOAT, TAG_INT, TAG_MERGE, TAG_NULL, TAG_STR, TAG_TIMESTAMP,
    is_resolvable, short_tag,
};

/// A scalar after resolution.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolved<'a> {
    Null,
    Bool(bool),
    Int(i64),
    /// Integers above `i64::MAX`.
    Uint(u64),
    Float(f64),
    Timestamp(DateTime<FixedOffset>),
    /// Text, including the `<<` merge key and values of tags the resolver does not know.
    Str(&'a str),
}

impl Resolved<'_> {
    pub fn is_null(&self) -> bool {
        matches!(self, Resolved::Null)
    }
}

// Classes of the first byte of a literal.
const HINT_NONE: u8 = 0;
const HINT_SIGN: u8 = b'S';
const HINT_DIGIT: u8 = b'D';
const HINT_WORD: u8 = b'M';
const HINT_DOT: u8 = b'.';

static HINTS: [u8; 256] = {
    let mut table = [HINT_NONE; 256];
    table[b'+' as usize] = HINT_SIGN;
    table[b'-' as usize] = HINT_SIGN;
    let mut d = b'0';
    while d <= b'9' {
        table[d as usize] = HINT_DIGIT;
        d += 1;
    }
    let words = b"yYnNtTfFoO~<";
    let mut i = 0;
    while i < words.len() {
        table[words[i] as usize] = HINT_WORD;
        i += 1;
    }
    table[b'.' as usize] = HINT_DOT;
    table
};

/// Literals with a fixed meaning.
fn lookup_word(literal: &str) -> Option<(&'static str, Resolved<'static>)> {
    Some(match literal {
        "y" | "Y" | "yes" | "Yes" | "YES" | "true" | "True" | "TRUE" | "on" | "On" | "ON" => {
            (TAG_BOOL, Resolved::Bool(true))
        }
        "n" | "N" | "no" | "No" | "NO" | "false" | "False" | "FALSE" | "off" | "Off" | "OFF" => {
            (TAG_BOOL, Resolved::Bool(false))
        }
        "" | "~" | "null" | "Null" | "NULL" => (TAG_NULL, Resolved::Null),
        ".nan" | ".NaN" | ".NAN" => (TAG_FLOAT, Resolved::Float(f64::NAN)),
        ".inf" | ".Inf" | ".INF" | "+.inf" | "+.Inf" | "+.INF" => {
            (TAG_FLOAT, Resolved::Float(f64::INFINITY))
        }
        "-.inf" | "-.Inf" | "-.INF" => (TAG_FLOAT, Resolved::Float(f64::NEG_INFINITY)),
        "<<" => (TAG_MERGE, Resolved::Str("<<")),
        _ => return None,
    })
}

/// Resolve `literal` under `tag` (long form, empty when the node carries none).
///
/// Returns the resolved tag and value. Tags outside the resolvable set, `!!binary` among
/// them, come back unchanged with the literal as text. An int under `!!float` widens to a
/// float; any other disagreement between the tag and the literal is an error.
pub fn resolve<'a>(tag: &'a str, literal: &'a str) -> Result<(&'a str, Resolved<'a>), Error> {
    if !is_resolvable(tag) {
        return Ok((tag, Resolved::Str(literal)));
    }
    let (rtag, value) = resolve_literal(tag, literal);
    if tag.is_empty() || tag == rtag || tag == TAG_STR {
        return Ok((rtag, value));
    }
    if tag == TAG_FLOAT {
        match value {
            Resolved::Int(v) => return Ok((TAG_FLOAT, Resolved::Float(v as f64))),
            Resolved::Uint(v) => return Ok((TAG_FLOAT, Resolved::Float(v as f64))),
            _ => {}
        }
    }
    Err(Error::msg(format!(
        "cannot decode {} `{}` as a {}",
        short_tag(rtag),
        literal,
        short_tag(tag)
    )))
}

fn resolve_literal<'a>(tag: &str, literal: &'a str) -> (&'static str, Resolved<'a>) {
    let hint = match literal.as_bytes().first() {
        Some(&b) => HINTS[b as usize],
        None => HINT_WORD,
    };
    // Any text is accepted as a string.
    if hint == HINT_NONE || tag == TAG_STR || tag == TAG_BINARY {
        return (TAG_STR, Resolved::Str(literal));
    }
    if let Some(found) = lookup_word(literal) {
        return found;
    }
    match hint {
        HINT_DOT => {
            if let Ok(v) = literal.parse::<f64>() {
                return (TAG_FLOAT, Resolved::Float(v));
            }
        }
        HINT_DIGIT | HINT_SIGN => {
            // Quoted text never reaches here untagged, so only plain or !!timestamp values
            // are tried as dates.
            if (tag.is_empty() || tag == TAG_TIMESTAMP)
                && let Some(ts) = parse_timestamp(literal)
            {
                return (TAG_TIMESTAMP, Resolved::Timestamp(ts));
            }
            let plain = literal.replace('_', "");
            if let Some(v) = parse_i64(&plain) {
                return (TAG_INT, Resolved::Int(v));
            }
            if let Some(v) = parse_u64(&plain) {
                return (TAG_INT, Resolved::Uint(v));
            }
            if is_plain_float(&plain)
                && let Ok(v) = plain.parse::<f64>()
            {
                return (TAG_FLOAT, Resolved::Float(v));
            }
        }
        _ => {}
    }
    (TAG_STR, Resolved::Str(literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(literal: &str) -> Resolved<'_> {
        resolve("", literal).expect("untagged scalars always resolve").1
    }

    #[test]
    fn integers() {
        assert_eq!(plain("1000"), Resolved::Int(1000));
        assert_eq!(plain("1_000"), Resolved::Int(1000));
        assert_eq!(plain("-1"), Resolved::Int(-1));
        assert_eq!(plain("0x1F"), Resolved::Int(31));
        assert_eq!(plain("0o17"), Resolved::Int(15));
        assert_eq!(plain("017"), Resolved::Int(15));
        assert_eq!(plain("0b1010_0111_0100_1010_1110"), Resolved::Int(685230));
        assert_eq!(plain("-0b101"), Resolved::Int(-5));
        assert_eq!(plain("18446744073709551615"), Resolved::Uint(u64::MAX));
        assert_eq!(
            plain("-18446744073709551616"),
            Resolved::Float(-18446744073709551616.0)
        );
    }

    #[test]
    fn floats() {
        assert_eq!(plain("1.5"), Resolved::Float(1.5));
        assert_eq!(plain("685_230.15"), Resolved::Float(685230.15));
        assert_eq!(plain("6.8523015e+5"), Resolved::Float(685230.15));
        assert_eq!(plain(".5"), Resolved::Float(0.5));
        assert_eq!(plain("08"), Resolved::Float(8.0));
        assert_eq!(plain(".inf"), Resolved::Float(f64::INFINITY));
        assert_eq!(plain("-.Inf"), Resolved::Float(f64::NEG_INFINITY));
        assert!(matches!(plain(".NaN"), Resolved::Float(v) if v.is_nan()));
        assert_eq!(plain(".iNf"), Resolved::Str(".iNf"));
    }

    #[test]
    fn words() {
        for t in ["y", "Yes", "true", "ON"] {
            assert_eq!(plain(t), Resolved::Bool(true), "{t}");
        }
        for f in ["n", "NO", "False", "off"] {
            assert_eq!(plain(f), Resolved::Bool(false), "{f}");
        }
        for n in ["", "~", "null", "NULL"] {
            assert_eq!(plain(n), Resolved::Null, "{n:?}");
        }
        assert_eq!(plain("nULL"), Resolved::Str("nULL"));
        assert_eq!(resolve("", "<<").unwrap(), (TAG_MERGE, Resolved::Str("<<")));
    }

    #[test]
    fn timestamps_only_untagged_or_explicit() {
        assert!(matches!(plain("2001-12-14"), Resolved::Timestamp(_)));
        let (tag, value) = resolve(TAG_TIMESTAMP, "2001-12-14t21:59:43.10-05:00").unwrap();
        assert_eq!(tag, TAG_TIMESTAMP);
        assert!(matches!(value, Resolved::Timestamp(_)));
        assert_eq!(
            resolve(TAG_STR, "2001-12-14").unwrap(),
            (TAG_STR, Resolved::Str("2001-12-14"))
        );
        assert_eq!(plain("2001-12-14x"), Resolved::Str("2001-12-14x"));
    }

    #[test]
    fn text_stays_text() {
        assert_eq!(plain("hello"), Resolved::Str("hello"));
        assert_eq!(plain("+"), Resolved::Str("+"));
        assert_eq!(plain("1.2.3"), Resolved::Str("1.2.3"));
        assert_eq!(resolve(TAG_STR, "123").unwrap(), (TAG_STR, Resolved::Str("123")));
    }

    #[test]
    fn explicit_tags() {
        assert_eq!(resolve(TAG_FLOAT, "1").unwrap(), (TAG_FLOAT, Resolved::Float(1.0)));
        assert_eq!(resolve(TAG_INT, "12").unwrap(), (TAG_INT, Resolved::Int(12)));
        assert_eq!(resolve(TAG_NULL, "~").unwrap(), (TAG_NULL, Resolved::Null));

        let err = resolve(TAG_INT, "abc").unwrap_err();
        assert_eq!(err.to_string(), "cannot decode !!str `abc` as a !!int");
        let err = resolve(TAG_INT, "yes").unwrap_err();
        assert_eq!(err.to_string(), "cannot decode !!bool `yes` as a !!int");
        assert!(resolve(TAG_BOOL, "1").is_err());
    }

    #[test]
    fn unknown_tags_pass_through() {
        assert_eq!(
            resolve(TAG_BINARY, "aGVsbG8=").unwrap(),
            (TAG_BINARY, Resolved::Str("aGVsbG8="))
        );
        assert_eq!(resolve("!custom", "12").unwrap(), ("!custom", Resolved::Str("12")));
    }
}
