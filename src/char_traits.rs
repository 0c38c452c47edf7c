//! Holds functions to determine if the character at a buffer position belongs to a specific
//! character set.
//!
//! The scanner works on the normalized UTF-8 buffer produced by the reader, so every predicate
//! takes the buffer and a byte position. Positions past the end read as NUL, the same value the
//! reader appends as end-of-input sentinel.

/// Byte at `i`, or NUL past the end of the buffer.
///
/// The reader guarantees whole characters, counted in characters, while predicates look at
/// byte offsets. At the end of input the ensured window ends in NUL sentinels, which is where
/// the scanner sees `is_z`. A byte offset past the ensured window carries no meaning for the
/// scanner; it reads as NUL here instead of panicking.
#[inline]
pub(crate) fn at(buf: &[u8], i: usize) -> u8 {
    buf.get(i).copied().unwrap_or(0)
}

/// Check whether the character is nil (`\0`).
#[inline]
pub(crate) fn is_z(buf: &[u8], i: usize) -> bool {
    at(buf, i) == 0
}

/// Check whether the character is a line break: `\r`, `\n`, NEL, LS or PS.
#[inline]
pub(crate) fn is_break(buf: &[u8], i: usize) -> bool {
    match at(buf, i) {
        b'\r' | b'\n' => true,
        0xC2 => at(buf, i + 1) == 0x85,
        0xE2 => at(buf, i + 1) == 0x80 && matches!(at(buf, i + 2), 0xA8 | 0xA9),
        _ => false,
    }
}

/// Check whether the characters at `i` are `\r\n`.
#[inline]
pub(crate) fn is_crlf(buf: &[u8], i: usize) -> bool {
    at(buf, i) == b'\r' && at(buf, i + 1) == b'\n'
}

/// Check whether the character is nil or a line break.
#[inline]
pub(crate) fn is_breakz(buf: &[u8], i: usize) -> bool {
    is_break(buf, i) || is_z(buf, i)
}

/// Check whether the character is a space.
#[inline]
pub(crate) fn is_space(buf: &[u8], i: usize) -> bool {
    at(buf, i) == b' '
}

/// Check whether the character is a tab.
#[inline]
pub(crate) fn is_tab(buf: &[u8], i: usize) -> bool {
    at(buf, i) == b'\t'
}

/// Check whether the character is a whitespace (` ` or `\t`).
#[inline]
pub(crate) fn is_blank(buf: &[u8], i: usize) -> bool {
    matches!(at(buf, i), b' ' | b'\t')
}

/// Check whether the character is nil, a line break or a whitespace.
#[inline]
pub(crate) fn is_blankz(buf: &[u8], i: usize) -> bool {
    is_blank(buf, i) || is_breakz(buf, i)
}

/// Check whether the character is a digit, letter, `_` or `-`.
#[inline]
pub(crate) fn is_alpha(buf: &[u8], i: usize) -> bool {
    matches!(at(buf, i), b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'_' | b'-')
}

/// Check whether the character is an ascii digit.
#[inline]
pub(crate) fn is_digit(buf: &[u8], i: usize) -> bool {
    at(buf, i).is_ascii_digit()
}

/// Value of the decimal digit at `i`.
#[inline]
pub(crate) fn as_digit(buf: &[u8], i: usize) -> u32 {
    u32::from(at(buf, i).wrapping_sub(b'0'))
}

/// Check whether the character is a hexadecimal digit (case insensitive).
#[inline]
pub(crate) fn is_hex(buf: &[u8], i: usize) -> bool {
    at(buf, i).is_ascii_hexdigit()
}

/// Value of the hexadecimal digit at `i`; zero for anything else.
#[inline]
pub(crate) fn as_hex(buf: &[u8], i: usize) -> u32 {
    match at(buf, i) {
        c @ b'0'..=b'9' => u32::from(c - b'0'),
        c @ b'a'..=b'f' => u32::from(c - b'a') + 10,
        c @ b'A'..=b'F' => u32::from(c - b'A') + 10,
        _ => 0,
    }
}

/// Check whether the characters at `i` form a UTF-8 byte order mark.
#[inline]
pub(crate) fn is_bom(buf: &[u8], i: usize) -> bool {
    at(buf, i) == 0xEF && at(buf, i + 1) == 0xBB && at(buf, i + 2) == 0xBF
}

/// Check whether the character may appear in a tag URI.
#[inline]
pub(crate) fn is_uri_char(buf: &[u8], i: usize) -> bool {
    is_alpha(buf, i)
        || matches!(
            at(buf, i),
            b';' | b'/'
                | b'?'
                | b':'
                | b'@'
                | b'&'
                | b'='
                | b'+'
                | b'$'
                | b','
                | b'.'
                | b'!'
                | b'~'
                | b'*'
                | b'\''
                | b'('
                | b')'
                | b'['
                | b']'
                | b'%'
        )
}

/// Check whether the character may terminate an anchor or alias name.
#[inline]
pub(crate) fn ends_anchor(buf: &[u8], i: usize) -> bool {
    is_blankz(buf, i)
        || matches!(
            at(buf, i),
            b'?' | b':' | b',' | b']' | b'}' | b'%' | b'@' | b'`'
        )
}

/// Number of bytes of the UTF-8 sequence starting with `lead`.
#[inline]
pub(crate) fn width(lead: u8) -> usize {
    if lead & 0x80 == 0x00 {
        1
    } else if lead & 0xE0 == 0xC0 {
        2
    } else if lead & 0xF0 == 0xE0 {
        3
    } else if lead & 0xF8 == 0xF0 {
        4
    } else {
        // Continuation bytes never start a character in a validated buffer; advance anyway.
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unicode_line_breaks_are_breaks() {
        let nel = "a\u{0085}".as_bytes();
        let ls = "\u{2028}".as_bytes();
        let ps = "\u{2029}".as_bytes();
        assert!(is_break(nel, 1));
        assert!(is_break(ls, 0));
        assert!(is_break(ps, 0));
        assert!(!is_break("\u{00A0}".as_bytes(), 0));
        assert!(is_crlf(b"\r\n", 0));
    }

    #[test]
    fn past_the_end_reads_as_nul() {
        let buf = b"ab";
        assert!(is_z(buf, 2));
        assert!(is_blankz(buf, 7));
        assert!(!is_alpha(buf, 3));
    }

    #[test]
    fn widths_follow_utf8_lead_bytes() {
        assert_eq!(width(b'a'), 1);
        assert_eq!(width("é".as_bytes()[0]), 2);
        assert_eq!(width("€".as_bytes()[0]), 3);
        assert_eq!(width("😀".as_bytes()[0]), 4);
        assert_eq!(as_hex(b"F", 0), 15);
        assert_eq!(as_digit(b"7", 0), 7);
    }
}
