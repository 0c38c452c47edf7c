//! Byte reader: sniffs the input encoding and decodes raw bytes on demand into the normalized
//! UTF-8 working buffer the scanner looks ahead into.
//!
//! The scanner asks for a number of characters with [`Reader::ensure`]; the reader decodes just
//! enough raw input to satisfy the request. Once the input is exhausted NUL sentinels are
//! appended, so lookahead never runs past the end of the buffer.

use std::io::{self, Read};

use crate::error::{Error, ReaderError};

/// How much raw input to pull from a `Read` source at a time.
const RAW_CHUNK: usize = 16 * 1024;

/// Consumed prefix length after which the working buffer gets compacted.
const COMPACT_THRESHOLD: usize = 16 * 1024;

/// Input encodings recognized by their byte order mark.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// UTF-8, with or without BOM.
    Utf8,
    /// UTF-16 little endian, `FF FE` BOM.
    Utf16Le,
    /// UTF-16 big endian, `FE FF` BOM.
    Utf16Be,
}

enum Source<'a> {
    Slice(&'a [u8]),
    Read {
        inner: Box<dyn Read + 'a>,
        raw: Vec<u8>,
    },
}

pub(crate) struct Reader<'a> {
    source: Source<'a>,
    /// Decode position: index into the slice, or into the `Read` source's raw buffer.
    raw_pos: usize,
    /// Offset of the next raw byte to decode, counted from the start of the input.
    offset: usize,
    /// Total raw bytes pulled from the source so far.
    pulled: usize,
    /// The source has no more bytes.
    eof: bool,
    encoding: Option<Encoding>,
    max_bytes: Option<usize>,
    /// Decoded characters; `buffer[pos..]` has not been consumed yet.
    pub(crate) buffer: Vec<u8>,
    pub(crate) pos: usize,
    /// Number of decoded, unconsumed characters in `buffer[pos..]`, sentinels included.
    pub(crate) unread: usize,
}

impl<'a> Reader<'a> {
    /// Reader over a complete in-memory input.
    pub(crate) fn from_slice(input: &'a [u8]) -> Self {
        Self::new(Source::Slice(input), true)
    }

    /// Reader pulling input from `inner` as the scanner needs it.
    pub(crate) fn from_read<R: Read + 'a>(inner: R) -> Self {
        Self::new(
            Source::Read {
                inner: Box::new(inner),
                raw: Vec::with_capacity(RAW_CHUNK),
            },
            false,
        )
    }

    fn new(source: Source<'a>, eof: bool) -> Self {
        let pulled = match &source {
            Source::Slice(input) => input.len(),
            Source::Read { .. } => 0,
        };
        Self {
            source,
            raw_pos: 0,
            offset: 0,
            pulled,
            eof,
            encoding: None,
            max_bytes: None,
            buffer: Vec::new(),
            pos: 0,
            unread: 0,
        }
    }

    /// Cap the number of raw input bytes this reader accepts.
    pub(crate) fn with_max_bytes(mut self, max_bytes: Option<usize>) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// The detected encoding; `None` until the first character was requested.
    pub(crate) fn encoding(&self) -> Option<Encoding> {
        self.encoding
    }

    /// Make sure at least `length` characters are decoded and unconsumed.
    pub(crate) fn ensure(&mut self, length: usize) -> Result<(), Error> {
        if self.unread >= length {
            return Ok(());
        }
        if self.encoding.is_none() {
            self.check_size()?;
            self.determine_encoding()?;
        }
        if self.pos > COMPACT_THRESHOLD && self.pos * 2 > self.buffer.len() {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
        while self.unread < length {
            self.fill_raw(4)?;
            if self.raw().is_empty() {
                // End of input: pad with sentinels until the lookahead is satisfied.
                self.buffer.push(0);
                self.unread += 1;
                continue;
            }
            self.decode_one()?;
        }
        Ok(())
    }

    /// Consume the character at the head of the buffer and return its width in bytes.
    #[inline]
    pub(crate) fn advance(&mut self) -> usize {
        let width = crate::char_traits::width(crate::char_traits::at(&self.buffer, self.pos));
        self.pos += width;
        self.unread = self.unread.saturating_sub(1);
        width
    }

    /// Unconsumed decoded bytes.
    #[inline]
    pub(crate) fn rest(&self) -> &[u8] {
        &self.buffer[self.pos..]
    }

    fn raw(&self) -> &[u8] {
        match &self.source {
            Source::Slice(input) => input.get(self.raw_pos..).unwrap_or(&[]),
            Source::Read { raw, .. } => raw.get(self.raw_pos..).unwrap_or(&[]),
        }
    }

    fn check_size(&self) -> Result<(), Error> {
        match self.max_bytes {
            Some(max) if self.pulled > max => Err(ReaderError::new(
                "input is larger than the configured limit",
                max,
                None,
            )
            .into()),
            _ => Ok(()),
        }
    }

    /// Pull raw input until at least `need` undecoded bytes are available or the source ends.
    fn fill_raw(&mut self, need: usize) -> Result<(), Error> {
        while !self.eof && self.raw().len() < need {
            let Source::Read { inner, raw } = &mut self.source else {
                self.eof = true;
                break;
            };
            if self.raw_pos > 0 {
                raw.drain(..self.raw_pos);
                self.raw_pos = 0;
            }
            let filled = raw.len();
            raw.resize(filled + RAW_CHUNK, 0);
            let read = loop {
                match inner.read(&mut raw[filled..]) {
                    Ok(read) => break read,
                    Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                    Err(cause) => {
                        raw.truncate(filled);
                        return Err(Error::IOError { cause });
                    }
                }
            };
            raw.truncate(filled + read);
            if read == 0 {
                self.eof = true;
            }
            self.pulled += read;
            self.check_size()?;
        }
        Ok(())
    }

    fn determine_encoding(&mut self) -> Result<(), Error> {
        self.fill_raw(3)?;
        let raw = self.raw();
        let (encoding, bom) = if raw.starts_with(&[0xFF, 0xFE]) {
            (Encoding::Utf16Le, 2)
        } else if raw.starts_with(&[0xFE, 0xFF]) {
            (Encoding::Utf16Be, 2)
        } else if raw.starts_with(&[0xEF, 0xBB, 0xBF]) {
            (Encoding::Utf8, 3)
        } else {
            (Encoding::Utf8, 0)
        };
        self.raw_pos += bom;
        self.offset += bom;
        self.encoding = Some(encoding);
        Ok(())
    }

    /// Decode one character from the raw input into the working buffer.
    fn decode_one(&mut self) -> Result<(), Error> {
        let (value, width) = match self.encoding {
            Some(Encoding::Utf16Le) => self.decode_utf16(true)?,
            Some(Encoding::Utf16Be) => self.decode_utf16(false)?,
            _ => self.decode_utf8()?,
        };
        if !is_printable(value) {
            return Err(ReaderError::new(
                "control characters are not allowed",
                self.offset,
                Some(value),
            )
            .into());
        }
        let ch = char::from_u32(value)
            .ok_or_else(|| ReaderError::new("invalid Unicode character", self.offset, Some(value)))?;
        let mut utf8 = [0u8; 4];
        self.buffer
            .extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
        self.unread += 1;
        self.raw_pos += width;
        self.offset += width;
        Ok(())
    }

    fn decode_utf8(&mut self) -> Result<(u32, usize), Error> {
        let lead = self.raw()[0];
        let width = match lead {
            l if l & 0x80 == 0x00 => 1,
            l if l & 0xE0 == 0xC0 => 2,
            l if l & 0xF0 == 0xE0 => 3,
            l if l & 0xF8 == 0xF0 => 4,
            _ => {
                return Err(ReaderError::new(
                    "invalid leading UTF-8 octet",
                    self.offset,
                    Some(u32::from(lead)),
                )
                .into());
            }
        };
        if self.raw().len() < width {
            return Err(ReaderError::new("incomplete UTF-8 octet sequence", self.offset, None).into());
        }
        let raw = self.raw();
        let mut value = match width {
            1 => u32::from(lead & 0x7F),
            2 => u32::from(lead & 0x1F),
            3 => u32::from(lead & 0x0F),
            _ => u32::from(lead & 0x07),
        };
        for k in 1..width {
            let octet = raw[k];
            if octet & 0xC0 != 0x80 {
                return Err(ReaderError::new(
                    "invalid trailing UTF-8 octet",
                    self.offset + k,
                    Some(u32::from(octet)),
                )
                .into());
            }
            value = (value << 6) | u32::from(octet & 0x3F);
        }
        let shortest = match width {
            1 => true,
            2 => value >= 0x80,
            3 => value >= 0x800,
            _ => value >= 0x10000,
        };
        if !shortest {
            return Err(ReaderError::new("invalid length of a UTF-8 sequence", self.offset, None).into());
        }
        if (0xD800..=0xDFFF).contains(&value) || value > 0x10FFFF {
            return Err(
                ReaderError::new("invalid Unicode character", self.offset, Some(value)).into(),
            );
        }
        Ok((value, width))
    }

    fn decode_utf16(&mut self, little_endian: bool) -> Result<(u32, usize), Error> {
        let unit = |raw: &[u8], at: usize| -> u32 {
            let (lo, hi) = if little_endian {
                (raw[at], raw[at + 1])
            } else {
                (raw[at + 1], raw[at])
            };
            u32::from(lo) | (u32::from(hi) << 8)
        };
        let raw = self.raw();
        if raw.len() < 2 {
            return Err(ReaderError::new("incomplete UTF-16 character", self.offset, None).into());
        }
        let value = unit(raw, 0);
        if value & 0xFC00 == 0xDC00 {
            return Err(
                ReaderError::new("unexpected low surrogate area", self.offset, Some(value)).into(),
            );
        }
        if value & 0xFC00 != 0xD800 {
            return Ok((value, 2));
        }
        if raw.len() < 4 {
            return Err(
                ReaderError::new("incomplete UTF-16 surrogate pair", self.offset, None).into(),
            );
        }
        let low = unit(raw, 2);
        if low & 0xFC00 != 0xDC00 {
            return Err(
                ReaderError::new("expected low surrogate area", self.offset + 2, Some(low)).into(),
            );
        }
        Ok((0x10000 + ((value & 0x3FF) << 10) + (low & 0x3FF), 4))
    }
}

/// The printable set: TAB, LF, CR, 0x20-0x7E, NEL, 0xA0-0xD7FF, 0xE000-0xFFFD and the
/// supplementary planes.
fn is_printable(value: u32) -> bool {
    matches!(value,
        0x09 | 0x0A | 0x0D | 0x20..=0x7E | 0x85 | 0xA0..=0xD7FF | 0xE000..=0xFFFD | 0x10000..=0x10FFFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(reader: &mut Reader<'_>) -> Result<String, Error> {
        let mut out = Vec::new();
        loop {
            reader.ensure(1)?;
            if reader.rest()[0] == 0 {
                break;
            }
            let width = reader.advance();
            out.extend_from_slice(&reader.buffer[reader.pos - width..reader.pos]);
        }
        Ok(String::from_utf8(out).expect("reader produces UTF-8"))
    }

    fn utf16(text: &str, little_endian: bool) -> Vec<u8> {
        let mut bytes = if little_endian {
            vec![0xFF, 0xFE]
        } else {
            vec![0xFE, 0xFF]
        };
        for unit in text.encode_utf16() {
            if little_endian {
                bytes.extend_from_slice(&unit.to_le_bytes());
            } else {
                bytes.extend_from_slice(&unit.to_be_bytes());
            }
        }
        bytes
    }

    #[test]
    fn utf8_bom_is_consumed() {
        let mut reader = Reader::from_slice(b"\xEF\xBB\xBFkey: v");
        assert_eq!(decode_all(&mut reader).unwrap(), "key: v");
        assert_eq!(reader.encoding(), Some(Encoding::Utf8));
    }

    #[test]
    fn utf16_inputs_are_normalized_to_utf8() {
        let text = "name: żółw 🐢\n";
        for little_endian in [true, false] {
            let bytes = utf16(text, little_endian);
            let mut reader = Reader::from_slice(&bytes);
            assert_eq!(decode_all(&mut reader).unwrap(), text);
        }
        let mut reader = Reader::from_slice(&[0xFF, 0xFE, b'a', 0]);
        reader.ensure(1).unwrap();
        assert_eq!(reader.encoding(), Some(Encoding::Utf16Le));
    }

    #[test]
    fn sentinels_pad_the_lookahead() {
        let mut reader = Reader::from_slice(b"a");
        reader.ensure(4).unwrap();
        assert_eq!(reader.unread, 4);
        assert_eq!(reader.rest(), b"a\0\0\0");
    }

    #[test]
    fn byte_lookahead_past_the_window_reads_as_nul() {
        use crate::char_traits::{is_break, is_z};

        let mut reader = Reader::from_slice("x\u{2028}y".as_bytes());
        reader.ensure(2).unwrap();
        // Continuation bytes of an ensured character are always in the buffer.
        assert_eq!(reader.rest().len(), 4);
        assert!(is_break(reader.rest(), 1));
        // The next character is not decoded yet.
        assert!(is_z(reader.rest(), 4));
        reader.ensure(3).unwrap();
        assert_eq!(reader.rest().get(4), Some(&b'y'));

        reader.ensure(4).unwrap();
        assert_eq!(reader.rest().get(5), Some(&0));
    }

    #[test]
    fn control_characters_are_rejected_with_offset() {
        let mut reader = Reader::from_slice(b"ab\x07c");
        let err = decode_all(&mut reader).unwrap_err();
        let Error::Reader(err) = err else {
            panic!("expected reader error, got {err:?}");
        };
        assert_eq!(err.problem(), "control characters are not allowed");
        assert_eq!(err.offset(), 2);
        assert_eq!(err.value(), Some(7));
    }

    #[test]
    fn malformed_utf8_is_rejected() {
        let cases: &[(&[u8], &str, usize)] = &[
            (b"a\xFFb", "invalid leading UTF-8 octet", 1),
            (b"a\xC3", "incomplete UTF-8 octet sequence", 1),
            (b"a\xC3\x28", "invalid trailing UTF-8 octet", 2),
            (b"\xC0\x80", "invalid length of a UTF-8 sequence", 0),
            (b"\xED\xA0\x80", "invalid Unicode character", 0),
        ];
        for (input, problem, offset) in cases {
            let mut reader = Reader::from_slice(input);
            match decode_all(&mut reader) {
                Err(Error::Reader(err)) => {
                    assert_eq!(err.problem(), *problem);
                    assert_eq!(err.offset(), *offset);
                }
                other => panic!("expected {problem}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unpaired_surrogates_are_rejected() {
        let lone_low = [0xFF, 0xFE, 0x00, 0xDC];
        let mut reader = Reader::from_slice(&lone_low);
        match decode_all(&mut reader) {
            Err(Error::Reader(err)) => assert_eq!(err.problem(), "unexpected low surrogate area"),
            other => panic!("unexpected {other:?}"),
        }

        let high_then_letter = [0xFF, 0xFE, 0x3D, 0xD8, b'a', 0x00];
        let mut reader = Reader::from_slice(&high_then_letter);
        match decode_all(&mut reader) {
            Err(Error::Reader(err)) => {
                assert_eq!(err.problem(), "expected low surrogate area");
                assert_eq!(err.offset(), 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    /// Hands out input a few bytes at a time to exercise refills across character boundaries.
    struct Trickle<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.step.min(buf.len()).min(self.data.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    #[test]
    fn read_source_refills_and_compacts() {
        let text = "ключ: значение\n".repeat(4000);
        let mut reader = Reader::from_read(Trickle {
            data: text.as_bytes(),
            step: 3,
        });
        assert_eq!(decode_all(&mut reader).unwrap(), text);
        assert!(reader.buffer.len() < text.len());
    }

    #[test]
    fn input_cap_is_enforced() {
        let mut reader = Reader::from_slice(b"0123456789").with_max_bytes(Some(4));
        match reader.ensure(1) {
            Err(Error::Reader(err)) => {
                assert_eq!(err.problem(), "input is larger than the configured limit")
            }
            other => panic!("unexpected {other:?}"),
        }

        let data = vec![b'a'; 100];
        let mut reader = Reader::from_read(Trickle {
            data: &data,
            step: 7,
        })
        .with_max_bytes(Some(50));
        assert!(matches!(decode_all(&mut reader), Err(Error::Reader(_))));
    }
}
