//! Home to the YAML Scanner.
//!
//! The scanner is the lowest-level parsing utility. It is the lexer / tokenizer, reading the
//! characters decoded by the [`Reader`] and emitting [`Token`]s. Besides splitting the input it
//! keeps track of block indentation (emitting the `BLOCK-*-START` / `BLOCK-END` tokens the
//! grammar needs) and of "simple key" candidates: a scalar that turns out to be a mapping key
//! once a `:` follows it gets a `KEY` token inserted in front of it after the fact.

use std::collections::VecDeque;
use std::io::Read;

use crate::char_traits::{
    as_digit, as_hex, at, ends_anchor, is_alpha, is_blank, is_blankz, is_bom, is_break,
    is_breakz, is_crlf, is_digit, is_hex, is_space, is_tab, is_uri_char, is_z,
};
use crate::error::{Error, ScanError};
use crate::location::Mark;
use crate::reader::{Encoding, Reader};

/// Default cap on `[`/`{` nesting.
pub const DEFAULT_MAX_FLOW_LEVEL: usize = 10_000;
/// Default cap on the number of enclosing block indentation levels.
pub const DEFAULT_MAX_INDENTS: usize = 10_000;

/// A simple key candidate is dropped once it is further behind than this many bytes.
const MAX_SIMPLE_KEY_LENGTH: usize = 1024;

/// The style of a scalar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScalarStyle {
    /// Unquoted.
    Plain,
    /// `'...'`
    SingleQuoted,
    /// `"..."`
    DoubleQuoted,
    /// `|`
    Literal,
    /// `>`
    Folded,
}

/// The kind and payload of a token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// The start of the stream, with the detected input encoding.
    StreamStart(Encoding),
    /// The end of the stream.
    StreamEnd,
    /// `%YAML major.minor`
    VersionDirective {
        /// Major version.
        major: u32,
        /// Minor version.
        minor: u32,
    },
    /// `%TAG handle prefix`
    TagDirective {
        /// The handle, like `!e!`.
        handle: String,
        /// The prefix the handle expands to.
        prefix: String,
    },
    /// `---`
    DocumentStart,
    /// `...`
    DocumentEnd,
    /// Start of a block sequence (synthesized from indentation).
    BlockSequenceStart,
    /// Start of a block mapping (synthesized from indentation).
    BlockMappingStart,
    /// End of a block collection (synthesized from indentation).
    BlockEnd,
    /// `[`
    FlowSequenceStart,
    /// `]`
    FlowSequenceEnd,
    /// `{`
    FlowMappingStart,
    /// `}`
    FlowMappingEnd,
    /// `-`
    BlockEntry,
    /// `,`
    FlowEntry,
    /// `?`, explicit or inserted in front of a simple key.
    Key,
    /// `:`
    Value,
    /// `*name`
    Alias(String),
    /// `&name`
    Anchor(String),
    /// `!handle!suffix`. A verbatim tag has an empty handle; the lone `!` has an empty
    /// handle and the suffix `!`.
    Tag {
        /// The handle, like `!!`.
        handle: String,
        /// Everything after the handle.
        suffix: String,
    },
    /// A scalar with its style and processed value.
    Scalar {
        /// How the scalar was written.
        style: ScalarStyle,
        /// The value after folding and escape processing.
        value: String,
    },
}

/// A scanned token with the span it covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    /// What the token is.
    pub kind: TokenKind,
    /// Where the token starts.
    pub start: Mark,
    /// Where the token ends.
    pub end: Mark,
}

impl Token {
    fn new(kind: TokenKind, start: Mark, end: Mark) -> Self {
        Self { kind, start, end }
    }
}

/// A potential simple key: a token that becomes a mapping key if a `:` follows in time.
#[derive(Clone, Copy, Debug, Default)]
struct SimpleKey {
    /// Whether the candidate is still alive.
    possible: bool,
    /// Whether the candidate must turn into a key (it starts a line at the current block
    /// indentation).
    required: bool,
    /// The number of the token the candidate starts with.
    token_number: usize,
    mark: Mark,
}

/// How a block scalar treats its trailing line breaks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Chomping {
    /// `-`: drop every trailing break.
    Strip,
    /// Default: keep exactly one trailing break.
    Clip,
    /// `+`: keep every trailing break.
    Keep,
}

/// The YAML scanner.
///
/// Tokens are pulled with [`Scanner::next_token`]; the scanner reads just enough input to
/// decide the next token, buffering a few more while a simple key candidate is pending.
pub struct Scanner<'a> {
    reader: Reader<'a>,
    /// Position of the next character.
    mark: Mark,
    /// Scanned, not yet consumed tokens.
    tokens: VecDeque<Token>,
    stream_start_produced: bool,
    stream_end_produced: bool,
    /// Whether the head of `tokens` may be handed out without scanning further.
    token_available: bool,
    /// Number of tokens consumed so far.
    tokens_parsed: usize,
    /// Current block indentation column; `-1` outside any block collection.
    indent: isize,
    /// Enclosing indentation columns.
    indents: Vec<isize>,
    /// Whether a simple key may start at the current position.
    simple_key_allowed: bool,
    /// One candidate per flow level, plus the block context one.
    simple_keys: Vec<SimpleKey>,
    flow_level: usize,
    max_flow_level: usize,
    max_indents: usize,
}

impl<'a> Scanner<'a> {
    /// Scanner over an in-memory input.
    pub fn from_slice(input: &'a [u8]) -> Self {
        Self::new(Reader::from_slice(input))
    }

    /// Scanner pulling input from a reader.
    pub fn from_read<R: Read + 'a>(input: R) -> Self {
        Self::new(Reader::from_read(input))
    }

    pub(crate) fn new(reader: Reader<'a>) -> Self {
        Self {
            reader,
            mark: Mark::default(),
            tokens: VecDeque::new(),
            stream_start_produced: false,
            stream_end_produced: false,
            token_available: false,
            tokens_parsed: 0,
            indent: -1,
            indents: Vec::new(),
            simple_key_allowed: false,
            simple_keys: Vec::new(),
            flow_level: 0,
            max_flow_level: DEFAULT_MAX_FLOW_LEVEL,
            max_indents: DEFAULT_MAX_INDENTS,
        }
    }

    /// Override the nesting caps.
    pub fn with_limits(mut self, max_flow_level: usize, max_indents: usize) -> Self {
        self.max_flow_level = max_flow_level;
        self.max_indents = max_indents;
        self
    }

    /// The position of the next unread character.
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// Consume and return the next token; `None` once the stream end was handed out.
    pub fn next_token(&mut self) -> Result<Option<Token>, Error> {
        if self.stream_end_produced {
            return Ok(None);
        }
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let token = self.tokens.pop_front();
        if let Some(token) = &token {
            debug_print!("  ⇒ {:?}", token.kind);
            self.consumed(token);
        }
        Ok(token)
    }

    /// Look at the next token without consuming it.
    pub(crate) fn peek_token(&mut self) -> Result<&Token, Error> {
        if !self.token_available {
            self.fetch_more_tokens()?;
        }
        let mark = self.mark;
        self.tokens
            .front()
            .ok_or_else(|| ScanError::new(mark, "unexpected end of the token stream").into())
    }

    /// Consume the token returned by the last [`Scanner::peek_token`].
    pub(crate) fn skip_token(&mut self) {
        if let Some(token) = self.tokens.pop_front() {
            debug_print!("  ⇒ {:?}", token.kind);
            self.consumed(&token);
        }
    }

    fn consumed(&mut self, token: &Token) {
        self.token_available = false;
        self.tokens_parsed += 1;
        if token.kind == TokenKind::StreamEnd {
            self.stream_end_produced = true;
        }
    }

    #[inline]
    fn cache(&mut self, length: usize) -> Result<(), Error> {
        self.reader.ensure(length)
    }

    /// Byte at lookahead position `k`.
    #[inline]
    fn ch(&self, k: usize) -> u8 {
        at(self.reader.rest(), k)
    }

    /// Apply a character predicate at lookahead position `k`.
    #[inline]
    fn look(&self, pred: fn(&[u8], usize) -> bool, k: usize) -> bool {
        pred(self.reader.rest(), k)
    }

    #[inline]
    fn skip(&mut self) {
        let width = self.reader.advance();
        self.mark.index += width;
        self.mark.column += 1;
    }

    fn skip_line(&mut self) {
        if self.look(is_crlf, 0) {
            self.reader.advance();
            self.reader.advance();
            self.mark.index += 2;
            self.mark.column = 0;
            self.mark.line += 1;
        } else if self.look(is_break, 0) {
            let width = self.reader.advance();
            self.mark.index += width;
            self.mark.column = 0;
            self.mark.line += 1;
        }
    }

    /// Copy the current character into `s` and consume it.
    fn read(&mut self, s: &mut Vec<u8>) {
        let start = self.reader.pos;
        self.skip();
        s.extend_from_slice(&self.reader.buffer[start..self.reader.pos]);
    }

    /// Consume a line break, normalizing CR, LF, CRLF and NEL to `\n`. LS and PS are kept.
    fn read_break(&mut self, s: &mut Vec<u8>) {
        if !self.look(is_break, 0) {
            return;
        }
        if matches!(self.ch(0), b'\r' | b'\n' | 0xC2) {
            s.push(b'\n');
            self.skip_line();
        } else {
            let start = self.reader.pos;
            self.skip_line();
            s.extend_from_slice(&self.reader.buffer[start..self.reader.pos]);
        }
    }

    fn fetch_more_tokens(&mut self) -> Result<(), Error> {
        loop {
            let need_more = if self.tokens.is_empty() {
                !self.stream_end_produced
            } else {
                self.stale_simple_keys()?;
                let parsed = self.tokens_parsed;
                self.simple_keys
                    .iter()
                    .any(|key| key.possible && key.token_number == parsed)
            };
            if !need_more {
                break;
            }
            self.fetch_next_token()?;
        }
        self.token_available = true;
        Ok(())
    }

    fn fetch_next_token(&mut self) -> Result<(), Error> {
        self.cache(1)?;
        if !self.stream_start_produced {
            self.fetch_stream_start();
            return Ok(());
        }
        self.scan_to_next_token()?;
        self.stale_simple_keys()?;
        self.unroll_indent(self.mark.column as isize);
        self.cache(4)?;

        if self.look(is_z, 0) {
            return self.fetch_stream_end();
        }
        let c = self.ch(0);
        if self.mark.column == 0 {
            if c == b'%' {
                return self.fetch_directive();
            }
            if self.is_document_indicator(b'-') {
                return self.fetch_document_indicator(TokenKind::DocumentStart);
            }
            if self.is_document_indicator(b'.') {
                return self.fetch_document_indicator(TokenKind::DocumentEnd);
            }
        }
        let next_blankz = self.look(is_blankz, 1);
        match c {
            b'[' => return self.fetch_flow_collection_start(TokenKind::FlowSequenceStart),
            b'{' => return self.fetch_flow_collection_start(TokenKind::FlowMappingStart),
            b']' => return self.fetch_flow_collection_end(TokenKind::FlowSequenceEnd),
            b'}' => return self.fetch_flow_collection_end(TokenKind::FlowMappingEnd),
            b',' => return self.fetch_flow_entry(),
            b'-' if next_blankz => return self.fetch_block_entry(),
            b'?' if self.flow_level > 0 || next_blankz => return self.fetch_key(),
            b':' if self.flow_level > 0 || next_blankz => return self.fetch_value(),
            b'*' => return self.fetch_anchor(true),
            b'&' => return self.fetch_anchor(false),
            b'!' => return self.fetch_tag(),
            b'|' if self.flow_level == 0 => return self.fetch_block_scalar(true),
            b'>' if self.flow_level == 0 => return self.fetch_block_scalar(false),
            b'\'' => return self.fetch_flow_scalar(true),
            b'"' => return self.fetch_flow_scalar(false),
            _ => {}
        }

        // A plain scalar may start with any non-blank character except the indicators. It may
        // also start with '-', '?' or ':' when followed by a non-space character.
        let indicator = matches!(
            c,
            b'-' | b'?'
                | b':'
                | b','
                | b'['
                | b']'
                | b'{'
                | b'}'
                | b'#'
                | b'&'
                | b'*'
                | b'!'
                | b'|'
                | b'>'
                | b'\''
                | b'"'
                | b'%'
                | b'@'
                | b'`'
        );
        if !(self.look(is_blankz, 0) || indicator)
            || (c == b'-' && !self.look(is_blank, 1))
            || (self.flow_level == 0 && (c == b'?' || c == b':') && !next_blankz)
        {
            return self.fetch_plain_scalar();
        }

        Err(ScanError::with_context(
            "while scanning for the next token",
            self.mark,
            self.mark,
            "found character that cannot start any token",
        )
        .into())
    }

    fn is_document_indicator(&self, c: u8) -> bool {
        self.ch(0) == c && self.ch(1) == c && self.ch(2) == c && self.look(is_blankz, 3)
    }

    /// Skip spaces, comments and line breaks up to the next token.
    fn scan_to_next_token(&mut self) -> Result<(), Error> {
        loop {
            self.cache(1)?;
            if self.mark.column == 0 && self.look(is_bom, 0) {
                self.skip();
                self.cache(1)?;
            }
            // Tabs are whitespace in flow context, and in block context where no simple key
            // may start (so never at the beginning of a line).
            while self.ch(0) == b' '
                || ((self.flow_level > 0 || !self.simple_key_allowed) && self.ch(0) == b'\t')
            {
                self.skip();
                self.cache(1)?;
            }
            if self.ch(0) == b'#' {
                while !self.look(is_breakz, 0) {
                    self.skip();
                    self.cache(1)?;
                }
            }
            if !self.look(is_break, 0) {
                break;
            }
            self.cache(2)?;
            self.skip_line();
            if self.flow_level == 0 {
                self.simple_key_allowed = true;
            }
        }
        Ok(())
    }

    /// Drop simple key candidates that can no longer be followed by their `:`.
    fn stale_simple_keys(&mut self) -> Result<(), Error> {
        let mark = self.mark;
        for key in &mut self.simple_keys {
            if key.possible
                && (key.mark.line < mark.line || key.mark.index + MAX_SIMPLE_KEY_LENGTH < mark.index)
            {
                if key.required {
                    return Err(ScanError::with_context(
                        "while scanning a simple key",
                        key.mark,
                        mark,
                        "could not find expected ':'",
                    )
                    .into());
                }
                key.possible = false;
            }
        }
        Ok(())
    }

    fn save_simple_key(&mut self) -> Result<(), Error> {
        // A required key starts at the current block indentation.
        let required = self.flow_level == 0 && self.indent == self.mark.column as isize;
        if self.simple_key_allowed {
            let key = SimpleKey {
                possible: true,
                required,
                token_number: self.tokens_parsed + self.tokens.len(),
                mark: self.mark,
            };
            self.remove_simple_key()?;
            if let Some(last) = self.simple_keys.last_mut() {
                *last = key;
            }
        }
        Ok(())
    }

    fn remove_simple_key(&mut self) -> Result<(), Error> {
        let mark = self.mark;
        if let Some(last) = self.simple_keys.last_mut() {
            if last.possible && last.required {
                return Err(ScanError::with_context(
                    "while scanning a simple key",
                    last.mark,
                    mark,
                    "could not find expected ':'",
                )
                .into());
            }
            last.possible = false;
        }
        Ok(())
    }

    fn increase_flow_level(&mut self) -> Result<(), Error> {
        self.simple_keys.push(SimpleKey {
            mark: self.mark,
            ..SimpleKey::default()
        });
        self.flow_level += 1;
        if self.flow_level > self.max_flow_level {
            return Err(ScanError::with_context(
                "while increasing flow level",
                self.mark,
                self.mark,
                format!("exceeded max depth of {}", self.max_flow_level),
            )
            .into());
        }
        Ok(())
    }

    fn decrease_flow_level(&mut self) {
        if self.flow_level > 0 {
            self.flow_level -= 1;
            self.simple_keys.pop();
        }
    }

    /// Push the current indentation and open a block collection if `column` is deeper.
    ///
    /// With `number`, the start token is inserted in front of that (already queued) token.
    fn roll_indent(
        &mut self,
        column: usize,
        number: Option<usize>,
        kind: TokenKind,
        mark: Mark,
    ) -> Result<(), Error> {
        if self.flow_level > 0 {
            return Ok(());
        }
        let column = column as isize;
        if self.indent < column {
            self.indents.push(self.indent);
            self.indent = column;
            if self.indents.len() > self.max_indents {
                let context_mark = self.simple_keys.last().map_or(self.mark, |key| key.mark);
                return Err(ScanError::with_context(
                    "while increasing indent level",
                    context_mark,
                    self.mark,
                    format!("exceeded max depth of {}", self.max_indents),
                )
                .into());
            }
            let token = Token::new(kind, mark, mark);
            match number {
                Some(number) => {
                    let index = number.saturating_sub(self.tokens_parsed).min(self.tokens.len());
                    self.tokens.insert(index, token);
                }
                None => self.tokens.push_back(token),
            }
        }
        Ok(())
    }

    /// Close every block collection deeper than `column`.
    fn unroll_indent(&mut self, column: isize) {
        if self.flow_level > 0 {
            return;
        }
        while self.indent > column {
            self.tokens
                .push_back(Token::new(TokenKind::BlockEnd, self.mark, self.mark));
            self.indent = self.indents.pop().unwrap_or(-1);
        }
    }

    fn fetch_stream_start(&mut self) {
        self.indent = -1;
        self.simple_keys.push(SimpleKey::default());
        self.simple_key_allowed = true;
        self.stream_start_produced = true;
        let encoding = self.reader.encoding().unwrap_or(Encoding::Utf8);
        self.tokens.push_back(Token::new(
            TokenKind::StreamStart(encoding),
            self.mark,
            self.mark,
        ));
    }

    fn fetch_stream_end(&mut self) -> Result<(), Error> {
        // Force a new line.
        if self.mark.column != 0 {
            self.mark.column = 0;
            self.mark.line += 1;
        }
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        self.tokens
            .push_back(Token::new(TokenKind::StreamEnd, self.mark, self.mark));
        Ok(())
    }

    fn fetch_directive(&mut self) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_directive()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_document_indicator(&mut self, kind: TokenKind) -> Result<(), Error> {
        self.unroll_indent(-1);
        self.remove_simple_key()?;
        self.simple_key_allowed = false;
        let start = self.mark;
        self.skip();
        self.skip();
        self.skip();
        self.tokens.push_back(Token::new(kind, start, self.mark));
        Ok(())
    }

    fn fetch_flow_collection_start(&mut self, kind: TokenKind) -> Result<(), Error> {
        // The indicators '[' and '{' may start a simple key.
        self.save_simple_key()?;
        self.increase_flow_level()?;
        self.simple_key_allowed = true;
        let start = self.mark;
        self.skip();
        self.tokens.push_back(Token::new(kind, start, self.mark));
        Ok(())
    }

    fn fetch_flow_collection_end(&mut self, kind: TokenKind) -> Result<(), Error> {
        self.remove_simple_key()?;
        self.decrease_flow_level();
        self.simple_key_allowed = false;
        let start = self.mark;
        self.skip();
        self.tokens.push_back(Token::new(kind, start, self.mark));
        Ok(())
    }

    fn fetch_flow_entry(&mut self) -> Result<(), Error> {
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start = self.mark;
        self.skip();
        self.tokens
            .push_back(Token::new(TokenKind::FlowEntry, start, self.mark));
        Ok(())
    }

    fn fetch_block_entry(&mut self) -> Result<(), Error> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(ScanError::new(
                    self.mark,
                    "block sequence entries are not allowed in this context",
                )
                .into());
            }
            self.roll_indent(
                self.mark.column,
                None,
                TokenKind::BlockSequenceStart,
                self.mark,
            )?;
        }
        // A '-' in flow context is left for the parser to report, with better context.
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let start = self.mark;
        self.skip();
        self.tokens
            .push_back(Token::new(TokenKind::BlockEntry, start, self.mark));
        Ok(())
    }

    fn fetch_key(&mut self) -> Result<(), Error> {
        if self.flow_level == 0 {
            if !self.simple_key_allowed {
                return Err(
                    ScanError::new(self.mark, "mapping keys are not allowed in this context").into(),
                );
            }
            self.roll_indent(
                self.mark.column,
                None,
                TokenKind::BlockMappingStart,
                self.mark,
            )?;
        }
        self.remove_simple_key()?;
        // Simple keys are allowed after '?' in the block context.
        self.simple_key_allowed = self.flow_level == 0;
        let start = self.mark;
        self.skip();
        self.tokens
            .push_back(Token::new(TokenKind::Key, start, self.mark));
        Ok(())
    }

    fn fetch_value(&mut self) -> Result<(), Error> {
        let key = self.simple_keys.last().copied().unwrap_or_default();
        if key.possible {
            // Insert the KEY token in front of the candidate, then possibly the mapping start.
            let index = key
                .token_number
                .saturating_sub(self.tokens_parsed)
                .min(self.tokens.len());
            self.tokens
                .insert(index, Token::new(TokenKind::Key, key.mark, key.mark));
            self.roll_indent(
                key.mark.column,
                Some(key.token_number),
                TokenKind::BlockMappingStart,
                key.mark,
            )?;
            if let Some(last) = self.simple_keys.last_mut() {
                last.possible = false;
            }
            self.simple_key_allowed = false;
        } else {
            // The ':' follows a complex key (or is an empty key).
            if self.flow_level == 0 {
                if !self.simple_key_allowed {
                    return Err(ScanError::new(
                        self.mark,
                        "mapping values are not allowed in this context",
                    )
                    .into());
                }
                self.roll_indent(
                    self.mark.column,
                    None,
                    TokenKind::BlockMappingStart,
                    self.mark,
                )?;
            }
            self.simple_key_allowed = self.flow_level == 0;
        }
        let start = self.mark;
        self.skip();
        self.tokens
            .push_back(Token::new(TokenKind::Value, start, self.mark));
        Ok(())
    }

    fn fetch_anchor(&mut self, alias: bool) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_anchor(alias)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_tag(&mut self) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_tag()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_block_scalar(&mut self, literal: bool) -> Result<(), Error> {
        // A simple key may follow a block scalar.
        self.remove_simple_key()?;
        self.simple_key_allowed = true;
        let token = self.scan_block_scalar(literal)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_flow_scalar(&mut self, single: bool) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_flow_scalar(single)?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn fetch_plain_scalar(&mut self) -> Result<(), Error> {
        self.save_simple_key()?;
        self.simple_key_allowed = false;
        let token = self.scan_plain_scalar()?;
        self.tokens.push_back(token);
        Ok(())
    }

    fn scan_directive(&mut self) -> Result<Token, Error> {
        let start = self.mark;
        self.skip();
        let name = self.scan_directive_name(start)?;
        let kind = match name.as_slice() {
            b"YAML" => {
                let (major, minor) = self.scan_version_directive_value(start)?;
                TokenKind::VersionDirective { major, minor }
            }
            b"TAG" => {
                let (handle, prefix) = self.scan_tag_directive_value(start)?;
                TokenKind::TagDirective { handle, prefix }
            }
            _ => {
                return Err(ScanError::with_context(
                    "while scanning a directive",
                    start,
                    self.mark,
                    "found unknown directive name",
                )
                .into());
            }
        };
        let end = self.mark;

        // Eat the rest of the line including any comments.
        self.cache(1)?;
        while self.look(is_blank, 0) {
            self.skip();
            self.cache(1)?;
        }
        if self.ch(0) == b'#' {
            while !self.look(is_breakz, 0) {
                self.skip();
                self.cache(1)?;
            }
        }
        if !self.look(is_breakz, 0) {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start,
                self.mark,
                "did not find expected comment or line break",
            )
            .into());
        }
        if self.look(is_break, 0) {
            self.cache(2)?;
            self.skip_line();
        }
        Ok(Token::new(kind, start, end))
    }

    fn scan_directive_name(&mut self, start: Mark) -> Result<Vec<u8>, Error> {
        let mut name = Vec::new();
        self.cache(1)?;
        while self.look(is_alpha, 0) {
            self.read(&mut name);
            self.cache(1)?;
        }
        if name.is_empty() {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start,
                self.mark,
                "could not find expected directive name",
            )
            .into());
        }
        if !self.look(is_blankz, 0) {
            return Err(ScanError::with_context(
                "while scanning a directive",
                start,
                self.mark,
                "found unexpected non-alphabetical character",
            )
            .into());
        }
        Ok(name)
    }

    fn scan_version_directive_value(&mut self, start: Mark) -> Result<(u32, u32), Error> {
        self.cache(1)?;
        while self.look(is_blank, 0) {
            self.skip();
            self.cache(1)?;
        }
        let major = self.scan_version_directive_number(start)?;
        if self.ch(0) != b'.' {
            return Err(ScanError::with_context(
                "while scanning a %YAML directive",
                start,
                self.mark,
                "did not find expected digit or '.' character",
            )
            .into());
        }
        self.skip();
        let minor = self.scan_version_directive_number(start)?;
        Ok((major, minor))
    }

    fn scan_version_directive_number(&mut self, start: Mark) -> Result<u32, Error> {
        let mut value = 0u32;
        let mut length = 0;
        self.cache(1)?;
        while self.look(is_digit, 0) {
            length += 1;
            if length > 9 {
                return Err(ScanError::with_context(
                    "while scanning a %YAML directive",
                    start,
                    self.mark,
                    "found extremely long version number",
                )
                .into());
            }
            value = value * 10 + as_digit(self.reader.rest(), 0);
            self.skip();
            self.cache(1)?;
        }
        if length == 0 {
            return Err(ScanError::with_context(
                "while scanning a %YAML directive",
                start,
                self.mark,
                "did not find expected version number",
            )
            .into());
        }
        Ok(value)
    }

    fn scan_tag_directive_value(&mut self, start: Mark) -> Result<(String, String), Error> {
        self.cache(1)?;
        while self.look(is_blank, 0) {
            self.skip();
            self.cache(1)?;
        }
        let handle = self.scan_tag_handle(true, start)?;
        self.cache(1)?;
        if !self.look(is_blank, 0) {
            return Err(ScanError::with_context(
                "while scanning a %TAG directive",
                start,
                self.mark,
                "did not find expected whitespace",
            )
            .into());
        }
        while self.look(is_blank, 0) {
            self.skip();
            self.cache(1)?;
        }
        let prefix = self.scan_tag_uri(true, None, start)?;
        self.cache(1)?;
        if !self.look(is_blankz, 0) {
            return Err(ScanError::with_context(
                "while scanning a %TAG directive",
                start,
                self.mark,
                "did not find expected whitespace or line break",
            )
            .into());
        }
        Ok((into_string(handle), into_string(prefix)))
    }

    fn scan_anchor(&mut self, alias: bool) -> Result<Token, Error> {
        let start = self.mark;
        self.skip();
        let mut name = Vec::new();
        self.cache(1)?;
        while self.look(is_alpha, 0) {
            self.read(&mut name);
            self.cache(1)?;
        }
        if name.is_empty() || !self.look(ends_anchor, 0) {
            let context = if alias {
                "while scanning an alias"
            } else {
                "while scanning an anchor"
            };
            return Err(ScanError::with_context(
                context,
                start,
                self.mark,
                "did not find expected alphabetic or numeric character",
            )
            .into());
        }
        let name = into_string(name);
        let kind = if alias {
            TokenKind::Alias(name)
        } else {
            TokenKind::Anchor(name)
        };
        Ok(Token::new(kind, start, self.mark))
    }

    fn scan_tag(&mut self) -> Result<Token, Error> {
        let start = self.mark;
        self.cache(2)?;
        let (handle, suffix) = if self.ch(1) == b'<' {
            // Verbatim: `!<uri>`, the handle stays empty.
            self.skip();
            self.skip();
            let suffix = self.scan_tag_uri(false, None, start)?;
            if self.ch(0) != b'>' {
                return Err(ScanError::with_context(
                    "while scanning a tag",
                    start,
                    self.mark,
                    "did not find the expected '>'",
                )
                .into());
            }
            self.skip();
            (Vec::new(), suffix)
        } else {
            let handle = self.scan_tag_handle(false, start)?;
            if handle.len() > 1 && handle.first() == Some(&b'!') && handle.last() == Some(&b'!') {
                let suffix = self.scan_tag_uri(false, None, start)?;
                (handle, suffix)
            } else {
                // Not a handle after all: the scanned part belongs to the suffix.
                let suffix = self.scan_tag_uri(false, Some(&handle), start)?;
                if suffix.is_empty() {
                    // The lone '!' tag.
                    (Vec::new(), b"!".to_vec())
                } else {
                    (b"!".to_vec(), suffix)
                }
            }
        };

        self.cache(1)?;
        if !self.look(is_blankz, 0) && (self.flow_level == 0 || self.ch(0) != b',') {
            return Err(ScanError::with_context(
                "while scanning a tag",
                start,
                self.mark,
                "did not find expected whitespace or line break",
            )
            .into());
        }
        Ok(Token::new(
            TokenKind::Tag {
                handle: into_string(handle),
                suffix: into_string(suffix),
            },
            start,
            self.mark,
        ))
    }

    fn scan_tag_handle(&mut self, directive: bool, start: Mark) -> Result<Vec<u8>, Error> {
        let context = if directive {
            "while scanning a tag directive"
        } else {
            "while scanning a tag"
        };
        self.cache(1)?;
        if self.ch(0) != b'!' {
            return Err(
                ScanError::with_context(context, start, self.mark, "did not find expected '!'")
                    .into(),
            );
        }
        let mut handle = Vec::new();
        self.read(&mut handle);
        self.cache(1)?;
        while self.look(is_alpha, 0) {
            self.read(&mut handle);
            self.cache(1)?;
        }
        if self.ch(0) == b'!' {
            self.read(&mut handle);
        } else if directive && handle != b"!" {
            // In a %TAG directive a handle must be `!`, `!!` or `!word!`.
            return Err(ScanError::with_context(
                "while parsing a tag directive",
                start,
                self.mark,
                "did not find expected '!'",
            )
            .into());
        }
        Ok(handle)
    }

    fn scan_tag_uri(
        &mut self,
        directive: bool,
        head: Option<&[u8]>,
        start: Mark,
    ) -> Result<Vec<u8>, Error> {
        let mut length = head.map_or(0, <[u8]>::len);
        let mut uri = Vec::new();
        // The head includes the leading '!', which is not part of the URI.
        if let Some(head) = head.filter(|head| head.len() > 1) {
            uri.extend_from_slice(&head[1..]);
        }
        self.cache(1)?;
        while self.look(is_uri_char, 0)
            && !(self.flow_level > 0 && matches!(self.ch(0), b',' | b'[' | b']'))
        {
            if self.ch(0) == b'%' {
                self.scan_uri_escapes(directive, start, &mut uri)?;
            } else {
                self.read(&mut uri);
            }
            length += 1;
            self.cache(1)?;
        }
        if length == 0 {
            let context = if directive {
                "while parsing a %TAG directive"
            } else {
                "while parsing a tag"
            };
            return Err(ScanError::with_context(
                context,
                start,
                self.mark,
                "did not find expected tag URI",
            )
            .into());
        }
        Ok(uri)
    }

    /// Decode a `%XX` escaped UTF-8 sequence.
    fn scan_uri_escapes(
        &mut self,
        directive: bool,
        start: Mark,
        uri: &mut Vec<u8>,
    ) -> Result<(), Error> {
        let context = if directive {
            "while parsing a %TAG directive"
        } else {
            "while parsing a tag"
        };
        let mut width = 0usize;
        loop {
            self.cache(3)?;
            if !(self.ch(0) == b'%' && self.look(is_hex, 1) && self.look(is_hex, 2)) {
                return Err(ScanError::with_context(
                    context,
                    start,
                    self.mark,
                    "did not find URI escaped octet",
                )
                .into());
            }
            let rest = self.reader.rest();
            let octet = ((as_hex(rest, 1) << 4) + as_hex(rest, 2)) as u8;
            if width == 0 {
                width = match octet {
                    o if o & 0x80 == 0x00 => 1,
                    o if o & 0xE0 == 0xC0 => 2,
                    o if o & 0xF0 == 0xE0 => 3,
                    o if o & 0xF8 == 0xF0 => 4,
                    _ => {
                        return Err(ScanError::with_context(
                            context,
                            start,
                            self.mark,
                            "found an incorrect leading UTF-8 octet",
                        )
                        .into());
                    }
                };
            } else if octet & 0xC0 != 0x80 {
                return Err(ScanError::with_context(
                    context,
                    start,
                    self.mark,
                    "found an incorrect trailing UTF-8 octet",
                )
                .into());
            }
            uri.push(octet);
            self.skip();
            self.skip();
            self.skip();
            width -= 1;
            if width == 0 {
                break;
            }
        }
        Ok(())
    }

    fn scan_block_scalar(&mut self, literal: bool) -> Result<Token, Error> {
        let start = self.mark;
        self.skip();

        let mut chomping = Chomping::Clip;
        let mut increment = 0usize;
        self.cache(1)?;
        if matches!(self.ch(0), b'+' | b'-') {
            chomping = if self.ch(0) == b'+' {
                Chomping::Keep
            } else {
                Chomping::Strip
            };
            self.skip();
            self.cache(1)?;
            if self.look(is_digit, 0) {
                increment = self.scan_indentation_indicator(start)?;
            }
        } else if self.look(is_digit, 0) {
            increment = self.scan_indentation_indicator(start)?;
            self.cache(1)?;
            if matches!(self.ch(0), b'+' | b'-') {
                chomping = if self.ch(0) == b'+' {
                    Chomping::Keep
                } else {
                    Chomping::Strip
                };
                self.skip();
            }
        }

        // Eat whitespaces and comments to the end of the line.
        self.cache(1)?;
        while self.look(is_blank, 0) {
            self.skip();
            self.cache(1)?;
        }
        if self.ch(0) == b'#' {
            while !self.look(is_breakz, 0) {
                self.skip();
                self.cache(1)?;
            }
        }
        if !self.look(is_breakz, 0) {
            return Err(ScanError::with_context(
                "while scanning a block scalar",
                start,
                self.mark,
                "did not find expected comment or line break",
            )
            .into());
        }
        if self.look(is_break, 0) {
            self.cache(2)?;
            self.skip_line();
        }

        let mut end = self.mark;
        let mut indent: isize = 0;
        if increment > 0 {
            indent = if self.indent >= 0 {
                self.indent + increment as isize
            } else {
                increment as isize
            };
        }

        let mut value = Vec::new();
        let mut leading_break = Vec::new();
        let mut trailing_breaks = Vec::new();
        self.block_scalar_breaks(&mut indent, &mut trailing_breaks, start, &mut end)?;

        self.cache(1)?;
        let mut leading_blank = false;
        while self.mark.column as isize == indent && !self.look(is_z, 0) {
            // We are at the beginning of a non-empty line.
            let trailing_blank = self.look(is_blank, 0);
            if !literal && leading_break.first() == Some(&b'\n') && !leading_blank && !trailing_blank
            {
                // Fold the break between two regular lines into a space.
                if trailing_breaks.is_empty() {
                    value.push(b' ');
                }
                leading_break.clear();
            } else {
                value.append(&mut leading_break);
            }
            value.append(&mut trailing_breaks);

            leading_blank = self.look(is_blank, 0);
            while !self.look(is_breakz, 0) {
                self.read(&mut value);
                self.cache(1)?;
            }
            self.cache(2)?;
            self.read_break(&mut leading_break);
            self.block_scalar_breaks(&mut indent, &mut trailing_breaks, start, &mut end)?;
        }

        if chomping != Chomping::Strip {
            value.append(&mut leading_break);
        }
        if chomping == Chomping::Keep {
            value.append(&mut trailing_breaks);
        }

        let style = if literal {
            ScalarStyle::Literal
        } else {
            ScalarStyle::Folded
        };
        Ok(Token::new(
            TokenKind::Scalar {
                style,
                value: into_string(value),
            },
            start,
            end,
        ))
    }

    fn scan_indentation_indicator(&mut self, start: Mark) -> Result<usize, Error> {
        if self.ch(0) == b'0' {
            return Err(ScanError::with_context(
                "while scanning a block scalar",
                start,
                self.mark,
                "found an indentation indicator equal to 0",
            )
            .into());
        }
        let increment = as_digit(self.reader.rest(), 0) as usize;
        self.skip();
        Ok(increment)
    }

    /// Consume the empty lines before block scalar content and settle the indentation if it
    /// was not given explicitly.
    fn block_scalar_breaks(
        &mut self,
        indent: &mut isize,
        breaks: &mut Vec<u8>,
        start: Mark,
        end: &mut Mark,
    ) -> Result<(), Error> {
        let mut max_indent: isize = 0;
        *end = self.mark;
        loop {
            self.cache(1)?;
            while (*indent == 0 || (self.mark.column as isize) < *indent) && self.look(is_space, 0)
            {
                self.skip();
                self.cache(1)?;
            }
            max_indent = max_indent.max(self.mark.column as isize);
            if (*indent == 0 || (self.mark.column as isize) < *indent) && self.look(is_tab, 0) {
                return Err(ScanError::with_context(
                    "while scanning a block scalar",
                    start,
                    self.mark,
                    "found a tab character where an indentation space is expected",
                )
                .into());
            }
            if !self.look(is_break, 0) {
                break;
            }
            self.cache(2)?;
            self.read_break(breaks);
            *end = self.mark;
        }
        if *indent == 0 {
            *indent = max_indent.max(self.indent + 1).max(1);
        }
        Ok(())
    }

    fn scan_flow_scalar(&mut self, single: bool) -> Result<Token, Error> {
        let start = self.mark;
        self.skip();

        let quote = if single { b'\'' } else { b'"' };
        let mut value = Vec::new();
        let mut leading_break = Vec::new();
        let mut trailing_breaks = Vec::new();
        let mut whitespaces = Vec::new();

        loop {
            self.cache(4)?;
            if self.mark.column == 0
                && (self.is_document_indicator(b'-') || self.is_document_indicator(b'.'))
            {
                return Err(ScanError::with_context(
                    "while scanning a quoted scalar",
                    start,
                    self.mark,
                    "found unexpected document indicator",
                )
                .into());
            }
            if self.look(is_z, 0) {
                return Err(ScanError::with_context(
                    "while scanning a quoted scalar",
                    start,
                    self.mark,
                    "found unexpected end of stream",
                )
                .into());
            }

            self.cache(2)?;
            let mut leading_blanks = false;
            while !self.look(is_blankz, 0) {
                let c = self.ch(0);
                if single && c == b'\'' && self.ch(1) == b'\'' {
                    value.push(b'\'');
                    self.skip();
                    self.skip();
                } else if c == quote {
                    break;
                } else if !single && c == b'\\' && self.look(is_break, 1) {
                    // An escaped line break joins the lines without a space.
                    self.cache(3)?;
                    self.skip();
                    self.skip_line();
                    leading_blanks = true;
                    break;
                } else if !single && c == b'\\' {
                    self.scan_escape(start, &mut value)?;
                } else {
                    self.read(&mut value);
                }
                self.cache(2)?;
            }

            self.cache(1)?;
            if self.ch(0) == quote {
                break;
            }

            // Consume blank characters and line breaks.
            self.cache(1)?;
            while self.look(is_blank, 0) || self.look(is_break, 0) {
                if self.look(is_blank, 0) {
                    if leading_blanks {
                        self.skip();
                    } else {
                        self.read(&mut whitespaces);
                    }
                } else {
                    self.cache(2)?;
                    if leading_blanks {
                        self.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.cache(1)?;
            }

            if leading_blanks {
                fold_breaks(&mut value, &mut leading_break, &mut trailing_breaks);
            } else {
                value.append(&mut whitespaces);
            }
        }

        // Eat the right quote.
        self.skip();
        let style = if single {
            ScalarStyle::SingleQuoted
        } else {
            ScalarStyle::DoubleQuoted
        };
        Ok(Token::new(
            TokenKind::Scalar {
                style,
                value: into_string(value),
            },
            start,
            self.mark,
        ))
    }

    /// Process one `\` escape sequence of a double-quoted scalar.
    fn scan_escape(&mut self, start: Mark, value: &mut Vec<u8>) -> Result<(), Error> {
        let mut code_length = 0usize;
        match self.ch(1) {
            b'0' => value.push(b'\0'),
            b'a' => value.push(b'\x07'),
            b'b' => value.push(b'\x08'),
            b't' | b'\t' => value.push(b'\t'),
            b'n' => value.push(b'\n'),
            b'v' => value.push(b'\x0B'),
            b'f' => value.push(b'\x0C'),
            b'r' => value.push(b'\r'),
            b'e' => value.push(b'\x1B'),
            b' ' => value.push(b' '),
            b'"' => value.push(b'"'),
            b'/' => value.push(b'/'),
            b'\'' => value.push(b'\''),
            b'\\' => value.push(b'\\'),
            // NEL, non-breaking space, line separator, paragraph separator.
            b'N' => value.extend_from_slice("\u{0085}".as_bytes()),
            b'_' => value.extend_from_slice("\u{00A0}".as_bytes()),
            b'L' => value.extend_from_slice("\u{2028}".as_bytes()),
            b'P' => value.extend_from_slice("\u{2029}".as_bytes()),
            b'x' => code_length = 2,
            b'u' => code_length = 4,
            b'U' => code_length = 8,
            _ => {
                return Err(ScanError::with_context(
                    "while parsing a quoted scalar",
                    start,
                    self.mark,
                    "found unknown escape character",
                )
                .into());
            }
        }
        self.skip();
        self.skip();

        if code_length > 0 {
            self.cache(code_length)?;
            let mut code = 0u32;
            for k in 0..code_length {
                if !self.look(is_hex, k) {
                    return Err(ScanError::with_context(
                        "while parsing a quoted scalar",
                        start,
                        self.mark,
                        "did not find expected hexdecimal number",
                    )
                    .into());
                }
                code = (code << 4) + as_hex(self.reader.rest(), k);
            }
            let ch = char::from_u32(code).ok_or_else(|| {
                Error::from(ScanError::with_context(
                    "while parsing a quoted scalar",
                    start,
                    self.mark,
                    "found invalid Unicode character escape code",
                ))
            })?;
            let mut utf8 = [0u8; 4];
            value.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            for _ in 0..code_length {
                self.skip();
            }
        }
        Ok(())
    }

    fn scan_plain_scalar(&mut self) -> Result<Token, Error> {
        let start = self.mark;
        let mut end = self.mark;
        let indent = self.indent + 1;

        let mut value = Vec::new();
        let mut leading_break = Vec::new();
        let mut trailing_breaks = Vec::new();
        let mut whitespaces = Vec::new();
        let mut leading_blanks = false;

        loop {
            self.cache(4)?;
            if self.mark.column == 0
                && (self.is_document_indicator(b'-') || self.is_document_indicator(b'.'))
            {
                break;
            }
            if self.ch(0) == b'#' {
                break;
            }

            while !self.look(is_blankz, 0) {
                let c = self.ch(0);
                if (c == b':' && self.look(is_blankz, 1))
                    || (self.flow_level > 0
                        && matches!(c, b',' | b'?' | b'[' | b']' | b'{' | b'}'))
                {
                    break;
                }
                if leading_blanks || !whitespaces.is_empty() {
                    if leading_blanks {
                        fold_breaks(&mut value, &mut leading_break, &mut trailing_breaks);
                        leading_blanks = false;
                    } else {
                        value.append(&mut whitespaces);
                    }
                }
                self.read(&mut value);
                end = self.mark;
                self.cache(2)?;
            }

            if !(self.look(is_blank, 0) || self.look(is_break, 0)) {
                break;
            }

            self.cache(1)?;
            while self.look(is_blank, 0) || self.look(is_break, 0) {
                if self.look(is_blank, 0) {
                    if leading_blanks
                        && (self.mark.column as isize) < indent
                        && self.look(is_tab, 0)
                    {
                        return Err(ScanError::with_context(
                            "while scanning a plain scalar",
                            start,
                            self.mark,
                            "found a tab character that violates indentation",
                        )
                        .into());
                    }
                    if leading_blanks {
                        self.skip();
                    } else {
                        self.read(&mut whitespaces);
                    }
                } else {
                    self.cache(2)?;
                    if leading_blanks {
                        self.read_break(&mut trailing_breaks);
                    } else {
                        whitespaces.clear();
                        self.read_break(&mut leading_break);
                        leading_blanks = true;
                    }
                }
                self.cache(1)?;
            }

            if self.flow_level == 0 && (self.mark.column as isize) < indent {
                break;
            }
        }

        // A line break inside the scalar allows a simple key on the next line.
        if leading_blanks {
            self.simple_key_allowed = true;
        }
        Ok(Token::new(
            TokenKind::Scalar {
                style: ScalarStyle::Plain,
                value: into_string(value),
            },
            start,
            end,
        ))
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}

/// Join the line breaks collected inside a flow or plain scalar: a single break between two
/// lines becomes a space, `n` breaks become `n - 1` newlines.
fn fold_breaks(value: &mut Vec<u8>, leading_break: &mut Vec<u8>, trailing_breaks: &mut Vec<u8>) {
    if leading_break.first() == Some(&b'\n') {
        if trailing_breaks.is_empty() {
            value.push(b' ');
        } else {
            value.append(trailing_breaks);
        }
        leading_break.clear();
    } else {
        value.append(leading_break);
        value.append(trailing_breaks);
    }
}

fn into_string(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|err| String::from_utf8_lossy(err.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Scanner::from_slice(input.as_bytes())
            .map(|token| token.expect("scan must succeed").kind)
            .collect()
    }

    fn scalars(input: &str) -> Vec<String> {
        kinds(input)
            .into_iter()
            .filter_map(|kind| match kind {
                TokenKind::Scalar { value, .. } => Some(value),
                _ => None,
            })
            .collect()
    }

    fn scan_error(input: &str) -> ScanError {
        let mut scanner = Scanner::from_slice(input.as_bytes());
        loop {
            match scanner.next_token() {
                Ok(Some(_)) => continue,
                Ok(None) => panic!("expected a scan error for {input:?}"),
                Err(Error::Scan(err)) => return err,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
    }

    fn plain(value: &str) -> TokenKind {
        TokenKind::Scalar {
            style: ScalarStyle::Plain,
            value: value.to_owned(),
        }
    }

    #[test]
    fn block_mapping_gets_key_inserted_before_simple_key() {
        use TokenKind::*;
        assert_eq!(
            kinds("a: 1\nb: 2\n"),
            vec![
                StreamStart(Encoding::Utf8),
                BlockMappingStart,
                Key,
                plain("a"),
                Value,
                plain("1"),
                Key,
                plain("b"),
                Value,
                plain("2"),
                BlockEnd,
                StreamEnd,
            ]
        );
    }

    #[test]
    fn nested_block_sequence_unrolls_on_dedent() {
        use TokenKind::*;
        assert_eq!(
            kinds("k:\n  - x\n  - y\nz: 1"),
            vec![
                StreamStart(Encoding::Utf8),
                BlockMappingStart,
                Key,
                plain("k"),
                Value,
                BlockSequenceStart,
                BlockEntry,
                plain("x"),
                BlockEntry,
                plain("y"),
                BlockEnd,
                Key,
                plain("z"),
                Value,
                plain("1"),
                BlockEnd,
                StreamEnd,
            ]
        );
    }

    #[test]
    fn flow_collections_and_anchors() {
        use TokenKind::*;
        assert_eq!(
            kinds("{a: &x [1, *x], b: !!str c}"),
            vec![
                StreamStart(Encoding::Utf8),
                FlowMappingStart,
                Key,
                plain("a"),
                Value,
                Anchor("x".into()),
                FlowSequenceStart,
                plain("1"),
                FlowEntry,
                Alias("x".into()),
                FlowSequenceEnd,
                FlowEntry,
                Key,
                plain("b"),
                Value,
                Tag {
                    handle: "!!".into(),
                    suffix: "str".into()
                },
                plain("c"),
                FlowMappingEnd,
                StreamEnd,
            ]
        );
    }

    #[test]
    fn plain_scalars_fold_line_breaks() {
        assert_eq!(scalars("a b\n  c\n\n  d"), vec!["a b c\nd"]);
        assert_eq!(scalars("[http://x.y/z, a:b]"), vec!["http://x.y/z", "a:b"]);
    }

    #[test]
    fn quoted_scalars_fold_and_escape() {
        assert_eq!(scalars("'it''s\n  here'"), vec!["it's here"]);
        assert_eq!(
            scalars(r#""tab\tnl\nx\x41\u00e9\U0001F600 \N\_""#),
            vec!["tab\tnl\nxAé😀 \u{85}\u{a0}"]
        );
        assert_eq!(scalars("\"join\\\n   ed\""), vec!["joined"]);
        assert_eq!(scalars("\"a\n\n  b\""), vec!["a\nb"]);
    }

    #[test]
    fn literal_block_chomping() {
        assert_eq!(scalars("|\n  a\n   b\n\n"), vec!["a\n b\n"]);
        assert_eq!(scalars("|-\n  a\n\n"), vec!["a"]);
        assert_eq!(scalars("|+\n  a\n\n\n"), vec!["a\n\n\n"]);
        assert_eq!(scalars("|2\n   a\n  b\n"), vec![" a\nb\n"]);
    }

    #[test]
    fn folded_block_joins_lines() {
        assert_eq!(scalars(">\n  one\n  two\n\n  three\n"), vec!["one two\nthree\n"]);
        assert_eq!(
            scalars(">\n  a\n    indented\n  b\n"),
            vec!["a\n  indented\nb\n"]
        );
    }

    #[test]
    fn directives_and_verbatim_tags() {
        use TokenKind::*;
        let tokens = kinds("%YAML 1.1\n%TAG !e! tag:example.com,2000:\n--- !<tag:x> v\n...\n");
        assert_eq!(tokens[1], VersionDirective { major: 1, minor: 1 });
        assert_eq!(
            tokens[2],
            TagDirective {
                handle: "!e!".into(),
                prefix: "tag:example.com,2000:".into()
            }
        );
        assert_eq!(tokens[3], DocumentStart);
        assert_eq!(
            tokens[4],
            Tag {
                handle: String::new(),
                suffix: "tag:x".into()
            }
        );
        assert_eq!(tokens[6], DocumentEnd);
    }

    #[test]
    fn lone_bang_tag() {
        let tokens = kinds("! a");
        assert_eq!(
            tokens[1],
            TokenKind::Tag {
                handle: String::new(),
                suffix: "!".into()
            }
        );
    }

    #[test]
    fn uri_escapes_are_decoded() {
        let tokens = kinds("!e%C3%A9 a");
        assert_eq!(
            tokens[1],
            TokenKind::Tag {
                handle: "!".into(),
                suffix: "eé".into()
            }
        );
    }

    #[test]
    fn required_simple_key_must_find_colon() {
        let err = scan_error("a: b\nc\nd: e\n");
        assert_eq!(err.problem(), "could not find expected ':'");
        assert_eq!(err.context(), Some("while scanning a simple key"));
        assert_eq!(err.context_mark().map(|m| m.line()), Some(1));
    }

    #[test]
    fn tabs_cannot_indent() {
        let err = scan_error("a:\n\tb: 1\n");
        assert_eq!(err.problem(), "found character that cannot start any token");
    }

    #[test]
    fn unknown_escape_is_rejected() {
        let err = scan_error(r#""\q""#);
        assert_eq!(err.problem(), "found unknown escape character");
    }

    #[test]
    fn unterminated_quote_is_rejected() {
        let err = scan_error("'abc");
        assert_eq!(err.problem(), "found unexpected end of stream");
    }

    #[test]
    fn flow_depth_is_capped() {
        let input = "[".repeat(DEFAULT_MAX_FLOW_LEVEL + 1);
        let err = scan_error(&input);
        assert_eq!(err.problem(), "exceeded max depth of 10000");

        let mut scanner = Scanner::from_slice(b"[[[1]]]").with_limits(2, 2);
        let result: Result<Vec<_>, _> = scanner.by_ref().collect();
        assert!(result.is_err());
    }

    #[test]
    fn block_depth_is_capped() {
        let mut input = String::new();
        for depth in 0..5 {
            input.push_str(&" ".repeat(depth));
            input.push_str("k:\n");
        }
        let result: Result<Vec<_>, _> = Scanner::from_slice(input.as_bytes())
            .with_limits(DEFAULT_MAX_FLOW_LEVEL, 3)
            .collect();
        match result {
            Err(Error::Scan(err)) => assert_eq!(err.problem(), "exceeded max depth of 3"),
            other => panic!("expected depth error, got {other:?}"),
        }
    }

    #[test]
    fn marks_track_lines_and_columns() {
        let tokens: Vec<Token> = Scanner::from_slice("a:\n  bé: c".as_bytes())
            .collect::<Result<_, _>>()
            .unwrap();
        let inner_key = tokens
            .iter()
            .find(|t| t.kind == plain("bé"))
            .expect("inner key");
        assert_eq!(inner_key.start.line(), 1);
        assert_eq!(inner_key.start.column(), 2);
        assert_eq!(inner_key.end.column(), 4);
        assert_eq!(inner_key.end.index() - inner_key.start.index(), 3);
    }
}
