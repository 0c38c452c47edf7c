//! Event parser: a pull-based state machine over the scanner's tokens.
//!
//! Each call to [`Parser::next_event`] runs the machine until exactly one event is ready.
//! Nested collections push the state to return to on a stack; a parallel stack of marks
//! remembers where each open collection started so errors can name it.

use std::io::Read;

use smallvec::SmallVec;

use crate::error::{Error, ScanError};
use crate::location::Mark;
use crate::reader::Encoding;
use crate::scanner::{ScalarStyle, Scanner, Token, TokenKind};

/// The standard tag prefix `!!` expands to.
pub const DEFAULT_TAG_PREFIX: &str = "tag:yaml.org,2002:";

/// A `%TAG` directive: a handle and the prefix it expands to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagDirective {
    pub handle: String,
    pub prefix: String,
}

impl TagDirective {
    fn new(handle: &str, prefix: &str) -> Self {
        Self {
            handle: handle.to_owned(),
            prefix: prefix.to_owned(),
        }
    }
}

/// What happened at a point of the stream.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    StreamStart(Encoding),
    StreamEnd,
    DocumentStart {
        /// The `%YAML` directive, if present.
        version: Option<(u32, u32)>,
        /// The `%TAG` directives given for this document.
        tags: Vec<TagDirective>,
        /// No `---` marker.
        implicit: bool,
    },
    DocumentEnd {
        /// No `...` marker.
        implicit: bool,
    },
    Alias {
        anchor: String,
    },
    Scalar {
        anchor: Option<String>,
        /// The fully expanded tag.
        tag: Option<String>,
        value: String,
        /// The tag may be omitted when the scalar is written plain.
        plain_implicit: bool,
        /// The tag may be omitted when the scalar is written quoted.
        quoted_implicit: bool,
        style: ScalarStyle,
    },
    SequenceStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow: bool,
    },
    SequenceEnd,
    MappingStart {
        anchor: Option<String>,
        tag: Option<String>,
        implicit: bool,
        flow: bool,
    },
    MappingEnd,
}

/// An event with the span of the tokens that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub start: Mark,
    pub end: Mark,
}

impl Event {
    fn new(kind: EventKind, start: Mark, end: Mark) -> Self {
        Self { kind, start, end }
    }

    /// The zero-length plain scalar standing in for a missing node.
    fn empty_scalar(mark: Mark) -> Self {
        Self::new(
            EventKind::Scalar {
                anchor: None,
                tag: None,
                value: String::new(),
                plain_implicit: true,
                quoted_implicit: false,
                style: ScalarStyle::Plain,
            },
            mark,
            mark,
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    StreamStart,
    ImplicitDocumentStart,
    DocumentStart,
    DocumentContent,
    DocumentEnd,
    BlockNode,
    BlockNodeOrIndentlessSequence,
    FlowNode,
    BlockSequenceFirstEntry,
    BlockSequenceEntry,
    IndentlessSequenceEntry,
    BlockMappingFirstKey,
    BlockMappingKey,
    BlockMappingValue,
    FlowSequenceFirstEntry,
    FlowSequenceEntry,
    FlowSequenceEntryMappingKey,
    FlowSequenceEntryMappingValue,
    FlowSequenceEntryMappingEnd,
    FlowMappingFirstKey,
    FlowMappingKey,
    FlowMappingValue,
    FlowMappingEmptyValue,
    End,
}

/// The YAML event parser.
pub struct Parser<'a> {
    scanner: Scanner<'a>,
    state: State,
    states: SmallVec<[State; 16]>,
    marks: SmallVec<[Mark; 16]>,
    /// Tag directives in effect for the current document, defaults included.
    tag_directives: Vec<TagDirective>,
}

impl<'a> Parser<'a> {
    pub fn new(scanner: Scanner<'a>) -> Self {
        Self {
            scanner,
            state: State::StreamStart,
            states: SmallVec::new(),
            marks: SmallVec::new(),
            tag_directives: Vec::new(),
        }
    }

    pub fn from_slice(input: &'a [u8]) -> Self {
        Self::new(Scanner::from_slice(input))
    }

    pub fn from_read<R: Read + 'a>(input: R) -> Self {
        Self::new(Scanner::from_read(input))
    }

    /// Produce the next event; `None` once the stream end was delivered.
    pub fn next_event(&mut self) -> Result<Option<Event>, Error> {
        if self.state == State::End {
            return Ok(None);
        }
        let event = self.state_machine()?;
        debug_print!("{:?}", event.kind);
        Ok(Some(event))
    }

    fn state_machine(&mut self) -> Result<Event, Error> {
        match self.state {
            State::StreamStart => self.stream_start(),
            State::ImplicitDocumentStart => self.document_start(true),
            State::DocumentStart => self.document_start(false),
            State::DocumentContent => self.document_content(),
            State::DocumentEnd => self.document_end(),
            State::BlockNode => self.parse_node(true, false),
            State::BlockNodeOrIndentlessSequence => self.parse_node(true, true),
            State::FlowNode => self.parse_node(false, false),
            State::BlockSequenceFirstEntry => self.block_sequence_entry(true),
            State::BlockSequenceEntry => self.block_sequence_entry(false),
            State::IndentlessSequenceEntry => self.indentless_sequence_entry(),
            State::BlockMappingFirstKey => self.block_mapping_key(true),
            State::BlockMappingKey => self.block_mapping_key(false),
            State::BlockMappingValue => self.block_mapping_value(),
            State::FlowSequenceFirstEntry => self.flow_sequence_entry(true),
            State::FlowSequenceEntry => self.flow_sequence_entry(false),
            State::FlowSequenceEntryMappingKey => self.flow_sequence_entry_mapping_key(),
            State::FlowSequenceEntryMappingValue => self.flow_sequence_entry_mapping_value(),
            State::FlowSequenceEntryMappingEnd => self.flow_sequence_entry_mapping_end(),
            State::FlowMappingFirstKey => self.flow_mapping_key(true),
            State::FlowMappingKey => self.flow_mapping_key(false),
            State::FlowMappingValue => self.flow_mapping_value(false),
            State::FlowMappingEmptyValue => self.flow_mapping_value(true),
            State::End => Err(ScanError::new(self.scanner.mark(), "no more events").into()),
        }
    }

    fn peek(&mut self) -> Result<&Token, Error> {
        self.scanner.peek_token()
    }

    /// Consume the token returned by the last peek.
    fn take(&mut self) -> Result<Token, Error> {
        let mark = self.scanner.mark();
        self.scanner
            .next_token()?
            .ok_or_else(|| ScanError::new(mark, "unexpected end of the token stream").into())
    }

    fn skip(&mut self) {
        self.scanner.skip_token();
    }

    fn pop_state(&mut self) -> State {
        self.states.pop().unwrap_or(State::End)
    }

    fn pop_mark(&mut self) -> Mark {
        self.marks.pop().unwrap_or_default()
    }

    /// Remember where a collection starts and consume its opening token.
    fn open_collection(&mut self) -> Result<(), Error> {
        let start = self.peek()?.start;
        self.marks.push(start);
        self.skip();
        Ok(())
    }

    fn stream_start(&mut self) -> Result<Event, Error> {
        let token = self.take()?;
        let TokenKind::StreamStart(encoding) = token.kind else {
            return Err(ScanError::new(token.start, "did not find expected <stream-start>").into());
        };
        self.state = State::ImplicitDocumentStart;
        Ok(Event::new(
            EventKind::StreamStart(encoding),
            token.start,
            token.end,
        ))
    }

    fn document_start(&mut self, implicit: bool) -> Result<Event, Error> {
        // Extra document end indicators are allowed between documents.
        if !implicit {
            while self.peek()?.kind == TokenKind::DocumentEnd {
                self.skip();
            }
        }

        let token = self.peek()?;
        let (start, end) = (token.start, token.end);
        let stream_end = token.kind == TokenKind::StreamEnd;
        let directive_or_marker = stream_end
            || matches!(
                token.kind,
                TokenKind::VersionDirective { .. }
                    | TokenKind::TagDirective { .. }
                    | TokenKind::DocumentStart
            );

        if implicit && !directive_or_marker {
            self.process_directives()?;
            self.states.push(State::DocumentEnd);
            self.state = State::BlockNode;
            return Ok(Event::new(
                EventKind::DocumentStart {
                    version: None,
                    tags: Vec::new(),
                    implicit: true,
                },
                start,
                end,
            ));
        }

        if stream_end {
            self.state = State::End;
            self.skip();
            return Ok(Event::new(EventKind::StreamEnd, start, end));
        }

        let (version, tags) = self.process_directives()?;
        let token = self.peek()?;
        if token.kind != TokenKind::DocumentStart {
            return Err(
                ScanError::new(token.start, "did not find expected <document start>").into(),
            );
        }
        let end = token.end;
        self.states.push(State::DocumentEnd);
        self.state = State::DocumentContent;
        self.skip();
        Ok(Event::new(
            EventKind::DocumentStart {
                version,
                tags,
                implicit: false,
            },
            start,
            end,
        ))
    }

    fn document_content(&mut self) -> Result<Event, Error> {
        let token = self.peek()?;
        if matches!(
            token.kind,
            TokenKind::VersionDirective { .. }
                | TokenKind::TagDirective { .. }
                | TokenKind::DocumentStart
                | TokenKind::DocumentEnd
                | TokenKind::StreamEnd
        ) {
            let mark = token.start;
            self.state = self.pop_state();
            return Ok(Event::empty_scalar(mark));
        }
        self.parse_node(true, false)
    }

    fn document_end(&mut self) -> Result<Event, Error> {
        let token = self.peek()?;
        let start = token.start;
        let mut end = token.start;
        let mut implicit = true;
        if token.kind == TokenKind::DocumentEnd {
            end = token.end;
            implicit = false;
            self.skip();
        }
        self.tag_directives.clear();
        self.state = State::DocumentStart;
        Ok(Event::new(EventKind::DocumentEnd { implicit }, start, end))
    }

    /// Collect the directives in front of a document and install the default tag handles.
    fn process_directives(
        &mut self,
    ) -> Result<(Option<(u32, u32)>, Vec<TagDirective>), Error> {
        let mut version = None;
        let mut tags = Vec::new();
        loop {
            let token = self.scanner.peek_token()?;
            let mark = token.start;
            match &token.kind {
                TokenKind::VersionDirective { major, minor } => {
                    if version.is_some() {
                        return Err(ScanError::new(mark, "found duplicate %YAML directive").into());
                    }
                    if (*major, *minor) != (1, 1) {
                        return Err(ScanError::new(mark, "found incompatible YAML document").into());
                    }
                    version = Some((*major, *minor));
                }
                TokenKind::TagDirective { handle, prefix } => {
                    let directive = TagDirective::new(handle, prefix);
                    if self.tag_directives.iter().any(|d| d.handle == directive.handle) {
                        return Err(ScanError::new(mark, "found duplicate %TAG directive").into());
                    }
                    self.tag_directives.push(directive.clone());
                    tags.push(directive);
                }
                _ => break,
            }
            self.skip();
        }
        for (handle, prefix) in [("!", "!"), ("!!", DEFAULT_TAG_PREFIX)] {
            if !self.tag_directives.iter().any(|d| d.handle == handle) {
                self.tag_directives.push(TagDirective::new(handle, prefix));
            }
        }
        Ok((version, tags))
    }

    /// Expand a tag token against the active tag directives.
    fn resolve_tag(
        &self,
        handle: String,
        suffix: String,
        node_start: Mark,
        tag_mark: Mark,
    ) -> Result<String, Error> {
        if handle.is_empty() {
            return Ok(suffix);
        }
        self.tag_directives
            .iter()
            .find(|d| d.handle == handle)
            .map(|d| format!("{}{}", d.prefix, suffix))
            .ok_or_else(|| {
                ScanError::with_context(
                    "while parsing a node",
                    node_start,
                    tag_mark,
                    "found undefined tag handle",
                )
                .into()
            })
    }

    fn parse_node(&mut self, block: bool, indentless_sequence: bool) -> Result<Event, Error> {
        if matches!(self.peek()?.kind, TokenKind::Alias(_)) {
            let token = self.take()?;
            self.state = self.pop_state();
            if let TokenKind::Alias(anchor) = token.kind {
                return Ok(Event::new(EventKind::Alias { anchor }, token.start, token.end));
            }
        }

        // Node properties: an anchor and a tag, in either order.
        let mut anchor = None;
        let mut tag_token = None;
        let mut start = None;
        let mut end = None;
        loop {
            let token = self.peek()?;
            let can_take = match token.kind {
                TokenKind::Anchor(_) => anchor.is_none(),
                TokenKind::Tag { .. } => tag_token.is_none(),
                _ => false,
            };
            if !can_take {
                break;
            }
            let token = self.take()?;
            start.get_or_insert(token.start);
            end = Some(token.end);
            match token.kind {
                TokenKind::Anchor(name) => anchor = Some(name),
                TokenKind::Tag { handle, suffix } => tag_token = Some((handle, suffix, token.start)),
                _ => {}
            }
        }

        let token = self.peek()?;
        let start = start.unwrap_or(token.start);
        let end = end.unwrap_or(token.start);
        let tag = match tag_token {
            Some((handle, suffix, tag_mark)) => {
                Some(self.resolve_tag(handle, suffix, start, tag_mark)?)
            }
            None => None,
        };
        let implicit = tag.as_deref().is_none_or(str::is_empty);

        let token = self.peek()?;
        let token_start = token.start;
        let token_end = token.end;
        match token.kind {
            TokenKind::BlockEntry if indentless_sequence => {
                self.state = State::IndentlessSequenceEntry;
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        flow: false,
                    },
                    start,
                    token_end,
                ))
            }
            TokenKind::Scalar { .. } => {
                let token = self.take()?;
                self.state = self.pop_state();
                let TokenKind::Scalar { style, value } = token.kind else {
                    return Err(ScanError::new(token.start, "did not find expected scalar").into());
                };
                let plain_implicit = (implicit && style == ScalarStyle::Plain)
                    || tag.as_deref() == Some("!");
                let quoted_implicit = implicit && !plain_implicit;
                Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        value,
                        plain_implicit,
                        quoted_implicit,
                        style,
                    },
                    start,
                    token.end,
                ))
            }
            TokenKind::FlowSequenceStart => {
                self.state = State::FlowSequenceFirstEntry;
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        flow: true,
                    },
                    start,
                    token_end,
                ))
            }
            TokenKind::FlowMappingStart => {
                self.state = State::FlowMappingFirstKey;
                Ok(Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        flow: true,
                    },
                    start,
                    token_end,
                ))
            }
            TokenKind::BlockSequenceStart if block => {
                self.state = State::BlockSequenceFirstEntry;
                Ok(Event::new(
                    EventKind::SequenceStart {
                        anchor,
                        tag,
                        implicit,
                        flow: false,
                    },
                    start,
                    token_end,
                ))
            }
            TokenKind::BlockMappingStart if block => {
                self.state = State::BlockMappingFirstKey;
                Ok(Event::new(
                    EventKind::MappingStart {
                        anchor,
                        tag,
                        implicit,
                        flow: false,
                    },
                    start,
                    token_end,
                ))
            }
            _ if anchor.is_some() || tag.is_some() => {
                // Properties without content: an empty plain scalar.
                self.state = self.pop_state();
                Ok(Event::new(
                    EventKind::Scalar {
                        anchor,
                        tag,
                        value: String::new(),
                        plain_implicit: implicit,
                        quoted_implicit: false,
                        style: ScalarStyle::Plain,
                    },
                    start,
                    end,
                ))
            }
            _ => {
                let context = if block {
                    "while parsing a block node"
                } else {
                    "while parsing a flow node"
                };
                Err(ScanError::with_context(
                    context,
                    start,
                    token_start,
                    "did not find expected node content",
                )
                .into())
            }
        }
    }

    fn block_sequence_entry(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.open_collection()?;
        }
        let token = self.peek()?;
        match token.kind {
            TokenKind::BlockEntry => {
                let mark = token.end;
                self.skip();
                let next = &self.peek()?.kind;
                if matches!(next, TokenKind::BlockEntry | TokenKind::BlockEnd) {
                    self.state = State::BlockSequenceEntry;
                    Ok(Event::empty_scalar(mark))
                } else {
                    self.states.push(State::BlockSequenceEntry);
                    self.parse_node(true, false)
                }
            }
            TokenKind::BlockEnd => {
                let (start, end) = (token.start, token.end);
                self.state = self.pop_state();
                self.pop_mark();
                self.skip();
                Ok(Event::new(EventKind::SequenceEnd, start, end))
            }
            _ => {
                let problem_mark = token.start;
                let context_mark = self.pop_mark();
                Err(ScanError::with_context(
                    "while parsing a block collection",
                    context_mark,
                    problem_mark,
                    "did not find expected '-' indicator",
                )
                .into())
            }
        }
    }

    fn indentless_sequence_entry(&mut self) -> Result<Event, Error> {
        let token = self.peek()?;
        if token.kind == TokenKind::BlockEntry {
            let mark = token.end;
            self.skip();
            let next = &self.peek()?.kind;
            if matches!(
                next,
                TokenKind::BlockEntry | TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = State::IndentlessSequenceEntry;
                return Ok(Event::empty_scalar(mark));
            }
            self.states.push(State::IndentlessSequenceEntry);
            return self.parse_node(true, false);
        }
        let mark = token.start;
        self.state = self.pop_state();
        Ok(Event::new(EventKind::SequenceEnd, mark, mark))
    }

    fn block_mapping_key(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.open_collection()?;
        }
        let token = self.peek()?;
        match token.kind {
            TokenKind::Key => {
                let mark = token.end;
                self.skip();
                let next = &self.peek()?.kind;
                if matches!(
                    next,
                    TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
                ) {
                    self.state = State::BlockMappingValue;
                    Ok(Event::empty_scalar(mark))
                } else {
                    self.states.push(State::BlockMappingValue);
                    self.parse_node(true, true)
                }
            }
            TokenKind::BlockEnd => {
                let (start, end) = (token.start, token.end);
                self.state = self.pop_state();
                self.pop_mark();
                self.skip();
                Ok(Event::new(EventKind::MappingEnd, start, end))
            }
            _ => {
                let problem_mark = token.start;
                let context_mark = self.pop_mark();
                Err(ScanError::with_context(
                    "while parsing a block mapping",
                    context_mark,
                    problem_mark,
                    "did not find expected key",
                )
                .into())
            }
        }
    }

    fn block_mapping_value(&mut self) -> Result<Event, Error> {
        let token = self.peek()?;
        if token.kind == TokenKind::Value {
            let mark = token.end;
            self.skip();
            let next = &self.peek()?.kind;
            if matches!(
                next,
                TokenKind::Key | TokenKind::Value | TokenKind::BlockEnd
            ) {
                self.state = State::BlockMappingKey;
                return Ok(Event::empty_scalar(mark));
            }
            self.states.push(State::BlockMappingKey);
            return self.parse_node(true, true);
        }
        let mark = token.start;
        self.state = State::BlockMappingKey;
        Ok(Event::empty_scalar(mark))
    }

    fn flow_sequence_entry(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.open_collection()?;
        }
        let mut token = self.peek()?;
        if token.kind != TokenKind::FlowSequenceEnd {
            if !first {
                if token.kind == TokenKind::FlowEntry {
                    self.skip();
                    token = self.peek()?;
                } else {
                    let problem_mark = token.start;
                    let context_mark = self.pop_mark();
                    return Err(ScanError::with_context(
                        "while parsing a flow sequence",
                        context_mark,
                        problem_mark,
                        "did not find expected ',' or ']'",
                    )
                    .into());
                }
            }
            if token.kind == TokenKind::Key {
                // A single-pair mapping inside a flow sequence: `[a: b]`.
                let (start, end) = (token.start, token.end);
                self.state = State::FlowSequenceEntryMappingKey;
                self.skip();
                return Ok(Event::new(
                    EventKind::MappingStart {
                        anchor: None,
                        tag: None,
                        implicit: true,
                        flow: true,
                    },
                    start,
                    end,
                ));
            }
            if token.kind != TokenKind::FlowSequenceEnd {
                self.states.push(State::FlowSequenceEntry);
                return self.parse_node(false, false);
            }
        }
        let (start, end) = (token.start, token.end);
        self.state = self.pop_state();
        self.pop_mark();
        self.skip();
        Ok(Event::new(EventKind::SequenceEnd, start, end))
    }

    fn flow_sequence_entry_mapping_key(&mut self) -> Result<Event, Error> {
        let token = self.peek()?;
        if !matches!(
            token.kind,
            TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
        ) {
            self.states.push(State::FlowSequenceEntryMappingValue);
            return self.parse_node(false, false);
        }
        // Empty key. The ':' stays for the value state to consume.
        let mark = token.start;
        self.state = State::FlowSequenceEntryMappingValue;
        Ok(Event::empty_scalar(mark))
    }

    fn flow_sequence_entry_mapping_value(&mut self) -> Result<Event, Error> {
        let mut token = self.peek()?;
        if token.kind == TokenKind::Value {
            self.skip();
            token = self.peek()?;
            if !matches!(
                token.kind,
                TokenKind::FlowEntry | TokenKind::FlowSequenceEnd
            ) {
                self.states.push(State::FlowSequenceEntryMappingEnd);
                return self.parse_node(false, false);
            }
        }
        let mark = token.start;
        self.state = State::FlowSequenceEntryMappingEnd;
        Ok(Event::empty_scalar(mark))
    }

    fn flow_sequence_entry_mapping_end(&mut self) -> Result<Event, Error> {
        let mark = self.peek()?.start;
        self.state = State::FlowSequenceEntry;
        Ok(Event::new(EventKind::MappingEnd, mark, mark))
    }

    fn flow_mapping_key(&mut self, first: bool) -> Result<Event, Error> {
        if first {
            self.open_collection()?;
        }
        let mut token = self.peek()?;
        if token.kind != TokenKind::FlowMappingEnd {
            if !first {
                if token.kind == TokenKind::FlowEntry {
                    self.skip();
                    token = self.peek()?;
                } else {
                    let problem_mark = token.start;
                    let context_mark = self.pop_mark();
                    return Err(ScanError::with_context(
                        "while parsing a flow mapping",
                        context_mark,
                        problem_mark,
                        "did not find expected ',' or '}'",
                    )
                    .into());
                }
            }
            if token.kind == TokenKind::Key {
                self.skip();
                let token = self.peek()?;
                if matches!(
                    token.kind,
                    TokenKind::Value | TokenKind::FlowEntry | TokenKind::FlowMappingEnd
                ) {
                    let mark = token.start;
                    self.state = State::FlowMappingValue;
                    return Ok(Event::empty_scalar(mark));
                }
                self.states.push(State::FlowMappingValue);
                return self.parse_node(false, false);
            }
            if token.kind != TokenKind::FlowMappingEnd {
                self.states.push(State::FlowMappingEmptyValue);
                return self.parse_node(false, false);
            }
        }
        let (start, end) = (token.start, token.end);
        self.state = self.pop_state();
        self.pop_mark();
        self.skip();
        Ok(Event::new(EventKind::MappingEnd, start, end))
    }

    fn flow_mapping_value(&mut self, empty: bool) -> Result<Event, Error> {
        let mut token = self.peek()?;
        if empty {
            let mark = token.start;
            self.state = State::FlowMappingKey;
            return Ok(Event::empty_scalar(mark));
        }
        if token.kind == TokenKind::Value {
            self.skip();
            token = self.peek()?;
            if !matches!(
                token.kind,
                TokenKind::FlowEntry | TokenKind::FlowMappingEnd
            ) {
                self.states.push(State::FlowMappingKey);
                return self.parse_node(false, false);
            }
        }
        let mark = token.start;
        self.state = State::FlowMappingKey;
        Ok(Event::empty_scalar(mark))
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Event, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => None,
            Err(err) => {
                // A failed parser is finished.
                self.state = State::End;
                Some(Err(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Compact rendering of an event stream, one letter group per event.
    fn trace(input: &str) -> Vec<String> {
        Parser::from_slice(input.as_bytes())
            .map(|event| {
                let event = event.expect("parse must succeed");
                match event.kind {
                    EventKind::StreamStart(_) => "+STR".to_owned(),
                    EventKind::StreamEnd => "-STR".to_owned(),
                    EventKind::DocumentStart { implicit, .. } => {
                        if implicit { "+DOC" } else { "+DOC ---" }.to_owned()
                    }
                    EventKind::DocumentEnd { implicit } => {
                        if implicit { "-DOC" } else { "-DOC ..." }.to_owned()
                    }
                    EventKind::Alias { anchor } => format!("=ALI *{anchor}"),
                    EventKind::Scalar {
                        anchor, tag, value, ..
                    } => {
                        let mut out = "=VAL".to_owned();
                        if let Some(anchor) = anchor {
                            out.push_str(&format!(" &{anchor}"));
                        }
                        if let Some(tag) = tag {
                            out.push_str(&format!(" <{tag}>"));
                        }
                        out.push_str(&format!(" :{value}"));
                        out
                    }
                    EventKind::SequenceStart { anchor, flow, .. } => {
                        let mut out = if flow { "+SEQ []" } else { "+SEQ" }.to_owned();
                        if let Some(anchor) = anchor {
                            out.push_str(&format!(" &{anchor}"));
                        }
                        out
                    }
                    EventKind::SequenceEnd => "-SEQ".to_owned(),
                    EventKind::MappingStart { anchor, flow, .. } => {
                        let mut out = if flow { "+MAP {}" } else { "+MAP" }.to_owned();
                        if let Some(anchor) = anchor {
                            out.push_str(&format!(" &{anchor}"));
                        }
                        out
                    }
                    EventKind::MappingEnd => "-MAP".to_owned(),
                }
            })
            .collect()
    }

    fn parse_error(input: &str) -> ScanError {
        for event in Parser::from_slice(input.as_bytes()) {
            match event {
                Ok(_) => continue,
                Err(Error::Scan(err)) => return err,
                Err(other) => panic!("unexpected error {other:?}"),
            }
        }
        panic!("expected a parse error for {input:?}");
    }

    #[test]
    fn block_mapping_with_indentless_sequence() {
        assert_eq!(
            trace("k:\n- a\n-\nv: &x 1\n"),
            vec![
                "+STR", "+DOC", "+MAP", "=VAL :k", "+SEQ", "=VAL :a", "=VAL :", "-SEQ",
                "=VAL :v", "=VAL &x :1", "-MAP", "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn empty_values_are_synthesized() {
        assert_eq!(
            trace("a:\nb:\n"),
            vec!["+STR", "+DOC", "+MAP", "=VAL :a", "=VAL :", "=VAL :b", "=VAL :", "-MAP", "-DOC", "-STR"]
        );
        assert_eq!(
            trace("{a, b: }"),
            vec![
                "+STR", "+DOC", "+MAP {}", "=VAL :a", "=VAL :", "=VAL :b", "=VAL :", "-MAP",
                "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn single_pair_mappings_in_flow_sequence() {
        assert_eq!(
            trace("[a: 1, ? : 2, b]"),
            vec![
                "+STR", "+DOC", "+SEQ []", "+MAP {}", "=VAL :a", "=VAL :1", "-MAP", "+MAP {}",
                "=VAL :", "=VAL :2", "-MAP", "=VAL :b", "-SEQ", "-DOC", "-STR",
            ]
        );
    }

    #[test]
    fn tags_expand_against_directives() {
        assert_eq!(
            trace("%TAG !e! tag:e.com,2000:\n--- !e!x [!!int 1, !local 2, ! 3]\n...\n"),
            vec![
                "+STR",
                "+DOC ---",
                "+SEQ []",
                "=VAL <tag:yaml.org,2002:int> :1",
                "=VAL <!local> :2",
                "=VAL <!> :3",
                "-SEQ",
                "-DOC ...",
                "-STR",
            ]
        );
    }

    #[test]
    fn implicit_flags_follow_style_and_tag() {
        let events: Vec<Event> = Parser::from_slice(b"[a, 'b', ! c, !!str d]")
            .collect::<Result<_, _>>()
            .unwrap();
        let flags: Vec<(bool, bool)> = events
            .iter()
            .filter_map(|event| match &event.kind {
                EventKind::Scalar {
                    plain_implicit,
                    quoted_implicit,
                    ..
                } => Some((*plain_implicit, *quoted_implicit)),
                _ => None,
            })
            .collect();
        assert_eq!(
            flags,
            vec![(true, false), (false, true), (true, false), (false, false)]
        );
    }

    #[test]
    fn properties_without_content_make_empty_scalar() {
        assert_eq!(
            trace("a: &x\nb: !!str\n"),
            vec![
                "+STR",
                "+DOC",
                "+MAP",
                "=VAL :a",
                "=VAL &x :",
                "=VAL :b",
                "=VAL <tag:yaml.org,2002:str> :",
                "-MAP",
                "-DOC",
                "-STR",
            ]
        );
    }

    #[test]
    fn multiple_documents() {
        assert_eq!(
            trace("a\n---\nb\n"),
            vec!["+STR", "+DOC", "=VAL :a", "-DOC", "+DOC ---", "=VAL :b", "-DOC", "-STR"]
        );
        assert_eq!(trace(""), vec!["+STR", "-STR"]);
    }

    #[test]
    fn undefined_tag_handle() {
        let err = parse_error("!x!y a");
        assert_eq!(err.problem(), "found undefined tag handle");
        assert_eq!(err.context(), Some("while parsing a node"));
    }

    #[test]
    fn directive_errors() {
        assert_eq!(
            parse_error("%YAML 1.2\n--- a").problem(),
            "found incompatible YAML document"
        );
        assert_eq!(
            parse_error("%YAML 1.1\n%YAML 1.1\n--- a").problem(),
            "found duplicate %YAML directive"
        );
        assert_eq!(
            parse_error("%TAG !a! x\n%TAG !a! y\n--- a").problem(),
            "found duplicate %TAG directive"
        );
        assert_eq!(
            parse_error("%YAML 1.1\na").problem(),
            "did not find expected <document start>"
        );
    }

    #[test]
    fn unclosed_flow_sequence_names_its_start() {
        let err = parse_error("x: [1, 2\ny: 3");
        assert_eq!(err.context(), Some("while parsing a flow sequence"));
        assert_eq!(err.problem(), "did not find expected ',' or ']'");
        assert_eq!(err.context_mark().map(|m| m.column()), Some(3));
    }

    #[test]
    fn block_mapping_requires_keys() {
        let err = parse_error("a: 1\n- b\n");
        assert_eq!(err.context(), Some("while parsing a block mapping"));
        assert_eq!(err.problem(), "did not find expected key");
    }
}
