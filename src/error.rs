//! Defines the error taxonomy of the decoder and the location attached to it.
//!
//! Reader and scan errors stop the pipeline immediately. Decode errors are collected while
//! binding and surface together as [`Error::Unmarshal`] once the document has been walked.
use std::fmt;

use serde::de;

use crate::location::{Location, Mark};

/// Malformed input found while turning raw bytes into characters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderError {
    pub(crate) problem: &'static str,
    pub(crate) offset: usize,
    pub(crate) value: Option<u32>,
}

impl ReaderError {
    pub(crate) fn new(problem: &'static str, offset: usize, value: Option<u32>) -> Self {
        Self {
            problem,
            offset,
            value,
        }
    }

    /// Short description of what is wrong with the input.
    pub fn problem(&self) -> &str {
        self.problem
    }

    /// Offset of the offending octet in the raw input.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The offending octet, code unit or code point, if one applies.
    pub fn value(&self) -> Option<u32> {
        self.value
    }
}

impl fmt::Display for ReaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(f, "{}: #{value:X} at byte {}", self.problem, self.offset),
            None => write!(f, "{} at byte {}", self.problem, self.offset),
        }
    }
}

/// A grammar violation reported by the scanner or the parser.
///
/// The optional context names the enclosing construct and where it started, for example
/// "while parsing a block mapping" and the mark of the mapping's first key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanError {
    pub(crate) mark: Mark,
    pub(crate) problem: String,
    pub(crate) context: Option<(&'static str, Mark)>,
}

impl ScanError {
    pub(crate) fn new(mark: Mark, problem: impl Into<String>) -> Self {
        Self {
            mark,
            problem: problem.into(),
            context: None,
        }
    }

    pub(crate) fn with_context(
        context: &'static str,
        context_mark: Mark,
        mark: Mark,
        problem: impl Into<String>,
    ) -> Self {
        Self {
            mark,
            problem: problem.into(),
            context: Some((context, context_mark)),
        }
    }

    /// Where the problem was detected.
    pub fn mark(&self) -> Mark {
        self.mark
    }

    /// What went wrong.
    pub fn problem(&self) -> &str {
        &self.problem
    }

    /// The enclosing construct, if known.
    pub fn context(&self) -> Option<&str> {
        self.context.map(|(context, _)| context)
    }

    /// Where the enclosing construct started, if known.
    pub fn context_mark(&self) -> Option<Mark> {
        self.context.map(|(_, mark)| mark)
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((context, mark)) = self.context {
            let location = mark.location();
            write!(
                f,
                "{context} at line {}, column {}: ",
                location.row, location.column
            )?;
        }
        fmt_with_location(f, &self.problem, &self.mark.location())
    }
}

impl std::error::Error for ScanError {}

/// One non-fatal failure while binding a node onto its destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodeError {
    pub(crate) location: Location,
    pub(crate) message: String,
}

impl DecodeError {
    pub(crate) fn new(mark: Mark, message: impl Into<String>) -> Self {
        Self {
            location: mark.location(),
            message: message.into(),
        }
    }

    /// Location of the offending node.
    pub fn location(&self) -> Location {
        self.location
    }

    /// The message without the line prefix.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}", self.location.row, self.message)
    }
}

/// Every non-fatal failure collected during one decode call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnmarshalErrors {
    pub(crate) errors: Vec<DecodeError>,
}

impl UnmarshalErrors {
    pub(crate) fn new(errors: Vec<DecodeError>) -> Self {
        Self { errors }
    }

    /// The collected errors in document order.
    pub fn errors(&self) -> &[DecodeError] {
        &self.errors
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// True when nothing went wrong.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Iterate the errors.
    pub fn iter(&self) -> std::slice::Iter<'_, DecodeError> {
        self.errors.iter()
    }
}

impl fmt::Display for UnmarshalErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unmarshal errors:")?;
        for err in &self.errors {
            write!(f, "\n  {err}")?;
        }
        Ok(())
    }
}

/// Error type returned by every public entry point; compatible with `serde::de::Error`.
#[derive(Debug)]
pub enum Error {
    /// Free-form fatal error with optional source location: unknown anchors, alias cycles,
    /// excessive aliasing, invalid `!!binary` data and similar.
    Message { msg: String, location: Location },
    /// The input bytes are not valid for the detected encoding.
    Reader(ReaderError),
    /// The scanner or parser rejected the document.
    Scan(ScanError),
    /// Type mismatches and strict-mode violations collected during binding.
    Unmarshal(UnmarshalErrors),
    /// The underlying reader failed. This may happen only when decoding from a reader.
    IOError { cause: std::io::Error },
    /// Another error together with the source text it refers to. Displays as a rendered
    /// snippet pointing at the offending location.
    WithSnippet { text: String, error: Box<Error> },
}

impl Error {
    /// Construct a `Message` error with no known location.
    pub(crate) fn msg<S: Into<String>>(s: S) -> Self {
        Error::Message {
            msg: s.into(),
            location: Location::UNKNOWN,
        }
    }

    /// Attach or override the location of a `Message` error.
    ///
    /// Other variants carry their own position and are returned unchanged.
    pub(crate) fn with_location(mut self, set_location: Location) -> Self {
        if let Error::Message { location, .. } = &mut self {
            *location = set_location;
        }
        self
    }

    /// Attach the location of a mark.
    pub(crate) fn at(self, mark: Mark) -> Self {
        self.with_location(mark.location())
    }

    /// Keep `text` alongside the error so that it displays as a snippet.
    ///
    /// Errors without a location are returned unchanged.
    pub(crate) fn with_snippet(self, text: &str) -> Self {
        match self {
            Error::WithSnippet { .. } => self,
            error if error.location().is_none() => error,
            error => Error::WithSnippet {
                text: text.to_owned(),
                error: Box::new(error),
            },
        }
    }

    /// Drop the snippet wrapper, if any.
    pub fn without_snippet(self) -> Self {
        match self {
            Error::WithSnippet { error, .. } => *error,
            other => other,
        }
    }

    /// If the error has a known location, return it.
    ///
    /// Reader errors only know a byte offset and return `None`. For collected decode errors
    /// this is the location of the first one.
    pub fn location(&self) -> Option<Location> {
        match self {
            Error::Message { location, .. } => {
                if location != &Location::UNKNOWN {
                    Some(*location)
                } else {
                    None
                }
            }
            Error::Scan(err) => Some(err.mark.location()),
            Error::Unmarshal(errs) => errs.errors.first().map(|err| err.location),
            Error::WithSnippet { error, .. } => error.location(),
            Error::Reader(_) | Error::IOError { .. } => None,
        }
    }

    /// The collected decode errors, if this is an aggregate error.
    pub fn unmarshal_errors(&self) -> Option<&UnmarshalErrors> {
        match self {
            Error::Unmarshal(errs) => Some(errs),
            Error::WithSnippet { error, .. } => error.unmarshal_errors(),
            _ => None,
        }
    }

    /// True for errors that stopped decoding early, as opposed to collected mismatches.
    pub fn is_fatal(&self) -> bool {
        match self {
            Error::Unmarshal(_) => false,
            Error::WithSnippet { error, .. } => error.is_fatal(),
            _ => true,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Message { msg, location } => fmt_with_location(f, msg, location),
            Error::Reader(err) => write!(f, "{err}"),
            Error::Scan(err) => write!(f, "{err}"),
            Error::Unmarshal(errs) => write!(f, "{errs}"),
            Error::IOError { cause } => write!(f, "IO error: {cause}"),
            Error::WithSnippet { text, error } => {
                write!(f, "{}", error.render(text, crate::snippet::DEFAULT_PATH))
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Scan(err) => Some(err),
            Error::IOError { cause } => Some(cause),
            Error::WithSnippet { error, .. } => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl de::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::msg(msg.to_string())
    }
}

impl From<ReaderError> for Error {
    fn from(err: ReaderError) -> Self {
        Error::Reader(err)
    }
}

impl From<ScanError> for Error {
    fn from(err: ScanError) -> Self {
        Error::Scan(err)
    }
}

/// Print a message optionally suffixed with "at line X, column Y".
fn fmt_with_location(f: &mut fmt::Formatter<'_>, msg: &str, location: &Location) -> fmt::Result {
    if location != &Location::UNKNOWN {
        write!(
            f,
            "{msg} at line {}, column {}",
            location.row, location.column
        )
    } else {
        write!(f, "{msg}")
    }
}
