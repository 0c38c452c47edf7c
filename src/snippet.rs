//! Caret snippets for errors that know where they happened.

use annotate_snippets::{
    AnnotationKind, Level, Renderer, Snippet as AnnotateSnippet, renderer::DecorStyle,
};

use crate::error::Error;
use crate::location::Location;

/// Path shown in the snippet header when the caller has none.
pub(crate) const DEFAULT_PATH: &str = "<input>";

/// Lines of context above and below the reported line.
const CONTEXT_LINES: usize = 2;

impl Error {
    /// Render the error against the YAML `source` it was produced from.
    ///
    /// Errors with a location get a rustc-like snippet with a caret under the offending
    /// character; collected decode errors get one snippet each. Errors without a location
    /// render as their plain message.
    ///
    /// ```rust
    /// use yaml_decode::Shape;
    ///
    /// let yaml = "a: 1\nb: [\n";
    /// let err = yaml_decode::decode(yaml.as_bytes(), &Shape::Dynamic, false).unwrap_err();
    /// let rendered = err.render(yaml, "config.yaml");
    /// assert!(rendered.contains("config.yaml"));
    /// ```
    pub fn render(&self, source: &str, path: &str) -> String {
        match self {
            Error::WithSnippet { error, .. } => error.render(source, path),
            Error::Unmarshal(errs) => {
                let mut out = String::from("unmarshal errors:");
                for err in errs.iter() {
                    out.push('\n');
                    out.push_str(&render_one(source, path, err.message(), err.location()));
                }
                out
            }
            Error::Message { msg, location } => render_one(source, path, msg, *location),
            Error::Scan(err) => render_one(source, path, err.problem(), err.mark().location()),
            other => other.to_string(),
        }
    }
}

fn render_one(source: &str, path: &str, msg: &str, location: Location) -> String {
    let fallback = || {
        if location == Location::UNKNOWN {
            msg.to_owned()
        } else {
            format!("{msg} at line {}, column {}", location.row, location.column)
        }
    };
    if location == Location::UNKNOWN {
        return fallback();
    }
    // Marks are computed on the BOM-less stream.
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    let starts = line_starts(source);
    let row = location.row as usize;
    if row == 0 || row > starts.len() {
        return fallback();
    }
    let Some(start) = byte_offset(source, starts[row - 1], location.column as usize) else {
        return fallback();
    };
    // One character, or an empty span at a line end.
    let end = match source.as_bytes().get(start) {
        None | Some(b'\n') | Some(b'\r') => start,
        Some(_) => source[start..]
            .chars()
            .next()
            .map_or(start, |c| start + c.len_utf8()),
    };

    let first_row = row.saturating_sub(CONTEXT_LINES).max(1);
    let last_row = (row + CONTEXT_LINES).min(starts.len());
    let window_start = starts[first_row - 1];
    let window_end = if last_row < starts.len() {
        starts[last_row]
    } else {
        source.len()
    };
    let window = &source[window_start..window_end];
    let span = (start - window_start)..(end - window_start);

    let report = &[Level::ERROR
        .primary_title(format!(
            "line {} column {}: {msg}",
            location.row, location.column
        ))
        .element(
            AnnotateSnippet::source(window)
                .line_start(first_row)
                .path(path)
                .fold(false)
                .annotation(AnnotationKind::Primary.span(span).label(msg)),
        )];
    Renderer::plain()
        .decor_style(DecorStyle::Ascii)
        .render(report)
        .to_string()
}

/// Byte offsets at which each line starts.
fn line_starts(text: &str) -> Vec<usize> {
    let mut starts = vec![0];
    starts.extend(
        text.bytes()
            .enumerate()
            .filter(|&(i, b)| b == b'\n' && i + 1 < text.len())
            .map(|(i, _)| i + 1),
    );
    starts
}

/// Byte offset of the 1-based character `column` on the line starting at `line_start`.
fn byte_offset(text: &str, line_start: usize, column: usize) -> Option<usize> {
    let line = &text[line_start..];
    let line = &line[..line.find('\n').unwrap_or(line.len())];
    let target = column.checked_sub(1)?;
    match line.char_indices().nth(target) {
        Some((i, _)) => Some(line_start + i),
        None if line.chars().count() == target => Some(line_start + line.len()),
        None => None,
    }
}
