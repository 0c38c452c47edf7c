//! Source location utilities.

/// Position inside the normalized (UTF-8) input stream.
///
/// `index` counts bytes of the decoded stream. `line` and `column` are zero-based; the column
/// counts characters, not bytes, so it matches what an editor shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Mark {
    pub(crate) index: usize,
    pub(crate) line: usize,
    pub(crate) column: usize,
}

impl Mark {
    /// Create a mark from its raw coordinates.
    pub const fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }

    /// Byte offset in the decoded stream.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Zero-based line.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Zero-based column, in characters.
    pub fn column(&self) -> usize {
        self.column
    }

    /// The 1-indexed location of this mark, as reported to users.
    pub fn location(&self) -> Location {
        Location::new(self.line + 1, self.column + 1)
    }
}

/// Row/column location within the source YAML document (1-indexed).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Location {
    pub(crate) row: u32,
    pub(crate) column: u32,
}

impl Location {
    /// Sentinel value meaning "location unknown".
    pub const UNKNOWN: Self = Self { row: 0, column: 0 };

    /// Create a new location record from 1-indexed coordinates.
    pub(crate) const fn new(row: usize, column: usize) -> Self {
        // Saturate instead of wrapping; this is error reporting only.
        let row = if row > u32::MAX as usize { u32::MAX } else { row as u32 };
        let column = if column > u32::MAX as usize {
            u32::MAX
        } else {
            column as u32
        };
        Self { row, column }
    }

    /// 1-indexed line.
    pub fn line(&self) -> u64 {
        self.row as u64
    }

    /// 1-indexed column.
    pub fn column(&self) -> u64 {
        self.column as u64
    }
}

impl From<Mark> for Location {
    fn from(mark: Mark) -> Self {
        mark.location()
    }
}
