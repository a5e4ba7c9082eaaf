//! Source location tracking

use std::fmt;

/// Interned source file identifier
///
/// File names are stored once on the [`Graph`](crate::graph::Graph);
/// positions carry this cheap copyable handle instead of the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "f{}", self.0)
    }
}

/// A character range within one line of one source file.
///
/// Line and column numbers start from 1, as in text editors. `start` is
/// inclusive, `end` exclusive. The derived `Ord` gives the canonical
/// `(file, line, start)` total order used for tie-breaking everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourcePos {
    pub file: FileId,
    pub line: u32,
    /// First character column (inclusive)
    pub start: u32,
    /// One past the last character column
    pub end: u32,
}

impl SourcePos {
    #[inline]
    pub fn new(file: FileId, line: u32, start: u32, end: u32) -> Self {
        Self { file, line, start, end }
    }

    /// Child position at the given displacement and length within this span.
    #[inline]
    pub fn slice(&self, disp: u32, len: u32) -> Self {
        Self {
            file: self.file,
            line: self.line,
            start: self.start + disp,
            end: self.start + disp + len,
        }
    }

    /// Span length in characters.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether two spans claim a common character.
    ///
    /// Spans on different lines or in different files never intersect.
    #[inline]
    pub fn intersects(&self, other: &SourcePos) -> bool {
        self.file == other.file
            && self.line == other.line
            && self.start < other.end
            && other.start < self.end
    }

    /// Smallest span covering both operands.
    ///
    /// When the two spans sit on different lines the result clamps to the
    /// earlier line; spans only ever need enough precision for diagnostics.
    pub fn merge(&self, other: &SourcePos) -> SourcePos {
        let (first, second) = if self <= other { (self, other) } else { (other, self) };
        let end = if first.line == second.line {
            first.end.max(second.end)
        } else {
            first.end
        };
        SourcePos {
            file: first.file,
            line: first.line,
            start: first.start,
            end,
        }
    }
}

impl fmt::Display for SourcePos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}:{}-{}}}", self.line, self.start, self.end)
    }
}
