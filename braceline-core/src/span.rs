//! Line ranges reported by the block locator

use serde::{Deserialize, Serialize};

/// Inclusive, 1-indexed line range of a brace-delimited block
///
/// Both ends refer to positions in the caller's line sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockRange {
    /// Line holding the block's opening context (1-indexed)
    pub start_line: usize,
    /// Line holding the closing brace (1-indexed, inclusive)
    pub end_line: usize,
}

impl BlockRange {
    /// Create a new block range
    pub fn new(start_line: usize, end_line: usize) -> Self {
        BlockRange {
            start_line,
            end_line,
        }
    }

    /// Number of lines covered by the range
    pub fn line_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end_line - self.start_line + 1
        }
    }

    /// Check if the range is backwards
    pub fn is_empty(&self) -> bool {
        self.end_line < self.start_line
    }

    /// Check if a 1-indexed line falls inside the range
    pub fn contains_line(&self, line: usize) -> bool {
        self.start_line <= line && line <= self.end_line
    }

    /// Check if this range shares at least one line with another range
    pub fn overlaps(&self, other: &BlockRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start_line <= other.end_line && other.start_line <= self.end_line
    }

    /// Check if the ranges overlap or sit back to back
    pub fn touches(&self, other: &BlockRange) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.overlaps(other)
            || self.end_line.saturating_add(1) == other.start_line
            || other.end_line.saturating_add(1) == self.start_line
    }

    /// Borrow the covered lines from the caller's source
    ///
    /// Returns `None` if the range does not fit inside `lines`.
    pub fn slice<'a, S: AsRef<str>>(&self, lines: &'a [S]) -> Option<Vec<&'a str>> {
        if self.is_empty() || self.start_line == 0 || self.end_line > lines.len() {
            return None;
        }
        Some(
            lines[self.start_line - 1..self.end_line]
                .iter()
                .map(|l| l.as_ref())
                .collect(),
        )
    }
}

impl std::fmt::Display for BlockRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_line, self.end_line)
    }
}
