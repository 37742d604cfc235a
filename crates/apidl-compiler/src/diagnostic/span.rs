//! Source location tracking.

use std::fmt;

use serde::Serialize;

/// A span in the source code. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start_line: usize,
    pub start_col: usize,
    pub end_line: usize,
    pub end_col: usize,
}

impl Span {
    pub fn new(start_line: usize, start_col: usize, end_line: usize, end_col: usize) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// Where a diagnostic points: the file label plus the start of a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// File label (usually the base name of the file). May be empty for
    /// content parsed without a file name.
    pub prefix: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(prefix: impl Into<String>, span: Span) -> Self {
        Self {
            prefix: prefix.into(),
            line: span.start_line,
            column: span.start_col,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            write!(f, "line {}:{}", self.line, self.column)
        } else {
            write!(f, "{} line {}:{}", self.prefix, self.line, self.column)
        }
    }
}
