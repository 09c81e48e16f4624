//! Source positions attached to statements and diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A line/column position in the original source unit.
///
/// Lines and columns are 1-based as delivered by the frontend; the zero
/// position marks synthesized nodes with no source of their own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: u32,
    pub col: u32,
}

impl Span {
    pub fn new(line: u32, col: u32) -> Self {
        Span { line, col }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}
