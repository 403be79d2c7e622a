//! Source location information for parse errors.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a construct in the original source text.
///
/// Lines and columns are 1-based; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    /// Line number (1-based)
    pub line: usize,

    /// Column number (1-based)
    pub col: usize,
}

impl SourceInfo {
    /// Create a new SourceInfo.
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }

    /// Create a SourceInfo from a yaml-rust2::Marker.
    ///
    /// yaml-rust2 reports 1-based lines and 0-based columns.
    pub fn from_marker(marker: &yaml_rust2::scanner::Marker) -> Self {
        Self {
            line: marker.line().max(1),
            col: marker.col() + 1,
        }
    }

    /// Shift a location that is relative to a fragment starting at `base`.
    pub fn offset_by(self, base: SourceInfo) -> Self {
        if self.line == 1 {
            Self {
                line: base.line,
                col: base.col + self.col - 1,
            }
        } else {
            Self {
                line: base.line + self.line - 1,
                col: self.col,
            }
        }
    }
}

impl Default for SourceInfo {
    fn default() -> Self {
        Self { line: 1, col: 1 }
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}
