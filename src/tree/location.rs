//! Source locations attached to canonical nodes and diagnostics.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A 1-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Line (1-indexed).
    pub line: usize,
    /// Column (1-indexed).
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Convert a tree-sitter point (0-indexed) into a position.
    #[cfg(feature = "tree-sitter")]
    pub fn from_point(point: tree_sitter::Point) -> Self {
        Self {
            line: point.row + 1,
            column: point.column + 1,
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Either a single point or a begin/end range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Extent {
    Point(Position),
    Range { begin: Position, end: Position },
}

/// Where a node or diagnostic lives in a source file.
///
/// Locations are built once when a node is constructed and never change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    file: String,
    extent: Extent,
}

impl SourceLocation {
    /// A single-point location.
    pub fn point(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            extent: Extent::Point(Position::new(line, column)),
        }
    }

    /// A begin/end range location.
    pub fn range(file: impl Into<String>, begin: Position, end: Position) -> Self {
        Self {
            file: file.into(),
            extent: Extent::Range { begin, end },
        }
    }

    /// The `(1,1)` location used when a parser gives no position.
    pub fn start_of(file: impl Into<String>) -> Self {
        Self::point(file, 1, 1)
    }

    /// Location spanning a tree-sitter node.
    #[cfg(feature = "tree-sitter")]
    pub fn from_node(file: &str, node: tree_sitter::Node) -> Self {
        Self::range(
            file,
            Position::from_point(node.start_position()),
            Position::from_point(node.end_position()),
        )
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// The first position covered by this location.
    pub fn begin(&self) -> Position {
        match self.extent {
            Extent::Point(p) => p,
            Extent::Range { begin, .. } => begin,
        }
    }

    /// The last position covered by this location (same as `begin` for points).
    pub fn end(&self) -> Position {
        match self.extent {
            Extent::Point(p) => p,
            Extent::Range { end, .. } => end,
        }
    }

    pub fn line(&self) -> usize {
        self.begin().line
    }

    pub fn column(&self) -> usize {
        self.begin().column
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.extent {
            Extent::Point(p) => write!(f, "{}:{}", self.file, p),
            Extent::Range { begin, end } => write!(f, "{}:{}-{}", self.file, begin, end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_begin_and_end_coincide() {
        let loc = SourceLocation::point("a.py", 3, 7);
        assert_eq!(loc.begin(), Position::new(3, 7));
        assert_eq!(loc.end(), Position::new(3, 7));
        assert_eq!(loc.to_string(), "a.py:3:7");
    }

    #[test]
    fn test_range_display() {
        let loc = SourceLocation::range("A.java", Position::new(1, 1), Position::new(4, 2));
        assert_eq!(loc.line(), 1);
        assert_eq!(loc.end().line, 4);
        assert_eq!(loc.to_string(), "A.java:1:1-4:2");
    }

    #[test]
    fn test_start_of_defaults_to_origin() {
        let loc = SourceLocation::start_of("x.kt");
        assert_eq!(loc.begin(), Position::default());
    }
}
