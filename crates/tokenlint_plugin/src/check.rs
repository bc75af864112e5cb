//! The three kinds of checks and what they are invoked with.

use serde::{Deserialize, Serialize};
use tokenlint_source::{Position, SyntaxTree, Token};

use crate::CheckerState;

/// Where a logical line check found a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Offset {
    /// An absolute source position.
    Position(Position),
    /// A character offset into the logical line.
    Char(usize),
}

impl From<usize> for Offset {
    fn from(offset: usize) -> Self {
        Self::Char(offset)
    }
}

impl From<Position> for Offset {
    fn from(position: Position) -> Self {
        Self::Position(position)
    }
}

impl From<(u32, u32)> for Offset {
    fn from(position: (u32, u32)) -> Self {
        Self::Position(position.into())
    }
}

/// A finding of a logical line check: where, and the `CODE message` text.
pub type LogicalFinding = (Offset, String);

/// A finding of a physical line check: the column and the `CODE message` text.
pub type PhysicalFinding = (u32, String);

/// A finding of a syntax tree check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFinding {
    /// 1-based line number.
    pub line: u32,
    /// 0-based column.
    pub column: u32,
    /// `CODE message` text.
    pub message: String,
    /// Name of the check that produced the finding.
    pub origin: String,
}

impl TreeFinding {
    /// Creates a new finding.
    pub fn new(
        line: u32,
        column: u32,
        message: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            origin: origin.into(),
        }
    }
}

/// A physical line handed to a [`PhysicalLineCheck`].
#[derive(Debug, Clone, Copy)]
pub struct PhysicalLine<'a> {
    /// Raw line text, line terminator included.
    pub text: &'a str,
    /// Line number the line is reported at.
    pub line_number: u32,
    /// Indentation character of the file, once known.
    pub indent_char: Option<char>,
}

/// A logical line handed to a [`LogicalLineCheck`].
#[derive(Debug, Clone, Copy)]
pub struct LogicalLine<'a> {
    /// Joined statement text with string contents masked.
    pub text: &'a str,
    /// Joined comments of the statement.
    pub comments: &'a str,
    /// Tokens the logical line was built from.
    pub tokens: &'a [Token],
    /// Blank lines directly before this line.
    pub blank_lines: u32,
    /// Blank lines before this line, including those before preceding comments.
    pub blank_before: u32,
    /// Indentation width of this line.
    pub indent_level: usize,
    /// Text of the previous non-empty logical line.
    pub previous_logical: &'a str,
    /// Indentation width of the previous non-empty logical line.
    pub previous_indent_level: usize,
    /// Indentation character of the file, once known.
    pub indent_char: Option<char>,
    /// Number of lines read when the logical line ended.
    pub line_number: u32,
}

/// A parsed file handed to a [`TreeCheck`].
#[derive(Debug, Clone, Copy)]
pub struct TreeContext<'a> {
    /// The statement tree.
    pub tree: &'a SyntaxTree,
    /// Name of the file being checked.
    pub filename: &'a str,
    /// Physical lines of the file.
    pub lines: &'a [String],
}

/// A check invoked once per file with its syntax tree.
pub trait TreeCheck: Send + Sync {
    /// Unique name of the check.
    fn name(&self) -> &str;

    /// Runs the check.
    fn run(&self, context: &TreeContext<'_>, state: &mut CheckerState) -> Vec<TreeFinding>;
}

/// A check invoked once per logical line.
pub trait LogicalLineCheck: Send + Sync {
    /// Unique name of the check.
    fn name(&self) -> &str;

    /// Runs the check.
    fn run(&self, line: &LogicalLine<'_>, state: &mut CheckerState) -> Vec<LogicalFinding>;
}

/// A check invoked once per physical line.
pub trait PhysicalLineCheck: Send + Sync {
    /// Unique name of the check.
    fn name(&self) -> &str;

    /// Runs the check. At most one finding is reported per line.
    fn run(&self, line: &PhysicalLine<'_>, state: &mut CheckerState) -> Option<PhysicalFinding>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_offset_conversions() {
        assert_eq!(Offset::from(4usize), Offset::Char(4));
        assert_eq!(
            Offset::from((3, 7)),
            Offset::Position(Position::new(3, 7))
        );
    }

    #[test]
    fn test_offset_serializes_untagged() {
        assert_eq!(serde_json::to_string(&Offset::Char(2)).unwrap(), "2");
        assert_eq!(
            serde_json::to_string(&Offset::Position(Position::new(1, 2))).unwrap(),
            r#"{"line":1,"column":2}"#
        );
    }
}
