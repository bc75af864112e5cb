//! The diagnostic data model.

use serde::{Deserialize, Serialize};

/// A single finding: a code, a location and a message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Violation {
    /// The diagnostic code, e.g. `E501`.
    pub code: String,

    /// The file the finding belongs to.
    pub filename: String,

    /// 1-based line number.
    pub line_number: u32,

    /// 0-based column number.
    pub column_number: u32,

    /// The message, without the code.
    pub text: String,

    /// The physical line the finding is on, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_line: Option<String>,
}

impl Violation {
    /// Creates a new violation without a physical line.
    pub fn new(
        code: impl Into<String>,
        filename: impl Into<String>,
        line_number: u32,
        column_number: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            filename: filename.into(),
            line_number,
            column_number,
            text: text.into(),
            physical_line: None,
        }
    }

    /// Sets the physical line.
    pub fn with_physical_line(mut self, line: Option<impl Into<String>>) -> Self {
        self.physical_line = line.map(Into::into);
        self
    }

    /// Sort key used to order findings within a file.
    pub fn sort_key(&self) -> (u32, u32) {
        (self.line_number, self.column_number)
    }
}
