//! Source processing error types.

use thiserror::Error;

use crate::Position;

/// A structural failure raised while the token stream is being produced.
///
/// Tokens produced before the failure are still valid; the failure only
/// stops the stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TokenizeError {
    /// Human readable description.
    pub message: String,
    /// Where the failure was detected.
    pub position: Position,
}

impl TokenizeError {
    /// Creates a new tokenize error.
    pub fn new(message: impl Into<String>, position: Position) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

/// The category of a syntax error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// Malformed statement or bracket structure.
    Syntax,
    /// Inconsistent or unexpected indentation.
    Indentation,
    /// The tokenizer could not finish the file.
    Token,
}

impl SyntaxErrorKind {
    /// Returns the name reported alongside the error message.
    pub fn type_name(self) -> &'static str {
        match self {
            SyntaxErrorKind::Syntax => "SyntaxError",
            SyntaxErrorKind::Indentation => "IndentationError",
            SyntaxErrorKind::Token => "TokenError",
        }
    }
}

/// Errors that can occur while building a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", kind.type_name())]
pub struct SyntaxError {
    /// The error category.
    pub kind: SyntaxErrorKind,
    /// The primary message.
    pub message: String,
    /// Best-effort location of the error.
    pub position: Option<Position>,
}

impl SyntaxError {
    /// Creates a syntax error at a position.
    pub fn syntax(message: impl Into<String>, position: Position) -> Self {
        Self {
            kind: SyntaxErrorKind::Syntax,
            message: message.into(),
            position: Some(position),
        }
    }

    /// Creates an indentation error at a position.
    pub fn indentation(message: impl Into<String>, position: Position) -> Self {
        Self {
            kind: SyntaxErrorKind::Indentation,
            message: message.into(),
            position: Some(position),
        }
    }

    /// Returns the name of the error category.
    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

impl From<TokenizeError> for SyntaxError {
    fn from(err: TokenizeError) -> Self {
        Self {
            kind: SyntaxErrorKind::Token,
            message: err.message,
            position: Some(err.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syntax_error_display_includes_type_name() {
        let err = SyntaxError::syntax("unmatched ')'", Position::new(3, 4));
        assert_eq!(err.to_string(), "SyntaxError: unmatched ')'");
        assert_eq!(err.type_name(), "SyntaxError");
    }

    #[test]
    fn test_tokenize_error_converts_to_token_error() {
        let err: SyntaxError = TokenizeError::new("EOF in multi-line string", Position::new(2, 0)).into();
        assert_eq!(err.kind, SyntaxErrorKind::Token);
        assert_eq!(err.position, Some(Position::new(2, 0)));
        assert_eq!(err.to_string(), "TokenError: EOF in multi-line string");
    }
}
