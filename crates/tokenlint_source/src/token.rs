//! Lexical tokens.

use serde::{Deserialize, Serialize};

use crate::Position;

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Identifier or keyword.
    Name,
    /// Numeric literal.
    Number,
    /// String literal, possibly spanning several physical lines.
    String,
    /// Operator or delimiter.
    Op,
    /// `#` comment. A comment on a line of its own keeps the line terminator.
    Comment,
    /// End of a statement.
    Newline,
    /// Line end that does not terminate a statement.
    Nl,
    /// Increase of indentation.
    Indent,
    /// Decrease of indentation.
    Dedent,
    /// A character the tokenizer does not understand.
    ErrorToken,
    /// End of input.
    EndMarker,
}

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token kind.
    pub kind: TokenKind,
    /// The token text as it appears in the source.
    pub text: String,
    /// Position of the first character.
    pub start: Position,
    /// Position just past the last character.
    pub end: Position,
    /// The physical line(s) the token was read from, line terminators included.
    pub line: String,
}

impl Token {
    /// Creates a new token.
    pub fn new(
        kind: TokenKind,
        text: impl Into<String>,
        start: Position,
        end: Position,
        line: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            text: text.into(),
            start,
            end,
            line: line.into(),
        }
    }

    /// Returns true for `Newline` and `Nl` tokens.
    pub fn is_newline(&self) -> bool {
        matches!(self.kind, TokenKind::Newline | TokenKind::Nl)
    }

    /// Returns true for comment tokens.
    pub fn is_comment(&self) -> bool {
        self.kind == TokenKind::Comment
    }

    /// Returns true when this token ends a physical line.
    ///
    /// Besides the newline tokens this includes comment-only lines, whose
    /// comment token carries the line terminator, and the last token before
    /// an explicit backslash continuation.
    pub fn is_eol(&self) -> bool {
        if self.is_newline() || (self.is_comment() && self.text.ends_with('\n')) {
            return true;
        }
        let rest = self
            .line
            .char_indices()
            .nth(self.end.column as usize)
            .map_or("", |(idx, _)| &self.line[idx..]);
        matches!(rest.trim_start(), "\\\n" | "\\\r\n")
    }

    /// Returns true for a string literal containing line breaks.
    pub fn is_multiline_string(&self) -> bool {
        self.kind == TokenKind::String && self.text.contains('\n')
    }

    /// Returns true for tokens that never contribute text to a logical line.
    pub fn is_skipped_in_logical_line(&self) -> bool {
        matches!(
            self.kind,
            TokenKind::Nl | TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent
        )
    }
}

/// Updates a bracket nesting counter for an operator token's text.
pub fn count_parentheses(depth: usize, text: &str) -> usize {
    match text {
        "(" | "[" | "{" => depth + 1,
        ")" | "]" | "}" => depth.saturating_sub(1),
        _ => depth,
    }
}

/// Replaces the contents of a string literal with `x` characters.
///
/// Prefixes and quotes are kept so that checks can still see where the
/// literal starts and ends.
pub fn mutate_string(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let Some(&quote) = chars.last() else {
        return String::new();
    };
    let Some(first_quote) = chars.iter().position(|&c| c == quote) else {
        return text.to_string();
    };
    let mut start = first_quote + 1;
    let mut end = chars.len() - 1;
    let tail: String = chars[chars.len().saturating_sub(3)..].iter().collect();
    if chars.len() >= 6 && (tail == "\"\"\"" || tail == "'''") {
        start += 2;
        end -= 2;
    }
    if start > end {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    out.extend(&chars[..start]);
    out.extend(std::iter::repeat_n('x', end - start));
    out.extend(&chars[end..]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn token(kind: TokenKind, text: &str, start: (u32, u32), end: (u32, u32), line: &str) -> Token {
        Token::new(kind, text, start.into(), end.into(), line)
    }

    #[rstest]
    #[case("\"abc\"", "\"xxx\"")]
    #[case("'a'", "'x'")]
    #[case("r'\\d+'", "r'xxx'")]
    #[case("\"\"\"doc\nstring\"\"\"", "\"\"\"xxxxxxxxxx\"\"\"")]
    #[case("''", "''")]
    fn test_mutate_string(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(mutate_string(input), expected);
    }

    #[test]
    fn test_count_parentheses() {
        assert_eq!(count_parentheses(0, "("), 1);
        assert_eq!(count_parentheses(2, "]"), 1);
        assert_eq!(count_parentheses(1, "+"), 1);
        assert_eq!(count_parentheses(0, "}"), 0);
    }

    #[test]
    fn test_newline_tokens_are_eol() {
        let nl = token(TokenKind::Nl, "\n", (1, 0), (1, 1), "\n");
        assert!(nl.is_eol());
        assert!(nl.is_newline());
    }

    #[test]
    fn test_token_before_backslash_continuation_is_eol() {
        let line = "x = 1 + \\\n";
        let plus = token(TokenKind::Op, "+", (1, 6), (1, 7), line);
        let one = token(TokenKind::Number, "1", (1, 4), (1, 5), line);

        assert!(plus.is_eol());
        assert!(!one.is_eol());
    }

    #[test]
    fn test_comment_line_is_eol_only_with_terminator() {
        let own_line = token(TokenKind::Comment, "# note\n", (1, 0), (1, 7), "# note\n");
        let trailing = token(TokenKind::Comment, "# note", (1, 6), (1, 12), "x = 1 # note\n");

        assert!(own_line.is_eol());
        assert!(!trailing.is_eol());
    }

    #[test]
    fn test_multiline_string_detection() {
        let s = token(TokenKind::String, "'''a\nb'''", (1, 0), (2, 4), "'''a\nb'''\n");
        assert!(s.is_multiline_string());

        let single = token(TokenKind::String, "'a'", (1, 0), (1, 3), "'a'\n");
        assert!(!single.is_multiline_string());
    }
}
