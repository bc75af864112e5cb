//! Line-driven tokenizer.
//!
//! The tokenizer reads one physical line at a time, only when the consumer
//! asks for more tokens. This keeps the number of lines read in step with
//! the token being processed, which the check driver relies on to report
//! physical line diagnostics at the right line number.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::{Position, Token, TokenKind, TokenizeError};

const TAB_SIZE: usize = 8;

const THREE_CHAR_OPS: &[&str] = &["**=", "//=", ">>=", "<<=", "..."];
const TWO_CHAR_OPS: &[&str] = &[
    "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", "+=", "-=", "*=", "/=", "%=", "&=",
    "|=", "^=", "@=", ":=",
];
const ONE_CHAR_OPS: &str = "+-*/%&|^~<>()[]{},:;.=@";

const STRING_PREFIXES: &[&str] = &["r", "u", "b", "f", "br", "rb", "fr", "rf"];

/// A string literal that has not been closed yet.
#[derive(Debug)]
struct OpenString {
    start: Position,
    quote: String,
    text: String,
    lines: String,
}

/// Produces [`Token`]s from source lines on demand.
#[derive(Debug)]
pub struct Tokenizer {
    lines: Arc<[String]>,
    next_line: usize,
    pending: VecDeque<Token>,
    indents: Vec<usize>,
    depth: usize,
    continued: bool,
    open_string: Option<OpenString>,
    finished: bool,
}

impl Tokenizer {
    /// Creates a tokenizer over the given physical lines.
    ///
    /// Each line is expected to keep its line terminator.
    pub fn new(lines: Arc<[String]>) -> Self {
        Self {
            lines,
            next_line: 0,
            pending: VecDeque::new(),
            indents: vec![0],
            depth: 0,
            continued: false,
            open_string: None,
            finished: false,
        }
    }

    /// Number of physical lines consumed so far.
    pub fn lines_read(&self) -> u32 {
        self.next_line as u32
    }

    fn read_line(&mut self) -> Result<(), TokenizeError> {
        if self.next_line >= self.lines.len() {
            return self.finish();
        }

        let lines = Arc::clone(&self.lines);
        let line = lines[self.next_line].as_str();
        self.next_line += 1;
        let lnum = self.next_line as u32;
        let chars: Vec<char> = line.chars().collect();

        let mut pos = 0;
        if self.open_string.is_some() {
            match self.continue_string(&chars, line, lnum) {
                Some(end) => pos = end,
                None => return Ok(()),
            }
        } else if self.depth == 0 && !self.continued {
            match self.start_statement_line(&chars, line, lnum)? {
                Some(start) => pos = start,
                None => return Ok(()),
            }
        } else {
            self.continued = false;
        }

        self.scan(&chars, line, lnum, pos);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), TokenizeError> {
        let eof_line = self.lines.len() as u32 + 1;
        if let Some(open) = &self.open_string {
            return Err(TokenizeError::new("EOF in multi-line string", open.start));
        }
        if self.depth > 0 || self.continued {
            return Err(TokenizeError::new(
                "EOF in multi-line statement",
                Position::new(eof_line, 0),
            ));
        }

        let eof = Position::new(eof_line, 0);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, "", eof, eof, "");
        }
        self.push(TokenKind::EndMarker, "", eof, eof, "");
        self.finished = true;
        Ok(())
    }

    /// Handles indentation, blank lines and comment-only lines.
    ///
    /// Returns the column where regular scanning should continue, or `None`
    /// when the whole line has been consumed.
    fn start_statement_line(
        &mut self,
        chars: &[char],
        line: &str,
        lnum: u32,
    ) -> Result<Option<usize>, TokenizeError> {
        let mut column = 0;
        let mut pos = 0;
        while pos < chars.len() {
            match chars[pos] {
                ' ' => column += 1,
                '\t' => column = (column / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => column = 0,
                _ => break,
            }
            pos += 1;
        }

        // A comment on its own line ends that line, so its token keeps the
        // terminator and no NL follows unless the terminator is missing.
        if pos < chars.len() && chars[pos] == '#' {
            let text: String = chars[pos..].iter().collect();
            let end = Position::new(lnum, chars.len() as u32);
            let terminated = text.ends_with('\n');
            self.push(TokenKind::Comment, text, Position::new(lnum, pos as u32), end, line);
            if !terminated {
                self.push(TokenKind::Nl, "", end, end, line);
            }
            return Ok(None);
        }

        if pos == chars.len() || matches!(chars[pos], '\r' | '\n') {
            let text: String = chars[pos..].iter().collect();
            self.push(
                TokenKind::Nl,
                text,
                Position::new(lnum, pos as u32),
                Position::new(lnum, chars.len() as u32),
                line,
            );
            return Ok(None);
        }

        let top = self.indents.last().copied().unwrap_or(0);
        if column > top {
            self.indents.push(column);
            let text: String = chars[..pos].iter().collect();
            self.push(
                TokenKind::Indent,
                text,
                Position::new(lnum, 0),
                Position::new(lnum, pos as u32),
                line,
            );
        }
        while column < self.indents.last().copied().unwrap_or(0) {
            if !self.indents.contains(&column) {
                return Err(TokenizeError::new(
                    "unindent does not match any outer indentation level",
                    Position::new(lnum, pos as u32),
                ));
            }
            self.indents.pop();
            let here = Position::new(lnum, pos as u32);
            self.push(TokenKind::Dedent, "", here, here, line);
        }

        Ok(Some(pos))
    }

    /// Continues an open string literal on a new line.
    ///
    /// Returns the column just past the closing quote when the literal ends
    /// on this line.
    fn continue_string(&mut self, chars: &[char], line: &str, lnum: u32) -> Option<usize> {
        let mut open = self.open_string.take()?;
        match find_string_end(chars, 0, &open.quote) {
            Some(end) => {
                open.text.extend(&chars[..end]);
                open.lines.push_str(line);
                self.push(
                    TokenKind::String,
                    open.text,
                    open.start,
                    Position::new(lnum, end as u32),
                    open.lines,
                );
                Some(end)
            }
            None => {
                open.text.push_str(line);
                open.lines.push_str(line);
                if open.quote.len() == 3 || ends_with_continuation(line) {
                    self.open_string = Some(open);
                } else {
                    let end = line_content_end(chars);
                    self.push(
                        TokenKind::ErrorToken,
                        open.text.trim_end_matches(['\r', '\n']).to_string(),
                        open.start,
                        Position::new(lnum, end as u32),
                        open.lines,
                    );
                }
                None
            }
        }
    }

    fn scan(&mut self, chars: &[char], line: &str, lnum: u32, mut pos: usize) {
        let max = chars.len();
        let mut terminated = false;

        while pos < max {
            let c = chars[pos];
            if matches!(c, ' ' | '\t' | '\x0c') {
                pos += 1;
                continue;
            }

            let start = Position::new(lnum, pos as u32);

            if c == '\r' || c == '\n' {
                let kind = if self.depth > 0 {
                    TokenKind::Nl
                } else {
                    TokenKind::Newline
                };
                let text: String = chars[pos..].iter().collect();
                self.push(kind, text, start, Position::new(lnum, max as u32), line);
                terminated = true;
                break;
            }

            if c == '#' {
                let end = line_content_end(chars);
                let text: String = chars[pos..end].iter().collect();
                self.push(
                    TokenKind::Comment,
                    text,
                    start,
                    Position::new(lnum, end as u32),
                    line,
                );
                pos = end;
                continue;
            }

            if c == '\\' && chars[pos + 1..].iter().all(|c| matches!(c, '\r' | '\n')) {
                self.continued = true;
                terminated = true;
                break;
            }

            if c.is_ascii_digit() || (c == '.' && chars.get(pos + 1).is_some_and(char::is_ascii_digit))
            {
                let end = scan_number(chars, pos);
                let text: String = chars[pos..end].iter().collect();
                self.push(
                    TokenKind::Number,
                    text,
                    start,
                    Position::new(lnum, end as u32),
                    line,
                );
                pos = end;
                continue;
            }

            if c == '_' || c.is_alphabetic() {
                let mut end = pos + 1;
                while end < max && (chars[end] == '_' || chars[end].is_alphanumeric()) {
                    end += 1;
                }
                let word: String = chars[pos..end].iter().collect();
                let is_prefix = STRING_PREFIXES.contains(&word.to_ascii_lowercase().as_str());
                if is_prefix && end < max && matches!(chars[end], '\'' | '"') {
                    match self.scan_string(chars, line, lnum, pos, end) {
                        Some(next) => {
                            pos = next;
                            continue;
                        }
                        None => {
                            terminated = true;
                            break;
                        }
                    }
                }
                self.push(
                    TokenKind::Name,
                    word,
                    start,
                    Position::new(lnum, end as u32),
                    line,
                );
                pos = end;
                continue;
            }

            if c == '\'' || c == '"' {
                match self.scan_string(chars, line, lnum, pos, pos) {
                    Some(next) => {
                        pos = next;
                        continue;
                    }
                    None => {
                        terminated = true;
                        break;
                    }
                }
            }

            let op_len = operator_len(chars, pos);
            if op_len > 0 {
                let text: String = chars[pos..pos + op_len].iter().collect();
                match text.as_str() {
                    "(" | "[" | "{" => self.depth += 1,
                    ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
                self.push(
                    TokenKind::Op,
                    text,
                    start,
                    Position::new(lnum, (pos + op_len) as u32),
                    line,
                );
                pos += op_len;
                continue;
            }

            self.push(
                TokenKind::ErrorToken,
                c.to_string(),
                start,
                Position::new(lnum, pos as u32 + 1),
                line,
            );
            pos += 1;
        }

        // The last line of a file may lack a terminator.
        if !terminated && self.depth == 0 && !self.continued && self.open_string.is_none() {
            let last_is_newline = self
                .pending
                .back()
                .is_some_and(|t| t.start.line == lnum && t.is_newline());
            if !last_is_newline {
                let here = Position::new(lnum, max as u32);
                self.push(TokenKind::Newline, "", here, here, line);
            }
        }
    }

    /// Scans a string literal whose prefix starts at `prefix_start` and whose
    /// opening quote is at `quote_pos`.
    ///
    /// Returns the column after the literal, or `None` when the literal
    /// continues on the next line.
    fn scan_string(
        &mut self,
        chars: &[char],
        line: &str,
        lnum: u32,
        prefix_start: usize,
        quote_pos: usize,
    ) -> Option<usize> {
        let quote_char = chars[quote_pos];
        let is_triple = chars.get(quote_pos + 1) == Some(&quote_char)
            && chars.get(quote_pos + 2) == Some(&quote_char);
        let quote: String = if is_triple {
            std::iter::repeat_n(quote_char, 3).collect()
        } else {
            quote_char.to_string()
        };
        let body_start = quote_pos + quote.len();
        let start = Position::new(lnum, prefix_start as u32);

        if let Some(end) = find_string_end(chars, body_start, &quote) {
            let text: String = chars[prefix_start..end].iter().collect();
            self.push(
                TokenKind::String,
                text,
                start,
                Position::new(lnum, end as u32),
                line,
            );
            return Some(end);
        }

        if is_triple || ends_with_continuation(line) {
            self.open_string = Some(OpenString {
                start,
                quote,
                text: chars[prefix_start..].iter().collect(),
                lines: line.to_string(),
            });
            return None;
        }

        // Unterminated single-quoted literal: report the quote and move on.
        self.push(
            TokenKind::ErrorToken,
            quote_char.to_string(),
            Position::new(lnum, quote_pos as u32),
            Position::new(lnum, quote_pos as u32 + 1),
            line,
        );
        Some(quote_pos + 1)
    }

    fn push(
        &mut self,
        kind: TokenKind,
        text: impl Into<String>,
        start: Position,
        end: Position,
        line: impl Into<String>,
    ) {
        self.pending.push_back(Token::new(kind, text, start, end, line));
    }
}

impl Iterator for Tokenizer {
    type Item = Result<Token, TokenizeError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(Ok(token));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.read_line() {
                self.finished = true;
                self.pending.clear();
                return Some(Err(err));
            }
        }
    }
}

/// Tokenizes a complete source text.
pub fn tokenize(source: &str) -> Result<Vec<Token>, TokenizeError> {
    let lines: Arc<[String]> = split_lines(source).into();
    Tokenizer::new(lines).collect()
}

/// Splits source text into physical lines, keeping line terminators.
pub fn split_lines(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(str::to_string).collect()
}

/// Column where the line content ends, excluding the line terminator.
fn line_content_end(chars: &[char]) -> usize {
    let mut end = chars.len();
    while end > 0 && matches!(chars[end - 1], '\r' | '\n') {
        end -= 1;
    }
    end
}

fn ends_with_continuation(line: &str) -> bool {
    line.trim_end_matches(['\r', '\n']).ends_with('\\') && line.ends_with('\n')
}

/// Finds the column just past the closing quote, starting the search at `from`.
fn find_string_end(chars: &[char], from: usize, quote: &str) -> Option<usize> {
    let quote: Vec<char> = quote.chars().collect();
    let mut pos = from;
    while pos < chars.len() {
        let c = chars[pos];
        if c == '\\' {
            pos += 2;
            continue;
        }
        if chars[pos..].starts_with(&quote) {
            return Some(pos + quote.len());
        }
        pos += 1;
    }
    None
}

fn scan_number(chars: &[char], start: usize) -> usize {
    let mut end = start;
    while end < chars.len() {
        let c = chars[end];
        if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
            end += 1;
        } else if matches!(c, '+' | '-')
            && end > start
            && matches!(chars[end - 1], 'e' | 'E')
            && !is_hex_literal(&chars[start..end])
        {
            end += 1;
        } else {
            break;
        }
    }
    end
}

fn is_hex_literal(chars: &[char]) -> bool {
    chars.len() > 1 && chars[0] == '0' && matches!(chars[1], 'x' | 'X')
}

fn operator_len(chars: &[char], pos: usize) -> usize {
    let rest = &chars[pos..];
    for (ops, len) in [(THREE_CHAR_OPS, 3), (TWO_CHAR_OPS, 2)] {
        if rest.len() >= len {
            let candidate: String = rest[..len].iter().collect();
            if ops.contains(&candidate.as_str()) {
                return len;
            }
        }
    }
    if ONE_CHAR_OPS.contains(rest[0]) { 1 } else { 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source).unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn texts(source: &str) -> Vec<String> {
        tokenize(source).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_simple_statement() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1\n"),
            vec![Name, Op, Number, Newline, EndMarker]
        );
        assert_eq!(texts("x = 1\n"), vec!["x", "=", "1", "\n", ""]);
    }

    #[test]
    fn test_blank_line_produces_nl() {
        use TokenKind::*;
        assert_eq!(kinds("\n  \nx\n"), vec![Nl, Nl, Name, Newline, EndMarker]);
    }

    #[test]
    fn test_comment_line_keeps_its_terminator() {
        use TokenKind::*;
        let tokens = tokenize("# note\nx  # trailing\n").unwrap();

        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Comment, Name, Comment, Newline, EndMarker]
        );
        assert_eq!(tokens[0].text, "# note\n");
        assert_eq!(tokens[2].text, "# trailing");
    }

    #[test]
    fn test_unterminated_comment_line_is_followed_by_nl() {
        use TokenKind::*;
        assert_eq!(kinds("x\n# end"), vec![Name, Newline, Comment, Nl, EndMarker]);
    }

    #[test]
    fn test_brackets_turn_newlines_into_nl() {
        use TokenKind::*;
        assert_eq!(
            kinds("f(a,\n  b)\n"),
            vec![Name, Op, Name, Op, Nl, Name, Op, Newline, EndMarker]
        );
    }

    #[test]
    fn test_indent_and_dedent() {
        use TokenKind::*;
        let source = "if x:\n    y\nz\n";
        assert_eq!(
            kinds(source),
            vec![Name, Name, Op, Newline, Indent, Name, Newline, Dedent, Name, Newline, EndMarker]
        );
    }

    #[test]
    fn test_dedents_emitted_at_eof() {
        let tokens = tokenize("if x:\n    y\n").unwrap();
        let dedent = tokens.iter().find(|t| t.kind == TokenKind::Dedent).unwrap();
        assert_eq!(dedent.start, Position::new(3, 0));
    }

    #[test]
    fn test_triple_quoted_string_spans_lines() {
        let source = "x = \"\"\"a\nb\nc\"\"\"\n";
        let tokens = tokenize(source).unwrap();
        let string = tokens.iter().find(|t| t.kind == TokenKind::String).unwrap();

        assert_eq!(string.text, "\"\"\"a\nb\nc\"\"\"");
        assert_eq!(string.start, Position::new(1, 4));
        assert_eq!(string.end, Position::new(3, 4));
        assert_eq!(string.line, source);
        assert!(string.is_multiline_string());
    }

    #[test]
    fn test_prefixed_string() {
        let tokens = tokenize("rb'\\d'\n").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].text, "rb'\\d'");
    }

    #[test]
    fn test_backslash_continuation_emits_no_token() {
        use TokenKind::*;
        assert_eq!(
            kinds("x = 1 + \\\n    2\n"),
            vec![Name, Op, Number, Op, Number, Newline, EndMarker]
        );
    }

    #[test]
    fn test_missing_final_newline_still_ends_statement() {
        let tokens = tokenize("x = 1").unwrap();
        let newline = tokens.iter().find(|t| t.kind == TokenKind::Newline).unwrap();
        assert_eq!(newline.text, "");
        assert_eq!(newline.start, Position::new(1, 5));
    }

    #[test]
    fn test_operators_prefer_longest_match() {
        assert_eq!(
            texts("a **= b // c\n")[..5],
            ["a", "**=", "b", "//", "c"].map(String::from)
        );
    }

    #[test]
    fn test_numbers_with_exponent() {
        assert_eq!(texts("1e-5 0x1e\n")[..2], ["1e-5", "0x1e"].map(String::from));
    }

    #[test]
    fn test_eof_in_multiline_string_is_an_error() {
        let err = tokenize("x = '''abc\ndef\n").unwrap_err();
        assert_eq!(err.message, "EOF in multi-line string");
        assert_eq!(err.position, Position::new(1, 4));
    }

    #[test]
    fn test_eof_in_multiline_statement_is_an_error() {
        let err = tokenize("foo(1,\n2\n").unwrap_err();
        assert_eq!(err.message, "EOF in multi-line statement");
        assert_eq!(err.position, Position::new(3, 0));
    }

    #[test]
    fn test_inconsistent_dedent_is_an_error() {
        let err = tokenize("if x:\n    y\n  z\n").unwrap_err();
        assert_eq!(err.position, Position::new(3, 2));
    }

    #[test]
    fn test_tokens_before_error_are_yielded() {
        let lines: Arc<[String]> = split_lines("a = 1\nb = (\n").into();
        let results: Vec<_> = Tokenizer::new(lines).collect();

        assert!(results[0].is_ok());
        assert!(results.last().unwrap().is_err());
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
    }

    #[test]
    fn test_lines_read_tracks_consumed_lines() {
        let lines: Arc<[String]> = split_lines("a\nb\n").into();
        let mut tokenizer = Tokenizer::new(lines);
        assert_eq!(tokenizer.lines_read(), 0);

        let first = tokenizer.next().unwrap().unwrap();
        assert_eq!(first.text, "a");
        assert_eq!(tokenizer.lines_read(), 1);
    }

    #[test]
    fn test_unterminated_single_quote_is_error_token() {
        let tokens = tokenize("x = 'abc\n").unwrap();
        assert!(tokens.iter().any(|t| t.kind == TokenKind::ErrorToken && t.text == "'"));
    }
}
