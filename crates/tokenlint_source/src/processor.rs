//! Per-file source processing.
//!
//! A [`FileProcessor`] owns the lines of one file and the tokenizer reading
//! them. It assembles logical lines out of the buffered tokens and keeps the
//! bookkeeping checks rely on: blank lines, indentation levels and the
//! previous logical line.

use std::io::{self, Read};
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::tokenizer::{Tokenizer, split_lines};
use crate::tree::SyntaxTree;
use crate::{Position, SyntaxError, Token, TokenKind, TokenizeError, mutate_string};

/// File-level directive that disables checking of the whole file.
static NOQA_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*#\s*tklint[:=]\s*noqa\s*$").expect("valid file noqa pattern")
});

/// The file name that denotes standard input.
pub const STDIN_FILENAME: &str = "-";

const UTF8_BOM: char = '\u{feff}';
const TAB_SIZE: usize = 8;

/// Offset-to-position mapping of a logical line.
///
/// Each entry pairs a character offset into the logical line with the source
/// position it corresponds to. The first entry is `(0, start of first token)`;
/// every following entry is `(length after token, end of token)`.
pub type OffsetMapping = Vec<(usize, Position)>;

/// Options that influence how a file is processed.
#[derive(Debug, Clone, Default)]
pub struct ProcessorOptions {
    /// Ignore file-level `# tklint: noqa` directives.
    pub disable_noqa: bool,
}

/// Processes the tokens and lines of a single file.
#[derive(Debug)]
pub struct FileProcessor {
    filename: String,
    options: ProcessorOptions,
    lines: Arc<[String]>,
    tokenizer: Tokenizer,
    tokens: Vec<Token>,
    scanned_lines: usize,
    multiline_line: Option<u32>,

    /// Number of blank lines seen since the last logical line.
    pub blank_lines: u32,
    /// Largest number of blank lines seen before the current logical line,
    /// across comment-only logical lines.
    pub blank_before: u32,
    /// Indentation character of the file, learned from the first indented line.
    pub indent_char: Option<char>,
    /// Indentation level of the current logical line.
    pub indent_level: usize,
    /// Indentation level of the previous non-empty logical line.
    pub previous_indent_level: usize,
    /// Text of the previous non-empty logical line.
    pub previous_logical: String,
    /// Text of the current logical line.
    pub logical_line: String,
}

impl FileProcessor {
    /// Opens `filename` and prepares it for processing.
    ///
    /// The file name `-` reads standard input.
    pub fn new(filename: impl Into<String>, options: &ProcessorOptions) -> io::Result<Self> {
        let filename = filename.into();
        let source = if filename == STDIN_FILENAME {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        } else {
            std::fs::read_to_string(&filename)?
        };
        Ok(Self::from_source(filename, &source, options))
    }

    /// Creates a processor over in-memory source text.
    pub fn from_source(filename: impl Into<String>, source: &str, options: &ProcessorOptions) -> Self {
        let source = source.strip_prefix(UTF8_BOM).unwrap_or(source);
        let lines: Arc<[String]> = split_lines(source).into();
        Self {
            filename: filename.into(),
            options: options.clone(),
            tokenizer: Tokenizer::new(Arc::clone(&lines)),
            lines,
            tokens: Vec::new(),
            scanned_lines: 0,
            multiline_line: None,
            blank_lines: 0,
            blank_before: 0,
            indent_char: None,
            indent_level: 0,
            previous_indent_level: 0,
            previous_logical: String::new(),
            logical_line: String::new(),
        }
    }

    /// Returns the file name this processor was created for.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Returns all physical lines of the file.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Returns the number of physical lines in the file.
    pub fn total_lines(&self) -> u32 {
        self.lines.len() as u32
    }

    /// Returns the current line number.
    ///
    /// Outside a multi-line string this is the number of lines read so far.
    pub fn line_number(&self) -> u32 {
        self.multiline_line
            .unwrap_or_else(|| self.tokenizer.lines_read())
    }

    /// Returns the physical line with the given 1-based number.
    pub fn line_for(&self, line_number: u32) -> Option<&str> {
        let index = (line_number as usize).checked_sub(1)?;
        self.lines.get(index).map(String::as_str)
    }

    /// Returns the tokens buffered for the current logical line.
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Replaces the buffered tokens.
    pub fn set_tokens(&mut self, tokens: Vec<Token>) {
        self.tokens = tokens;
    }

    /// Drops the first buffered token.
    pub fn delete_first_token(&mut self) {
        if !self.tokens.is_empty() {
            self.tokens.remove(0);
        }
    }

    /// Pulls the next token from the file and buffers it.
    ///
    /// Returns `Ok(None)` once the tokens past the last physical line are
    /// reached.
    pub fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        let Some(token) = self.tokenizer.next().transpose()? else {
            return Ok(None);
        };
        self.learn_indent_char();
        if token.start.line > self.total_lines() {
            return Ok(None);
        }
        debug!(
            "{:?} {}-{} {:?}",
            token.kind, token.start, token.end, token.text
        );
        self.tokens.push(token.clone());
        Ok(Some(token))
    }

    fn learn_indent_char(&mut self) {
        let read = self.tokenizer.lines_read() as usize;
        while self.scanned_lines < read {
            let line = &self.lines[self.scanned_lines];
            self.scanned_lines += 1;
            if self.indent_char.is_none() {
                if let Some(c @ (' ' | '\t')) = line.chars().next() {
                    self.indent_char = Some(c);
                }
            }
        }
    }

    /// Assembles the logical line out of the buffered tokens.
    ///
    /// Returns the joined comments, the logical line text with string
    /// contents masked, and the offset mapping. The mapping is empty when no
    /// buffered token contributes to a logical line.
    pub fn build_logical_line(&mut self) -> (String, String, OffsetMapping) {
        let mut comments = Vec::new();
        let mut logical = String::new();
        let mut mapping: OffsetMapping = Vec::new();
        let mut length = 0;
        let mut previous: Option<Position> = None;

        for token in &self.tokens {
            if token.is_skipped_in_logical_line() {
                continue;
            }
            if mapping.is_empty() {
                mapping.push((0, token.start));
            }
            if token.kind == TokenKind::Comment {
                comments.push(token.text.clone());
                continue;
            }

            let mut text = if token.kind == TokenKind::String {
                mutate_string(&token.text)
            } else {
                token.text.clone()
            };

            if let Some(prev) = previous {
                if prev.line != token.start.line {
                    let prev_char = self
                        .line_for(prev.line)
                        .and_then(|line| line.chars().nth((prev.column as usize).saturating_sub(1)));
                    let opens = matches!(prev_char, Some('{' | '[' | '('));
                    let closes = matches!(text.as_str(), "}" | "]" | ")");
                    if prev_char == Some(',') || (!opens && !closes) {
                        text.insert(0, ' ');
                    }
                } else if prev.column != token.start.column {
                    let gap = char_slice(
                        &token.line,
                        prev.column as usize,
                        token.start.column as usize,
                    );
                    text.insert_str(0, &gap);
                }
            }

            length += text.chars().count();
            logical.push_str(&text);
            mapping.push((length, token.end));
            previous = Some(token.end);
        }

        self.logical_line = logical.clone();
        (comments.concat(), logical, mapping)
    }

    /// Updates indentation and blank line state for a new logical line.
    pub fn update_state(&mut self, mapping: &OffsetMapping) {
        let Some(&(_, start)) = mapping.first() else {
            return;
        };
        let prefix = self
            .line_for(start.line)
            .map(|line| char_slice(line, 0, start.column as usize))
            .unwrap_or_default();
        self.indent_level = expand_indent(&prefix);
        self.blank_before = self.blank_before.max(self.blank_lines);
    }

    /// Moves on to the next logical line.
    pub fn next_logical_line(&mut self) {
        if !self.logical_line.is_empty() {
            self.previous_indent_level = self.indent_level;
            self.previous_logical = std::mem::take(&mut self.logical_line);
        }
        self.blank_lines = 0;
        self.tokens.clear();
    }

    /// Resets the blank lines counted before a logical line.
    pub fn reset_blank_before(&mut self) {
        self.blank_before = 0;
    }

    /// Records a blank line.
    pub fn visited_new_blank_line(&mut self) {
        self.blank_lines += 1;
    }

    /// Reports whether the whole file should be skipped.
    pub fn should_ignore_file(&self) -> bool {
        if self.options.disable_noqa {
            return false;
        }
        let ignored = self
            .lines
            .iter()
            .any(|line| NOQA_FILE.is_match(line.trim_end_matches(['\r', '\n'])));
        if ignored {
            warn!("Skipping {} because of a file-level noqa directive", self.filename);
        }
        ignored
    }

    /// Applies corrections after a physical line check reported `code`.
    pub fn check_physical_error(&mut self, code: &str, line: &str) {
        if code == "E101" {
            self.indent_char = line.chars().next();
        }
    }

    /// Overrides the current line number while the physical lines of a
    /// multi-line string are checked.
    pub fn enter_multiline(&mut self, line_number: u32) {
        self.multiline_line = Some(line_number);
    }

    /// Advances the overridden line number to the next line of the string.
    pub fn next_multiline_line(&mut self) {
        if let Some(line) = self.multiline_line.as_mut() {
            *line += 1;
        }
    }

    /// Restores the regular line number after a multi-line string.
    pub fn leave_multiline(&mut self) {
        self.multiline_line = None;
    }

    /// Returns the physical lines a multi-line token spans, except the last.
    ///
    /// The last line is terminated by a regular token and is checked when
    /// that token is seen.
    pub fn split_line(&self, token: &Token) -> Vec<String> {
        let count = token.end.line.saturating_sub(token.start.line) as usize;
        token
            .line
            .split_inclusive('\n')
            .take(count)
            .map(str::to_string)
            .collect()
    }

    /// Builds the syntax tree of the whole file.
    pub fn build_ast(&self) -> Result<SyntaxTree, SyntaxError> {
        SyntaxTree::parse(&self.lines)
    }
}

/// Returns the indentation width of a line, expanding tabs to multiples of 8.
pub fn expand_indent(line: &str) -> usize {
    let mut width = 0;
    for c in line.chars() {
        match c {
            '\t' => width = width / TAB_SIZE * TAB_SIZE + TAB_SIZE,
            ' ' => width += 1,
            _ => break,
        }
    }
    width
}

fn char_slice(line: &str, from: usize, to: usize) -> String {
    line.chars().skip(from).take(to.saturating_sub(from)).collect()
}
