//! Per-file check driver.
//!
//! A [`FileChecker`] feeds the tokens of one file through a small state
//! machine. Physical line checks run whenever a token ends a physical line,
//! logical line checks whenever a statement ends outside of brackets, and the
//! syntax tree checks once at the end.

use std::sync::Arc;

use crossbeam_channel::Sender;
use tokenlint_plugin::{
    CheckRegistry, CheckerState, LogicalLine, Offset, PhysicalLine, TreeContext, Violation,
};
use tokenlint_source::{
    FileProcessor, Position, ProcessorOptions, Token, TokenKind, TokenizeError, count_parentheses,
};
use tracing::debug;

use crate::manager::ResultMessage;

/// Code reported when a file cannot be read or tokenized.
pub const IO_ERROR_CODE: &str = "E902";

/// Code reported when a file cannot be parsed.
pub const SYNTAX_ERROR_CODE: &str = "E999";

/// Runs all checks against a single file and collects the raw findings.
#[derive(Debug)]
pub struct FileChecker {
    filename: String,
    registry: Arc<CheckRegistry>,
    processor: Option<FileProcessor>,
    results: Vec<Violation>,
    tree_states: Vec<CheckerState>,
    logical_states: Vec<CheckerState>,
    physical_states: Vec<CheckerState>,
}

impl FileChecker {
    /// Opens `filename` for checking.
    ///
    /// A file that cannot be read yields a checker holding a single `E902`
    /// finding and running no checks.
    pub fn new(
        filename: impl Into<String>,
        registry: Arc<CheckRegistry>,
        options: &ProcessorOptions,
    ) -> Self {
        let filename = filename.into();
        let processor = FileProcessor::new(filename.as_str(), options);
        let mut checker = Self::with_processor(filename, registry, None);
        match processor {
            Ok(processor) => checker.processor = Some(processor),
            Err(err) => {
                debug!("Cannot read {}: {}", checker.filename, err);
                let message = format!("{:?}: {}", err.kind(), err);
                checker.report(Some(IO_ERROR_CODE), 1, 0, &message);
            }
        }
        checker
    }

    /// Creates a checker over in-memory source text.
    pub fn from_source(
        filename: impl Into<String>,
        source: &str,
        registry: Arc<CheckRegistry>,
        options: &ProcessorOptions,
    ) -> Self {
        let filename = filename.into();
        let processor = FileProcessor::from_source(filename.as_str(), source, options);
        Self::with_processor(filename, registry, Some(processor))
    }

    fn with_processor(
        filename: String,
        registry: Arc<CheckRegistry>,
        processor: Option<FileProcessor>,
    ) -> Self {
        let states = |count: usize| -> Vec<CheckerState> {
            (0..count).map(|_| CheckerState::new()).collect()
        };
        Self {
            tree_states: states(registry.tree_checks().len()),
            logical_states: states(registry.logical_checks().len()),
            physical_states: states(registry.physical_checks().len()),
            filename,
            registry,
            processor,
            results: Vec::new(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Raw findings collected so far, in the order they were found.
    pub fn results(&self) -> &[Violation] {
        &self.results
    }

    /// Takes the collected findings out of the checker.
    pub fn take_results(&mut self) -> Vec<Violation> {
        std::mem::take(&mut self.results)
    }

    /// Records a finding and returns its code.
    ///
    /// Without an explicit code, the first word of `text` is the code and
    /// the rest is the message.
    pub fn report(&mut self, code: Option<&str>, line_number: u32, column: u32, text: &str) -> String {
        let (code, message) = match code {
            Some(code) => (code, text),
            None => text.split_once(' ').unwrap_or((text, "")),
        };
        let physical_line = self
            .processor
            .as_ref()
            .and_then(|processor| processor.line_for(line_number));

        let violation = Violation::new(code, self.filename.as_str(), line_number, column, message)
            .with_physical_line(physical_line);
        self.results.push(violation);
        code.to_string()
    }

    /// Runs every check against the file.
    ///
    /// A tokenizer failure is recorded as an `E902` finding and stops token
    /// processing; the syntax tree checks still run. When `results` is given
    /// the findings are sent there as one batch.
    pub fn run_checks(&mut self, results: Option<&Sender<ResultMessage>>) {
        if let Some(processor) = self.processor.as_ref() {
            if processor.should_ignore_file() {
                return;
            }

            if let Err(err) = self.process_tokens() {
                let line = err.position.line.max(1);
                let message = format!("TokenError: {}", err.message);
                self.report(Some(IO_ERROR_CODE), line, err.position.column, &message);
            }
            self.run_ast_checks();
        }

        if let Some(sender) = results {
            let batch = ResultMessage::Batch {
                filename: self.filename.clone(),
                results: self.take_results(),
            };
            if sender.send(batch).is_err() {
                debug!("Result queue closed before {} was sent", self.filename);
            }
        }
    }

    fn process_tokens(&mut self) -> Result<(), TokenizeError> {
        let mut parens = 0;
        loop {
            let Some(processor) = self.processor.as_mut() else {
                return Ok(());
            };
            let Some(token) = processor.next_token()? else {
                break;
            };

            self.check_physical_eol(&token);
            if token.kind == TokenKind::Op {
                parens = count_parentheses(parens, &token.text);
            } else if parens == 0 {
                if token.is_newline() {
                    self.handle_newline(token.kind);
                } else if token.is_comment() && self.buffered_tokens() == 1 {
                    self.handle_comment(token);
                }
            }
        }

        if self.buffered_tokens() > 0 {
            let last_line = self
                .processor
                .as_ref()
                .and_then(|processor| processor.lines().last().cloned());
            if let Some(line) = last_line {
                self.run_physical_checks(&line);
            }
            self.run_logical_checks();
        }
        Ok(())
    }

    fn buffered_tokens(&self) -> usize {
        self.processor
            .as_ref()
            .map_or(0, |processor| processor.tokens().len())
    }

    /// A comment on its own line forms a logical line by itself.
    fn handle_comment(&mut self, token: Token) {
        let text = token.text.trim_end_matches(['\r', '\n']).to_string();
        let end = Position::new(
            token.start.line,
            token.start.column + text.chars().count() as u32,
        );
        let comment = Token { text, end, ..token };
        if let Some(processor) = self.processor.as_mut() {
            processor.set_tokens(vec![comment]);
        }
        self.run_logical_checks();
    }

    fn handle_newline(&mut self, kind: TokenKind) {
        if kind == TokenKind::Newline {
            self.run_logical_checks();
            if let Some(processor) = self.processor.as_mut() {
                processor.reset_blank_before();
            }
        } else if self.buffered_tokens() == 1 {
            // Only the line break itself: a blank line.
            if let Some(processor) = self.processor.as_mut() {
                processor.visited_new_blank_line();
                processor.delete_first_token();
            }
        } else {
            self.run_logical_checks();
        }
    }

    /// Runs the physical line checks when `token` ends a physical line.
    ///
    /// Every line of a multi-line string except its last is checked here,
    /// at its own line number. The last line ends with a regular token.
    fn check_physical_eol(&mut self, token: &Token) {
        if token.is_eol() {
            self.run_physical_checks(&token.line);
        } else if token.is_multiline_string() {
            let Some(processor) = self.processor.as_mut() else {
                return;
            };
            let lines = processor.split_line(token);
            processor.enter_multiline(token.start.line);
            for line in &lines {
                self.run_physical_checks(line);
                if let Some(processor) = self.processor.as_mut() {
                    processor.next_multiline_line();
                }
            }
            if let Some(processor) = self.processor.as_mut() {
                processor.leave_multiline();
            }
        }
    }

    /// Runs every physical line check against one line.
    pub fn run_physical_checks(&mut self, physical_line: &str) {
        let registry = Arc::clone(&self.registry);
        for (index, check) in registry.physical_checks().iter().enumerate() {
            let Some(processor) = self.processor.as_ref() else {
                return;
            };
            let context = PhysicalLine {
                text: physical_line,
                line_number: processor.line_number(),
                indent_char: processor.indent_char,
            };

            debug!("Running {} on line {}", check.name(), context.line_number);
            let Some((column, text)) = check.run(&context, &mut self.physical_states[index]) else {
                continue;
            };
            let code = self.report(None, context.line_number, column, &text);
            if let Some(processor) = self.processor.as_mut() {
                processor.check_physical_error(&code, physical_line);
            }
        }
    }

    /// Builds the current logical line and runs every logical line check
    /// against it.
    pub fn run_logical_checks(&mut self) {
        let Some(processor) = self.processor.as_mut() else {
            return;
        };
        let (comments, logical_line, mapping) = processor.build_logical_line();
        if mapping.is_empty() {
            return;
        }
        processor.update_state(&mapping);
        debug!("Logical line: \"{}\"", logical_line.trim_end());

        let context = LogicalLine {
            text: &logical_line,
            comments: &comments,
            tokens: processor.tokens(),
            blank_lines: processor.blank_lines,
            blank_before: processor.blank_before,
            indent_level: processor.indent_level,
            previous_logical: &processor.previous_logical,
            previous_indent_level: processor.previous_indent_level,
            indent_char: processor.indent_char,
            line_number: processor.line_number(),
        };
        let mut findings = Vec::new();
        for (check, state) in self
            .registry
            .logical_checks()
            .iter()
            .zip(self.logical_states.iter_mut())
        {
            debug!("Running {}", check.name());
            findings.extend(check.run(&context, state));
        }

        for (offset, text) in findings {
            let position = find_offset(offset, &mapping);
            self.report(None, position.line, position.column, &text);
        }

        if let Some(processor) = self.processor.as_mut() {
            processor.next_logical_line();
        }
    }

    /// Builds the syntax tree and runs every tree check against it.
    ///
    /// A file that cannot be parsed gets one `E999` finding instead, and
    /// findings after the error line are dropped.
    pub fn run_ast_checks(&mut self) {
        let Some(processor) = self.processor.as_ref() else {
            return;
        };
        let tree = match processor.build_ast() {
            Ok(tree) => tree,
            Err(err) => {
                let position = err.position.unwrap_or(Position::new(1, 0));
                let line = position.line.max(1);
                // Nothing past the error point is meaningful.
                self.results.retain(|violation| violation.line_number <= line);
                let message = format!("{}: {}", err.type_name(), err.message);
                self.report(
                    Some(SYNTAX_ERROR_CODE),
                    line,
                    position.column,
                    &message,
                );
                return;
            }
        };

        let context = TreeContext {
            tree: &tree,
            filename: &self.filename,
            lines: processor.lines(),
        };
        let mut findings = Vec::new();
        for (check, state) in self
            .registry
            .tree_checks()
            .iter()
            .zip(self.tree_states.iter_mut())
        {
            debug!("Running {}", check.name());
            findings.extend(check.run(&context, state));
        }

        for finding in findings {
            self.report(None, finding.line, finding.column, &finding.message);
        }
    }
}

/// Resolves a logical line offset to a source position.
///
/// A character offset maps through the first mapping entry whose offset is
/// at or past it, or the last entry when it lies beyond the line.
pub fn find_offset(offset: Offset, mapping: &[(usize, Position)]) -> Position {
    let offset = match offset {
        Offset::Position(position) => return position,
        Offset::Char(offset) => offset,
    };

    let Some(&(boundary, position)) = mapping
        .iter()
        .find(|(boundary, _)| offset <= *boundary)
        .or_else(|| mapping.last())
    else {
        return Position::new(1, 0);
    };

    let column = i64::from(position.column) + offset as i64 - boundary as i64;
    Position::new(position.line, column.max(0) as u32)
}
