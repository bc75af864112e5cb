//! Logical line checks.

use std::sync::LazyLock;

use regex::Regex;
use tokenlint_plugin::{CheckerState, LogicalFinding, LogicalLine, LogicalLineCheck, Offset};

const TOP_LEVEL_BLANK_LINES: u32 = 2;
const METHOD_BLANK_LINES: u32 = 1;

static SINGLETON_LEFT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?P<singleton>None|False|True)\s*(?P<op>[=!]=)")
        .expect("valid singleton comparison pattern")
});

static SINGLETON_RIGHT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<op>[=!]=)\s*(?P<singleton>None|False|True)\b")
        .expect("valid singleton comparison pattern")
});

/// Converts a byte offset into `text` to a character offset.
fn char_offset(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// E303 and E304: blank line usage between statements.
#[derive(Debug, Clone, Copy)]
pub struct BlankLines;

impl LogicalLineCheck for BlankLines {
    fn name(&self) -> &str {
        "blank-lines"
    }

    fn run(&self, line: &LogicalLine<'_>, _state: &mut CheckerState) -> Vec<LogicalFinding> {
        if line.previous_logical.is_empty() && line.blank_before < TOP_LEVEL_BLANK_LINES {
            return Vec::new();
        }

        if line.previous_logical.starts_with('@') {
            if line.blank_lines > 0 {
                return vec![(
                    Offset::Char(0),
                    format!(
                        "E304 blank lines found after function decorator ({})",
                        line.blank_lines
                    ),
                )];
            }
        } else if line.blank_lines > TOP_LEVEL_BLANK_LINES
            || (line.indent_level > 0 && line.blank_lines == METHOD_BLANK_LINES + 1)
        {
            return vec![(
                Offset::Char(0),
                format!("E303 too many blank lines ({})", line.blank_lines),
            )];
        }
        Vec::new()
    }
}

/// E702 and E703: semicolons between or after statements.
#[derive(Debug, Clone, Copy)]
pub struct CompoundStatements;

impl LogicalLineCheck for CompoundStatements {
    fn name(&self) -> &str {
        "compound-statements"
    }

    fn run(&self, line: &LogicalLine<'_>, _state: &mut CheckerState) -> Vec<LogicalFinding> {
        let last_char = line.text.chars().count().saturating_sub(1);
        line.text
            .chars()
            .enumerate()
            .filter(|(_, c)| *c == ';')
            .map(|(offset, _)| {
                let message = if offset < last_char {
                    "E702 multiple statements on one line (semicolon)"
                } else {
                    "E703 statement ends with a semicolon"
                };
                (Offset::Char(offset), message.to_string())
            })
            .collect()
    }
}

/// E711 and E712: comparison to `None`, `True` or `False` with `==` or `!=`.
#[derive(Debug, Clone, Copy)]
pub struct ComparisonToSingleton;

impl LogicalLineCheck for ComparisonToSingleton {
    fn name(&self) -> &str {
        "comparison-to-singleton"
    }

    fn run(&self, line: &LogicalLine<'_>, _state: &mut CheckerState) -> Vec<LogicalFinding> {
        let mut matches: Vec<(usize, &str, &str)> = SINGLETON_LEFT
            .captures_iter(line.text)
            .chain(SINGLETON_RIGHT.captures_iter(line.text))
            .filter_map(|caps| {
                let op = caps.name("op")?;
                let singleton = caps.name("singleton")?;
                Some((op.start(), op.as_str(), singleton.as_str()))
            })
            .collect();
        matches.sort_by_key(|(start, _, _)| *start);
        matches.dedup_by_key(|(start, _, _)| *start);

        matches
            .into_iter()
            .map(|(start, op, singleton)| {
                let same = op == "==";
                let mut suggestion = format!(
                    "'if cond is {}{}:'",
                    if same { "" } else { "not " },
                    singleton
                );
                let code = if singleton == "None" {
                    "E711"
                } else {
                    let nonzero = (singleton == "True" && same) || (singleton == "False" && !same);
                    suggestion.push_str(&format!(
                        " or 'if {}cond:'",
                        if nonzero { "" } else { "not " }
                    ));
                    "E712"
                };
                (
                    Offset::Char(char_offset(line.text, start)),
                    format!("{} comparison to {} should be {}", code, singleton, suggestion),
                )
            })
            .collect()
    }
}
