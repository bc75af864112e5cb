//! Physical line checks.

use tokenlint_plugin::{CheckerState, PhysicalFinding, PhysicalLine, PhysicalLineCheck};

/// Leading spaces and tabs of a line.
fn indentation(line: &str) -> &str {
    let end = line
        .find(|c: char| c != ' ' && c != '\t')
        .unwrap_or(line.len());
    &line[..end]
}

/// E501: line longer than the configured maximum.
///
/// A comment holding nothing but one long word, typically a URL, is allowed
/// as long as the part before the word fits.
#[derive(Debug, Clone, Copy)]
pub struct MaxLineLength {
    max_line_length: usize,
}

impl MaxLineLength {
    pub fn new(max_line_length: usize) -> Self {
        Self { max_line_length }
    }
}

impl PhysicalLineCheck for MaxLineLength {
    fn name(&self) -> &str {
        "max-line-length"
    }

    fn run(&self, line: &PhysicalLine<'_>, _state: &mut CheckerState) -> Option<PhysicalFinding> {
        let text = line.text.trim_end();
        let length = text.chars().count();
        if length <= self.max_line_length {
            return None;
        }

        let chunks: Vec<&str> = text.split_whitespace().collect();
        if let [first, last] = chunks.as_slice() {
            let prefix = length - last.chars().count();
            if *first == "#" && prefix < self.max_line_length.saturating_sub(7) {
                return None;
            }
        }

        Some((
            self.max_line_length as u32,
            format!(
                "E501 line too long ({} > {} characters)",
                length, self.max_line_length
            ),
        ))
    }
}

/// W291 and W293: trailing whitespace.
#[derive(Debug, Clone, Copy)]
pub struct TrailingWhitespace;

impl PhysicalLineCheck for TrailingWhitespace {
    fn name(&self) -> &str {
        "trailing-whitespace"
    }

    fn run(&self, line: &PhysicalLine<'_>, _state: &mut CheckerState) -> Option<PhysicalFinding> {
        let text = line.text.trim_end_matches(['\n', '\r', '\x0c']);
        let stripped = text.trim_end_matches([' ', '\t', '\x0b']);
        if text == stripped {
            return None;
        }

        if stripped.is_empty() {
            Some((0, "W293 blank line contains whitespace".to_string()))
        } else {
            Some((
                stripped.chars().count() as u32,
                "W291 trailing whitespace".to_string(),
            ))
        }
    }
}

/// W191: indentation contains tabs.
#[derive(Debug, Clone, Copy)]
pub struct TabsObsolete;

impl PhysicalLineCheck for TabsObsolete {
    fn name(&self) -> &str {
        "tabs-obsolete"
    }

    fn run(&self, line: &PhysicalLine<'_>, _state: &mut CheckerState) -> Option<PhysicalFinding> {
        indentation(line.text)
            .find('\t')
            .map(|offset| (offset as u32, "W191 indentation contains tabs".to_string()))
    }
}

/// E101: indentation uses a character other than the file's indent
/// character.
#[derive(Debug, Clone, Copy)]
pub struct TabsOrSpaces;

impl PhysicalLineCheck for TabsOrSpaces {
    fn name(&self) -> &str {
        "tabs-or-spaces"
    }

    fn run(&self, line: &PhysicalLine<'_>, _state: &mut CheckerState) -> Option<PhysicalFinding> {
        let indent_char = line.indent_char?;
        indentation(line.text)
            .chars()
            .position(|c| c != indent_char)
            .map(|offset| {
                (
                    offset as u32,
                    "E101 indentation contains mixed spaces and tabs".to_string(),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn run(check: &dyn PhysicalLineCheck, text: &str, indent_char: Option<char>) -> Option<PhysicalFinding> {
        let line = PhysicalLine {
            text,
            line_number: 1,
            indent_char,
        };
        check.run(&line, &mut CheckerState::new())
    }

    #[rstest]
    #[case::short("x = 1\n", None)]
    #[case::exact(&format!("{}\n", "x".repeat(79)), None)]
    #[case::long(&format!("{}\n", "x".repeat(80)), Some((79, "E501 line too long (80 > 79 characters)".to_string())))]
    #[case::url_comment(&format!("# {}\n", "h".repeat(100)), None)]
    #[case::indented_long_comment(&format!("{}# {}\n", " ".repeat(75), "h".repeat(20)), Some((79, "E501 line too long (97 > 79 characters)".to_string())))]
    fn test_max_line_length(#[case] text: &str, #[case] expected: Option<PhysicalFinding>) {
        assert_eq!(run(&MaxLineLength::new(79), text, None), expected);
    }

    #[test]
    fn test_max_line_length_counts_characters() {
        let text = format!("s = '{}'\n", "é".repeat(70));
        assert_eq!(run(&MaxLineLength::new(79), &text, None), None);
    }

    #[rstest]
    #[case("x = 1\n", None)]
    #[case("x = 1  \n", Some((5, "W291 trailing whitespace".to_string())))]
    #[case("x = 1\t\r\n", Some((5, "W291 trailing whitespace".to_string())))]
    #[case("    \n", Some((0, "W293 blank line contains whitespace".to_string())))]
    #[case("\n", None)]
    fn test_trailing_whitespace(#[case] text: &str, #[case] expected: Option<PhysicalFinding>) {
        assert_eq!(run(&TrailingWhitespace, text, None), expected);
    }

    #[rstest]
    #[case("    x\n", None)]
    #[case("\tx\n", Some(0))]
    #[case("  \tx\n", Some(2))]
    #[case("x = '\t'\n", None)]
    fn test_tabs_obsolete(#[case] text: &str, #[case] expected: Option<u32>) {
        assert_eq!(run(&TabsObsolete, text, None).map(|f| f.0), expected);
    }

    #[rstest]
    #[case("    x\n", Some(' '), None)]
    #[case("\t x\n", Some('\t'), Some(1))]
    #[case("  \tx\n", Some(' '), Some(2))]
    #[case("\tx\n", None, None)]
    fn test_tabs_or_spaces(
        #[case] text: &str,
        #[case] indent_char: Option<char>,
        #[case] expected: Option<u32>,
    ) {
        assert_eq!(run(&TabsOrSpaces, text, indent_char).map(|f| f.0), expected);
    }
}
