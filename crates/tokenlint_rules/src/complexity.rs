//! Cyclomatic complexity of functions.

use tokenlint_plugin::{CheckerState, TreeCheck, TreeContext, TreeFinding};
use tokenlint_source::Statement;

/// Keywords that open a new branch of control flow.
const BRANCH_KEYWORDS: &[&str] = &["if", "elif", "for", "while", "except", "case"];

/// C901: function too complex.
///
/// The complexity of a function is one plus the number of branching
/// statements in its body. Nested functions and classes are measured on
/// their own.
#[derive(Debug, Clone, Copy)]
pub struct Complexity {
    max_complexity: usize,
}

impl Complexity {
    pub fn new(max_complexity: usize) -> Self {
        Self { max_complexity }
    }
}

impl TreeCheck for Complexity {
    fn name(&self) -> &str {
        "complexity"
    }

    fn run(&self, context: &TreeContext<'_>, _state: &mut CheckerState) -> Vec<TreeFinding> {
        context
            .tree
            .walk()
            .filter(|statement| statement.keyword() == Some("def"))
            .filter_map(|function| {
                let complexity = 1 + count_branches(&function.body);
                if complexity <= self.max_complexity {
                    return None;
                }
                let name = function.defined_name().unwrap_or("<unknown>");
                let start = function.start();
                Some(TreeFinding::new(
                    start.line,
                    start.column,
                    format!("C901 '{}' is too complex ({})", name, complexity),
                    self.name(),
                ))
            })
            .collect()
    }
}

fn count_branches(body: &[Statement]) -> usize {
    body.iter()
        .map(|statement| match statement.keyword() {
            Some("def" | "class") => 0,
            Some(keyword) if BRANCH_KEYWORDS.contains(&keyword) => {
                1 + count_branches(&statement.body)
            }
            _ => count_branches(&statement.body),
        })
        .sum()
}
