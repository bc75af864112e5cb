//! # tokenlint_rules
//!
//! Built-in checks for TokenLint.
//!
//! | Code | Kind | Check |
//! |------|------|-------|
//! | E501 | physical | line too long |
//! | W291, W293 | physical | trailing whitespace |
//! | W191 | physical | indentation contains tabs |
//! | E101 | physical | indentation mixes spaces and tabs |
//! | E702, E703 | logical | statements separated or ended by a semicolon |
//! | E711, E712 | logical | comparison to a singleton with `==` or `!=` |
//! | E303, E304 | logical | too many blank lines, blank lines after a decorator |
//! | C901 | syntax tree | function too complex |

mod complexity;
mod logical;
mod physical;

pub use complexity::Complexity;
pub use logical::{BlankLines, ComparisonToSingleton, CompoundStatements};
pub use physical::{MaxLineLength, TabsObsolete, TabsOrSpaces, TrailingWhitespace};

use tokenlint_plugin::{CheckRegistry, PluginError};
use tracing::debug;

/// Settings of the built-in checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleOptions {
    /// Longest allowed physical line.
    pub max_line_length: usize,
    /// Highest allowed function complexity. `None` disables the check.
    pub max_complexity: Option<usize>,
}

impl Default for RuleOptions {
    fn default() -> Self {
        Self {
            max_line_length: 79,
            max_complexity: None,
        }
    }
}

/// Builds a registry holding every built-in check.
pub fn builtin_registry(options: &RuleOptions) -> Result<CheckRegistry, PluginError> {
    let mut registry = CheckRegistry::new();

    registry.register_physical(TabsOrSpaces)?;
    registry.register_physical(TabsObsolete)?;
    registry.register_physical(TrailingWhitespace)?;
    registry.register_physical(MaxLineLength::new(options.max_line_length))?;

    registry.register_logical(BlankLines)?;
    registry.register_logical(CompoundStatements)?;
    registry.register_logical(ComparisonToSingleton)?;

    if let Some(max_complexity) = options.max_complexity {
        registry.register_tree(Complexity::new(max_complexity))?;
    }

    debug!("Registered built-in checks: {:?}", registry);
    Ok(registry)
}
