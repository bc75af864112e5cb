//! # tokenlint_plugin
//!
//! Check plugin contract for TokenLint.
//!
//! This crate provides:
//! - The three check traits: syntax tree, logical line and physical line
//! - The per-check state slot threaded into every invocation
//! - `CheckRegistry`, the read-only partition of registered checks
//! - `Violation`, the diagnostic data model
//!
//! Findings carry their code as the first word of the message, for example
//! `"E501 line too long (82 > 79 characters)"`.

mod check;
mod error;
mod registry;
mod state;
mod violation;

pub use check::{
    LogicalFinding, LogicalLine, LogicalLineCheck, Offset, PhysicalFinding, PhysicalLine,
    PhysicalLineCheck, TreeCheck, TreeContext, TreeFinding,
};
pub use error::PluginError;
pub use registry::CheckRegistry;
pub use state::CheckerState;
pub use violation::Violation;
