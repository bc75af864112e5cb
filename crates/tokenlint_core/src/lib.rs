//! # tokenlint_core
//!
//! Core linter engine for TokenLint.
//!
//! This crate provides:
//! - `FileChecker`, which drives the checks of one file over its tokens
//! - `Manager`, which runs checkers serially or on a worker pool
//! - `StyleGuide`, which decides which findings are reported
//! - Configuration loading, file discovery and diff parsing
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use tokenlint_core::{LinterConfig, Manager, MemorySink, StyleGuide};
//!
//! let config = LinterConfig::discover(".")?.unwrap_or_default();
//! let sink = MemorySink::new();
//! let style_guide = StyleGuide::new(config.style_guide_options(), Box::new(sink.clone()));
//!
//! let mut manager = Manager::new(
//!     Arc::new(Mutex::new(style_guide)),
//!     vec!["src".to_string()],
//!     Arc::new(registry),
//!     &config,
//! )?;
//! manager.start();
//! manager.run()?;
//! manager.report();
//!
//! for violation in sink.violations() {
//!     println!("{}:{}: {}", violation.filename, violation.line_number, violation.code);
//! }
//! ```

pub mod checker;
mod config;
pub mod diff;
mod error;
pub mod file_finder;
pub mod manager;
pub mod notifier;
pub mod style_guide;

pub use checker::{FileChecker, IO_ERROR_CODE, SYNTAX_ERROR_CODE, find_offset};
pub use config::LinterConfig;
pub use diff::{DiffRanges, parse_unified_diff};
pub use error::LinterError;
pub use file_finder::{FileFinder, is_using_stdin};
pub use manager::{
    ExecutionEnvironment, Manager, ResultMessage, WorkMessage, determine_worker_count,
    is_serial_retry,
};
pub use notifier::{Listener, Notifier};
pub use style_guide::{
    Decision, MemorySink, ReportSink, Selection, StyleGuide, StyleGuideOptions,
};
