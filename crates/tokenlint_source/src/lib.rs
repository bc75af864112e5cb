//! # tokenlint_source
//!
//! Source processing for TokenLint.
//!
//! This crate provides:
//! - The token model and a line-driven tokenizer
//! - `FileProcessor`, which reconstructs physical and logical lines
//! - A statement-level syntax tree with positioned syntax errors
//!
//! ## Example
//!
//! ```rust
//! use tokenlint_source::{FileProcessor, ProcessorOptions};
//!
//! let mut processor =
//!     FileProcessor::from_source("example.py", "x = (1,\n     2)\n", &ProcessorOptions::default());
//!
//! while let Some(token) = processor.next_token().unwrap() {
//!     if token.kind == tokenlint_source::TokenKind::Newline {
//!         break;
//!     }
//! }
//!
//! let (_, logical, _) = processor.build_logical_line();
//! assert_eq!(logical, "x = (1, 2)");
//! ```

mod error;
mod position;
mod processor;
mod token;
pub mod tokenizer;
pub mod tree;

pub use error::{SyntaxError, SyntaxErrorKind, TokenizeError};
pub use position::Position;
pub use processor::{
    FileProcessor, OffsetMapping, ProcessorOptions, STDIN_FILENAME, expand_indent,
};
pub use token::{Token, TokenKind, count_parentheses, mutate_string};
pub use tokenizer::{Tokenizer, tokenize};
pub use tree::{Statement, StatementKind, SyntaxTree};
