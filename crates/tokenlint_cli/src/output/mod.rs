//! Output formatting module

mod json;
mod text;

use std::io::Write;

use tokenlint_core::ReportSink;

pub use json::JsonSink;
pub use text::TextSink;

use crate::cli::OutputFormat;

/// Creates the sink that renders accepted findings in `format`.
pub fn create_sink(format: OutputFormat, writer: Box<dyn Write + Send>) -> Box<dyn ReportSink> {
    match format {
        OutputFormat::Text => Box::new(TextSink::new(writer)),
        OutputFormat::Json => Box::new(JsonSink::new(writer)),
    }
}
