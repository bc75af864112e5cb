//! Text output formatter

use std::io::{self, Write};

use tokenlint_core::ReportSink;
use tokenlint_plugin::Violation;
use tracing::warn;

/// Writes one `path:line:col: CODE message` line per finding.
///
/// Columns are shown 1-based.
pub struct TextSink {
    writer: Box<dyn Write + Send>,
}

impl TextSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl ReportSink for TextSink {
    fn handle(&mut self, violation: &Violation) {
        if let Err(e) = writeln!(self.writer, "{}", format_violation(violation)) {
            warn!("Failed to write finding: {}", e);
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

fn format_violation(violation: &Violation) -> String {
    format!(
        "{}:{}:{}: {} {}",
        violation.filename,
        violation.line_number,
        violation.column_number + 1,
        violation.code,
        violation.text
    )
}
