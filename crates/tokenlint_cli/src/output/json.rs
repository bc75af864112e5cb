//! JSON output formatter

use std::io::{self, Write};

use tokenlint_core::ReportSink;
use tokenlint_plugin::Violation;

/// Collects findings and writes them as one JSON array when finished.
pub struct JsonSink {
    writer: Box<dyn Write + Send>,
    violations: Vec<Violation>,
}

impl JsonSink {
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer,
            violations: Vec::new(),
        }
    }
}

impl ReportSink for JsonSink {
    fn handle(&mut self, violation: &Violation) {
        self.violations.push(violation.clone());
    }

    fn finish(&mut self) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, &self.violations)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }
}
