//! The decision engine.
//!
//! [`StyleGuide`] decides for every raw diagnostic whether it is reported:
//! the code has to be selected by the user's select/ignore prefixes, the
//! physical line must not carry a matching `# noqa` comment, and the line has
//! to be part of the diff when the run is restricted to one.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use regex::Regex;
use tokenlint_plugin::Violation;
use tokenlint_source::STDIN_FILENAME;
use tracing::debug;

use crate::diff::DiffRanges;
use crate::notifier::{Listener, Notifier};

/// Trailing `# noqa` comment, optionally followed by a list of codes.
static NOQA_INLINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)# noqa(?:: )?(?P<codes>[A-Z0-9,]+)?$").expect("valid noqa pattern")
});

/// Options the decision engine is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleGuideOptions {
    /// Code prefixes to report. Empty selects everything.
    pub select: Vec<String>,
    /// Code prefixes to ignore.
    pub ignore: Vec<String>,
    /// Ignore inline `# noqa` comments.
    pub disable_noqa: bool,
    /// File name reported for standard input.
    pub stdin_display_name: String,
}

impl Default for StyleGuideOptions {
    fn default() -> Self {
        Self {
            select: Vec::new(),
            ignore: Vec::new(),
            disable_noqa: false,
            stdin_display_name: "stdin".to_string(),
        }
    }
}

/// How a code relates to one of the select/ignore prefix lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    ExplicitlySelected,
    ImplicitlySelected,
    ExplicitlyIgnored,
    ImplicitlyIgnored,
}

/// Whether diagnostics with a code are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Selected,
    Ignored,
}

/// Receives accepted diagnostics in their final order.
pub trait ReportSink: Send {
    /// Handles one accepted diagnostic.
    fn handle(&mut self, violation: &Violation);

    /// Called once after the last diagnostic.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that keeps accepted diagnostics in memory.
///
/// Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    violations: Arc<Mutex<Vec<Violation>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything handled so far.
    pub fn violations(&self) -> Vec<Violation> {
        self.violations.lock().clone()
    }
}

impl ReportSink for MemorySink {
    fn handle(&mut self, violation: &Violation) {
        self.violations.lock().push(violation.clone());
    }
}

/// Decides which diagnostics are reported and forwards them.
pub struct StyleGuide {
    options: StyleGuideOptions,
    notifier: Notifier,
    sink: Box<dyn ReportSink>,
    decision_cache: HashMap<String, Decision>,
    parsed_diff: DiffRanges,
    line_cache: HashMap<String, Vec<String>>,
    total_reported: usize,
}

impl StyleGuide {
    pub fn new(options: StyleGuideOptions, sink: Box<dyn ReportSink>) -> Self {
        Self {
            options,
            notifier: Notifier::new(),
            sink,
            decision_cache: HashMap::new(),
            parsed_diff: DiffRanges::new(),
            line_cache: HashMap::new(),
            total_reported: 0,
        }
    }

    pub fn options(&self) -> &StyleGuideOptions {
        &self.options
    }

    /// Registers a listener notified for accepted codes starting with `prefix`.
    pub fn register_listener(&mut self, prefix: impl Into<String>, listener: Box<dyn Listener>) {
        self.notifier.register_listener(prefix, listener);
    }

    /// Restricts reporting to the given lines.
    pub fn add_diff_ranges(&mut self, ranges: DiffRanges) {
        self.parsed_diff = ranges;
    }

    /// Number of diagnostics accepted so far.
    pub fn total_reported(&self) -> usize {
        self.total_reported
    }

    /// Resolves `code` against the select list.
    pub fn is_user_selected(&self, code: &str) -> Selection {
        if self.options.select.is_empty() {
            return Selection::ImplicitlySelected;
        }
        if starts_with_any(code, &self.options.select) {
            return Selection::ExplicitlySelected;
        }
        Selection::ImplicitlyIgnored
    }

    /// Resolves `code` against the ignore list.
    pub fn is_user_ignored(&self, code: &str) -> Selection {
        if starts_with_any(code, &self.options.ignore) {
            return Selection::ExplicitlyIgnored;
        }
        Selection::ImplicitlySelected
    }

    /// Breaks the tie for a code matched by both lists.
    ///
    /// The smallest matching prefix of each list is compared; the code is
    /// selected when the select prefix extends the ignore prefix.
    fn decision_for(&self, code: &str) -> Decision {
        let smallest_match = |prefixes: &[String]| {
            prefixes
                .iter()
                .filter(|prefix| code.starts_with(prefix.as_str()))
                .min()
                .cloned()
                .unwrap_or_default()
        };
        let selected = smallest_match(&self.options.select);
        let ignored = smallest_match(&self.options.ignore);

        if selected.starts_with(&ignored) {
            Decision::Selected
        } else {
            Decision::Ignored
        }
    }

    /// Decides whether diagnostics with `code` are reported.
    pub fn should_report_error(&mut self, code: &str) -> Decision {
        if let Some(decision) = self.decision_cache.get(code) {
            return *decision;
        }

        let selected = self.is_user_selected(code);
        let ignored = self.is_user_ignored(code);
        let decision = match (selected, ignored) {
            (
                Selection::ExplicitlySelected | Selection::ImplicitlySelected,
                Selection::ImplicitlySelected,
            ) => Decision::Selected,
            (Selection::ExplicitlySelected, Selection::ExplicitlyIgnored) => {
                self.decision_for(code)
            }
            _ => Decision::Ignored,
        };

        debug!("\"{}\" will be {:?}", code, decision);
        self.decision_cache.insert(code.to_string(), decision);
        decision
    }

    /// Reports whether the diagnostic's line carries a matching `# noqa`.
    ///
    /// Without a physical line on the diagnostic the line is read back from
    /// the file.
    pub fn is_inline_ignored(&mut self, violation: &Violation) -> bool {
        if self.options.disable_noqa {
            return false;
        }

        let physical_line = match violation.physical_line.as_deref() {
            Some(line) => line.to_string(),
            None => self.cached_line(&violation.filename, violation.line_number),
        };
        let Some(captures) = NOQA_INLINE.captures(physical_line.trim_end_matches(['\r', '\n'])) else {
            debug!("{:?} is not inline ignored", violation);
            return false;
        };

        let Some(codes) = captures.name("codes") else {
            debug!("{:?} is ignored by a blanket `# noqa`", violation);
            return true;
        };

        let ignored = codes
            .as_str()
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .any(|code| violation.code == code || violation.code.starts_with(code));
        debug!(
            "{:?} is {}ignored inline with `# noqa: {}`",
            violation,
            if ignored { "" } else { "not " },
            codes.as_str()
        );
        ignored
    }

    fn cached_line(&mut self, filename: &str, line_number: u32) -> String {
        let lines = self
            .line_cache
            .entry(filename.to_string())
            .or_insert_with(|| {
                fs::read_to_string(filename)
                    .map(|source| source.split_inclusive('\n').map(str::to_string).collect())
                    .unwrap_or_default()
            });
        (line_number as usize)
            .checked_sub(1)
            .and_then(|index| lines.get(index))
            .cloned()
            .unwrap_or_default()
    }

    /// Reports whether the diagnostic is on a line of the diff.
    ///
    /// Always true when no diff ranges were added.
    pub fn is_in_diff(&self, violation: &Violation) -> bool {
        if self.parsed_diff.is_empty() {
            return true;
        }
        match self.parsed_diff.get(&violation.filename) {
            Some(lines) if !lines.is_empty() => lines.contains(&violation.line_number),
            _ => false,
        }
    }

    /// Decides on a raw diagnostic and forwards it when accepted.
    ///
    /// Returns true when the diagnostic was reported.
    pub fn handle_error(&mut self, mut violation: Violation) -> bool {
        if violation.filename.is_empty() || violation.filename == STDIN_FILENAME {
            violation.filename = self.options.stdin_display_name.clone();
        }

        let selected = self.should_report_error(&violation.code) == Decision::Selected;
        let accepted = selected && !self.is_inline_ignored(&violation) && self.is_in_diff(&violation);
        if accepted {
            self.sink.handle(&violation);
            self.notifier.notify(&violation.code, &violation);
            self.total_reported += 1;
        }
        accepted
    }

    /// Flushes the sink.
    pub fn finish(&mut self) -> io::Result<()> {
        self.sink.finish()
    }
}

impl std::fmt::Debug for StyleGuide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StyleGuide")
            .field("options", &self.options)
            .field("notifier", &self.notifier)
            .field("total_reported", &self.total_reported)
            .finish_non_exhaustive()
    }
}

fn starts_with_any(code: &str, prefixes: &[String]) -> bool {
    prefixes.iter().any(|prefix| code.starts_with(prefix.as_str()))
}
