//! Lint command implementation

use std::io::{self, Read};
use std::sync::Arc;

use miette::{IntoDiagnostic, Result};
use parking_lot::Mutex;
use tokenlint_core::{LinterConfig, Manager, StyleGuide, parse_unified_diff};
use tokenlint_rules::{RuleOptions, builtin_registry};
use tracing::{info, warn};

use crate::cli::Cli;
use crate::output::create_sink;

/// Checks the files named on the command line.
///
/// Returns true when the process should exit with a failure status.
pub fn run_lint(cli: &Cli) -> Result<bool> {
    let config = load_config(cli)?;

    let mut arguments = cli.paths.clone();
    let diff_ranges = if config.diff {
        let mut patch = String::new();
        io::stdin().read_to_string(&mut patch).into_diagnostic()?;
        let ranges = parse_unified_diff(&patch).into_diagnostic()?;

        let mut files: Vec<String> = ranges.keys().cloned().collect();
        files.sort();
        info!("Diff touches {} files", files.len());
        arguments = files;
        Some(ranges)
    } else {
        None
    };

    let registry = builtin_registry(&RuleOptions {
        max_line_length: config.max_line_length,
        max_complexity: config.max_complexity,
    })
    .into_diagnostic()?;

    let sink = create_sink(cli.format, Box::new(io::stdout()));
    let mut style_guide = StyleGuide::new(config.style_guide_options(), sink);
    if let Some(ranges) = diff_ranges {
        style_guide.add_diff_ranges(ranges);
    }
    let style_guide = Arc::new(Mutex::new(style_guide));

    let mut manager = Manager::new(
        Arc::clone(&style_guide),
        arguments,
        Arc::new(registry),
        &config,
    )
    .into_diagnostic()?;
    manager.start();
    manager.run().into_diagnostic()?;
    manager.report();

    let mut style_guide = style_guide.lock();
    style_guide.finish().into_diagnostic()?;

    let total = style_guide.total_reported();
    info!(
        "Checked {} files, reported {} findings",
        manager.filenames().len(),
        total
    );
    Ok(total > 0 && !cli.exit_zero)
}

/// Loads the configuration file and applies command line overrides.
pub fn load_config(cli: &Cli) -> Result<LinterConfig> {
    let mut config = if let Some(ref path) = cli.config {
        LinterConfig::from_file(path).into_diagnostic()?
    } else {
        find_config()?
    };

    if !cli.select.is_empty() {
        config.select = cli.select.clone();
    }
    if !cli.ignore.is_empty() {
        config.ignore = cli.ignore.clone();
    }
    if !cli.exclude.is_empty() {
        config.exclude = cli.exclude.clone();
    }
    if !cli.filename.is_empty() {
        config.filename = cli.filename.clone();
    }
    if let Some(ref jobs) = cli.jobs {
        config.jobs = jobs.clone();
    }
    if let Some(ref name) = cli.stdin_display_name {
        config.stdin_display_name = name.clone();
    }
    if let Some(max_line_length) = cli.max_line_length {
        config.max_line_length = max_line_length;
    }
    if cli.max_complexity.is_some() {
        config.max_complexity = cli.max_complexity;
    }
    config.diff |= cli.diff;
    config.disable_noqa |= cli.disable_noqa;

    if config.diff && cli.paths.iter().any(|path| path == "-") {
        warn!("Standard input holds the diff; `-` is not checked");
    }
    Ok(config)
}

pub fn find_config() -> Result<LinterConfig> {
    match LinterConfig::discover(".").into_diagnostic()? {
        Some(config) => Ok(config),
        None => {
            info!("No config file found, using defaults");
            Ok(LinterConfig::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.jsonc");
        fs::write(
            &path,
            r#"{ "select": ["W"], "ignore": ["W291"], "max_line_length": 100, "jobs": 2 }"#,
        )
        .unwrap();

        let cli = Cli::try_parse_from([
            "tklint",
            "--config",
            path.to_str().unwrap(),
            "--select",
            "E",
            "--max-complexity",
            "5",
            "--disable-noqa",
        ])
        .unwrap();
        let config = load_config(&cli).unwrap();

        assert_eq!(config.select, vec!["E"]);
        assert_eq!(config.ignore, vec!["W291"]);
        assert_eq!(config.max_line_length, 100);
        assert_eq!(config.max_complexity, Some(5));
        assert_eq!(config.jobs, "2");
        assert!(config.disable_noqa);
        assert!(!config.diff);
    }

    #[test]
    fn test_invalid_config_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, r#"{ "unknown": true }"#).unwrap();

        let cli = Cli::try_parse_from(["tklint", "--config", path.to_str().unwrap()]).unwrap();
        assert!(load_config(&cli).is_err());
    }
}
