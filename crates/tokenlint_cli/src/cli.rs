//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// TokenLint - Token-based style checker for Python sources
#[derive(Parser, Debug)]
#[command(name = "tklint")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Files or directories to check. `-` reads standard input
    #[arg(default_value = ".")]
    pub paths: Vec<String>,

    /// Comma-separated code prefixes to report
    #[arg(long, value_delimiter = ',')]
    pub select: Vec<String>,

    /// Comma-separated code prefixes to ignore
    #[arg(long, value_delimiter = ',')]
    pub ignore: Vec<String>,

    /// Comma-separated patterns of files and directories to skip
    #[arg(long, value_delimiter = ',')]
    pub exclude: Vec<String>,

    /// Comma-separated patterns of file names to check
    #[arg(long, value_delimiter = ',')]
    pub filename: Vec<String>,

    /// Number of parallel jobs, or "auto"
    #[arg(short, long)]
    pub jobs: Option<String>,

    /// Only report findings on lines changed by a unified diff read from stdin
    #[arg(long)]
    pub diff: bool,

    /// Ignore `# noqa` comments
    #[arg(long)]
    pub disable_noqa: bool,

    /// File name to report for standard input
    #[arg(long, value_name = "NAME")]
    pub stdin_display_name: Option<String>,

    /// Maximum allowed line length
    #[arg(long, value_name = "N")]
    pub max_line_length: Option<usize>,

    /// Maximum allowed function complexity
    #[arg(long, value_name = "N")]
    pub max_complexity: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Exit with status 0 even when findings are reported
    #[arg(long)]
    pub exit_zero: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["tklint"]).unwrap();
        assert_eq!(cli.paths, vec!["."]);
        assert!(cli.select.is_empty());
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.exit_zero);
    }

    #[test]
    fn test_comma_separated_lists() {
        let cli = Cli::try_parse_from([
            "tklint",
            "--select",
            "E,W1",
            "--ignore=E501",
            "-j",
            "4",
            "--format",
            "json",
            "src",
            "tests",
        ])
        .unwrap();
        assert_eq!(cli.select, vec!["E", "W1"]);
        assert_eq!(cli.ignore, vec!["E501"]);
        assert_eq!(cli.jobs.as_deref(), Some("4"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.paths, vec!["src", "tests"]);
    }

    #[test]
    fn test_rejects_unknown_format() {
        assert!(Cli::try_parse_from(["tklint", "--format", "sarif"]).is_err());
    }
}
