//! Linter configuration.

use std::fs;
use std::path::{Path, PathBuf};

use jsonc_parser::ParseOptions;
use serde::{Deserialize, Deserializer, Serialize};
use tokenlint_source::ProcessorOptions;
use tracing::debug;

use crate::LinterError;
use crate::style_guide::StyleGuideOptions;

/// Configuration for the linter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LinterConfig {
    /// Code prefixes to report. Empty selects everything.
    pub select: Vec<String>,

    /// Code prefixes to ignore.
    pub ignore: Vec<String>,

    /// Patterns of files and directories to skip.
    pub exclude: Vec<String>,

    /// Patterns of file names to check.
    pub filename: Vec<String>,

    /// Number of parallel jobs, `"auto"` or a number.
    #[serde(deserialize_with = "deserialize_jobs")]
    pub jobs: String,

    /// Ignore `# noqa` comments.
    pub disable_noqa: bool,

    /// File name to report for standard input.
    pub stdin_display_name: String,

    /// Maximum allowed line length.
    pub max_line_length: usize,

    /// Maximum allowed complexity of a function. Unset disables the check.
    pub max_complexity: Option<usize>,

    /// Only report findings on lines changed by a diff read from stdin.
    pub diff: bool,

    /// Directory containing the configuration file.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

fn default_exclude() -> Vec<String> {
    [".svn", "CVS", ".bzr", ".hg", ".git", "__pycache__", ".tox", ".eggs", "*.egg"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Accepts `"jobs": "auto"`, `"jobs": "4"` and `"jobs": 4`.
fn deserialize_jobs<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Jobs {
        Text(String),
        Count(u64),
    }

    Ok(match Jobs::deserialize(deserializer)? {
        Jobs::Text(text) => text,
        Jobs::Count(count) => count.to_string(),
    })
}

impl LinterConfig {
    /// Configuration file names, in lookup order.
    pub const CONFIG_FILES: [&'static str; 2] = [".tklint.jsonc", ".tklint.json"];

    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            select: Vec::new(),
            ignore: Vec::new(),
            exclude: default_exclude(),
            filename: vec!["*.py".to_string()],
            jobs: "auto".to_string(),
            disable_noqa: false,
            stdin_display_name: "stdin".to_string(),
            max_line_length: 79,
            max_complexity: None,
            diff: false,
            base_dir: None,
        }
    }

    /// Looks for a configuration file in `dir`.
    ///
    /// Returns `Ok(None)` when none of [`Self::CONFIG_FILES`] exists.
    pub fn discover(dir: impl AsRef<Path>) -> Result<Option<Self>, LinterError> {
        for name in Self::CONFIG_FILES {
            let path = dir.as_ref().join(name);
            if path.is_file() {
                debug!("Using configuration file {}", path.display());
                return Self::from_file(&path).map(Some);
            }
        }
        Ok(None)
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinterError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| LinterError::config(format!("Failed to read config: {}", e)))?;

        let mut config = Self::from_json(&content)?;
        if let Some(parent) = path.parent() {
            config.base_dir = Some(parent.to_path_buf());
        }
        Ok(config)
    }

    /// Parses configuration from JSON with comments.
    pub fn from_json(json: &str) -> Result<Self, LinterError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| LinterError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        serde_json::from_value(value)
            .map_err(|e| LinterError::config(format!("Invalid config: {}", e)))
    }

    /// Options for the source processor.
    pub fn processor_options(&self) -> ProcessorOptions {
        ProcessorOptions {
            disable_noqa: self.disable_noqa,
        }
    }

    /// Options for the style guide.
    pub fn style_guide_options(&self) -> StyleGuideOptions {
        StyleGuideOptions {
            select: self.select.clone(),
            ignore: self.ignore.clone(),
            disable_noqa: self.disable_noqa,
            stdin_display_name: self.stdin_display_name.clone(),
        }
    }
}

impl Default for LinterConfig {
    fn default() -> Self {
        Self::new()
    }
}
