use crate::error::LinterError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use tokenlint_source::STDIN_FILENAME;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Expands command line arguments into the files to check.
pub struct FileFinder {
    exclude_globs: Option<GlobSet>,
    filename_globs: Option<GlobSet>,
}

impl FileFinder {
    pub fn new(exclude: &[String], filename: &[String]) -> Result<Self, LinterError> {
        let exclude_globs = Self::build_globset(exclude)?;
        let filename_globs = Self::build_globset(filename)?;

        Ok(Self {
            exclude_globs,
            filename_globs,
        })
    }

    fn build_globset(patterns: &[String]) -> Result<Option<GlobSet>, LinterError> {
        if patterns.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern).map_err(|e| {
                LinterError::pattern(format!("Invalid glob pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }

        let globset = builder
            .build()
            .map_err(|e| LinterError::pattern(format!("Failed to build globset: {}", e)))?;

        Ok(Some(globset))
    }

    /// Checks if a path matches the exclude patterns.
    ///
    /// Both the base name and the absolute path are tried.
    pub fn is_path_excluded(&self, path: &Path) -> bool {
        let Some(excludes) = self.exclude_globs.as_ref() else {
            return false;
        };

        if path.file_name().is_some_and(|name| excludes.is_match(name)) {
            info!("\"{}\" has been excluded", path.display());
            return true;
        }

        let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        let excluded = excludes.is_match(&absolute);
        debug!(
            "\"{}\" has {}been excluded",
            absolute.display(),
            if excluded { "" } else { "not " }
        );
        excluded
    }

    /// Checks if a file name matches the filename patterns.
    ///
    /// Standard input always matches.
    pub fn matches_filename(&self, filename: &str) -> bool {
        filename == STDIN_FILENAME
            || self
                .filename_globs
                .as_ref()
                .is_none_or(|globs| globs.is_match(filename))
    }

    /// Expands one argument into file names.
    ///
    /// Directories are walked in file name order and excluded directories are
    /// not descended into. Any other argument is returned as is, unless it is
    /// excluded itself.
    pub fn filenames_from(&self, argument: &str) -> Vec<String> {
        if argument != STDIN_FILENAME && self.is_path_excluded(Path::new(argument)) {
            return Vec::new();
        }

        let path = Path::new(argument);
        if !path.is_dir() {
            return vec![argument.to_string()];
        }

        WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !self.is_path_excluded(entry.path()))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Skipping unreadable entry: {}", err);
                    None
                }
            })
            .filter(|entry| !entry.file_type().is_dir())
            .map(|entry| entry.path().to_string_lossy().into_owned())
            .collect()
    }

    /// Expands all arguments, keeping the files matching the filename patterns.
    pub fn discover_files(&self, arguments: &[String]) -> Vec<String> {
        let files: Vec<String> = arguments
            .iter()
            .flat_map(|argument| self.filenames_from(argument))
            .filter(|filename| self.matches_filename(filename))
            .collect();

        info!("Discovered {} files to check", files.len());
        files
    }
}

/// Returns true when one of the arguments denotes standard input.
pub fn is_using_stdin(arguments: &[String]) -> bool {
    arguments.iter().any(|argument| argument == STDIN_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_build_globset_empty() {
        assert!(FileFinder::build_globset(&[]).unwrap().is_none());
    }

    #[test]
    fn test_build_globset_invalid_pattern() {
        let result = FileFinder::build_globset(&strings(&["[invalid"]));
        assert!(matches!(result, Err(LinterError::Pattern(_))));
    }

    #[test]
    fn test_excluded_by_basename() {
        let finder = FileFinder::new(&strings(&["*.pyc", ".git"]), &[]).unwrap();
        assert!(finder.is_path_excluded(Path::new("pkg/module.pyc")));
        assert!(finder.is_path_excluded(Path::new("repo/.git")));
        assert!(!finder.is_path_excluded(Path::new("pkg/module.py")));
    }

    #[test]
    fn test_excluded_by_absolute_path() {
        let dir = tempdir().unwrap();
        let pattern = format!("{}/build/*", dir.path().display());
        let finder = FileFinder::new(&[pattern], &[]).unwrap();

        assert!(finder.is_path_excluded(&dir.path().join("build").join("gen.py")));
        assert!(!finder.is_path_excluded(&dir.path().join("src").join("gen.py")));
    }

    #[test]
    fn test_no_patterns_excludes_nothing() {
        let finder = FileFinder::new(&[], &[]).unwrap();
        assert!(!finder.is_path_excluded(Path::new("anything.py")));
        assert!(finder.matches_filename("anything.txt"));
    }

    #[test]
    fn test_matches_filename() {
        let finder = FileFinder::new(&[], &strings(&["*.py"])).unwrap();
        assert!(finder.matches_filename("src/pkg/a.py"));
        assert!(!finder.matches_filename("README.md"));
        assert!(finder.matches_filename("-"));
    }

    #[test]
    fn test_discover_files_walks_sorted_and_prunes() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::create_dir_all(root.join("__pycache__")).unwrap();
        fs::write(root.join("b.py"), "").unwrap();
        fs::write(root.join("a.py"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::write(root.join("pkg").join("c.py"), "").unwrap();
        fs::write(root.join("__pycache__").join("d.py"), "").unwrap();

        let finder = FileFinder::new(&strings(&["__pycache__"]), &strings(&["*.py"])).unwrap();
        let files = finder.discover_files(&[root.to_string_lossy().into_owned()]);

        let relative: Vec<String> = files
            .iter()
            .map(|f| {
                Path::new(f)
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect();
        assert_eq!(relative, vec!["a.py", "b.py", "pkg/c.py"]);
    }

    #[test]
    fn test_explicit_files_keep_argument_order() {
        let finder = FileFinder::new(&[], &strings(&["*.py"])).unwrap();
        let files = finder.discover_files(&strings(&["z.py", "a.py", "-"]));
        assert_eq!(files, strings(&["z.py", "a.py", "-"]));
    }

    #[test]
    fn test_is_using_stdin() {
        assert!(is_using_stdin(&strings(&["a.py", "-"])));
        assert!(!is_using_stdin(&strings(&["a.py"])));
    }
}
