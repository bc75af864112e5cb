//! End-to-end runs of the manager with the built-in checks.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::{TempDir, tempdir};
use tokenlint_core::{ExecutionEnvironment, LinterConfig, Manager, MemorySink, StyleGuide};
use tokenlint_plugin::Violation;
use tokenlint_rules::{RuleOptions, builtin_registry};

const STYLE_ISSUES: &str = "import os\nx = 1;\nif x == None:  \n    pass\n";
const SYNTAX_ERROR: &str = "y = 2;\nprint \"x\"\n";
const CLEAN: &str = "def f(a):\n    return a\n";

fn project() -> TempDir {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a.py"), STYLE_ISSUES).unwrap();
    fs::write(dir.path().join("b.py"), SYNTAX_ERROR).unwrap();
    fs::write(dir.path().join("c.py"), CLEAN).unwrap();
    fs::write(dir.path().join("notes.txt"), "x = 1;\n").unwrap();
    dir
}

fn environment(parallel: bool) -> ExecutionEnvironment {
    ExecutionEnvironment {
        parallel_supported: parallel,
        platform_compatible: true,
        using_stdin: false,
        diff: false,
        available_parallelism: Some(4),
    }
}

struct Run {
    violations: Vec<Violation>,
    total_reported: usize,
    ran_parallel: bool,
}

fn lint(
    arguments: Vec<String>,
    config: &LinterConfig,
    parallel: bool,
    configure: impl FnOnce(&mut StyleGuide),
) -> Run {
    let registry = builtin_registry(&RuleOptions::default()).unwrap();
    let sink = MemorySink::new();
    let mut style_guide = StyleGuide::new(config.style_guide_options(), Box::new(sink.clone()));
    configure(&mut style_guide);
    let style_guide = Arc::new(Mutex::new(style_guide));

    let mut manager = Manager::with_environment(
        Arc::clone(&style_guide),
        arguments,
        Arc::new(registry),
        config,
        &environment(parallel),
    )
    .unwrap();
    manager.start();
    manager.run().unwrap();
    manager.report();

    let total_reported = style_guide.lock().total_reported();
    Run {
        violations: sink.violations(),
        total_reported,
        ran_parallel: manager.ran_parallel(),
    }
}

fn summary(violations: &[Violation], root: &Path) -> Vec<(String, u32, u32, String)> {
    violations
        .iter()
        .map(|v| {
            let name = Path::new(&v.filename)
                .strip_prefix(root)
                .map_or(v.filename.clone(), |p| p.to_string_lossy().into_owned());
            (name, v.line_number, v.column_number, v.code.clone())
        })
        .collect()
}

fn row(name: &str, line: u32, column: u32, code: &str) -> (String, u32, u32, String) {
    (name.to_string(), line, column, code.to_string())
}

fn arguments(dir: &TempDir) -> Vec<String> {
    vec![dir.path().to_string_lossy().into_owned()]
}

fn parallel_config() -> LinterConfig {
    LinterConfig {
        jobs: "3".to_string(),
        ..LinterConfig::default()
    }
}

#[rstest]
#[case::serial(false)]
#[case::parallel(true)]
fn test_reports_files_in_order_with_sorted_findings(#[case] parallel: bool) {
    let dir = project();
    let run = lint(arguments(&dir), &parallel_config(), parallel, |_| {});

    assert_eq!(run.ran_parallel, parallel);
    assert_eq!(
        summary(&run.violations, dir.path()),
        vec![
            row("a.py", 2, 5, "E703"),
            row("a.py", 3, 5, "E711"),
            row("a.py", 3, 13, "W291"),
            row("b.py", 1, 5, "E703"),
            row("b.py", 2, 6, "E999"),
        ]
    );
    assert_eq!(run.total_reported, 5);
}

#[test]
fn test_serial_and_parallel_runs_agree() {
    let dir = project();
    let serial = lint(arguments(&dir), &parallel_config(), false, |_| {});
    let parallel = lint(arguments(&dir), &parallel_config(), true, |_| {});
    assert_eq!(serial.violations, parallel.violations);
}

#[test]
fn test_syntax_error_message() {
    let dir = project();
    let run = lint(arguments(&dir), &LinterConfig::default(), false, |_| {});
    let syntax_error = run
        .violations
        .iter()
        .find(|v| v.code == "E999")
        .unwrap();
    assert_eq!(syntax_error.text, "SyntaxError: invalid syntax");
    assert_eq!(syntax_error.physical_line.as_deref(), Some("print \"x\"\n"));
}

#[rstest]
#[case::serial(false)]
#[case::parallel(true)]
fn test_missing_file_is_reported_once(#[case] parallel: bool) {
    let dir = project();
    let missing = dir.path().join("missing.py").to_string_lossy().into_owned();
    let run = lint(vec![missing.clone()], &parallel_config(), parallel, |_| {});

    assert_eq!(run.violations.len(), 1);
    let violation = &run.violations[0];
    assert_eq!(violation.code, "E902");
    assert_eq!(violation.filename, missing);
    assert_eq!((violation.line_number, violation.column_number), (1, 0));
    assert!(violation.text.starts_with("NotFound"), "{}", violation.text);
}

#[rstest]
#[case::select_prefix(&["E7"], &[], &["E703", "E711", "E703"])]
#[case::ignore_prefix(&[], &["E7"], &["W291", "E999"])]
#[case::longer_select_wins(&["E711"], &["E7"], &["E711"])]
#[case::longer_ignore_wins(&["E"], &["E70"], &["E711", "E999"])]
fn test_select_and_ignore(
    #[case] select: &[&str],
    #[case] ignore: &[&str],
    #[case] expected: &[&str],
) {
    let dir = project();
    let config = LinterConfig {
        select: select.iter().map(|s| s.to_string()).collect(),
        ignore: ignore.iter().map(|s| s.to_string()).collect(),
        ..LinterConfig::default()
    };
    let run = lint(arguments(&dir), &config, false, |_| {});
    let codes: Vec<&str> = run.violations.iter().map(|v| v.code.as_str()).collect();
    assert_eq!(codes, expected);
}

#[rstest]
#[case::honored(false, 1)]
#[case::disabled(true, 3)]
fn test_noqa_comments(#[case] disable_noqa: bool, #[case] expected: usize) {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("noqa.py"),
        "x = 1;  # noqa: E703\ny = x == None  # noqa\nz = 3;  # noqa: E501\n",
    )
    .unwrap();
    let config = LinterConfig {
        disable_noqa,
        ..LinterConfig::default()
    };

    let run = lint(arguments(&dir), &config, false, |_| {});
    assert_eq!(run.violations.len(), expected);
    assert_eq!(run.violations.last().map(|v| v.line_number), Some(3));
}

#[test]
fn test_diff_ranges_limit_reported_lines() {
    let dir = project();
    let a = dir.path().join("a.py").to_string_lossy().into_owned();
    let ranges: HashMap<String, HashSet<u32>> = HashMap::from([(a, HashSet::from([3]))]);

    let run = lint(arguments(&dir), &LinterConfig::default(), false, move |style_guide| {
        style_guide.add_diff_ranges(ranges)
    });
    assert_eq!(
        summary(&run.violations, dir.path()),
        vec![row("a.py", 3, 5, "E711"), row("a.py", 3, 13, "W291")]
    );
}

#[test]
fn test_excluded_directory_is_skipped() {
    let dir = project();
    let vendored = dir.path().join("vendored");
    fs::create_dir(&vendored).unwrap();
    fs::write(vendored.join("d.py"), "x = 1;\n").unwrap();

    let config = LinterConfig {
        exclude: vec!["vendored".to_string()],
        ..LinterConfig::default()
    };
    let run = lint(arguments(&dir), &config, false, |_| {});
    assert!(
        run.violations
            .iter()
            .all(|v| !v.filename.contains("vendored"))
    );
}

#[test]
fn test_multiline_string_lines_are_checked_at_their_own_line() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("doc.py"),
        "s = \"\"\"first  \nsecond \n\"\"\"\nt = 1;\n",
    )
    .unwrap();

    let run = lint(arguments(&dir), &LinterConfig::default(), false, |_| {});
    assert_eq!(
        summary(&run.violations, dir.path()),
        vec![
            row("doc.py", 1, 12, "W291"),
            row("doc.py", 2, 6, "W291"),
            row("doc.py", 4, 5, "E703"),
        ]
    );
}

#[test]
fn test_nothing_is_reported_past_a_syntax_error() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("e.py"), "x = 1;\nprint \"x\"\ny = 2;\nz = 3  \n").unwrap();

    let run = lint(arguments(&dir), &LinterConfig::default(), false, |_| {});
    assert_eq!(
        summary(&run.violations, dir.path()),
        vec![row("e.py", 1, 5, "E703"), row("e.py", 2, 6, "E999")]
    );
}
