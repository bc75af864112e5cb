//! Integration tests for CLI behavior
//!
//! These tests run the `tklint` binary against small projects on disk.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

const STYLE_ISSUES: &str = "x = 1;\nif x == None:  \n    pass\n";

/// Helper to create a command for the tklint CLI
fn tklint_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tklint"))
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, content) in files {
        fs::write(dir.path().join(name), content).unwrap();
    }
    dir
}

mod help_command {
    use super::*;

    #[test]
    fn shows_help_with_flag() {
        tklint_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Usage:"));
    }

    #[test]
    fn shows_version_with_flag() {
        tklint_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    }
}

mod lint_files {
    use super::*;

    #[test]
    fn clean_project_succeeds_without_output() {
        let dir = project(&[("clean.py", "def f(a):\n    return a\n")]);

        tklint_cmd()
            .current_dir(dir.path())
            .arg("clean.py")
            .assert()
            .success()
            .stdout(predicate::str::is_empty());
    }

    #[test]
    fn reports_findings_and_fails() {
        let dir = project(&[("a.py", STYLE_ISSUES)]);

        tklint_cmd()
            .current_dir(dir.path())
            .arg("a.py")
            .assert()
            .code(1)
            .stdout(
                "a.py:1:6: E703 statement ends with a semicolon\n\
                 a.py:2:6: E711 comparison to None should be 'if cond is None:'\n\
                 a.py:2:14: W291 trailing whitespace\n",
            );
    }

    #[test]
    fn exit_zero_succeeds_with_findings() {
        let dir = project(&[("a.py", STYLE_ISSUES)]);

        tklint_cmd()
            .current_dir(dir.path())
            .args(["--exit-zero", "a.py"])
            .assert()
            .success()
            .stdout(predicate::str::contains("E703"));
    }

    #[test]
    fn select_limits_reported_codes() {
        let dir = project(&[("a.py", STYLE_ISSUES)]);

        tklint_cmd()
            .current_dir(dir.path())
            .args(["--select", "W", "a.py"])
            .assert()
            .code(1)
            .stdout("a.py:2:14: W291 trailing whitespace\n");
    }

    #[test]
    fn walks_directories_in_name_order() {
        let dir = project(&[("b.py", "y = 2;\n"), ("a.py", "x = 1;\n"), ("c.txt", "z = 3;\n")]);

        tklint_cmd()
            .current_dir(dir.path())
            .args(["-j", "2", "."])
            .assert()
            .code(1)
            .stdout(
                "./a.py:1:6: E703 statement ends with a semicolon\n\
                 ./b.py:1:6: E703 statement ends with a semicolon\n",
            );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = project(&[]);

        tklint_cmd()
            .current_dir(dir.path())
            .arg("missing.py")
            .assert()
            .code(1)
            .stdout(predicate::str::starts_with("missing.py:1:1: E902 NotFound"));
    }

    #[test]
    fn json_format_lists_findings() {
        let dir = project(&[("a.py", STYLE_ISSUES)]);

        let output = tklint_cmd()
            .current_dir(dir.path())
            .args(["--format", "json", "a.py"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1));

        let findings: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        let codes: Vec<&str> = findings
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["code"].as_str().unwrap())
            .collect();
        assert_eq!(codes, vec!["E703", "E711", "W291"]);
        assert_eq!(findings[0]["column_number"], 5);
    }
}

mod stdin_input {
    use super::*;

    #[test]
    fn reads_source_from_stdin_with_display_name() {
        tklint_cmd()
            .args(["--stdin-display-name", "input.py", "-"])
            .write_stdin("x = 1;\n")
            .assert()
            .code(1)
            .stdout("input.py:1:6: E703 statement ends with a semicolon\n");
    }

    #[test]
    fn diff_mode_reports_changed_lines_only() {
        let dir = project(&[("a.py", "x = 1;\ny = 2\nz = 3\nw = 4;\n")]);
        let patch = "\
diff --git a/a.py b/a.py
--- a/a.py
+++ b/a.py
@@ -3,2 +3,2 @@
 z = 3
-w = 4
+w = 4;
";

        tklint_cmd()
            .current_dir(dir.path())
            .arg("--diff")
            .write_stdin(patch)
            .assert()
            .code(1)
            .stdout("a.py:4:6: E703 statement ends with a semicolon\n");
    }
}

mod configuration {
    use super::*;

    #[test]
    fn discovers_config_in_working_directory() {
        let dir = project(&[
            ("a.py", STYLE_ISSUES),
            (".tklint.jsonc", "{\n  // style is checked elsewhere\n  \"ignore\": [\"E7\"]\n}\n"),
        ]);

        tklint_cmd()
            .current_dir(dir.path())
            .arg("a.py")
            .assert()
            .code(1)
            .stdout("a.py:2:14: W291 trailing whitespace\n");
    }

    #[test]
    fn invalid_config_fails_with_error() {
        let dir = project(&[("a.py", STYLE_ISSUES), (".tklint.json", r#"{ "selects": [] }"#)]);

        tklint_cmd()
            .current_dir(dir.path())
            .arg("a.py")
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Configuration error"));
    }
}
