//! Unified diff parsing.

use std::collections::{HashMap, HashSet};

use crate::LinterError;

/// Line numbers touched by a diff, keyed by file name.
pub type DiffRanges = HashMap<String, HashSet<u32>>;

/// Parses a unified diff (git-style) into the new-side line ranges of each
/// hunk, keyed by the file they belong to.
///
/// Paths come from the `+++` header with a leading `b/` stripped. Files that
/// are deleted by the diff (`+++ /dev/null`) are skipped.
pub fn parse_unified_diff(diff_text: &str) -> Result<DiffRanges, LinterError> {
    let mut ranges = DiffRanges::new();
    let mut current_path: Option<String> = None;
    let mut remaining_rows: u32 = 0;

    for raw in diff_text.lines() {
        if remaining_rows > 0 {
            // Removed lines do not exist on the new side, and `\ No newline`
            // markers belong to neither side.
            if !raw.starts_with('-') && !raw.starts_with('\\') {
                remaining_rows -= 1;
            }
            continue;
        }

        if raw.starts_with("@@") {
            let hunk = parse_hunk_header(raw)?;
            remaining_rows = hunk.count;
            if let Some(path) = current_path.as_deref() {
                ranges
                    .entry(path.to_string())
                    .or_default()
                    .extend(hunk.start..hunk.start.saturating_add(hunk.count));
            }
            continue;
        }

        if let Some(rest) = raw.strip_prefix("+++ ") {
            current_path = parse_new_path(rest);
        }
    }

    Ok(ranges)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HunkHeader {
    start: u32,
    count: u32,
}

fn parse_hunk_header(line: &str) -> Result<HunkHeader, LinterError> {
    // @@ -1,2 +3,4 @@ optional section heading
    // @@ -1 +3 @@
    let malformed = || LinterError::diff(format!("malformed hunk header: {}", line));

    let new_side = line
        .split_whitespace()
        .nth(2)
        .and_then(|part| part.strip_prefix('+'))
        .ok_or_else(malformed)?;

    let (start, count) = match new_side.split_once(',') {
        Some((start, count)) => (start, Some(count)),
        None => (new_side, None),
    };
    let start: u32 = start.parse().map_err(|_| malformed())?;
    let count: u32 = match count {
        Some(count) => count.parse().map_err(|_| malformed())?,
        None => 1,
    };

    Ok(HunkHeader { start, count })
}

fn parse_new_path(rest: &str) -> Option<String> {
    let path = rest.split('\t').next().unwrap_or(rest).trim_end();
    if path == "/dev/null" || path.is_empty() {
        return None;
    }
    Some(path.strip_prefix("b/").unwrap_or(path).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lines(ranges: &DiffRanges, path: &str) -> Vec<u32> {
        let mut lines: Vec<u32> = ranges[path].iter().copied().collect();
        lines.sort_unstable();
        lines
    }

    #[test]
    fn test_parses_hunk_ranges() {
        let diff = "\
diff --git a/src/a.py b/src/a.py
index 1111111..2222222 100644
--- a/src/a.py
+++ b/src/a.py
@@ -1,3 +1,4 @@
 import os
+import sys

 x = 1
@@ -10,2 +11,2 @@ def f():
-    return 1
+    return 2
     pass
";
        let ranges = parse_unified_diff(diff).unwrap();
        assert_eq!(lines(&ranges, "src/a.py"), vec![1, 2, 3, 4, 11, 12]);
    }

    #[test]
    fn test_multiple_files() {
        let diff = "\
--- a/a.py
+++ b/a.py
@@ -1 +1 @@
-x
+y
--- a/b.py
+++ b/b.py
@@ -5,0 +6,2 @@
+one
+two
";
        let ranges = parse_unified_diff(diff).unwrap();
        assert_eq!(lines(&ranges, "a.py"), vec![1]);
        assert_eq!(lines(&ranges, "b.py"), vec![6, 7]);
    }

    #[test]
    fn test_deleted_file_is_skipped() {
        let diff = "\
--- a/gone.py
+++ /dev/null
@@ -1,2 +0,0 @@
-a
-b
";
        let ranges = parse_unified_diff(diff).unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_header_like_content_inside_hunk_is_not_a_header() {
        let diff = "\
+++ b/a.py
@@ -1,2 +1,2 @@
-+++ b/fake.py
++++ b/other.py
 x
";
        let ranges = parse_unified_diff(diff).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(lines(&ranges, "a.py"), vec![1, 2]);
    }

    #[test]
    fn test_no_newline_marker_does_not_consume_a_row() {
        let diff = "\
--- a/a.py
+++ b/a.py
@@ -1 +1,2 @@
-old
\\ No newline at end of file
+new
+++ b/other.py
@@ -9 +10 @@
-x
+y
";
        let ranges = parse_unified_diff(diff).unwrap();
        assert_eq!(ranges.len(), 1);
        assert_eq!(lines(&ranges, "a.py"), vec![1, 2, 10]);
    }

    #[test]
    fn test_malformed_hunk_header() {
        let err = parse_unified_diff("+++ b/a.py\n@@ -1 +x @@\n").unwrap_err();
        assert!(matches!(err, LinterError::Diff(_)));
    }

    #[test]
    fn test_empty_diff() {
        assert!(parse_unified_diff("").unwrap().is_empty());
    }
}
