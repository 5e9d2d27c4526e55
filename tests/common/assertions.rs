//! Domain-specific assertion macros for dtrain harnesses.
//!
//! These wrap `pretty_assertions` and add failure messages that say which
//! file or directory broke the expectation.

/// Assert that the report at `path` has exactly the JSON content `expected`.
///
/// Both sides are parsed, so key order inside a record and whitespace do not
/// matter; record order and values do.
///
/// ```rust
/// assert_report_eq!(ws.report("faster_rcnn"), r#"{"metrics": []}"#);
/// ```
#[macro_export]
macro_rules! assert_report_eq {
    ($path:expr, $expected:expr) => {{
        let path = std::path::PathBuf::from(&$path);
        let text = std::fs::read_to_string(&path).unwrap_or_else(|e| {
            panic!("assert_report_eq! failed: cannot read {}: {e}", path.display())
        });
        let actual: serde_json::Value = serde_json::from_str(&text).unwrap_or_else(|e| {
            panic!(
                "assert_report_eq! failed: {} is not valid JSON: {e}\n  contents: {text}",
                path.display()
            )
        });
        let expected: serde_json::Value = serde_json::from_str($expected).unwrap();
        pretty_assertions::assert_eq!(actual, expected, "report {}", path.display());
    }};
}

/// Assert that a path no longer exists.
#[macro_export]
macro_rules! assert_removed {
    ($path:expr) => {{
        let path = std::path::PathBuf::from(&$path);
        if path.exists() {
            panic!("assert_removed! failed: {} still exists", path.display());
        }
    }};
}

/// Assert that a directory contains no report files.
#[macro_export]
macro_rules! assert_no_reports {
    ($dir:expr) => {{
        let dir = std::path::PathBuf::from(&$dir);
        if dir.exists() {
            let reports: Vec<_> = std::fs::read_dir(&dir)
                .unwrap()
                .filter_map(|e| e.ok())
                .map(|e| e.file_name())
                .collect();
            if !reports.is_empty() {
                panic!(
                    "assert_no_reports! failed: {} contains {:?}",
                    dir.display(),
                    reports
                );
            }
        }
    }};
}
