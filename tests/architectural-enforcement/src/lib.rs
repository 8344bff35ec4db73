//! Architectural Enforcement Integration Tests
//!
//! Source scans that keep the geocoding core honest:
//! - HTTP client usage stays behind the transport seam
//! - No thread sleeps in production code
//! - No `.unwrap()` in production code
//! - Runtime bridging (`block_on`, `blocking_recv`) only in the bridge
//!
//! Production code is everything in `geostream/core/src` before each file's
//! `#[cfg(test)] mod tests`, minus other `#[cfg(test)]` items and test-only
//! files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Files that are compiled only for tests
const TEST_ONLY_FILES: &[&str] = &["test_utils.rs"];

/// A forbidden pattern found in production code
#[derive(Debug, Clone)]
pub struct Violation {
    /// File containing the match, relative to the core source root
    pub file: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub text: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} - {}", self.file.display(), self.line, self.text)
    }
}

/// Source root of the core crate
pub fn core_src() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("geostream")
        .join("core")
        .join("src")
}

/// Production lines of every core source file, as `(relative path, line no, code)`.
///
/// Comment-only lines are dropped and trailing `//` comments are stripped.
pub fn production_lines() -> Vec<(PathBuf, usize, String)> {
    let root = core_src();
    let mut lines = Vec::new();

    for entry in walkdir::WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
    {
        let name = entry.file_name().to_string_lossy();
        if TEST_ONLY_FILES.contains(&name.as_ref()) {
            continue;
        }

        let Ok(content) = fs::read_to_string(entry.path()) else {
            continue;
        };
        let relative = entry
            .path()
            .strip_prefix(&root)
            .unwrap_or(entry.path())
            .to_path_buf();

        lines.extend(
            scan_production(&content)
                .into_iter()
                .map(|(line, code)| (relative.clone(), line, code)),
        );
    }

    lines
}

/// Production lines of one file's source, as `(line no, code)`.
///
/// A `#[cfg(test)]` on `mod tests` ends the scan; on any other item only
/// that item's line is skipped.
fn scan_production(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut test_only_item = false;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("//") {
            continue;
        }
        if trimmed.starts_with("#[cfg(test)]") {
            test_only_item = true;
            continue;
        }
        if test_only_item {
            if trimmed.starts_with("mod tests") {
                break;
            }
            if !trimmed.starts_with("#[") {
                test_only_item = false;
            }
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push((idx + 1, code.to_string()));
    }

    lines
}

/// Every production line matching `pattern`, except in `allowed` files
pub fn find_violations(pattern: &str, allowed: &[&str]) -> Vec<Violation> {
    production_lines()
        .into_iter()
        .filter(|(file, _, code)| {
            code.contains(pattern) && !allowed.iter().any(|a| file == Path::new(a))
        })
        .map(|(file, line, code)| Violation {
            file,
            line,
            text: code.trim().to_string(),
        })
        .collect()
}

/// Print violations and fail the test if there are any
pub fn assert_no_violations(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }

    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }

    panic!(
        "\nFound {} violation(s) of: {rule}\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_sources_are_found() {
        let lines = production_lines();
        assert!(lines
            .iter()
            .any(|(file, _, _)| file == Path::new("dispatch.rs")));
        assert!(!lines
            .iter()
            .any(|(file, _, _)| file == Path::new("test_utils.rs")));
    }

    #[test]
    fn test_scan_continues_past_test_only_items() {
        let source = "pub mod a;\n#[cfg(test)]\nmod test_utils;\n\npub use a::Thing;\n\n#[cfg(test)]\nmod tests {\n    fn t() {}\n}\n";
        let lines: Vec<usize> = scan_production(source).into_iter().map(|(n, _)| n).collect();
        assert_eq!(lines, vec![1, 5]);
    }

    #[test]
    fn test_lib_reexports_are_scanned() {
        assert!(production_lines()
            .iter()
            .any(|(file, _, code)| file == Path::new("lib.rs") && code.contains("pub use")));
    }

    #[test]
    fn test_test_modules_are_excluded() {
        // The dispatcher's tests sleep; its production code does not
        assert!(find_violations("tokio::time::sleep", &[]).is_empty());
    }
}
