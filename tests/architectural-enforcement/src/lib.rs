//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - No blocking `std::thread::sleep` in production code
//! - No `unwrap()`/`expect()` outside tests
//! - `tally-core` stays independent of the HTTP server stack
//!
//! Helpers here find the workspace's source files and strip the parts of
//! each file that are not production code (comments and `#[cfg(test)]`
//! modules).

use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Workspace root, two levels above this crate
#[must_use]
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Every `.rs` file under `dir`, relative to the workspace root
#[must_use]
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    let root = workspace_root().join(dir);
    let mut files: Vec<PathBuf> = WalkDir::new(&root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .filter(|path| path.extension().is_some_and(|ext| ext == "rs"))
        .collect();
    files.sort();
    files
}

/// A production line: 1-based line number and text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Line number in the file
    pub number: usize,
    /// Line text, trimmed
    pub text: String,
}

/// Lines of `content` that are production code
///
/// Comment lines are skipped, and everything from the first `#[cfg(test)]`
/// onwards is dropped.
#[must_use]
pub fn production_lines(content: &str) -> Vec<SourceLine> {
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| line.trim() != "#[cfg(test)]")
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(idx, line)| SourceLine {
            number: idx + 1,
            text: line.trim().to_string(),
        })
        .collect()
}

/// Every production line in `dirs` containing one of `patterns`
///
/// Returns `path:line: text` strings ready for an assertion message.
#[must_use]
pub fn find_violations(dirs: &[&str], patterns: &[&str]) -> Vec<String> {
    let mut violations = Vec::new();
    for dir in dirs {
        for path in rust_files(dir) {
            let Ok(content) = std::fs::read_to_string(&path) else {
                continue;
            };
            for line in production_lines(&content) {
                if patterns.iter().any(|p| line.text.contains(p)) {
                    violations.push(format!("{}:{}: {}", path.display(), line.number, line.text));
                }
            }
        }
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let content = "fn a() {}\n// comment\nfn b() {}\n#[cfg(test)]\nmod tests { fn c() { x.unwrap(); } }\n";

        let lines = production_lines(content);

        assert_eq!(
            lines,
            vec![
                SourceLine { number: 1, text: "fn a() {}".into() },
                SourceLine { number: 3, text: "fn b() {}".into() },
            ]
        );
    }

    #[test]
    fn test_finds_workspace_sources() {
        let files = rust_files("tally/core/src");
        assert!(files.iter().any(|p| p.ends_with("lib.rs")));
    }
}
