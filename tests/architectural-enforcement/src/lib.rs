//! Architectural Enforcement Integration Tests
//!
//! This package contains integration tests that enforce architectural principles:
//! - The core stays UI-free (no terminal crates)
//! - No blocking sleeps in production code
//! - No `unwrap()`/`expect()` outside tests
//!
//! The helpers here walk the workspace sources; the checks live in `tests/`.

use std::fs;
use std::path::{Path, PathBuf};

/// Crate source directories checked by every rule
pub const PRODUCTION_DIRS: [&str; 2] = ["conductor/core/src", "tui/src"];

/// A rule violation, printed as `path:line - code`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// File the offending line is in
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The offending line, trimmed
    pub code: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.code)
    }
}

/// Workspace root (two levels above this package)
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../..")
}

/// Every `.rs` file under `dir` (relative to the workspace root)
pub fn rust_files(dir: &str) -> Vec<PathBuf> {
    walkdir::WalkDir::new(workspace_root().join(dir))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(|e| e.into_path())
        .collect()
}

/// Lines of `source` that ship in the binary, numbered from 1
///
/// Stops at the first `#[cfg(test)]`; test modules sit at the bottom of each
/// file. Line comments are stripped.
pub fn production_lines(source: &str) -> Vec<(usize, &str)> {
    source
        .lines()
        .enumerate()
        .take_while(|(_, line)| !line.trim_start().starts_with("#[cfg(test)]"))
        .map(|(idx, line)| (idx + 1, line.split("//").next().unwrap_or(line)))
        .filter(|(_, code)| !code.trim().is_empty())
        .collect()
}

/// Scan production code in `dirs` for lines matching `is_violation`
pub fn find_violations(dirs: &[&str], is_violation: impl Fn(&str) -> bool) -> Vec<Violation> {
    let mut violations = Vec::new();
    for dir in dirs {
        for path in rust_files(dir) {
            let Ok(content) = fs::read_to_string(&path) else {
                continue;
            };
            for (line, code) in production_lines(&content) {
                if is_violation(code) {
                    violations.push(Violation {
                        path: path.clone(),
                        line,
                        code: code.trim().to_string(),
                    });
                }
            }
        }
    }
    violations
}

/// Panic with every violation listed
pub fn assert_clean(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!("\nFound {} {rule} violation(s).\nFix these before merging!", violations.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// note\nlet x = 1; // trailing\n#[cfg(test)]\nmod tests {}\n";
        let lines = production_lines(source);
        assert_eq!(lines, vec![(1, "fn a() {}"), (3, "let x = 1; ")]);
    }

    #[test]
    fn test_workspace_root_has_members() {
        assert!(workspace_root().join("conductor/core/Cargo.toml").exists());
        assert!(workspace_root().join("tui/Cargo.toml").exists());
    }
}
