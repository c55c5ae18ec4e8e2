//! Panic Enforcement
//!
//! Production code must not call `unwrap()` or `expect()`; failures travel
//! as `Result`s or end up in session state and alerts. Test modules, test
//! doubles and doc comments are exempt.

use std::fs;
use std::path::{Path, PathBuf};

/// Crates whose sources are checked, relative to the workspace root.
const CHECKED_SOURCES: [&str; 3] = ["camdeck-core/src", "camdeck-sim/src", "camdeck-cli/src"];

const FORBIDDEN_CALLS: [&str; 2] = [".unwrap()", ".expect("];

#[derive(Debug)]
struct PanicViolation {
    file_path: String,
    line_number: usize,
    context: String,
}

struct PanicChecker {
    violations: Vec<PanicViolation>,
    files_checked: usize,
}

impl PanicChecker {
    fn new() -> Self {
        Self {
            violations: Vec::new(),
            files_checked: 0,
        }
    }

    fn workspace_root() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("..")
    }

    fn find_rust_files(dir: &Path, files: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                Self::find_rust_files(&path, files)?;
            } else if path.extension().is_some_and(|ext| ext == "rs") {
                files.push(path);
            }
        }
        Ok(())
    }

    fn is_test_file(path: &Path) -> bool {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        name.contains("test") || name == "tests.rs"
    }

    /// Scans `content` up to its first `#[cfg(test)]`.
    fn check_content(&mut self, file_path: &str, content: &str) {
        for (index, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.starts_with("#[cfg(test)]") {
                break;
            }
            if trimmed.starts_with("//") {
                continue;
            }
            if FORBIDDEN_CALLS.iter().any(|call| trimmed.contains(call)) {
                self.violations.push(PanicViolation {
                    file_path: file_path.to_string(),
                    line_number: index + 1,
                    context: trimmed.to_string(),
                });
            }
        }
    }

    fn check_workspace(&mut self) -> std::io::Result<()> {
        let root = Self::workspace_root();
        let mut files = Vec::new();
        for source in CHECKED_SOURCES {
            Self::find_rust_files(&root.join(source), &mut files)?;
        }

        for file in files {
            if Self::is_test_file(&file) {
                continue;
            }
            let content = fs::read_to_string(&file)?;
            self.files_checked += 1;
            self.check_content(&file.to_string_lossy(), &content);
        }
        Ok(())
    }

    fn report_violations(&self) -> bool {
        if self.violations.is_empty() {
            println!(
                "Panic enforcement: {} files checked, no violations found",
                self.files_checked
            );
            return true;
        }

        println!("Panic enforcement violations found:");
        for violation in &self.violations {
            println!("{}:{}", violation.file_path, violation.line_number);
            println!("  {}", violation.context);
        }
        println!(
            "Found {} violation(s) in {} file(s) checked",
            self.violations.len(),
            self.files_checked
        );
        false
    }
}

#[test]
fn test_is_test_file() {
    assert!(PanicChecker::is_test_file(Path::new(
        "camdeck-core/src/test_mocks.rs"
    )));
    assert!(PanicChecker::is_test_file(Path::new("src/session/tests.rs")));
    assert!(!PanicChecker::is_test_file(Path::new("src/session/mod.rs")));
}

#[test]
fn test_detection_stops_at_test_module() {
    let mut checker = PanicChecker::new();
    let content = r#"
fn parse(raw: &str) -> u8 {
    raw.parse().unwrap()
}

/// let value = parse("1").unwrap();
fn open(path: &str) -> File {
    File::open(path).expect("exists")
}

#[cfg(test)]
mod tests {
    fn helper() { Some(1).unwrap(); }
}
"#;
    checker.check_content("sample.rs", content);

    let lines: Vec<usize> = checker.violations.iter().map(|v| v.line_number).collect();
    assert_eq!(lines, vec![3, 8]);
}

#[test]
fn panic_enforcement() {
    let mut checker = PanicChecker::new();
    checker
        .check_workspace()
        .expect("Failed to check workspace");

    assert!(
        checker.report_violations(),
        "unwrap()/expect() found in production code - see output above"
    );
}
