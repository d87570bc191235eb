//! Expansion of command-line paths into Python files to check.

use std::path::{Path, PathBuf};

use globset::GlobSet;
use walkdir::WalkDir;

use crate::analysis::get_analyzer;

/// Directories never descended into.
const SKIP_DIRS: &[&str] = &[
    "__pycache__",
    "node_modules",
    "vendor",
    "venv",
    "env",
    "site-packages",
    "build",
    "dist",
];

/// Test directories, skipped unless test files are included.
const TEST_DIRS: &[&str] = &["tests", "test"];

/// Options for directory expansion.
#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub include_test_files: bool,
    pub exclude: GlobSet,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            include_test_files: false,
            exclude: GlobSet::empty(),
        }
    }
}

/// Expand a file or directory into the Python files it contains.
///
/// An explicit file is returned as is. Directories are walked recursively;
/// hidden, virtualenv and vendor directories are skipped, as are test files
/// unless `include_test_files` is set. Entries that cannot be visited but
/// look like Python files are still returned so the caller can report them.
pub fn collect_files(target: &Path, options: &CollectOptions) -> Vec<PathBuf> {
    if !target.is_dir() {
        return vec![target.to_path_buf()];
    }

    let mut files = Vec::new();

    for entry in WalkDir::new(target).into_iter().filter_entry(|e| {
        if e.depth() == 0 || !e.file_type().is_dir() {
            return true;
        }
        let name = e.file_name().to_string_lossy();
        if name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref()) {
            return false;
        }
        options.include_test_files || !TEST_DIRS.contains(&name.as_ref())
    }) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                match e.path() {
                    Some(path) if is_python(path) => files.push(path.to_path_buf()),
                    _ => log::warn!("skipping unreadable entry: {}", e),
                }
                continue;
            }
        };

        let path = entry.path();
        if !entry.file_type().is_file() || !is_python(path) {
            continue;
        }
        if !options.include_test_files && is_test_file(path) {
            continue;
        }
        let relative = path.strip_prefix(target).unwrap_or(path);
        if options.exclude.is_match(relative) || options.exclude.is_match(path) {
            log::debug!("excluded {}", path.display());
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    files.dedup();
    files
}

fn is_python(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .and_then(get_analyzer)
        .is_some()
}

/// Whether a file name follows pytest's test file conventions.
pub fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let stem = name.strip_suffix(".py").unwrap_or(name);
    stem.starts_with("test_") || stem.ends_with("_test")
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    fn layout() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        for rel in [
            "app/main.py",
            "app/models.py",
            "app/migrations/0001_initial.py",
            "app/notes.txt",
            "app/test_models.py",
            "app/models_test.py",
            "tests/test_main.py",
            ".git/hooks/pre_commit.py",
            "venv/lib/site.py",
            "app/__pycache__/main.py",
            "setup.py",
        ] {
            touch(root, rel);
        }
        dir
    }

    fn relative(root: &Path, files: &[PathBuf]) -> Vec<String> {
        files
            .iter()
            .map(|f| f.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect()
    }

    #[test]
    fn test_collect_skips_tests_and_hidden() {
        let dir = layout();
        let files = collect_files(dir.path(), &CollectOptions::default());
        assert_eq!(
            relative(dir.path(), &files),
            vec![
                "app/main.py",
                "app/migrations/0001_initial.py",
                "app/models.py",
                "setup.py"
            ]
        );
    }

    #[test]
    fn test_collect_includes_tests_when_asked() {
        let dir = layout();
        let options = CollectOptions {
            include_test_files: true,
            ..CollectOptions::default()
        };
        let files = relative(dir.path(), &collect_files(dir.path(), &options));
        assert!(files.contains(&"tests/test_main.py".to_string()));
        assert!(files.contains(&"app/test_models.py".to_string()));
        assert!(files.contains(&"app/models_test.py".to_string()));
        assert!(!files.iter().any(|f| f.starts_with("venv/") || f.starts_with(".git/")));
    }

    #[test]
    fn test_collect_applies_excludes() {
        let dir = layout();
        let mut builder = GlobSetBuilder::new();
        builder.add(Glob::new("**/migrations/**").unwrap());
        let options = CollectOptions {
            exclude: builder.build().unwrap(),
            ..CollectOptions::default()
        };
        let files = relative(dir.path(), &collect_files(dir.path(), &options));
        assert_eq!(files, vec!["app/main.py", "app/models.py", "setup.py"]);
    }

    #[test]
    fn test_explicit_file_is_kept() {
        let dir = layout();
        let file = dir.path().join("tests/test_main.py");
        assert_eq!(collect_files(&file, &CollectOptions::default()), vec![file]);
    }

    #[test]
    fn test_is_test_file() {
        assert!(is_test_file(Path::new("tests/test_app.py")));
        assert!(is_test_file(Path::new("app_test.py")));
        assert!(!is_test_file(Path::new("testing.py")));
        assert!(!is_test_file(Path::new("contest.py")));
    }
}
