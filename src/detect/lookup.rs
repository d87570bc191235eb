//! Lookups of artifacts that live outside the checked file: test files
//! and architecture documents.
//!
//! The lookup caches everything it touches for the duration of a run:
//! - The project walk happens at most once
//! - Each glob pattern is expanded at most once
//! - Each candidate file is read at most once (unreadable files included)
//!
//! Lookup failures of any kind mean "not found"; they are never errors.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use globset::GlobBuilder;
use once_cell::sync::OnceCell;
use walkdir::{DirEntry, WalkDir};

/// Directory names never searched for tests or documents.
const SKIP_DIRS: &[&str] = &["__pycache__", "node_modules", "venv"];

/// Cached test and document lookups rooted at a project directory.
pub struct ArtifactLookup {
    root: PathBuf,
    /// Every file under the root, relative to it, sorted.
    files: OnceCell<Vec<PathBuf>>,
    /// Pattern to absolute matches, in sorted order.
    expansions: RwLock<HashMap<String, Arc<Vec<PathBuf>>>>,
    /// File contents; `None` for unreadable files.
    contents: RwLock<HashMap<PathBuf, Option<Arc<String>>>>,
}

impl ArtifactLookup {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            files: OnceCell::new(),
            expansions: RwLock::new(HashMap::new()),
            contents: RwLock::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether any file matched by `patterns` mentions a test for `name`.
    ///
    /// A test is `test_<name>` or `test<Name>`. Patterns are tried in order and
    /// the first hit ends the search.
    pub fn has_test(&self, name: &str, patterns: &[String]) -> bool {
        let needles = test_names(name);
        patterns.iter().any(|pattern| {
            self.expand(pattern).iter().any(|file| {
                self.read(file)
                    .map(|content| needles.iter().any(|n| content.contains(n.as_str())))
                    .unwrap_or(false)
            })
        })
    }

    /// Whether any of `doc_files` mentions `name`.
    pub fn is_documented(&self, name: &str, doc_files: &[String]) -> bool {
        doc_files.iter().any(|doc| {
            self.expand(doc).iter().any(|file| {
                self.read(file)
                    .map(|content| content.contains(name))
                    .unwrap_or(false)
            })
        })
    }

    /// Files matching a pattern, relative to the root.
    ///
    /// Patterns without glob metacharacters name a single file.
    fn expand(&self, pattern: &str) -> Arc<Vec<PathBuf>> {
        {
            let cache = match self.expansions.read() {
                Ok(cache) => cache,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(matches) = cache.get(pattern) {
                return Arc::clone(matches);
            }
        }

        let matches = Arc::new(if is_glob(pattern) {
            self.match_glob(pattern)
        } else {
            let path = self.root.join(pattern);
            if path.is_file() {
                vec![path]
            } else {
                Vec::new()
            }
        });
        log::debug!("lookup pattern `{}` matched {} files", pattern, matches.len());

        let mut cache = match self.expansions.write() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(cache.entry(pattern.to_string()).or_insert(matches))
    }

    fn match_glob(&self, pattern: &str) -> Vec<PathBuf> {
        let matcher = match GlobBuilder::new(pattern).literal_separator(true).build() {
            Ok(glob) => glob.compile_matcher(),
            Err(e) => {
                log::debug!("ignoring invalid lookup pattern `{}`: {}", pattern, e);
                return Vec::new();
            }
        };

        self.project_files()
            .iter()
            .filter(|rel| matcher.is_match(rel))
            .map(|rel| self.root.join(rel))
            .collect()
    }

    fn project_files(&self) -> &[PathBuf] {
        self.files.get_or_init(|| {
            let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
                .into_iter()
                .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        log::warn!("lookup walk: {}", e);
                        None
                    }
                })
                .filter(|e| e.file_type().is_file())
                .filter_map(|e| e.path().strip_prefix(&self.root).ok().map(Path::to_path_buf))
                .collect();
            files.sort();
            log::debug!("indexed {} files under {}", files.len(), self.root.display());
            files
        })
    }

    fn read(&self, path: &Path) -> Option<Arc<String>> {
        {
            let cache = match self.contents.read() {
                Ok(cache) => cache,
                Err(poisoned) => poisoned.into_inner(),
            };
            if let Some(content) = cache.get(path) {
                return content.clone();
            }
        }

        let content = fs::read(path)
            .map(|bytes| Arc::new(String::from_utf8_lossy(&bytes).into_owned()))
            .ok();

        let mut cache = match self.contents.write() {
            Ok(cache) => cache,
            Err(poisoned) => poisoned.into_inner(),
        };
        cache.entry(path.to_path_buf()).or_insert(content).clone()
    }
}

/// Test function names that count as covering `name`.
pub fn test_names(name: &str) -> [String; 2] {
    let mut chars = name.chars();
    let camel = match chars.next() {
        Some(first) => format!("test{}{}", first.to_uppercase(), chars.as_str()),
        None => "test".to_string(),
    };
    [format!("test_{}", name), camel]
}

/// Whether a test function name is itself a test.
pub fn is_test_function(name: &str) -> bool {
    name == "test" || name.starts_with("test_")
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIP_DIRS.contains(&name.as_ref())
}
