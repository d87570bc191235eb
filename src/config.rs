//! Configuration for quality-guard.
//!
//! Settings are merged from built-in defaults and an optional project file.
//! Two file layouts are accepted: the flat layout, with every key at the top
//! level, and the sectioned layout written by `quality-guard init`:
//!
//! ```json
//! {
//!   "rules": { "max_complexity": 10 },
//!   "patterns": { "test_patterns": ["tests/test_*.py"] },
//!   "enforcement": { "level": "error" },
//!   "auto_generation": { "tests": true, "docs": true, "output_dir": "tests" }
//! }
//! ```
//!
//! Section keys are applied first, then top-level keys override them.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::detect::{RuleName, Severity};

/// Project configuration file names, in lookup order.
pub const CONFIG_FILE_NAMES: &[&str] = &[
    "quality-guard.json",
    ".quality-guard.json",
    "quality-guard.yaml",
    "spyq.json",
];

/// Default file written by `init`.
pub const DEFAULT_CONFIG_FILE: &str = "quality-guard.json";

const SECTIONS: &[&str] = &["rules", "patterns", "enforcement", "auto_generation", "auto_generate"];

/// Keys of the generation section and the flat keys they set.
const GENERATION_KEYS: &[(&str, &str)] = &[
    ("tests", "generate_tests"),
    ("docs", "generate_docs"),
    ("output_dir", "test_output_dir"),
];

/// Errors raised while loading or validating configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("config file {path} must contain an object at the top level")]
    NotAnObject { path: PathBuf },

    #[error("invalid configuration in {path}: {source}")]
    Schema {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value for `{key}`: {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("invalid glob pattern `{pattern}` in `{key}`: {source}")]
    InvalidPattern {
        key: String,
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("unknown rule `{0}` in `disabled_rules`")]
    UnknownRule(String),
}

/// Resolved settings for one run. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub require_tests: bool,
    pub require_docstrings: bool,
    pub require_architecture_docs: bool,
    pub max_function_lines: usize,
    pub max_function_params: usize,
    pub max_nesting_depth: usize,
    pub max_complexity: usize,
    pub max_file_lines: usize,
    /// Globs, relative to the project root, of files that may hold tests.
    pub test_patterns: Vec<String>,
    /// Documents, relative to the project root, that authorize functions.
    pub doc_files: Vec<String>,
    /// Literal substrings forbidden in function source.
    pub forbidden_patterns: Vec<String>,
    /// Lowest severity that fails the run.
    pub enforcement_level: Severity,
    /// Globs of paths skipped during directory expansion.
    pub exclude_paths: Vec<String>,
    /// Whether directory expansion keeps test files.
    pub include_test_files: bool,
    pub disabled_rules: Vec<String>,
    /// Whether `generate` writes test stubs.
    pub generate_tests: bool,
    /// Whether `generate` prints docstring templates.
    pub generate_docs: bool,
    /// Directory, relative to the project root, that receives test stubs.
    pub test_output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            require_tests: true,
            require_docstrings: true,
            require_architecture_docs: false,
            max_function_lines: 50,
            max_function_params: 4,
            max_nesting_depth: 4,
            max_complexity: 10,
            max_file_lines: 300,
            test_patterns: strings(&[
                "tests/test_*.py",
                "test_*.py",
                "*_test.py",
                "tests/**/test_*.py",
            ]),
            doc_files: strings(&[
                "README.md",
                "docs/README.md",
                "docs/API.md",
                "docs/architecture.md",
                "ARCHITECTURE.md",
            ]),
            forbidden_patterns: Vec::new(),
            enforcement_level: Severity::Error,
            exclude_paths: Vec::new(),
            include_test_files: false,
            disabled_rules: Vec::new(),
            generate_tests: true,
            generate_docs: true,
            test_output_dir: "tests".to_string(),
        }
    }
}

impl Config {
    /// Load and validate a configuration file.
    ///
    /// `.yaml`/`.yml` files are read as YAML, everything else as JSON.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let value: Value = if is_yaml(path) {
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?
        };

        let config = Self::from_value(value, path)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a config from an already-decoded document.
    pub fn from_value(value: Value, origin: &Path) -> Result<Self, ConfigError> {
        let object = match value {
            Value::Object(object) => object,
            // An empty YAML document decodes to null.
            Value::Null => Map::new(),
            _ => {
                return Err(ConfigError::NotAnObject {
                    path: origin.to_path_buf(),
                })
            }
        };

        serde_json::from_value(Value::Object(flatten_sections(object))).map_err(|source| {
            ConfigError::Schema {
                path: origin.to_path_buf(),
                source,
            }
        })
    }

    /// Resolve the configuration for a run.
    ///
    /// An explicit path must exist. Without one, the project root is searched
    /// for [`CONFIG_FILE_NAMES`], then the per-user config file is tried.
    /// Returns the defaults when nothing is found.
    pub fn resolve(
        explicit: Option<&Path>,
        root: &Path,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        let found = discover(root).or_else(|| user_config_path().filter(|p| p.is_file()));
        match found {
            Some(path) => {
                log::debug!("using config file {}", path.display());
                Ok((Self::load(&path)?, Some(path)))
            }
            None => {
                log::debug!("no config file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }

    /// Check patterns, rule names, and values that serde cannot check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        compile_globs("test_patterns", &self.test_patterns)?;
        compile_globs("exclude_paths", &self.exclude_paths)?;

        for (key, list) in [
            ("test_patterns", &self.test_patterns),
            ("doc_files", &self.doc_files),
            ("forbidden_patterns", &self.forbidden_patterns),
        ] {
            if list.iter().any(|entry| entry.is_empty()) {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    reason: "entries must not be empty".to_string(),
                });
            }
        }

        if self.test_output_dir.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "test_output_dir".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        for name in &self.disabled_rules {
            match RuleName::parse(name) {
                Some(rule) if !rule.is_synthetic() => {}
                _ => return Err(ConfigError::UnknownRule(name.clone())),
            }
        }

        Ok(())
    }

    /// Whether a rule is active for this run.
    pub fn is_rule_enabled(&self, rule: RuleName) -> bool {
        !self.disabled_rules.iter().any(|r| r == rule.as_str())
    }

    /// Compiled `exclude_paths` matcher.
    pub fn exclude_set(&self) -> Result<GlobSet, ConfigError> {
        compile_globs("exclude_paths", &self.exclude_paths)
    }

    /// Sectioned configuration written by `init`.
    pub fn template() -> Value {
        let defaults = Self::default();
        json!({
            "version": "1.0.0",
            "description": "quality-guard configuration",
            "rules": {
                "require_tests": defaults.require_tests,
                "require_docstrings": defaults.require_docstrings,
                "require_architecture_docs": defaults.require_architecture_docs,
                "max_file_lines": defaults.max_file_lines,
                "max_function_lines": defaults.max_function_lines,
                "max_function_params": defaults.max_function_params,
                "max_nesting_depth": defaults.max_nesting_depth,
                "max_complexity": defaults.max_complexity,
            },
            "enforcement": {
                "level": defaults.enforcement_level,
            },
            "patterns": {
                "test_patterns": defaults.test_patterns,
                "doc_files": defaults.doc_files,
                "forbidden_patterns": ["eval(", "exec(", "globals()", "__import__", "input("],
            },
            "auto_generation": {
                "enabled": true,
                "tests": defaults.generate_tests,
                "docs": defaults.generate_docs,
                "output_dir": defaults.test_output_dir,
            },
            "exclude_paths": ["**/migrations/**"],
            "include_test_files": defaults.include_test_files,
            "disabled_rules": [],
        })
    }
}

/// First project config file present in `root`.
pub fn discover(root: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| root.join(name))
        .find(|path| path.is_file())
}

/// Per-user configuration file location.
pub fn user_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "quality-guard").map(|dirs| dirs.config_dir().join("config.json"))
}

fn flatten_sections(object: Map<String, Value>) -> Map<String, Value> {
    let mut merged = Map::new();

    for section in ["rules", "patterns"] {
        if let Some(Value::Object(entries)) = object.get(section) {
            merged.extend(entries.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    if let Some(Value::Object(enforcement)) = object.get("enforcement") {
        if let Some(level) = enforcement.get("level") {
            merged.insert("enforcement_level".to_string(), level.clone());
        }
    }
    for section in ["auto_generate", "auto_generation"] {
        if let Some(Value::Object(generation)) = object.get(section) {
            for (key, flat) in GENERATION_KEYS {
                if let Some(value) = generation.get(*key) {
                    merged.insert(flat.to_string(), value.clone());
                }
            }
            // `enabled: false` switches the whole section off.
            if generation.get("enabled") == Some(&Value::Bool(false)) {
                merged.insert("generate_tests".to_string(), Value::Bool(false));
                merged.insert("generate_docs".to_string(), Value::Bool(false));
            }
        }
    }

    for (key, value) in object {
        if SECTIONS.contains(&key.as_str()) && value.is_object() {
            continue;
        }
        merged.insert(key, value);
    }

    merged
}

fn compile_globs(key: &str, patterns: &[String]) -> Result<GlobSet, ConfigError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|source| ConfigError::InvalidPattern {
            key: key.to_string(),
            pattern: pattern.clone(),
            source,
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| ConfigError::InvalidPattern {
        key: key.to_string(),
        pattern: patterns.join(", "),
        source,
    })
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
