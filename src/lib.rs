//! quality-guard - source quality gate for Python projects.
//!
//! quality-guard parses Python files with tree-sitter and checks every
//! function against a configurable rule set: missing tests, missing
//! docstrings, excessive length, parameter count, nesting depth and
//! cyclomatic complexity, undocumented functions, and forbidden patterns.
//! It can also scaffold pytest stubs and docstring templates for the
//! functions it flags.
//!
//! # Architecture
//!
//! - `analysis`: Python parsing into a `SourceModel`, per-function metrics
//! - `detect`: Rules, the validator, test/doc lookups, file collection
//! - `config`: Configuration schema, discovery and validation
//! - `report`: Output formatting (human, JSON, SARIF)
//! - `generate`: Test stubs and docstring templates for flagged functions
//! - `cli`: Command-line entry points
//!
//! # Example
//!
//! ```no_run
//! use quality_guard::{validate, Config};
//!
//! let violations = validate("src", &Config::default())?;
//! for v in &violations {
//!     println!("{}:{}: {}", v.file_path, v.line_number, v.message);
//! }
//! # Ok::<(), quality_guard::ConfigError>(())
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod detect;
pub mod generate;
pub mod report;

pub use analysis::{Declaration, LanguageAnalyzer, PythonAnalyzer, SourceModel};
pub use config::{Config, ConfigError};
pub use detect::{validate, FileReport, RuleName, RuleSet, Severity, Validator, Violation};
