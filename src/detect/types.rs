//! Core types for detection results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Severity levels for violations, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            "critical" => Ok(Severity::Critical),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Rule names for different violation types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleName {
    MissingTest,
    MissingDocstring,
    FunctionTooLong,
    TooManyParameters,
    ExcessiveNesting,
    HighComplexity,
    UnauthorizedFunction,
    ForbiddenPattern,
    FileTooLong,
    // Synthetic, emitted by the validator itself
    ParseError,
    IoError,
}

impl RuleName {
    /// Every rule name, registered rules first.
    pub const ALL: [RuleName; 11] = [
        RuleName::FileTooLong,
        RuleName::MissingTest,
        RuleName::MissingDocstring,
        RuleName::FunctionTooLong,
        RuleName::TooManyParameters,
        RuleName::ExcessiveNesting,
        RuleName::HighComplexity,
        RuleName::UnauthorizedFunction,
        RuleName::ForbiddenPattern,
        RuleName::ParseError,
        RuleName::IoError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RuleName::MissingTest => "missing_test",
            RuleName::MissingDocstring => "missing_docstring",
            RuleName::FunctionTooLong => "function_too_long",
            RuleName::TooManyParameters => "too_many_parameters",
            RuleName::ExcessiveNesting => "excessive_nesting",
            RuleName::HighComplexity => "high_complexity",
            RuleName::UnauthorizedFunction => "unauthorized_function",
            RuleName::ForbiddenPattern => "forbidden_pattern",
            RuleName::FileTooLong => "file_too_long",
            RuleName::ParseError => "parse_error",
            RuleName::IoError => "io_error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|r| r.as_str() == s)
    }

    pub fn default_severity(&self) -> Severity {
        match self {
            RuleName::UnauthorizedFunction | RuleName::FileTooLong => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// One-line description for `rules` listings and SARIF metadata.
    pub fn description(&self) -> &'static str {
        match self {
            RuleName::MissingTest => "Function has no test in the configured test files",
            RuleName::MissingDocstring => "Function has no docstring of at least 10 characters",
            RuleName::FunctionTooLong => "Function has more code lines than max_function_lines",
            RuleName::TooManyParameters => "Function takes more than max_function_params",
            RuleName::ExcessiveNesting => "Control blocks nest deeper than max_nesting_depth",
            RuleName::HighComplexity => "Cyclomatic complexity exceeds max_complexity",
            RuleName::UnauthorizedFunction => "Function is absent from the architecture docs",
            RuleName::ForbiddenPattern => "Function body contains a forbidden pattern",
            RuleName::FileTooLong => "File has more lines than max_file_lines",
            RuleName::ParseError => "File could not be decoded or parsed",
            RuleName::IoError => "File could not be read",
        }
    }

    /// Synthetic rules cannot be disabled or configured.
    pub fn is_synthetic(&self) -> bool {
        matches!(self, RuleName::ParseError | RuleName::IoError)
    }
}

impl std::fmt::Display for RuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single detected issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_name: RuleName,
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
    pub file_path: String,
    /// 0 for file-level violations.
    pub line_number: usize,
    /// 0 when no column applies.
    pub column: usize,
    /// Empty for file-level violations.
    pub declaration_name: String,
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
}

impl Violation {
    pub fn new(
        rule_name: RuleName,
        severity: Severity,
        file: &Path,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_name,
            severity,
            message: message.into(),
            suggestion: String::new(),
            file_path: file.display().to_string(),
            line_number: 0,
            column: 0,
            declaration_name: String::new(),
            context: BTreeMap::new(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line_number = line;
        self
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = column;
        self
    }

    pub fn for_declaration(mut self, name: impl Into<String>) -> Self {
        self.declaration_name = name.into();
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = suggestion.into();
        self
    }

    pub fn with_context(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }
}

/// Violations found in one file.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Number of declarations examined (0 when the file failed to parse).
    pub declarations: usize,
    pub violations: Vec<Violation>,
}

impl FileReport {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            ..Self::default()
        }
    }

    /// Check if any violation reaches the given severity.
    pub fn has_blocking(&self, level: Severity) -> bool {
        is_blocking(&self.violations, level)
    }
}

/// Check whether any violation in a run reaches the enforcement level.
pub fn is_blocking<'a>(
    violations: impl IntoIterator<Item = &'a Violation>,
    level: Severity,
) -> bool {
    violations.into_iter().any(|v| v.severity >= level)
}
