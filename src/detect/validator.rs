//! Validation driver.
//!
//! A file moves through `read → parse → rules → report`. Read failures and
//! parse failures each produce a single violation for the file and stop
//! there; they never affect other files in the same run.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::analysis::{python_analyzer, LanguageAnalyzer};
use crate::config::{Config, ConfigError};

use super::files::{collect_files, CollectOptions};
use super::lookup::ArtifactLookup;
use super::rules::{RuleContext, RuleSet};
use super::{FileReport, RuleName, Violation};

/// Checks files against a fixed configuration.
pub struct Validator {
    config: Config,
    rules: RuleSet,
    lookup: ArtifactLookup,
    jobs: Option<usize>,
}

impl Validator {
    /// Create a validator resolving test and document lookups under `root`.
    pub fn new<P: AsRef<Path>>(config: Config, root: P) -> Self {
        Self {
            config,
            rules: RuleSet::standard(),
            lookup: ArtifactLookup::new(root),
            jobs: None,
        }
    }

    /// Limit the number of worker threads for multi-file runs.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs).filter(|&n| n > 0);
        self
    }

    /// Read and check one file.
    pub fn validate_file(&self, path: &Path) -> FileReport {
        match fs::read(path) {
            Ok(bytes) => self.validate_source(path, &bytes),
            Err(e) => {
                log::debug!("cannot read {}: {}", path.display(), e);
                let mut report = FileReport::new(path);
                report.violations.push(
                    Violation::new(
                        RuleName::IoError,
                        RuleName::IoError.default_severity(),
                        path,
                        format!("Cannot read file: {}", e),
                    )
                    .with_suggestion("Check that the file exists and is readable"),
                );
                report
            }
        }
    }

    /// Check already-read source bytes.
    pub fn validate_source(&self, path: &Path, bytes: &[u8]) -> FileReport {
        let model = python_analyzer().parse(path, bytes);
        let mut report = FileReport::new(path);

        if let Some(error) = &model.parse_error {
            log::debug!("{}: parse error at {}", path.display(), error);
            report.violations.push(
                Violation::new(
                    RuleName::ParseError,
                    RuleName::ParseError.default_severity(),
                    path,
                    format!("Cannot parse file: {}", error.message),
                )
                .at_line(error.line)
                .at_column(error.column)
                .with_suggestion(format!(
                    "Fix the syntax error at line {}, column {}",
                    error.line, error.column
                ))
                .with_context("line", error.line)
                .with_context("column", error.column),
            );
            return report;
        }

        let ctx = RuleContext {
            model: &model,
            config: &self.config,
            lookup: &self.lookup,
        };
        report.declarations = model.declarations.len();
        report.violations = self.rules.check(&ctx);
        log::debug!(
            "{}: {} declarations, {} violations",
            path.display(),
            report.declarations,
            report.violations.len()
        );
        report
    }

    /// Check many files in parallel. Reports are sorted by path.
    pub fn validate_paths(&self, files: &[PathBuf]) -> Vec<FileReport> {
        let run = || -> Vec<FileReport> {
            files.par_iter().map(|f| self.validate_file(f)).collect()
        };

        let mut reports = match self.jobs {
            Some(jobs) => match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    log::warn!("cannot start {} workers, using the default pool: {}", jobs, e);
                    run()
                }
            },
            None => run(),
        };

        reports.sort_by(|a, b| a.path.cmp(&b.path));
        reports
    }
}

/// Check a file or directory and return every violation in report order.
///
/// Test and document lookups are resolved from the current directory. An
/// invalid configuration fails before any file is read.
pub fn validate<P: AsRef<Path>>(
    target: P,
    config: &Config,
) -> Result<Vec<Violation>, ConfigError> {
    config.validate()?;
    let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let options = CollectOptions {
        include_test_files: config.include_test_files,
        exclude: config.exclude_set()?,
    };
    let files = collect_files(target.as_ref(), &options);
    Ok(Validator::new(config.clone(), root)
        .validate_paths(&files)
        .into_iter()
        .flat_map(|r| r.violations)
        .collect())
}
