//! Output formatting for quality-guard results.
//!
//! Supports three output formats:
//! - Human: one line per violation plus a summary line, optionally colored
//! - JSON: the ordered array of violation records
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use std::io::Write;
use std::path::Path;

use colored::*;
use serde::{Deserialize, Serialize};

use crate::detect::{RuleName, Severity, Violation};

/// Violation counts for the summary line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Error and critical violations.
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl Summary {
    pub fn from_violations<'a>(violations: impl IntoIterator<Item = &'a Violation>) -> Self {
        let mut summary = Self::default();
        for v in violations {
            match v.severity {
                Severity::Critical | Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => summary.infos += 1,
            }
        }
        summary
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Found {} errors and {} warnings", self.errors, self.warnings)
    }
}

// =============================================================================
// Human Format
// =============================================================================

/// Options for human-readable output.
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanOptions {
    pub color: bool,
    pub show_suggestions: bool,
}

/// Write violations as `<file>:<line>:<col>: <SEVERITY>: <message>` lines
/// followed by the summary line.
pub fn write_human<W: Write>(
    out: &mut W,
    violations: &[Violation],
    options: HumanOptions,
) -> anyhow::Result<()> {
    for v in violations {
        let tag = v.severity.as_str().to_uppercase();
        let tag = if options.color {
            colored_severity(v.severity, &tag).to_string()
        } else {
            tag
        };
        writeln!(
            out,
            "{}:{}:{}: {}: {}",
            v.file_path, v.line_number, v.column, tag, v.message
        )?;

        if options.show_suggestions && !v.suggestion.is_empty() {
            for line in v.suggestion.lines() {
                if options.color {
                    writeln!(out, "    {}", line.dimmed())?;
                } else {
                    writeln!(out, "    {}", line)?;
                }
            }
        }
    }

    let summary = Summary::from_violations(violations);
    if options.color {
        let line = summary.to_string();
        if summary.errors > 0 {
            writeln!(out, "{}", line.red().bold())?;
        } else if summary.warnings > 0 {
            writeln!(out, "{}", line.yellow())?;
        } else {
            writeln!(out, "{}", line.green())?;
        }
    } else {
        writeln!(out, "{}", summary)?;
    }
    Ok(())
}

fn colored_severity(severity: Severity, tag: &str) -> ColoredString {
    match severity {
        Severity::Critical => tag.red().bold(),
        Severity::Error => tag.red(),
        Severity::Warning => tag.yellow(),
        Severity::Info => tag.blue(),
    }
}

// =============================================================================
// JSON Format
// =============================================================================

/// Write violations as a JSON array, preserving report order.
pub fn write_json<W: Write>(out: &mut W, violations: &[Violation]) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(violations)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

// =============================================================================
// SARIF Format
// =============================================================================

const SARIF_VERSION: &str = "2.1.0";
const SARIF_SCHEMA: &str = "https://raw.githubusercontent.com/oasis-tcs/sarif-spec/master/Schemata/sarif-schema-2.1.0.json";
const TOOL_NAME: &str = "quality-guard";

#[derive(Serialize, Deserialize)]
struct SarifReport {
    version: String,
    #[serde(rename = "$schema")]
    schema: String,
    runs: Vec<SarifRun>,
}

#[derive(Serialize, Deserialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Serialize, Deserialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize, Deserialize)]
struct SarifDriver {
    name: String,
    version: String,
    rules: Vec<SarifRule>,
}

#[derive(Serialize, Deserialize)]
struct SarifRule {
    id: String,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage,
    #[serde(rename = "defaultConfiguration")]
    default_config: SarifRuleConfig,
}

#[derive(Serialize, Deserialize)]
struct SarifRuleConfig {
    level: String,
}

#[derive(Serialize, Deserialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Serialize, Deserialize)]
struct SarifMessage {
    text: String,
}

#[derive(Serialize, Deserialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Serialize, Deserialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifact,
    region: SarifRegion,
}

#[derive(Serialize, Deserialize)]
struct SarifArtifact {
    uri: String,
}

#[derive(Serialize, Deserialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn", skip_serializing_if = "Option::is_none")]
    start_column: Option<usize>,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::Error => "error",
        Severity::Warning => "warning",
        Severity::Info => "note",
    }
}

fn make_relative_path(file_path: &str, base_path: &Path) -> String {
    let file = Path::new(file_path);
    file.strip_prefix(base_path)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| file_path.replace('\\', "/"))
}

/// Write violations as a SARIF 2.1.0 log with one run.
pub fn write_sarif<W: Write>(
    out: &mut W,
    base_path: &Path,
    violations: &[Violation],
) -> anyhow::Result<()> {
    // Rule metadata for rules that fired, in registration order.
    let rules: Vec<SarifRule> = RuleName::ALL
        .iter()
        .filter(|rule| violations.iter().any(|v| v.rule_name == **rule))
        .map(|rule| SarifRule {
            id: rule.as_str().to_string(),
            short_description: SarifMessage {
                text: rule.description().to_string(),
            },
            default_config: SarifRuleConfig {
                level: sarif_level(rule.default_severity()).to_string(),
            },
        })
        .collect();

    let results: Vec<SarifResult> = violations
        .iter()
        .map(|v| SarifResult {
            rule_id: v.rule_name.as_str().to_string(),
            level: sarif_level(v.severity).to_string(),
            message: SarifMessage {
                text: v.message.clone(),
            },
            locations: vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifact {
                        uri: make_relative_path(&v.file_path, base_path),
                    },
                    region: SarifRegion {
                        start_line: v.line_number.max(1),
                        start_column: Some(v.column).filter(|&c| c > 0),
                    },
                },
            }],
        })
        .collect();

    let report = SarifReport {
        version: SARIF_VERSION.to_string(),
        schema: SARIF_SCHEMA.to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: TOOL_NAME.to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    rules,
                },
            },
            results,
        }],
    };

    let json = serde_json::to_string_pretty(&report)?;
    writeln!(out, "{}", json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Violation> {
        vec![
            Violation::new(
                RuleName::FileTooLong,
                Severity::Warning,
                Path::new("src/app.py"),
                "File is too long (320 lines, max 300)",
            )
            .with_suggestion("Split the file"),
            Violation::new(
                RuleName::TooManyParameters,
                Severity::Error,
                Path::new("src/app.py"),
                "Function 'foo' has too many parameters (5, max 4)",
            )
            .at_line(3)
            .at_column(1)
            .for_declaration("foo")
            .with_suggestion("Group related parameters\ninto an object"),
        ]
    }

    fn render(violations: &[Violation], options: HumanOptions) -> String {
        let mut out = Vec::new();
        write_human(&mut out, violations, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_human_format() {
        let text = render(&sample(), HumanOptions::default());
        assert_eq!(
            text,
            "src/app.py:0:0: WARNING: File is too long (320 lines, max 300)\n\
             src/app.py:3:1: ERROR: Function 'foo' has too many parameters (5, max 4)\n\
             Found 1 errors and 1 warnings\n"
        );
    }

    #[test]
    fn test_human_summary_always_printed() {
        assert_eq!(render(&[], HumanOptions::default()), "Found 0 errors and 0 warnings\n");
    }

    #[test]
    fn test_human_suggestions() {
        let options = HumanOptions {
            color: false,
            show_suggestions: true,
        };
        let text = render(&sample()[1..], options);
        assert!(text.contains("\n    Group related parameters\n    into an object\n"));
    }

    #[test]
    fn test_summary_counts_critical_as_errors() {
        let mut violations = sample();
        violations[0].severity = Severity::Critical;
        let info = Violation::new(RuleName::MissingTest, Severity::Info, Path::new("a.py"), "x");
        violations.push(info);
        let summary = Summary::from_violations(&violations);
        assert_eq!(summary, Summary { errors: 2, warnings: 0, infos: 1 });
    }

    #[test]
    fn test_json_is_ordered_array() {
        let mut out = Vec::new();
        write_json(&mut out, &sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.len(), 2);
        assert_eq!(array[0]["rule_name"], "file_too_long");
        assert_eq!(array[1]["rule_name"], "too_many_parameters");
        assert_eq!(array[1]["declaration_name"], "foo");
        assert_eq!(array[1]["line_number"], 3);
    }

    #[test]
    fn test_sarif_structure() {
        let mut out = Vec::new();
        write_sarif(&mut out, Path::new("src"), &sample()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();

        assert_eq!(value["version"], "2.1.0");
        let run = &value["runs"][0];
        assert_eq!(run["tool"]["driver"]["name"], "quality-guard");

        let rules = run["tool"]["driver"]["rules"].as_array().unwrap();
        let ids: Vec<&str> = rules.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["file_too_long", "too_many_parameters"]);

        let results = run["results"].as_array().unwrap();
        assert_eq!(results[0]["level"], "warning");
        let region = &results[0]["locations"][0]["physicalLocation"]["region"];
        assert_eq!(region["startLine"], 1);
        assert!(region.get("startColumn").is_none());
        assert_eq!(
            results[1]["locations"][0]["physicalLocation"]["artifactLocation"]["uri"],
            "app.py"
        );
        assert_eq!(
            results[1]["locations"][0]["physicalLocation"]["region"]["startColumn"],
            1
        );
    }
}
