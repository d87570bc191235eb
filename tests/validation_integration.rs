//! Integration tests for the full validation pipeline.
//!
//! These tests run the validator against the fixture project in
//! `testdata/project`, which has its own configuration, tests and docs.

use std::fs;
use std::path::PathBuf;

use quality_guard::detect::{collect_files, is_blocking, CollectOptions};
use quality_guard::{Config, RuleName, Severity, Validator};
use tempfile::TempDir;

fn project_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata/project")
}

fn project_config() -> Config {
    Config::load(project_path().join("quality-guard.json")).expect("fixture config should load")
}

fn validator(config: Config) -> Validator {
    Validator::new(config, project_path())
}

fn rules_for(validator: &Validator, rel: &str) -> Vec<RuleName> {
    validator
        .validate_file(&project_path().join(rel))
        .violations
        .iter()
        .map(|v| v.rule_name)
        .collect()
}

#[test]
fn test_fixture_config_is_sectioned() {
    let config = project_config();
    assert_eq!(config.test_patterns, vec!["tests/test_*.py"]);
    assert_eq!(config.forbidden_patterns, vec!["exec(", "eval("]);
    assert_eq!(config.enforcement_level, Severity::Error);
}

#[test]
fn test_clean_file_has_no_violations() {
    let v = validator(project_config());
    let report = v.validate_file(&project_path().join("src/billing.py"));
    assert_eq!(report.declarations, 2);
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}

#[test]
fn test_five_parameters_yield_exactly_two_violations() {
    let v = validator(Config::default());
    let report = v.validate_file(&project_path().join("src/params.py"));

    let rules: Vec<RuleName> = report.violations.iter().map(|v| v.rule_name).collect();
    assert_eq!(rules, vec![RuleName::MissingTest, RuleName::TooManyParameters]);

    let params = &report.violations[1];
    assert_eq!(params.context["actual"], 5);
    assert_eq!(params.context["max"], 4);
    assert_eq!(params.declaration_name, "foo");
}

#[test]
fn test_nesting_at_limit_is_allowed() {
    let v = validator(project_config());
    assert!(rules_for(&v, "src/nested.py").is_empty());

    let strict = validator(Config {
        max_nesting_depth: 3,
        ..project_config()
    });
    assert_eq!(rules_for(&strict, "src/nested.py"), vec![RuleName::ExcessiveNesting]);
}

#[test]
fn test_unparseable_file_yields_single_parse_error() {
    let v = validator(project_config());
    let report = v.validate_file(&project_path().join("src/broken.py"));
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].rule_name, RuleName::ParseError);
    assert_eq!(report.violations[0].severity, Severity::Error);
    assert_eq!(report.violations[0].line_number, 1);
}

#[test]
fn test_forbidden_pattern_points_at_use() {
    let v = validator(project_config());
    let report = v.validate_file(&project_path().join("src/risky.py"));
    assert_eq!(report.violations.len(), 1);

    let violation = &report.violations[0];
    assert_eq!(violation.rule_name, RuleName::ForbiddenPattern);
    assert_eq!(violation.line_number, 4);
    assert_eq!(violation.column, 14);
    assert_eq!(violation.context["pattern"], "eval(");
}

#[test]
fn test_architecture_docs() {
    let v = validator(Config {
        require_architecture_docs: true,
        ..project_config()
    });
    assert!(rules_for(&v, "src/billing.py").is_empty());
    assert!(rules_for(&v, "src/nested.py").is_empty());
    assert_eq!(
        rules_for(&v, "src/params.py"),
        vec![
            RuleName::MissingTest,
            RuleName::TooManyParameters,
            RuleName::UnauthorizedFunction
        ]
    );
}

#[test]
fn test_directory_sweep() {
    let config = project_config();
    let files = collect_files(&project_path(), &CollectOptions::default());
    let names: Vec<String> = files
        .iter()
        .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["billing.py", "broken.py", "nested.py", "params.py", "risky.py"]);

    let reports = validator(config).validate_paths(&files);
    assert_eq!(reports.len(), 5);
    let total: usize = reports.iter().map(|r| r.violations.len()).sum();
    // parse_error + missing_test/too_many_parameters + forbidden_pattern
    assert_eq!(total, 4);
    assert!(is_blocking(reports.iter().flat_map(|r| &r.violations), Severity::Error));
}

#[test]
fn test_sweep_is_idempotent() {
    let files = collect_files(&project_path(), &CollectOptions::default());
    let v = validator(project_config());
    let first = serde_json::to_string(&v.validate_paths(&files)).unwrap();
    let second = serde_json::to_string(&v.validate_paths(&files)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_one_unreadable_file_among_ten() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 0..9 {
        let path = dir.path().join(format!("module_{}.py", i));
        fs::write(
            &path,
            format!("def handler_{i}(event):\n    \"\"\"Handle event number {i}.\"\"\"\n    return event\n"),
        )
        .unwrap();
        files.push(path);
    }
    files.push(dir.path().join("module_9.py"));

    let config = Config {
        require_tests: false,
        ..Config::default()
    };
    let reports = Validator::new(config, dir.path()).with_jobs(4).validate_paths(&files);
    assert_eq!(reports.len(), 10);

    let (failed, full): (Vec<_>, Vec<_>) = reports
        .iter()
        .partition(|r| r.violations.iter().any(|v| v.rule_name == RuleName::IoError));
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].violations.len(), 1);
    assert_eq!(full.len(), 9);
    assert!(full.iter().all(|r| r.declarations == 1 && r.violations.is_empty()));

    let all = reports.iter().flat_map(|r| &r.violations);
    assert!(is_blocking(all, Severity::Error));
}

#[test]
fn test_file_too_long_is_file_level_warning() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("big.py");
    let mut source = String::from("def first():\n    pass\n");
    for i in 0..12 {
        source.push_str(&format!("VALUE_{} = {}\n", i, i));
    }
    fs::write(&path, source).unwrap();

    let config = Config {
        max_file_lines: 10,
        ..Config::default()
    };
    let report = Validator::new(config, dir.path()).validate_file(&path);
    let rules: Vec<RuleName> = report.violations.iter().map(|v| v.rule_name).collect();
    assert_eq!(
        rules,
        vec![RuleName::FileTooLong, RuleName::MissingTest, RuleName::MissingDocstring]
    );
    assert_eq!(report.violations[0].severity, Severity::Warning);
    assert_eq!(report.violations[0].line_number, 0);
    assert!(!is_blocking(&report.violations[..1], Severity::Error));
}

#[test]
fn test_library_validate_entry_point() {
    let config = Config {
        require_tests: false,
        ..project_config()
    };
    let violations = quality_guard::validate(project_path().join("src/billing.py"), &config)
        .expect("fixture config is valid");
    assert!(violations.is_empty());
}
