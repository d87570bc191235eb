//! Rule definitions and the standard rule set.
//!
//! Rules come in two families. File rules look at a whole [`SourceModel`];
//! declaration rules look at one [`Declaration`] at a time. Each rule emits
//! at most one violation per subject.

use crate::analysis::{metrics, Declaration, SourceModel, MIN_DOCSTRING_CHARS};
use crate::config::Config;
use crate::generate::{docstring_template, test_stub};

use super::lookup::{is_test_function, ArtifactLookup};
use super::{RuleName, Severity, Violation};

/// Everything a rule may consult while checking one file.
pub struct RuleContext<'a> {
    pub model: &'a SourceModel,
    pub config: &'a Config,
    pub lookup: &'a ArtifactLookup,
}

impl RuleContext<'_> {
    fn violation(&self, rule: RuleName, severity: Severity, message: String) -> Violation {
        Violation::new(rule, severity, &self.model.file_path, message)
    }

    fn declaration_violation(
        &self,
        rule: RuleName,
        severity: Severity,
        decl: &Declaration,
        message: String,
    ) -> Violation {
        self.violation(rule, severity, message)
            .at_line(decl.start_line)
            .at_column(decl.span.start_col)
            .for_declaration(decl.qualified_name())
    }
}

/// A check over a whole file.
pub trait FileRule: Send + Sync {
    fn rule(&self) -> RuleName;

    fn severity(&self) -> Severity {
        self.rule().default_severity()
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Violation>;
}

/// A check over a single declaration.
pub trait DeclarationRule: Send + Sync {
    fn rule(&self) -> RuleName;

    fn severity(&self) -> Severity {
        self.rule().default_severity()
    }

    /// Whether the rule is relevant to this declaration under this config.
    fn applies(&self, _decl: &Declaration, _config: &Config) -> bool {
        true
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation>;
}

/// Registered rules, in evaluation order.
pub struct RuleSet {
    file_rules: Vec<Box<dyn FileRule>>,
    declaration_rules: Vec<Box<dyn DeclarationRule>>,
}

impl RuleSet {
    /// The built-in rules in their fixed registration order.
    pub fn standard() -> Self {
        Self {
            file_rules: vec![Box::new(FileTooLong)],
            declaration_rules: vec![
                Box::new(MissingTest),
                Box::new(MissingDocstring),
                Box::new(FunctionTooLong),
                Box::new(TooManyParameters),
                Box::new(ExcessiveNesting),
                Box::new(HighComplexity),
                Box::new(UnauthorizedFunction),
                Box::new(ForbiddenPattern),
            ],
        }
    }

    pub fn file_rules(&self) -> &[Box<dyn FileRule>] {
        &self.file_rules
    }

    pub fn declaration_rules(&self) -> &[Box<dyn DeclarationRule>] {
        &self.declaration_rules
    }

    /// Rule names in registration order.
    pub fn names(&self) -> Vec<RuleName> {
        self.file_rules
            .iter()
            .map(|r| r.rule())
            .chain(self.declaration_rules.iter().map(|r| r.rule()))
            .collect()
    }

    /// Run every enabled rule over a parsed file.
    ///
    /// File-level violations come first, then declarations in textual order,
    /// each in registration order.
    pub fn check(&self, ctx: &RuleContext) -> Vec<Violation> {
        let config = ctx.config;
        let mut violations = Vec::new();

        for rule in &self.file_rules {
            if config.is_rule_enabled(rule.rule()) {
                violations.extend(rule.evaluate(ctx));
            }
        }

        for decl in &ctx.model.declarations {
            for rule in &self.declaration_rules {
                if config.is_rule_enabled(rule.rule()) && rule.applies(decl, config) {
                    violations.extend(rule.evaluate(decl, ctx));
                }
            }
        }

        violations
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

fn indent(text: &str) -> String {
    text.lines()
        .map(|line| if line.is_empty() { String::new() } else { format!("    {}", line) })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Threshold message shared by the numeric rules.
fn over_limit(decl: &Declaration, what: &str, actual: usize, max: usize) -> String {
    format!(
        "Function '{}' {} ({}, max {})",
        decl.qualified_name(),
        what,
        actual,
        max
    )
}

struct FileTooLong;

impl FileRule for FileTooLong {
    fn rule(&self) -> RuleName {
        RuleName::FileTooLong
    }

    fn evaluate(&self, ctx: &RuleContext) -> Option<Violation> {
        let actual = ctx.model.raw_line_count;
        let max = ctx.config.max_file_lines;
        if actual <= max {
            return None;
        }
        Some(
            ctx.violation(
                self.rule(),
                self.severity(),
                format!("File is too long ({} lines, max {})", actual, max),
            )
            .with_suggestion("Split the file into smaller modules by responsibility")
            .with_context("actual", actual)
            .with_context("max", max),
        )
    }
}

struct MissingTest;

impl DeclarationRule for MissingTest {
    fn rule(&self) -> RuleName {
        RuleName::MissingTest
    }

    fn applies(&self, decl: &Declaration, config: &Config) -> bool {
        config.require_tests && !is_test_function(&decl.name)
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let patterns = &ctx.config.test_patterns;
        if ctx.lookup.has_test(&decl.name, patterns) {
            return None;
        }

        let stem = ctx
            .model
            .file_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        let suggestion = format!(
            "Add a test in {}/test_{}.py, or run `quality-guard generate`:\n\n{}",
            ctx.config.test_output_dir,
            stem,
            test_stub(&stem, decl)
        );

        Some(
            ctx.declaration_violation(
                self.rule(),
                self.severity(),
                decl,
                format!(
                    "Function '{}' has no test (expected test_{} in {} test patterns)",
                    decl.qualified_name(),
                    decl.name,
                    patterns.len()
                ),
            )
            .with_suggestion(suggestion)
            .with_context("test_patterns", patterns.clone()),
        )
    }
}

struct MissingDocstring;

impl DeclarationRule for MissingDocstring {
    fn rule(&self) -> RuleName {
        RuleName::MissingDocstring
    }

    fn applies(&self, _decl: &Declaration, config: &Config) -> bool {
        config.require_docstrings
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        if decl.has_docstring {
            return None;
        }

        let actual = decl
            .docstring_text
            .as_deref()
            .map(|text| text.trim().chars().count())
            .unwrap_or(0);
        let message = match decl.docstring_text {
            Some(_) => format!(
                "Function '{}' docstring is too short ({} characters, min {})",
                decl.qualified_name(),
                actual,
                MIN_DOCSTRING_CHARS
            ),
            None => format!(
                "Function '{}' has no docstring (0 characters, min {})",
                decl.qualified_name(),
                MIN_DOCSTRING_CHARS
            ),
        };

        Some(
            ctx.declaration_violation(self.rule(), self.severity(), decl, message)
                .with_suggestion(format!(
                    "Add a docstring as the first statement of the body:\n\n{}",
                    indent(&docstring_template(decl))
                ))
                .with_context("actual", actual)
                .with_context("min", MIN_DOCSTRING_CHARS),
        )
    }
}

struct FunctionTooLong;

impl DeclarationRule for FunctionTooLong {
    fn rule(&self) -> RuleName {
        RuleName::FunctionTooLong
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let actual = metrics::line_count(ctx.model, decl);
        let max = ctx.config.max_function_lines;
        if actual <= max {
            return None;
        }
        Some(
            ctx.declaration_violation(
                self.rule(),
                self.severity(),
                decl,
                over_limit(decl, "is too long in lines", actual, max),
            )
            .with_suggestion("Split the function into smaller functions with one job each")
            .with_context("actual", actual)
            .with_context("max", max),
        )
    }
}

struct TooManyParameters;

impl DeclarationRule for TooManyParameters {
    fn rule(&self) -> RuleName {
        RuleName::TooManyParameters
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let actual = metrics::param_count(decl);
        let max = ctx.config.max_function_params;
        if actual <= max {
            return None;
        }
        Some(
            ctx.declaration_violation(
                self.rule(),
                self.severity(),
                decl,
                over_limit(decl, "has too many parameters", actual, max),
            )
            .with_suggestion("Group related parameters into a dataclass or configuration object")
            .with_context("actual", actual)
            .with_context("max", max),
        )
    }
}

struct ExcessiveNesting;

impl DeclarationRule for ExcessiveNesting {
    fn rule(&self) -> RuleName {
        RuleName::ExcessiveNesting
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let actual = metrics::nesting_depth(ctx.model, decl);
        let max = ctx.config.max_nesting_depth;
        if actual <= max {
            return None;
        }
        Some(
            ctx.declaration_violation(
                self.rule(),
                self.severity(),
                decl,
                over_limit(decl, "nests blocks too deeply", actual, max),
            )
            .with_suggestion("Use early returns or extract the inner blocks into helper functions")
            .with_context("actual", actual)
            .with_context("max", max),
        )
    }
}

struct HighComplexity;

impl DeclarationRule for HighComplexity {
    fn rule(&self) -> RuleName {
        RuleName::HighComplexity
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let actual = metrics::cyclomatic_complexity(ctx.model, decl);
        let max = ctx.config.max_complexity;
        if actual <= max {
            return None;
        }
        Some(
            ctx.declaration_violation(
                self.rule(),
                self.severity(),
                decl,
                over_limit(decl, "has too high cyclomatic complexity", actual, max),
            )
            .with_suggestion("Break the branching logic into smaller functions or a lookup table")
            .with_context("actual", actual)
            .with_context("max", max),
        )
    }
}

struct UnauthorizedFunction;

impl DeclarationRule for UnauthorizedFunction {
    fn rule(&self) -> RuleName {
        RuleName::UnauthorizedFunction
    }

    fn applies(&self, _decl: &Declaration, config: &Config) -> bool {
        config.require_architecture_docs
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let docs = &ctx.config.doc_files;
        if ctx.lookup.is_documented(&decl.name, docs) {
            return None;
        }
        Some(
            ctx.declaration_violation(
                self.rule(),
                self.severity(),
                decl,
                format!(
                    "Function '{}' is not mentioned in any of {} architecture documents",
                    decl.qualified_name(),
                    docs.len()
                ),
            )
            .with_suggestion(format!(
                "Describe `{}` in one of: {}",
                decl.name,
                docs.join(", ")
            ))
            .with_context("doc_files", docs.clone()),
        )
    }
}

struct ForbiddenPattern;

impl DeclarationRule for ForbiddenPattern {
    fn rule(&self) -> RuleName {
        RuleName::ForbiddenPattern
    }

    fn applies(&self, _decl: &Declaration, config: &Config) -> bool {
        !config.forbidden_patterns.is_empty()
    }

    fn evaluate(&self, decl: &Declaration, ctx: &RuleContext) -> Option<Violation> {
        let text = ctx.model.text_of(decl);
        let (pattern, offset) = ctx
            .config
            .forbidden_patterns
            .iter()
            .find_map(|p| text.find(p.as_str()).map(|offset| (p, offset)))?;

        let count = text.matches(pattern.as_str()).count();
        let before = &text[..offset];
        let line = decl.start_line + before.matches('\n').count();
        let column = match before.rfind('\n') {
            Some(newline) => offset - newline,
            None => decl.span.start_col + offset,
        };

        Some(
            ctx.violation(
                self.rule(),
                self.severity(),
                format!(
                    "Function '{}' contains forbidden pattern '{}' ({} occurrence{})",
                    decl.qualified_name(),
                    pattern,
                    count,
                    if count == 1 { "" } else { "s" }
                ),
            )
            .at_line(line)
            .at_column(column)
            .for_declaration(decl.qualified_name())
            .with_suggestion(format!(
                "Remove the use of '{}' or replace it with a safe alternative",
                pattern
            ))
            .with_context("pattern", pattern.as_str())
            .with_context("count", count),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{LanguageAnalyzer, PythonAnalyzer};
    use std::path::Path;
    use tempfile::TempDir;

    fn check(source: &str, config: &Config) -> Vec<Violation> {
        let dir = TempDir::new().unwrap();
        let model = PythonAnalyzer::new().parse(Path::new("app.py"), source.as_bytes());
        let lookup = ArtifactLookup::new(dir.path());
        let ctx = RuleContext {
            model: &model,
            config,
            lookup: &lookup,
        };
        RuleSet::standard().check(&ctx)
    }

    fn rules(violations: &[Violation]) -> Vec<RuleName> {
        violations.iter().map(|v| v.rule_name).collect()
    }

    fn quiet() -> Config {
        Config {
            require_tests: false,
            require_docstrings: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_registration_order() {
        assert_eq!(
            RuleSet::standard().names(),
            vec![
                RuleName::FileTooLong,
                RuleName::MissingTest,
                RuleName::MissingDocstring,
                RuleName::FunctionTooLong,
                RuleName::TooManyParameters,
                RuleName::ExcessiveNesting,
                RuleName::HighComplexity,
                RuleName::UnauthorizedFunction,
                RuleName::ForbiddenPattern,
            ]
        );
    }

    #[test]
    fn test_too_many_parameters_and_missing_test() {
        let source = "def foo(a, b, c, d, e):\n    \"\"\"Add up all five values.\"\"\"\n    return a\n";
        let violations = check(source, &Config::default());
        assert_eq!(rules(&violations), vec![RuleName::MissingTest, RuleName::TooManyParameters]);

        let params = &violations[1];
        assert_eq!(params.context["actual"], 5);
        assert_eq!(params.context["max"], 4);
        assert!(params.message.contains("foo"));
        assert!(params.message.contains('5'));
        assert!(params.message.contains('4'));
        assert_eq!(params.line_number, 1);
        assert_eq!(params.column, 1);
    }

    #[test]
    fn test_every_violation_has_a_suggestion() {
        let config = Config {
            max_function_lines: 1,
            max_function_params: 0,
            max_nesting_depth: 0,
            max_complexity: 1,
            max_file_lines: 1,
            require_architecture_docs: true,
            forbidden_patterns: vec!["eval(".to_string()],
            ..Config::default()
        };
        let source = "def run(x):\n    if x or eval(x):\n        return 1\n";
        let violations = check(source, &config);
        assert_eq!(violations.len(), 9);
        assert!(violations.iter().all(|v| !v.suggestion.is_empty()));
        assert_eq!(violations[0].rule_name, RuleName::FileTooLong);
        assert_eq!(violations[0].line_number, 0);
        assert!(violations[0].declaration_name.is_empty());
    }

    #[test]
    fn test_nesting_boundary_is_inclusive() {
        let source = r#"
def deep(a):
    if a:
        if a:
            if a:
                if a:
                    return 1
"#;
        assert!(check(source, &quiet()).is_empty());

        let strict = Config {
            max_nesting_depth: 3,
            ..quiet()
        };
        assert_eq!(rules(&check(source, &strict)), vec![RuleName::ExcessiveNesting]);
    }

    #[test]
    fn test_docstring_messages() {
        let config = Config {
            require_tests: false,
            ..Config::default()
        };
        let violations = check("def f():\n    \"\"\"Short.\"\"\"\n\ndef g():\n    pass\n", &config);
        assert_eq!(violations.len(), 2);
        assert!(violations[0].message.contains("too short"));
        assert_eq!(violations[0].context["actual"], 6);
        assert!(violations[1].message.contains("no docstring"));
    }

    #[test]
    fn test_suggestions_carry_generated_templates() {
        let source = "class Cart:\n    def add(self, item, count):\n        pass\n";
        let violations = check(source, &Config::default());
        assert_eq!(
            rules(&violations),
            vec![RuleName::MissingTest, RuleName::MissingDocstring]
        );

        let test = &violations[0].suggestion;
        assert!(test.starts_with("Add a test in tests/test_app.py"));
        assert!(test.contains("from app import Cart\n"));
        assert!(test.contains("def test_add():"));

        let doc = &violations[1].suggestion;
        assert!(doc.contains("    \"\"\"Brief description of add."));
        assert!(doc.contains("        item: Description of item"));
        assert!(doc.contains("        count: Description of count"));
        assert!(!doc.contains("self"));
    }

    #[test]
    fn test_test_functions_do_not_need_tests() {
        let config = Config {
            require_docstrings: false,
            ..Config::default()
        };
        let violations = check("def test_parse():\n    pass\n\ndef parse():\n    pass\n", &config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].declaration_name, "parse");
    }

    #[test]
    fn test_forbidden_pattern_location_and_count() {
        let config = Config {
            forbidden_patterns: vec!["exec(".to_string(), "eval(".to_string()],
            ..quiet()
        };
        let source = "def run(code):\n    x = eval(code)\n    return eval(x)\n";
        let violations = check(source, &config);
        assert_eq!(violations.len(), 1);
        let v = &violations[0];
        assert_eq!(v.rule_name, RuleName::ForbiddenPattern);
        assert_eq!(v.line_number, 2);
        assert_eq!(v.column, 9);
        assert_eq!(v.context["pattern"], "eval(");
        assert_eq!(v.context["count"], 2);
    }

    #[test]
    fn test_method_names_are_qualified() {
        let config = Config {
            max_function_params: 1,
            ..quiet()
        };
        let source = "class Shop:\n    def buy(self, item, count):\n        pass\n";
        let violations = check(source, &config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].declaration_name, "Shop.buy");
        assert_eq!(violations[0].context["actual"], 2);
    }

    #[test]
    fn test_disabled_rules_are_skipped() {
        let config = Config {
            disabled_rules: vec!["missing_test".to_string(), "missing_docstring".to_string()],
            ..Config::default()
        };
        assert!(check("def f():\n    pass\n", &config).is_empty());
    }

    #[test]
    fn test_function_length_monotonic() {
        let source = "def f():\n    a = 1\n    b = 2\n    return a + b\n";
        let at = |max| {
            let config = Config {
                max_function_lines: max,
                ..quiet()
            };
            check(source, &config).len()
        };
        assert_eq!(at(3), 1);
        assert_eq!(at(4), 0);
        assert!(at(5) <= at(4));
    }
}
