//! Detection module for quality issues in Python code.

mod files;
mod lookup;
mod rules;
mod types;
mod validator;

pub use files::{collect_files, is_test_file, CollectOptions};
pub use lookup::{is_test_function, test_names, ArtifactLookup};
pub use rules::{DeclarationRule, FileRule, RuleContext, RuleSet};
pub use types::{is_blocking, FileReport, RuleName, Severity, Violation};
pub use validator::{validate, Validator};
