//! Scaffolding for untested and undocumented functions.
//!
//! Test stubs are written to `<output dir>/test_<module>.py` under the project
//! root. An existing test file is appended to, and a function whose
//! `test_<name>` already appears in it is left alone. Docstring templates are
//! only rendered; source files are never modified.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Serialize;

use crate::analysis::{metrics, python_analyzer, Declaration, LanguageAnalyzer, SourceModel};
use crate::config::Config;
use crate::detect::{is_test_function, ArtifactLookup};

/// What happened to one test stub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StubOutcome {
    /// A new test file was created.
    Created,
    /// The stub was appended to an existing test file.
    Appended,
    /// The test file already mentions `test_<name>`.
    Exists,
}

/// A test stub written for one function.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedTest {
    pub function: String,
    pub source: PathBuf,
    pub test_file: PathBuf,
    pub outcome: StubOutcome,
}

/// A docstring template for a function without an adequate docstring.
#[derive(Debug, Clone, Serialize)]
pub struct DocstringTemplate {
    pub function: String,
    pub source: PathBuf,
    pub line: usize,
    pub template: String,
}

/// Everything one generation run produced.
#[derive(Debug, Default, Serialize)]
pub struct GenerationReport {
    pub tests: Vec<GeneratedTest>,
    pub docstrings: Vec<DocstringTemplate>,
}

impl GenerationReport {
    /// Stubs that were actually written.
    pub fn written(&self) -> usize {
        self.tests
            .iter()
            .filter(|t| t.outcome != StubOutcome::Exists)
            .count()
    }
}

/// Writes test stubs and renders docstring templates for a project.
pub struct Generator<'a> {
    config: &'a Config,
    lookup: ArtifactLookup,
    output_dir: PathBuf,
}

impl<'a> Generator<'a> {
    pub fn new<P: AsRef<Path>>(config: &'a Config, root: P) -> Self {
        let lookup = ArtifactLookup::new(root);
        let output_dir = lookup.root().join(&config.test_output_dir);
        Self {
            config,
            lookup,
            output_dir,
        }
    }

    /// Directory that receives test stubs.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Process files in order. Unreadable and unparseable files are skipped.
    pub fn run(&self, files: &[PathBuf]) -> anyhow::Result<GenerationReport> {
        let mut report = GenerationReport::default();

        for path in files {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    log::warn!("skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            let model = python_analyzer().parse(path, &bytes);
            if let Some(error) = &model.parse_error {
                log::warn!("skipping {}: cannot parse ({})", path.display(), error);
                continue;
            }

            if self.config.generate_tests {
                self.generate_tests(&model, &mut report)?;
            }
            if self.config.generate_docs {
                report.docstrings.extend(
                    top_level_functions(&model)
                        .filter(|d| !d.has_docstring)
                        .map(|d| DocstringTemplate {
                            function: d.qualified_name(),
                            source: path.clone(),
                            line: d.start_line,
                            template: docstring_template(d),
                        }),
                );
            }
        }

        Ok(report)
    }

    fn generate_tests(
        &self,
        model: &SourceModel,
        report: &mut GenerationReport,
    ) -> anyhow::Result<()> {
        let module = match model.file_path.file_stem() {
            Some(stem) => stem.to_string_lossy().into_owned(),
            None => return Ok(()),
        };
        let test_file = self.output_dir.join(format!("test_{}.py", module));

        for decl in top_level_functions(model) {
            if is_test_function(&decl.name)
                || self.lookup.has_test(&decl.name, &self.config.test_patterns)
            {
                continue;
            }
            let outcome = write_test_stub(&test_file, &module, decl)
                .with_context(|| format!("failed to write {}", test_file.display()))?;
            log::debug!("{}: test_{} {:?}", test_file.display(), decl.name, outcome);
            report.tests.push(GeneratedTest {
                function: decl.qualified_name(),
                source: model.file_path.clone(),
                test_file: test_file.clone(),
                outcome,
            });
        }
        Ok(())
    }
}

/// Declarations that are not nested inside another function.
fn top_level_functions(model: &SourceModel) -> impl Iterator<Item = &Declaration> {
    model.declarations.iter().filter(move |decl| {
        !model.declarations.iter().any(|outer| {
            outer.span.start_byte < decl.span.start_byte
                && decl.span.end_byte <= outer.span.end_byte
        })
    })
}

/// Write or append the stub for `decl` to `test_file`.
pub fn write_test_stub(
    test_file: &Path,
    module: &str,
    decl: &Declaration,
) -> io::Result<StubOutcome> {
    match fs::read_to_string(test_file) {
        Ok(existing) => {
            if existing.contains(&format!("test_{}", decl.name)) {
                return Ok(StubOutcome::Exists);
            }
            let mut file = OpenOptions::new().append(true).open(test_file)?;
            write!(file, "\n\n{}", test_stub(module, decl))?;
            Ok(StubOutcome::Appended)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if let Some(parent) = test_file.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(test_file, test_stub(module, decl))?;
            Ok(StubOutcome::Created)
        }
        Err(e) => Err(e),
    }
}

/// Pytest skeleton for one function.
pub fn test_stub(module: &str, decl: &Declaration) -> String {
    let name = &decl.name;
    let qualified = decl.qualified_name();
    let (import, call) = match &decl.enclosing_class {
        Some(class) => (class.as_str(), format!("{}().{}", class, name)),
        None => (name.as_str(), name.clone()),
    };

    let mut stub = format!(
        "# Generated test for {qualified}\nfrom {module} import {import}\n\n\n\
         def test_{name}():\n    \"\"\"Test for {qualified}.\"\"\"\n"
    );
    let params = metrics::explicit_parameters(decl);
    if !params.is_empty() {
        stub.push_str(&format!("    # Arguments: {}\n", params.join(", ")));
    }
    stub.push_str(&format!(
        "    result = {call}()\n    assert result is not None\n\n\n\
         def test_{name}_edge_cases():\n    \"\"\"Edge cases for {qualified}.\"\"\"\n    pass\n"
    ));
    stub
}

/// Google-style docstring listing every explicit parameter.
pub fn docstring_template(decl: &Declaration) -> String {
    let mut doc = format!("\"\"\"Brief description of {}.\n", decl.name);
    let params = metrics::explicit_parameters(decl);
    if !params.is_empty() {
        doc.push_str("\nArgs:\n");
        for param in params {
            let bare = param.trim_start_matches('*');
            doc.push_str(&format!("    {}: Description of {}\n", param, bare));
        }
    }
    doc.push_str("\nReturns:\n    Description of return value\n\"\"\"");
    doc
}
