//! Language-specific analyzer implementations.

mod python;

pub use python::{is_adequate_docstring, PythonAnalyzer, MIN_DOCSTRING_CHARS};

use super::LanguageAnalyzer;
use once_cell::sync::OnceCell;

/// Static storage for Python analyzer.
static PYTHON_ANALYZER: OnceCell<PythonAnalyzer> = OnceCell::new();

/// The shared Python analyzer.
pub fn python_analyzer() -> &'static PythonAnalyzer {
    PYTHON_ANALYZER.get_or_init(PythonAnalyzer::new)
}

/// Get the analyzer for a file extension (without dot).
pub fn get_analyzer(ext: &str) -> Option<&'static dyn LanguageAnalyzer> {
    let analyzer = python_analyzer();
    if analyzer.handles_extension(ext) {
        Some(analyzer)
    } else {
        None
    }
}
