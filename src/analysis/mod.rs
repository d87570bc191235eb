//! AST-backed code analysis module.
//!
//! This module turns Python source into a [`SourceModel`] using tree-sitter
//! and computes per-declaration metrics over it:
//! - Declarations (functions and methods, nested and async included)
//! - Parameters, docstrings, enclosing class
//! - Line count, parameter count, nesting depth, cyclomatic complexity
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌──────────────┐     ┌───────────────┐
//! │ Source bytes    │────▶│ Analyzer     │────▶│ SourceModel   │
//! └─────────────────┘     │ (Python)     │     │ (Declarations,│
//!                         └──────────────┘     │  syntax tree) │
//!                                              └───────────────┘
//!                                                      │
//!                                                      ▼
//!                                              ┌───────────────┐
//!                                              │ metrics       │
//!                                              └───────────────┘
//! ```

mod facts;
mod languages;
pub mod metrics;
mod traits;

pub use facts::{Declaration, ParseError, SourceModel, Span};
pub use languages::{
    get_analyzer, is_adequate_docstring, python_analyzer, PythonAnalyzer, MIN_DOCSTRING_CHARS,
};
pub use traits::LanguageAnalyzer;
