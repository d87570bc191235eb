//! Core traits for language analysis.

use std::path::Path;

use super::SourceModel;

/// Language-specific analyzer trait.
///
/// An analyzer turns raw file bytes into a [`SourceModel`]. It never fails:
/// undecodable or syntactically broken input is recorded in
/// [`SourceModel::parse_error`].
///
/// # Thread Safety
///
/// Note: tree_sitter::Parser is not Sync, so implementations should
/// create parsers as needed.
pub trait LanguageAnalyzer: Send + Sync {
    /// Returns the language identifier (e.g., "python").
    fn language_id(&self) -> &'static str;

    /// Returns file extensions this analyzer handles (without dot).
    fn file_extensions(&self) -> &'static [&'static str];

    /// Build the model for one file.
    fn parse(&self, path: &Path, source: &[u8]) -> SourceModel;

    /// Check if this analyzer handles the given file extension.
    fn handles_extension(&self, ext: &str) -> bool {
        self.file_extensions().contains(&ext)
    }
}
