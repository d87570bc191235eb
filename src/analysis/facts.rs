//! Fact structures extracted from a parsed Python file.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Source location span with byte offsets and line/column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    /// Start byte offset (0-indexed).
    pub start_byte: usize,
    /// End byte offset (0-indexed, exclusive).
    pub end_byte: usize,
    /// Start line (1-indexed).
    pub start_line: usize,
    /// Start column (1-indexed).
    pub start_col: usize,
    /// End line (1-indexed).
    pub end_line: usize,
    /// End column (1-indexed).
    pub end_col: usize,
}

impl Span {
    /// Create a span from a tree-sitter node.
    pub fn from_node(node: tree_sitter::Node) -> Self {
        let start = node.start_position();
        let end = node.end_position();
        Self {
            start_byte: node.start_byte(),
            end_byte: node.end_byte(),
            start_line: start.row + 1, // tree-sitter is 0-indexed
            start_col: start.column + 1,
            end_line: end.row + 1,
            end_col: end.column + 1,
        }
    }
}

/// Why a file could not be turned into declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseError {
    /// Line of the failure (1-indexed).
    pub line: usize,
    /// Column of the failure (1-indexed).
    pub column: usize,
    pub message: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.line, self.column, self.message)
    }
}

/// A function or method definition.
///
/// Declarations are produced by the analyzer and never modified afterwards;
/// re-parsing a file yields a fresh [`SourceModel`].
#[derive(Debug, Clone)]
pub struct Declaration {
    /// The bare function name as written after `def`.
    pub name: String,
    /// Line of the `def` keyword (1-indexed).
    pub start_line: usize,
    /// Last line of the body (1-indexed).
    pub end_line: usize,
    /// Parameter names in order. Variadic parameters keep their `*`/`**` prefix.
    pub parameters: Vec<String>,
    /// Whether the docstring is present and long enough to count.
    pub has_docstring: bool,
    /// Raw docstring content, when the body starts with a string literal.
    pub docstring_text: Option<String>,
    /// Class whose body directly contains this definition.
    pub enclosing_class: Option<String>,
    /// Span of the whole `def` (without decorators).
    pub span: Span,
    /// Span of the body block, if the grammar produced one.
    pub body: Option<Span>,
    /// File the declaration was found in.
    pub enclosing_file: PathBuf,
}

impl Declaration {
    /// Get the qualified name (`Class.method` for methods).
    pub fn qualified_name(&self) -> String {
        match self.enclosing_class {
            Some(ref class) => format!("{}.{}", class, self.name),
            None => self.name.clone(),
        }
    }

    /// Whether this definition sits directly in a class body.
    pub fn is_method(&self) -> bool {
        self.enclosing_class.is_some()
    }
}

/// One parsed source file.
///
/// Owns the syntax tree; declarations refer back into it through byte spans,
/// see [`SourceModel::body_node`].
#[derive(Debug)]
pub struct SourceModel {
    pub file_path: PathBuf,
    /// Number of lines in the file as read.
    pub raw_line_count: usize,
    /// Declarations in textual order.
    pub declarations: Vec<Declaration>,
    pub parse_error: Option<ParseError>,
    pub(crate) source: String,
    pub(crate) tree: Option<tree_sitter::Tree>,
}

impl SourceModel {
    /// A model for a file that could not be parsed.
    pub(crate) fn failed(path: &Path, source: String, error: ParseError) -> Self {
        Self {
            file_path: path.to_path_buf(),
            raw_line_count: source.lines().count(),
            declarations: Vec::new(),
            parse_error: Some(error),
            source,
            tree: None,
        }
    }

    /// The decoded source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Source text covered by a declaration.
    pub fn text_of(&self, decl: &Declaration) -> &str {
        self.source
            .get(decl.span.start_byte..decl.span.end_byte)
            .unwrap_or("")
    }

    /// Resolve a declaration's body block in the owned syntax tree.
    pub fn body_node(&self, decl: &Declaration) -> Option<tree_sitter::Node<'_>> {
        let tree = self.tree.as_ref()?;
        let body = decl.body?;
        let node = tree
            .root_node()
            .descendant_for_byte_range(body.start_byte, body.end_byte)?;
        if node.kind() == "block" {
            return Some(node);
        }
        // A single-statement block shares its range with the statement.
        let mut current = node;
        while let Some(parent) = current.parent() {
            if parent.kind() == "block" && parent.start_byte() == body.start_byte {
                return Some(parent);
            }
            if parent.start_byte() < body.start_byte {
                break;
            }
            current = parent;
        }
        None
    }

    /// Find a declaration by bare name.
    pub fn find_declaration(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start_line: usize, end_line: usize) -> Span {
        Span {
            start_byte: 0,
            end_byte: 10,
            start_line,
            start_col: 1,
            end_line,
            end_col: 11,
        }
    }

    fn declaration(name: &str, class: Option<&str>) -> Declaration {
        Declaration {
            name: name.to_string(),
            start_line: 1,
            end_line: 2,
            parameters: vec![],
            has_docstring: false,
            docstring_text: None,
            enclosing_class: class.map(str::to_string),
            span: span(1, 2),
            body: None,
            enclosing_file: PathBuf::from("mod.py"),
        }
    }

    #[test]
    fn test_declaration_qualified_name() {
        let func = declaration("main", None);
        assert_eq!(func.qualified_name(), "main");
        assert!(!func.is_method());

        let method = declaration("validate", Some("Config"));
        assert_eq!(method.qualified_name(), "Config.validate");
        assert!(method.is_method());
    }

    #[test]
    fn test_failed_model_has_no_declarations() {
        let error = ParseError {
            line: 2,
            column: 5,
            message: "invalid syntax".to_string(),
        };
        let model = SourceModel::failed(Path::new("bad.py"), "a\nb\n".to_string(), error);
        assert!(model.declarations.is_empty());
        assert_eq!(model.raw_line_count, 2);
        assert_eq!(model.parse_error.as_ref().unwrap().to_string(), "2:5: invalid syntax");
    }
}
