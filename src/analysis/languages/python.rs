//! Python language analyzer using tree-sitter.
//!
//! Extracts function and method definitions with their parameters,
//! docstrings, and enclosing class. Syntax errors are located on the
//! first ERROR or MISSING node of the tree.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{anyhow, Result};
use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, Tree};

use crate::analysis::{Declaration, LanguageAnalyzer, ParseError, SourceModel, Span};

/// Shortest trimmed docstring that counts as documentation.
pub const MIN_DOCSTRING_CHARS: usize = 10;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Python 2 statements the grammar still accepts, with their keyword.
const LEGACY_STATEMENTS: &[(&str, &str)] =
    &[("print_statement", "print"), ("exec_statement", "exec")];

/// Every `def`, including methods, nested and async functions.
/// Decorated definitions are matched through their inner function node.
const DECLARATION_QUERY: &str = r#"
(function_definition
  name: (identifier) @func_name
) @function
"#;

static DECLARATIONS: OnceCell<Query> = OnceCell::new();

/// Python language analyzer.
pub struct PythonAnalyzer {
    language: Language,
}

impl PythonAnalyzer {
    pub fn new() -> Self {
        Self {
            language: tree_sitter_python::LANGUAGE.into(),
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    fn create_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| anyhow!("failed to load Python grammar: {}", e))?;
        Ok(parser)
    }

    fn declaration_query(&self) -> Result<&'static Query> {
        DECLARATIONS.get_or_try_init(|| {
            Query::new(&self.language, DECLARATION_QUERY)
                .map_err(|e| anyhow!("invalid declaration query: {}", e))
        })
    }

    fn parse_tree(&self, source: &str) -> Result<Tree> {
        let mut parser = self.create_parser()?;
        parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("parser produced no tree"))
    }

    fn extract_declarations(
        &self,
        path: &Path,
        tree: &Tree,
        source: &str,
    ) -> Result<Vec<Declaration>> {
        let query = self.declaration_query()?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(query, tree.root_node(), source.as_bytes());

        let mut declarations = Vec::new();
        let mut seen = HashSet::new();

        while let Some(m) = matches.next() {
            let mut name = None;
            let mut def_node = None;

            for capture in m.captures {
                match query.capture_names()[capture.index as usize] {
                    "func_name" => name = Some(node_text(capture.node, source)),
                    "function" => def_node = Some(capture.node),
                    _ => {}
                }
            }

            if let (Some(name), Some(node)) = (name, def_node) {
                if !name.is_empty() && seen.insert(node.start_byte()) {
                    declarations.push(build_declaration(path, node, name, source));
                }
            }
        }

        declarations.sort_by_key(|d| d.span.start_byte);
        Ok(declarations)
    }
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn language_id(&self) -> &'static str {
        "python"
    }

    fn file_extensions(&self) -> &'static [&'static str] {
        &["py", "pyi"]
    }

    fn parse(&self, path: &Path, bytes: &[u8]) -> SourceModel {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

        let source = match std::str::from_utf8(bytes) {
            Ok(text) => text.to_string(),
            Err(e) => {
                let offset = e.valid_up_to();
                let (line, column) = position_of(bytes, offset);
                let error = ParseError {
                    line,
                    column,
                    message: format!("invalid UTF-8 byte 0x{:02x}", bytes[offset]),
                };
                let lossy = String::from_utf8_lossy(bytes).into_owned();
                return SourceModel::failed(path, lossy, error);
            }
        };

        let tree = match self.parse_tree(&source) {
            Ok(tree) => tree,
            Err(e) => {
                let error = ParseError {
                    line: 1,
                    column: 1,
                    message: e.to_string(),
                };
                return SourceModel::failed(path, source, error);
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            let error = match first_syntax_error(root) {
                Some(node) => syntax_error_at(node),
                None => ParseError {
                    line: 1,
                    column: 1,
                    message: "invalid syntax".to_string(),
                },
            };
            return SourceModel::failed(path, source, error);
        }
        if let Some(error) = first_legacy_statement(root) {
            return SourceModel::failed(path, source, error);
        }

        let declarations = match self.extract_declarations(path, &tree, &source) {
            Ok(declarations) => declarations,
            Err(e) => {
                let error = ParseError {
                    line: 1,
                    column: 1,
                    message: e.to_string(),
                };
                return SourceModel::failed(path, source, error);
            }
        };

        log::trace!("{}: {} declarations", path.display(), declarations.len());

        SourceModel {
            file_path: path.to_path_buf(),
            raw_line_count: source.lines().count(),
            declarations,
            parse_error: None,
            source,
            tree: Some(tree),
        }
    }
}

/// Whether docstring content is long enough to count as documentation.
pub fn is_adequate_docstring(text: &str) -> bool {
    text.trim().chars().count() >= MIN_DOCSTRING_CHARS
}

fn build_declaration(path: &Path, node: Node, name: &str, source: &str) -> Declaration {
    let body = node.child_by_field_name("body");
    let parameters = node
        .child_by_field_name("parameters")
        .map(|p| parameter_names(p, source))
        .unwrap_or_default();
    let docstring_text = body.and_then(|b| docstring(b, source));
    let has_docstring = docstring_text
        .as_deref()
        .map(is_adequate_docstring)
        .unwrap_or(false);
    let span = Span::from_node(node);

    Declaration {
        name: name.to_string(),
        start_line: span.start_line,
        end_line: last_line(node),
        parameters,
        has_docstring,
        docstring_text,
        enclosing_class: enclosing_class(node, source),
        span,
        body: body.map(Span::from_node),
        enclosing_file: path.to_path_buf(),
    }
}

/// Last line holding text of the node (1-indexed).
fn last_line(node: Node) -> usize {
    let start = node.start_position();
    let end = node.end_position();
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

/// Class whose body directly contains the definition, looking through decorators.
fn enclosing_class(node: Node, source: &str) -> Option<String> {
    let mut current = node;
    if let Some(parent) = current.parent() {
        if parent.kind() == "decorated_definition" {
            current = parent;
        }
    }

    let block = current.parent()?;
    if block.kind() != "block" {
        return None;
    }
    let class = block.parent()?;
    if class.kind() != "class_definition" {
        return None;
    }
    class
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string())
}

fn parameter_names(params: Node, source: &str) -> Vec<String> {
    let mut cursor = params.walk();
    params
        .named_children(&mut cursor)
        .filter_map(|p| parameter_name(p, source))
        .collect()
}

fn parameter_name(node: Node, source: &str) -> Option<String> {
    match node.kind() {
        "identifier" | "tuple_pattern" => Some(node_text(node, source).to_string()),
        "default_parameter" | "typed_default_parameter" => node
            .child_by_field_name("name")
            .and_then(|n| parameter_name(n, source)),
        "typed_parameter" => node.named_child(0).and_then(|n| parameter_name(n, source)),
        "list_splat_pattern" => node
            .named_child(0)
            .map(|n| format!("*{}", node_text(n, source))),
        "dictionary_splat_pattern" => node
            .named_child(0)
            .map(|n| format!("**{}", node_text(n, source))),
        // `*` and `/` separators, comments
        _ => None,
    }
}

/// Content of the string literal opening a body, if any.
fn docstring(body: Node, source: &str) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|n| n.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }

    let expr = first.named_child(0)?;
    match expr.kind() {
        "string" => string_content(expr, source),
        "concatenated_string" => {
            let mut cursor = expr.walk();
            let parts: Option<Vec<String>> = expr
                .named_children(&mut cursor)
                .filter(|n| n.kind() == "string")
                .map(|s| string_content(s, source))
                .collect();
            parts.map(|p| p.concat())
        }
        _ => None,
    }
}

/// Text between the quotes of a string literal. F-strings yield `None`.
fn string_content(node: Node, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    let start = children.iter().find(|c| c.kind() == "string_start");
    let end = children.iter().rev().find(|c| c.kind() == "string_end");

    match (start, end) {
        (Some(start), Some(end)) => {
            if node_text(*start, source).contains(['f', 'F']) {
                return None;
            }
            source
                .get(start.end_byte()..end.start_byte())
                .map(str::to_string)
        }
        _ => strip_quotes(node_text(node, source)),
    }
}

fn strip_quotes(text: &str) -> Option<String> {
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let prefix = &text[..text.len() - body.len()];
    if prefix.contains(['f', 'F']) {
        return None;
    }
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return Some(body[quote.len()..body.len() - quote.len()].to_string());
        }
    }
    None
}

/// First ERROR or MISSING node in document order.
fn first_syntax_error(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).filter(|c| c.has_error()).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// First Python 2 `print`/`exec` statement in document order.
fn first_legacy_statement(root: Node) -> Option<ParseError> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let legacy = LEGACY_STATEMENTS.iter().find(|(kind, _)| *kind == node.kind());
        if let Some((_, keyword)) = legacy {
            let position = node.start_position();
            return Some(ParseError {
                line: position.row + 1,
                column: position.column + 1,
                message: format!("missing parentheses in call to '{}'", keyword),
            });
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn syntax_error_at(node: Node) -> ParseError {
    let position = node.start_position();
    let message = if node.is_missing() {
        format!("missing `{}`", node.kind())
    } else {
        "invalid syntax".to_string()
    };
    ParseError {
        line: position.row + 1,
        column: position.column + 1,
        message,
    }
}

/// 1-indexed line and byte column of an offset.
fn position_of(bytes: &[u8], offset: usize) -> (usize, usize) {
    let before = &bytes[..offset];
    let line = before.iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = before
        .iter()
        .rposition(|&b| b == b'\n')
        .map(|i| i + 1)
        .unwrap_or(0);
    (line, offset - line_start + 1)
}

fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}
