//! Per-declaration metrics.
//!
//! Every function here is total: a declaration whose body cannot be
//! resolved reports the neutral value (complexity 1, nesting 0).

use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Query, QueryCursor};

use super::languages;
use super::{Declaration, SourceModel};

/// Tree-sitter query for counting cyclomatic complexity in Python.
///
/// Counts:
/// - if statements
/// - elif clauses
/// - for loops (including async for)
/// - while loops
/// - except and except* clauses
/// - boolean operators (one node per `and`/`or`)
const COMPLEXITY_QUERY: &str = r#"
(if_statement) @branch
(elif_clause) @branch
(for_statement) @branch
(while_statement) @branch
(except_clause) @branch
(except_group_clause) @branch
(boolean_operator) @branch
"#;

/// Block kinds that add one level of nesting.
const NESTING_KINDS: &[&str] = &[
    "if_statement",
    "for_statement",
    "while_statement",
    "try_statement",
];

/// Receiver names dropped from a method's parameter count.
const RECEIVERS: &[&str] = &["self", "cls"];

static COMPLEXITY: OnceCell<Query> = OnceCell::new();

fn complexity_query() -> Option<&'static Query> {
    COMPLEXITY
        .get_or_try_init(|| Query::new(languages::python_analyzer().language(), COMPLEXITY_QUERY))
        .map_err(|e| log::warn!("invalid complexity query: {}", e))
        .ok()
}

/// Non-blank, non-comment lines between the `def` line and the end of the body.
pub fn line_count(model: &SourceModel, decl: &Declaration) -> usize {
    model
        .source()
        .lines()
        .skip(decl.start_line.saturating_sub(1))
        .take(decl.end_line.saturating_sub(decl.start_line) + 1)
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .count()
}

/// Number of parameters, not counting a method's `self`/`cls`.
pub fn param_count(decl: &Declaration) -> usize {
    explicit_parameters(decl).len()
}

/// Parameters a caller passes, without a method's `self`/`cls`.
pub fn explicit_parameters(decl: &Declaration) -> &[String] {
    match decl.parameters.split_first() {
        Some((first, rest)) if decl.is_method() && RECEIVERS.contains(&first.as_str()) => rest,
        _ => &decl.parameters,
    }
}

/// Deepest chain of nested `if`/`for`/`while`/`try` blocks in the body.
pub fn nesting_depth(model: &SourceModel, decl: &Declaration) -> usize {
    match model.body_node(decl) {
        Some(body) => max_nesting(body),
        None => 0,
    }
}

fn max_nesting(body: Node) -> usize {
    let mut deepest = 0;
    let mut stack = vec![(body, 0usize)];

    while let Some((node, depth)) = stack.pop() {
        let depth = if NESTING_KINDS.contains(&node.kind()) {
            deepest = deepest.max(depth + 1);
            depth + 1
        } else {
            depth
        };

        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            stack.push((child, depth));
        }
    }

    deepest
}

/// McCabe complexity of the body, boolean-operator sensitive.
pub fn cyclomatic_complexity(model: &SourceModel, decl: &Declaration) -> usize {
    let body = match model.body_node(decl) {
        Some(body) => body,
        None => return 1,
    };
    let query = match complexity_query() {
        Some(query) => query,
        None => return 1,
    };

    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, body, model.source().as_bytes());
    let mut complexity = 1;
    while let Some(m) = matches.next() {
        complexity += m.captures.len();
    }
    complexity
}
