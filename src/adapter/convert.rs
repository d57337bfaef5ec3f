//! Conversion rules shared by every adapter.
//!
//! Adapters classify raw grammar node types through [`SyntaxRules`] so the
//! canonical vocabulary stays uniform across languages: an `if_statement`
//! and a `while_statement` both become `Statement` nodes whose
//! `statementType` attribute is `if` / `while`.
//!
//! Cyclomatic complexity is calculated as:
//! - Start at 1
//! - Add 1 for each: if, for, while, switch case / match arm, catch / except
//!
//! Boolean operators (`&&`, `||`) are deliberately not counted, so the value
//! is a simplification of full McCabe complexity.

/// Base complexity of a method: one path through it.
pub const BASE_COMPLEXITY: i64 = 1;

/// How a raw grammar node is represented in the canonical tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxClass {
    /// Dropped (comments, punctuation).
    Skip,
    /// Replaced by its converted children (blocks, parentheses).
    Transparent,
    Statement,
    Expression,
    /// Kept as a catch-all node carrying its raw type.
    Unclassified,
}

/// Per-grammar classification tables.
#[derive(Debug, Clone, Copy)]
pub struct SyntaxRules {
    /// Node types counted as decision points for complexity.
    pub branch_kinds: &'static [&'static str],
    /// Node types flattened into their parent.
    pub transparent_kinds: &'static [&'static str],
    /// Node types dropped entirely.
    pub skip_kinds: &'static [&'static str],
    /// Statement node types whose name does not end in `statement`.
    pub statement_kinds: &'static [&'static str],
    /// Expression node types whose name does not end in `expression`.
    pub expression_kinds: &'static [&'static str],
    /// Branch kinds that are case labels; a label with no value (`default`)
    /// is not a decision point.
    pub case_label_kinds: &'static [&'static str],
}

impl SyntaxRules {
    /// Classify a raw grammar node type.
    pub fn classify(&self, kind: &str) -> SyntaxClass {
        if self.skip_kinds.contains(&kind) || kind.contains("comment") {
            return SyntaxClass::Skip;
        }
        if self.transparent_kinds.contains(&kind) {
            return SyntaxClass::Transparent;
        }
        let lower = kind.to_ascii_lowercase();
        if self.statement_kinds.contains(&kind) || lower.ends_with("statement") {
            return SyntaxClass::Statement;
        }
        if self.expression_kinds.contains(&kind)
            || lower.ends_with("expression")
            || lower.ends_with("identifier")
            || lower.ends_with("literal")
        {
            return SyntaxClass::Expression;
        }
        SyntaxClass::Unclassified
    }

    /// Whether `kind` is a complexity decision point.
    pub fn is_branch(&self, kind: &str) -> bool {
        self.branch_kinds.contains(&kind)
    }

    pub fn is_case_label(&self, kind: &str) -> bool {
        self.case_label_kinds.contains(&kind)
    }
}

/// Normalize a raw node type into the canonical `statementType` /
/// `expressionType` vocabulary: lower-cased, with a trailing `statement` or
/// `expression` suffix removed.
///
/// `if_statement` → `if`, `IfStatement` → `if`, `binary_expression` → `binary`.
pub fn normalize_kind_name(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    for suffix in ["statement", "expression"] {
        if let Some(stripped) = lower.strip_suffix(suffix) {
            let stripped = stripped.trim_end_matches('_');
            if !stripped.is_empty() {
                return stripped.to_string();
            }
        }
    }
    lower
}

/// Cyclomatic complexity from the node types found in a method body.
pub fn cyclomatic_complexity<'a, I>(kinds: I, rules: &SyntaxRules) -> i64
where
    I: IntoIterator<Item = &'a str>,
{
    let branches = kinds.into_iter().filter(|k| rules.is_branch(k)).count();
    BASE_COMPLEXITY + branches as i64
}

/// Split a comma-separated type list, ignoring commas nested in generic
/// brackets or parentheses.
///
/// `"Base<A, B>, Iface"` → `["Base<A, B>", "Iface"]`.
pub fn split_type_list(text: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();

    for c in text.chars() {
        match c {
            '<' | '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' | ']' => {
                depth -= 1;
                current.push(c);
            }
            ',' if depth == 0 => {
                let item = current.trim();
                if !item.is_empty() {
                    items.push(item.to_string());
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }

    let item = current.trim();
    if !item.is_empty() {
        items.push(item.to_string());
    }
    items
}

/// Display name of a module: the file stem of its path.
pub fn module_name(file_path: &str) -> String {
    std::path::Path::new(file_path)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Collapse internal whitespace so multi-line type text compares equal.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
