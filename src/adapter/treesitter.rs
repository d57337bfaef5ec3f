//! Tree-sitter based adapter implementation.
//!
//! This module provides a generic adapter that can be configured for
//! different languages via a [`Grammar`]. The driver owns everything the
//! languages share: parser setup, running the parse on the blocking pool,
//! timing, syntax-error collection and the recursive statement conversion.
//! Each grammar only supplies declaration conversion and its
//! [`SyntaxRules`].

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tree_sitter::{Language, Node, Parser as TsParser};

use super::convert::{self, SyntaxClass, SyntaxRules};
use super::{AdapterError, LanguageAdapter, ParseDiagnostic, ParseError, ParseResult, ParseWarning};
use crate::tree::{keys, AttrsBuilder, CodeNode, SourceLocation};

/// Language-specific half of a tree-sitter adapter.
pub trait Grammar: Send + Sync + 'static {
    /// Name reported in dispatcher statistics (e.g., "JavaAdapter").
    fn name(&self) -> &'static str;

    /// The tree-sitter language.
    fn language(&self) -> Language;

    /// Lower-cased language tags handled by this grammar.
    fn tags(&self) -> &'static [&'static str];

    /// Classification tables for statements, expressions and branches.
    fn rules(&self) -> &'static SyntaxRules;

    /// Convert a clean parse tree rooted at `root` into a `Module` node.
    fn convert(&self, cx: &mut Converter<'_>, root: Node<'_>) -> Result<CodeNode, AdapterError>;
}

/// Outcome of one blocking parse.
enum Outcome {
    Parsed {
        root: CodeNode,
        warnings: Vec<ParseWarning>,
    },
    Rejected(Vec<ParseError>),
}

/// Tree-sitter based adapter.
pub struct TreeSitterAdapter<G: Grammar> {
    grammar: Arc<G>,
}

impl<G: Grammar> TreeSitterAdapter<G> {
    /// Create a new tree-sitter adapter for the given grammar.
    pub fn new(grammar: G) -> Self {
        Self {
            grammar: Arc::new(grammar),
        }
    }

    pub fn grammar(&self) -> &G {
        &self.grammar
    }

    /// Parse and convert on the current thread.
    fn run(grammar: &G, source: &str, file_path: &str) -> Result<Outcome, AdapterError> {
        let mut parser = TsParser::new();
        parser.set_language(&grammar.language())?;
        let tree = parser
            .parse(source.as_bytes(), None)
            .ok_or(AdapterError::NoTree)?;
        let root = tree.root_node();

        if root.has_error() {
            let mut errors = Vec::new();
            collect_syntax_errors(root, source.as_bytes(), file_path, &mut errors);
            return Ok(Outcome::Rejected(errors));
        }

        let mut cx = Converter::new(source.as_bytes(), file_path, grammar.rules());
        let module = grammar.convert(&mut cx, root)?;
        Ok(Outcome::Parsed {
            root: module,
            warnings: cx.into_warnings(),
        })
    }

    /// Run [`Self::run`] on the blocking pool so the caller's thread never
    /// waits on the grammar engine.
    async fn run_detached(&self, source: &str, file_path: &str) -> Result<Outcome, AdapterError> {
        let grammar = Arc::clone(&self.grammar);
        let source = source.to_string();
        let file_path = file_path.to_string();

        tokio::task::spawn_blocking(move || Self::run(&grammar, &source, &file_path))
            .await
            .map_err(|e| AdapterError::Worker(e.to_string()))?
    }
}

#[async_trait]
impl<G: Grammar> LanguageAdapter for TreeSitterAdapter<G> {
    async fn parse(&self, source: &str, language: &str, file_path: &str) -> ParseResult {
        let started = Instant::now();
        let outcome = self.run_detached(source, file_path).await;
        let elapsed = started.elapsed();

        match outcome {
            Ok(Outcome::Parsed { root, warnings }) => {
                tracing::debug!(
                    language,
                    file = file_path,
                    elapsed_ms = elapsed.as_millis() as u64,
                    warnings = warnings.len(),
                    "parsed source"
                );
                ParseResult::success(root, warnings, language, file_path, elapsed)
            }
            Ok(Outcome::Rejected(errors)) => {
                tracing::debug!(language, file = file_path, errors = errors.len(), "syntax errors");
                ParseResult::failure(errors, language, file_path, elapsed)
            }
            Err(e) => {
                tracing::warn!(language, file = file_path, error = %e, "adapter failure");
                let error = ParseDiagnostic::at_start(e.to_string(), file_path);
                ParseResult::failure(vec![error], language, file_path, elapsed)
            }
        }
    }

    async fn validate_syntax(&self, source: &str, _language: &str) -> bool {
        matches!(
            self.run_detached(source, "<validate>").await,
            Ok(Outcome::Parsed { .. })
        )
    }

    fn supported_languages(&self) -> Vec<String> {
        self.grammar.tags().iter().map(|tag| tag.to_string()).collect()
    }

    fn adapter_name(&self) -> &'static str {
        self.grammar.name()
    }
}

/// Record every `ERROR` and `MISSING` node below `root`, in source order.
fn collect_syntax_errors(root: Node, source: &[u8], file: &str, out: &mut Vec<ParseError>) {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        let location = SourceLocation::from_node(file, node);
        if node.is_missing() {
            out.push(ParseDiagnostic::new(format!("missing `{}`", node.kind()), location));
            continue;
        }
        if node.is_error() {
            let text = node.utf8_text(source).unwrap_or("");
            let snippet: String = text.lines().next().unwrap_or("").chars().take(40).collect();
            out.push(ParseDiagnostic::new(
                format!("syntax error near `{}`", snippet.trim()),
                location,
            ));
            continue;
        }
        stack.extend(
            all_children(node)
                .into_iter()
                .rev()
                .filter(|child| child.has_error() || child.is_missing()),
        );
    }
}

/// Named children of a node, collected so the cursor borrow ends here.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    node.named_children(&mut node.walk()).collect()
}

/// All children (named and anonymous tokens) of a node.
pub fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    node.children(&mut node.walk()).collect()
}

/// Statement and expression nesting converted before a subtree is collapsed
/// into a single `Unclassified` leaf.
pub const MAX_SYNTAX_DEPTH: usize = 256;

/// Conversion state for one file.
pub struct Converter<'s> {
    source: &'s [u8],
    file: &'s str,
    rules: &'static SyntaxRules,
    warnings: Vec<ParseWarning>,
    depth: usize,
}

impl<'s> Converter<'s> {
    pub fn new(source: &'s [u8], file: &'s str, rules: &'static SyntaxRules) -> Self {
        Self {
            source,
            file,
            rules,
            warnings: Vec::new(),
            depth: 0,
        }
    }

    pub fn file(&self) -> &str {
        self.file
    }

    /// The full source buffer, for running queries against the tree.
    pub fn source(&self) -> &'s [u8] {
        self.source
    }

    /// Get text for a tree-sitter node.
    pub fn text(&self, node: Node) -> &'s str {
        node.utf8_text(self.source).unwrap_or("")
    }

    /// Text of a field child, if present.
    pub fn field_text(&self, node: Node, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| convert::squash_whitespace(self.text(n)))
    }

    pub fn location(&self, node: Node) -> SourceLocation {
        SourceLocation::from_node(self.file, node)
    }

    /// Record a partial-success warning at `node`.
    pub fn warn(&mut self, node: Node, message: impl Into<String>) {
        let location = self.location(node);
        self.warnings.push(ParseDiagnostic::new(message, location));
    }

    pub fn into_warnings(self) -> Vec<ParseWarning> {
        self.warnings
    }

    /// Cyclomatic complexity of a method body. Every decision point in the
    /// subtree counts once regardless of nesting depth.
    pub fn complexity(&self, body: Option<Node>) -> i64 {
        let Some(body) = body else {
            return convert::BASE_COMPLEXITY;
        };
        let mut kinds = Vec::new();
        let mut stack = vec![body];
        while let Some(node) = stack.pop() {
            // A label without a value is `default`, which adds no path.
            if !self.rules.is_case_label(node.kind()) || node.named_child_count() > 0 {
                kinds.push(node.kind());
            }
            stack.extend(named_children(node));
        }
        convert::cyclomatic_complexity(kinds, self.rules)
    }

    /// Convert the statements of a body block, in source order.
    pub fn body(&mut self, body: Option<Node>) -> Vec<CodeNode> {
        match body {
            Some(body) => named_children(body)
                .into_iter()
                .flat_map(|child| self.syntax(child))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Convert one statement or expression subtree.
    ///
    /// Returns several nodes when `node` is transparent, none when skipped.
    /// Below [`MAX_SYNTAX_DEPTH`] levels the subtree becomes one
    /// `Unclassified` leaf and a warning is recorded.
    pub fn syntax(&mut self, node: Node) -> Vec<CodeNode> {
        let class = self.rules.classify(node.kind());
        if class == SyntaxClass::Skip {
            return Vec::new();
        }
        if self.depth >= MAX_SYNTAX_DEPTH {
            self.warn(
                node,
                format!("syntax nested deeper than {} levels was collapsed", MAX_SYNTAX_DEPTH),
            );
            return vec![self.unclassified_with(node, Vec::new())];
        }

        self.depth += 1;
        let children: Vec<CodeNode> = named_children(node)
            .into_iter()
            .flat_map(|child| self.syntax(child))
            .collect();
        self.depth -= 1;

        if class == SyntaxClass::Transparent {
            return children;
        }

        let name = self.display_name(node);
        let location = self.location(node);
        let converted = match class {
            SyntaxClass::Statement => CodeNode::statement(
                name,
                location,
                children,
                AttrsBuilder::new()
                    .set(keys::STATEMENT_TYPE, convert::normalize_kind_name(node.kind()))
                    .build(),
            ),
            SyntaxClass::Expression => CodeNode::expression(
                name,
                location,
                children,
                AttrsBuilder::new()
                    .set(keys::EXPRESSION_TYPE, convert::normalize_kind_name(node.kind()))
                    .build(),
            ),
            _ => self.unclassified_with(node, children),
        };
        vec![converted]
    }

    /// A catch-all node for syntax no rule classified.
    pub fn unclassified(&mut self, node: Node) -> CodeNode {
        let children = named_children(node)
            .into_iter()
            .flat_map(|child| self.syntax(child))
            .collect();
        self.unclassified_with(node, children)
    }

    fn unclassified_with(&self, node: Node, children: Vec<CodeNode>) -> CodeNode {
        CodeNode::unclassified(
            self.display_name(node),
            self.location(node),
            children,
            AttrsBuilder::new().set(keys::SYNTAX_TYPE, node.kind()).build(),
        )
    }

    /// The `name` field when the grammar has one, the token text for leaves,
    /// empty otherwise.
    fn display_name(&self, node: Node) -> String {
        if let Some(name) = node.child_by_field_name("name") {
            return self.text(name).to_string();
        }
        if node.named_child_count() == 0 {
            return self.text(node).to_string();
        }
        String::new()
    }
}
