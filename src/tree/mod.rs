//! Canonical, language-agnostic syntax tree.
//!
//! Every adapter produces this tree and every downstream consumer (pattern
//! detection, similarity scoring) reads it. Nodes are immutable once built:
//! a transformation produces a new node rather than mutating shared state.
//!
//! ```text
//! Module ─┬─ Class ─┬─ Variable (field)
//!         │         └─ Method ── Statement ── Expression
//!         └─ Method (module-level function)
//! ```

mod attributes;
mod location;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub use attributes::{keys, parameter, AttrValue, Attributes, AttrsBuilder, UNKNOWN_TYPE};
pub use location::{Extent, Position, SourceLocation};

/// The closed set of canonical node kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Module,
    Class,
    Method,
    Variable,
    Statement,
    Expression,
    /// Parsed syntax that no adapter rule classified.
    Unclassified,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Module => "module",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
            NodeKind::Variable => "variable",
            NodeKind::Statement => "statement",
            NodeKind::Expression => "expression",
            NodeKind::Unclassified => "unclassified",
        }
    }

    /// Check if this kind is a declaration (class, method or variable).
    pub fn is_declaration(&self) -> bool {
        matches!(self, NodeKind::Class | NodeKind::Method | NodeKind::Variable)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A node of the canonical tree.
///
/// Children are exclusively owned (strict tree, no sharing), and attribute
/// values are owned copies, so a tree outlives the parser that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeNode {
    kind: NodeKind,
    name: String,
    location: SourceLocation,
    children: Vec<CodeNode>,
    attributes: Attributes,
}

impl CodeNode {
    pub fn new(
        kind: NodeKind,
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            location,
            children,
            attributes,
        }
    }

    pub fn module(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Module, name, location, children, attributes)
    }

    pub fn class(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Class, name, location, children, attributes)
    }

    pub fn method(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Method, name, location, children, attributes)
    }

    pub fn variable(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Variable, name, location, children, attributes)
    }

    pub fn statement(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Statement, name, location, children, attributes)
    }

    pub fn expression(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Expression, name, location, children, attributes)
    }

    pub fn unclassified(
        name: impl Into<String>,
        location: SourceLocation,
        children: Vec<CodeNode>,
        attributes: Attributes,
    ) -> Self {
        Self::new(NodeKind::Unclassified, name, location, children, attributes)
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    pub fn children(&self) -> &[CodeNode] {
        &self.children
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(AttrValue::as_str)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attribute(key).and_then(AttrValue::as_bool)
    }

    pub fn attr_int(&self, key: &str) -> Option<i64> {
        self.attribute(key).and_then(AttrValue::as_int)
    }

    /// A string-list attribute, empty when absent or of another variant.
    pub fn attr_list(&self, key: &str) -> &[String] {
        self.attribute(key).and_then(AttrValue::as_list).unwrap_or(&[])
    }

    /// A pair-list attribute, empty when absent or of another variant.
    pub fn attr_pairs(&self, key: &str) -> &[BTreeMap<String, String>] {
        self.attribute(key).and_then(AttrValue::as_pairs).unwrap_or(&[])
    }

    /// Whether the `modifiers` attribute contains `modifier`.
    pub fn has_modifier(&self, modifier: &str) -> bool {
        self.attr_list(keys::MODIFIERS).iter().any(|m| m == modifier)
    }

    /// Immediate children of the given kind.
    pub fn children_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &CodeNode> {
        self.children.iter().filter(move |c| c.kind == kind)
    }

    /// Pre-order traversal of this node and all descendants.
    pub fn walk(&self) -> Walk<'_> {
        Walk { stack: vec![self] }
    }

    /// Height of the subtree in edges; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0)];
        while let Some((node, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            stack.extend(node.children.iter().map(|c| (c, depth + 1)));
        }
        deepest
    }

    /// Number of nodes in the subtree, including this one.
    pub fn size(&self) -> usize {
        self.walk().count()
    }

    /// Distribution of node kinds across the subtree, including this node.
    pub fn kind_histogram(&self) -> BTreeMap<NodeKind, usize> {
        let mut histogram = BTreeMap::new();
        for node in self.walk() {
            *histogram.entry(node.kind).or_insert(0) += 1;
        }
        histogram
    }

    /// Compare kind, name, location, attributes and children.
    pub fn structurally_eq(&self, other: &CodeNode) -> bool {
        self == other
    }

    /// A copy of this node with `children` replacing the current ones.
    pub fn with_children(&self, children: Vec<CodeNode>) -> CodeNode {
        CodeNode {
            children,
            ..self.clone()
        }
    }

    /// A copy of this node with one attribute added or replaced.
    pub fn with_attribute(&self, key: &str, value: impl Into<AttrValue>) -> CodeNode {
        let mut attributes = self.attributes.clone();
        attributes.insert(key.to_string(), value.into());
        CodeNode {
            attributes,
            ..self.clone()
        }
    }
}

/// Iterator returned by [`CodeNode::walk`].
pub struct Walk<'a> {
    stack: Vec<&'a CodeNode>,
}

impl<'a> Iterator for Walk<'a> {
    type Item = &'a CodeNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(line: usize) -> SourceLocation {
        SourceLocation::point("test.java", line, 1)
    }

    fn sample() -> CodeNode {
        let stmt = CodeNode::statement(
            "",
            loc(3),
            vec![CodeNode::expression("x", loc(3), vec![], Attributes::new())],
            AttrsBuilder::new().set(keys::STATEMENT_TYPE, "return").build(),
        );
        let method = CodeNode::method(
            "get",
            loc(2),
            vec![stmt],
            AttrsBuilder::new()
                .set(keys::MODIFIERS, vec!["public".to_string()])
                .set(keys::CYCLOMATIC_COMPLEXITY, 1i64)
                .build(),
        );
        let field = CodeNode::variable(
            "x",
            loc(1),
            vec![],
            AttrsBuilder::new().set(keys::FIELD, true).build(),
        );
        CodeNode::class("Box", loc(1), vec![field, method], Attributes::new())
    }

    #[test]
    fn test_walk_is_preorder() {
        let tree = sample();
        let names: Vec<_> = tree.walk().map(|n| n.kind()).collect();
        assert_eq!(
            names,
            vec![
                NodeKind::Class,
                NodeKind::Variable,
                NodeKind::Method,
                NodeKind::Statement,
                NodeKind::Expression,
            ]
        );
    }

    #[test]
    fn test_depth_and_size() {
        let tree = sample();
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.size(), 5);

        let leaf = CodeNode::expression("y", loc(1), vec![], Attributes::new());
        assert_eq!(leaf.depth(), 0);
    }

    #[test]
    fn test_depth_of_long_chain() {
        let mut node = CodeNode::expression("x", loc(1), vec![], Attributes::new());
        for _ in 0..2000 {
            node = CodeNode::expression("", loc(1), vec![node], Attributes::new());
        }
        assert_eq!(node.depth(), 2000);
        assert_eq!(node.size(), 2001);
    }

    #[test]
    fn test_kind_histogram() {
        let histogram = sample().kind_histogram();
        assert_eq!(histogram[&NodeKind::Class], 1);
        assert_eq!(histogram[&NodeKind::Method], 1);
        assert_eq!(histogram.get(&NodeKind::Module), None);
    }

    #[test]
    fn test_attribute_accessors() {
        let tree = sample();
        let method = tree.children_of_kind(NodeKind::Method).next().unwrap();
        assert!(method.has_modifier("public"));
        assert!(!method.has_modifier("static"));
        assert_eq!(method.attr_int(keys::CYCLOMATIC_COMPLEXITY), Some(1));
        assert!(method.attr_list(keys::THROWS).is_empty());
        assert!(method.attr_pairs(keys::PARAMETERS).is_empty());
    }

    #[test]
    fn test_transformations_leave_original_untouched() {
        let tree = sample();
        let renamed = tree.with_attribute(keys::SUPERCLASS, "Base");
        assert_eq!(renamed.attr_str(keys::SUPERCLASS), Some("Base"));
        assert_eq!(tree.attr_str(keys::SUPERCLASS), None);

        let pruned = tree.with_children(vec![]);
        assert!(pruned.children().is_empty());
        assert_eq!(tree.children().len(), 2);
        assert!(!pruned.structurally_eq(&tree));
        assert!(tree.structurally_eq(&sample()));
    }
}
