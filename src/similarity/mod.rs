//! Pairwise similarity between canonical nodes.
//!
//! Same-kind pairs combine three sub-scores:
//!
//! ```text
//! score = 0.3 * lexical + 0.3 * semantic + 0.4 * structural
//! ```
//!
//! Pairs of different kinds get a reduced score built from lexical overlap
//! and child counts only, halved. Scoring is advisory: a failure inside the
//! computation yields 0.0 instead of an error.

pub mod text;

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use rayon::prelude::*;

use crate::tree::{keys, AttrValue, CodeNode, NodeKind, UNKNOWN_TYPE};

use text::{jaccard, jaccard_of, name_similarity, ratio, tokens};

pub const LEXICAL_WEIGHT: f64 = 0.3;
pub const SEMANTIC_WEIGHT: f64 = 0.3;
pub const STRUCTURAL_WEIGHT: f64 = 0.4;

/// Multiplier applied to pairs of different kinds.
pub const CROSS_KIND_PENALTY: f64 = 0.5;

/// Default threshold for corpus search.
pub const DEFAULT_THRESHOLD: f64 = 0.8;

/// Stateless similarity scorer.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimilarityScorer;

impl SimilarityScorer {
    pub fn new() -> Self {
        Self
    }

    /// Similarity of two nodes in [0, 1].
    ///
    /// Never panics: a panic or a non-finite intermediate result inside the
    /// computation degrades to 0.0.
    pub fn similarity(&self, a: &CodeNode, b: &CodeNode) -> f64 {
        match panic::catch_unwind(AssertUnwindSafe(|| self.score(a, b))) {
            Ok(score) if score.is_finite() => score.clamp(0.0, 1.0),
            Ok(score) => {
                tracing::warn!(a = a.name(), b = b.name(), score, "non-finite similarity");
                0.0
            }
            Err(_) => {
                tracing::warn!(a = a.name(), b = b.name(), "similarity scoring panicked");
                0.0
            }
        }
    }

    /// Corpus entries scoring at least `threshold` against `target`, best first.
    ///
    /// `target` itself is skipped by identity, so passing a corpus that
    /// contains it is fine. Entries with equal scores keep corpus order.
    pub fn find_similar<'a>(
        &self,
        target: &CodeNode,
        corpus: &[&'a CodeNode],
        threshold: f64,
    ) -> Vec<(&'a CodeNode, f64)> {
        let mut matches: Vec<(&'a CodeNode, f64)> = corpus
            .par_iter()
            .filter(|candidate| !ptr::eq(**candidate, target))
            .map(|candidate| (*candidate, self.similarity(target, candidate)))
            .filter(|(_, score)| *score >= threshold)
            .collect();
        matches.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        tracing::debug!(
            target = target.name(),
            candidates = corpus.len(),
            matches = matches.len(),
            threshold,
            "similarity search complete"
        );
        matches
    }

    fn score(&self, a: &CodeNode, b: &CodeNode) -> f64 {
        if a.kind() != b.kind() {
            let basic = ratio(a.children().len(), b.children().len());
            return (lexical(a, b) + basic) / 2.0 * CROSS_KIND_PENALTY;
        }
        LEXICAL_WEIGHT * lexical(a, b)
            + SEMANTIC_WEIGHT * semantic(a, b)
            + STRUCTURAL_WEIGHT * structural(a, b)
    }
}

/// Mean of depth, child-count and kind-distribution similarity.
pub fn structural(a: &CodeNode, b: &CodeNode) -> f64 {
    let depth = ratio(a.depth(), b.depth());
    let children = ratio(a.children().len(), b.children().len());

    let hist_a = a.kind_histogram();
    let hist_b = b.kind_histogram();
    let kinds: BTreeSet<&NodeKind> = hist_a.keys().chain(hist_b.keys()).collect();
    let shape = if kinds.is_empty() {
        1.0
    } else {
        let total: f64 = kinds
            .iter()
            .map(|kind| {
                ratio(
                    hist_a.get(*kind).copied().unwrap_or(0),
                    hist_b.get(*kind).copied().unwrap_or(0),
                )
            })
            .sum();
        total / kinds.len() as f64
    };

    (depth + children + shape) / 3.0
}

/// Token overlap of the names found anywhere in each subtree.
pub fn lexical(a: &CodeNode, b: &CodeNode) -> f64 {
    jaccard(&tokens(&subtree_text(a)), &tokens(&subtree_text(b)))
}

/// Kind-aware comparison of declarations.
pub fn semantic(a: &CodeNode, b: &CodeNode) -> f64 {
    match a.kind() {
        NodeKind::Class => {
            let names = |node: &CodeNode, kind| -> Vec<String> {
                node.children_of_kind(kind).map(|c| c.name().to_string()).collect()
            };
            let methods = jaccard_of(&names(a, NodeKind::Method), &names(b, NodeKind::Method));
            let fields = jaccard_of(&names(a, NodeKind::Variable), &names(b, NodeKind::Variable));
            (name_similarity(a.name(), b.name()) + methods + fields) / 3.0
        }
        NodeKind::Method => {
            let params = jaccard_of(&parameter_types(a), &parameter_types(b));
            let returns = type_match(a.attr_str(keys::RETURN_TYPE), b.attr_str(keys::RETURN_TYPE));
            (name_similarity(a.name(), b.name()) + params + returns) / 3.0
        }
        NodeKind::Variable => {
            let ty = type_match(a.attr_str(keys::TYPE), b.attr_str(keys::TYPE));
            (name_similarity(a.name(), b.name()) + ty) / 2.0
        }
        _ => jaccard(&tokens(&rendered(a)), &tokens(&rendered(b))),
    }
}

fn parameter_types(node: &CodeNode) -> Vec<&str> {
    node.attr_pairs(keys::PARAMETERS)
        .iter()
        .map(|p| p.get("type").map(String::as_str).unwrap_or(UNKNOWN_TYPE))
        .collect()
}

/// 1.0 on equal types, 0.5 when either side is unknown, else 0.0.
fn type_match(a: Option<&str>, b: Option<&str>) -> f64 {
    let a = a.unwrap_or(UNKNOWN_TYPE);
    let b = b.unwrap_or(UNKNOWN_TYPE);
    if a == b {
        1.0
    } else if a == UNKNOWN_TYPE || b == UNKNOWN_TYPE {
        0.5
    } else {
        0.0
    }
}

/// The node's name followed by the names of its descendants, pre-order.
fn subtree_text(node: &CodeNode) -> String {
    node.walk()
        .map(CodeNode::name)
        .filter(|n| !n.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Subtree names plus their textual attribute values.
fn rendered(node: &CodeNode) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for n in node.walk() {
        parts.push(n.name());
        for value in n.attributes().values() {
            match value {
                AttrValue::Str(s) => parts.push(s),
                AttrValue::StrList(list) => parts.extend(list.iter().map(String::as_str)),
                _ => {}
            }
        }
    }
    parts.join(" ")
}
