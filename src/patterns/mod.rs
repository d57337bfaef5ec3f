//! Pattern detection over canonical trees.
//!
//! A [`PatternRegistry`] holds named matchers. Every matcher is evaluated
//! against a node and each match becomes one [`CodePattern`]; matchers are
//! independent, so one node can produce several findings.

pub mod matchers;

use std::fmt;

use phf::phf_map;
use serde::{Deserialize, Serialize};

use crate::tree::{keys, CodeNode, NodeKind, SourceLocation};

/// Broad classification of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternCategory {
    DesignPattern,
    AntiPattern,
    CodePattern,
}

impl PatternCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatternCategory::DesignPattern => "DesignPattern",
            PatternCategory::AntiPattern => "AntiPattern",
            PatternCategory::CodePattern => "CodePattern",
        }
    }

    /// Category for a matcher name. Names not in the table are plain code patterns.
    pub fn for_pattern(name: &str) -> Self {
        CATEGORIES
            .get(name)
            .copied()
            .unwrap_or(PatternCategory::CodePattern)
    }
}

impl fmt::Display for PatternCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

static CATEGORIES: phf::Map<&'static str, PatternCategory> = phf_map! {
    "Singleton" => PatternCategory::DesignPattern,
    "Factory" => PatternCategory::DesignPattern,
    "Observer" => PatternCategory::DesignPattern,
    "Builder" => PatternCategory::DesignPattern,
    "Strategy" => PatternCategory::DesignPattern,
    "GodClass" => PatternCategory::AntiPattern,
    "LongMethod" => PatternCategory::AntiPattern,
};

static DESCRIPTIONS: phf::Map<&'static str, &'static str> = phf_map! {
    "Singleton" => "Class restricts instantiation to a single shared instance",
    "Factory" => "Object creation is delegated to a dedicated creation method",
    "Observer" => "Class maintains subscribers and notifies them of changes",
    "Builder" => "Class assembles an object step by step through chained calls",
    "Strategy" => "Interchangeable algorithm behind a common interface",
    "GodClass" => "Class has too many methods and likely too many responsibilities",
    "LongMethod" => "Method has too many statements to follow easily",
    "HighComplexity" => "Method has a high number of independent paths",
};

/// Human-readable description for a matcher name.
pub fn describe(name: &str) -> String {
    DESCRIPTIONS
        .get(name)
        .map(|d| d.to_string())
        .unwrap_or_else(|| format!("Detected {} pattern", name))
}

/// Result of evaluating one matcher against one node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub confidence: f64,
}

impl MatchOutcome {
    pub const MISS: MatchOutcome = MatchOutcome {
        matched: false,
        confidence: 0.0,
    };

    pub fn hit(confidence: f64) -> Self {
        Self {
            matched: true,
            confidence,
        }
    }
}

/// A matcher is a pure function of a node and a language tag.
pub type Matcher = fn(&CodeNode, &str) -> MatchOutcome;

/// A detected pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodePattern {
    pub name: String,
    pub category: PatternCategory,
    pub description: String,
    pub location: SourceLocation,
    /// Always within [0, 1].
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Built-in matcher names, in evaluation order.
pub const BUILTIN_MATCHERS: &[&str] = &[
    "Singleton",
    "Factory",
    "Observer",
    "Builder",
    "Strategy",
    "GodClass",
    "LongMethod",
    "HighComplexity",
];

fn builtin_matcher(name: &str) -> Option<Matcher> {
    let matcher: Matcher = match name {
        "Singleton" => matchers::singleton,
        "Factory" => matchers::factory,
        "Observer" => matchers::observer,
        "Builder" => matchers::builder,
        "Strategy" => matchers::strategy,
        "GodClass" => matchers::god_class,
        "LongMethod" => matchers::long_method,
        "HighComplexity" => matchers::high_complexity,
        _ => return None,
    };
    Some(matcher)
}

/// Ordered set of named matchers.
#[derive(Clone)]
pub struct PatternRegistry {
    matchers: Vec<(String, Matcher)>,
}

impl Default for PatternRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for PatternRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternRegistry")
            .field("matchers", &self.names())
            .finish()
    }
}

impl PatternRegistry {
    /// A registry with no matchers.
    pub fn empty() -> Self {
        Self {
            matchers: Vec::new(),
        }
    }

    /// A registry with every built-in matcher.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for name in BUILTIN_MATCHERS {
            if let Some(matcher) = builtin_matcher(name) {
                registry.register(*name, matcher);
            }
        }
        registry
    }

    /// Add a matcher, replacing any existing matcher with the same name.
    pub fn register(&mut self, name: impl Into<String>, matcher: Matcher) {
        let name = name.into();
        match self.matchers.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = matcher,
            None => self.matchers.push((name, matcher)),
        }
    }

    /// Remove a matcher by name. Returns false if it was not registered.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.matchers.len();
        self.matchers.retain(|(n, _)| n != name);
        self.matchers.len() != before
    }

    /// This registry without the named matchers.
    pub fn without<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        for name in names {
            self.remove(name.as_ref());
        }
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.matchers.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.matchers.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.matchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matchers.is_empty()
    }

    /// Evaluate every matcher against `node` alone.
    pub fn detect(&self, node: &CodeNode, language: &str) -> Vec<CodePattern> {
        self.matchers
            .iter()
            .filter_map(|(name, matcher)| {
                let outcome = matcher(node, language);
                outcome.matched.then(|| finding(name, node, outcome.confidence))
            })
            .collect()
    }

    /// Evaluate every matcher against every node of the tree, in pre-order.
    pub fn detect_in_tree(&self, root: &CodeNode, language: &str) -> Vec<CodePattern> {
        let findings: Vec<CodePattern> = root
            .walk()
            .flat_map(|node| self.detect(node, language))
            .collect();
        tracing::debug!(
            language,
            nodes = root.size(),
            findings = findings.len(),
            "pattern detection complete"
        );
        findings
    }
}

fn finding(name: &str, node: &CodeNode, confidence: f64) -> CodePattern {
    let confidence = if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    };
    CodePattern {
        name: name.to_string(),
        category: PatternCategory::for_pattern(name),
        description: describe(name),
        location: node.location().clone(),
        confidence,
        examples: vec![snippet(node)],
    }
}

/// One-line rendering of the matched node.
fn snippet(node: &CodeNode) -> String {
    match node.kind() {
        NodeKind::Method => {
            let params: Vec<&str> = node
                .attr_pairs(keys::PARAMETERS)
                .iter()
                .filter_map(|p| p.get("name").map(String::as_str))
                .collect();
            match node.attr_str(keys::RETURN_TYPE) {
                Some(ret) => format!("{}({}): {}", node.name(), params.join(", "), ret),
                None => format!("{}({})", node.name(), params.join(", ")),
            }
        }
        kind => format!("{} {}", kind, node.name()),
    }
}
