//! Codecanon - one canonical syntax tree for many languages.
//!
//! Source written in Java, Python, TypeScript or Kotlin is normalized into a
//! language-agnostic tree, which is then scanned for design patterns and
//! anti-patterns and compared for similarity.
//!
//! # Architecture
//!
//! - `tree`: The canonical node model every other module reads
//! - `adapter`: Per-language front ends producing canonical trees
//! - `dispatch`: Routes requests to the adapter for a language tag
//! - `patterns`: Named matchers producing pattern findings
//! - `similarity`: Structural, lexical and semantic node comparison
//! - `config`: YAML engine configuration
//! - `engine`: The facade bundling all of the above
//!
//! # Adding a New Language
//!
//! See `src/adapter/languages/` for examples. Implement `Grammar` for a
//! tree-sitter grammar (or `LanguageAdapter` directly) and register it in
//! `languages/mod.rs`.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() {
//! use codecanon::AnalysisEngine;
//!
//! let engine = AnalysisEngine::new();
//! let result = engine.parse("class Cache { }", "kotlin", "Cache.kt").await;
//! if let Some(root) = result.root() {
//!     for finding in engine.detect_patterns_in_tree(root, "kotlin") {
//!         println!("{} at {}", finding.name, finding.location);
//!     }
//! }
//! # }
//! ```

pub mod adapter;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod patterns;
pub mod similarity;
pub mod tree;

pub use adapter::languages::{builtin_adapter, builtin_adapters, KotlinAdapter, BUILTIN_LANGUAGES};
#[cfg(feature = "tree-sitter")]
pub use adapter::languages::{JavaAdapter, PythonAdapter, TypeScriptAdapter};
pub use adapter::{
    AdapterError, IncrementalFidelity, LanguageAdapter, ParseDiagnostic, ParseError, ParseResult,
    ParseWarning,
};
pub use config::{ConfigError, EngineConfig};
pub use dispatch::Dispatcher;
pub use engine::{AnalysisEngine, SourceFile};
pub use patterns::{CodePattern, MatchOutcome, Matcher, PatternCategory, PatternRegistry};
pub use similarity::SimilarityScorer;
pub use tree::{keys, AttrValue, Attributes, AttrsBuilder, CodeNode, NodeKind, SourceLocation};
