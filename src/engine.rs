//! Caller-facing facade.
//!
//! [`AnalysisEngine`] owns one dispatcher, one pattern registry and one
//! similarity scorer. Cloning an engine is cheap and shares all three.

use std::sync::Arc;

use futures::stream::{self, StreamExt};

use crate::adapter::languages::builtin_adapter;
use crate::adapter::{LanguageAdapter, ParseResult};
use crate::config::{ConfigError, EngineConfig};
use crate::dispatch::Dispatcher;
use crate::patterns::{CodePattern, PatternRegistry};
use crate::similarity::SimilarityScorer;
use crate::tree::CodeNode;

/// One input of a batch parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub source: String,
    pub language: String,
    pub path: String,
}

impl SourceFile {
    pub fn new(
        source: impl Into<String>,
        language: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            language: language.into(),
            path: path.into(),
        }
    }
}

#[derive(Clone)]
pub struct AnalysisEngine {
    dispatcher: Arc<Dispatcher>,
    patterns: Arc<PatternRegistry>,
    scorer: SimilarityScorer,
    config: Arc<EngineConfig>,
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisEngine {
    /// An engine with every built-in adapter and matcher.
    pub fn new() -> Self {
        Self::build(EngineConfig::default())
    }

    /// An engine configured by `config`, which is validated first.
    pub fn from_config(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: EngineConfig) -> Self {
        let dispatcher = Dispatcher::new();
        for language in &config.languages {
            if let Some(adapter) = builtin_adapter(language) {
                dispatcher.register(adapter);
            }
        }
        let patterns = PatternRegistry::builtin().without(&config.patterns.disabled);
        tracing::debug!(
            languages = ?dispatcher.languages(),
            matchers = ?patterns.names(),
            "analysis engine ready"
        );
        Self {
            dispatcher: Arc::new(dispatcher),
            patterns: Arc::new(patterns),
            scorer: SimilarityScorer::new(),
            config: Arc::new(config),
        }
    }

    /// The dispatcher, for registering additional adapters at runtime.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn patterns(&self) -> &PatternRegistry {
        &self.patterns
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub async fn parse(&self, source: &str, language: &str, file_path: &str) -> ParseResult {
        self.dispatcher.parse(source, language, file_path).await
    }

    pub async fn incremental_parse(
        &self,
        existing: &CodeNode,
        changed_text: &str,
        language: &str,
    ) -> ParseResult {
        self.dispatcher
            .incremental_parse(existing, changed_text, language)
            .await
    }

    pub async fn validate_syntax(&self, source: &str, language: &str) -> bool {
        self.dispatcher.validate_syntax(source, language).await
    }

    pub fn supports_language(&self, language: &str) -> bool {
        self.dispatcher.supports_language(language)
    }

    /// Registered language tags, sorted.
    pub fn supported_languages(&self) -> Vec<String> {
        self.dispatcher.languages()
    }

    /// Parse many files concurrently. Results come back in input order.
    ///
    /// At most `parse.max_concurrency` parses are in flight at once.
    pub async fn parse_all<I>(&self, files: I) -> Vec<ParseResult>
    where
        I: IntoIterator<Item = SourceFile>,
    {
        let limit = self.config.parse.max_concurrency.max(1);
        stream::iter(files)
            .map(|file| async move {
                self.dispatcher
                    .parse(&file.source, &file.language, &file.path)
                    .await
            })
            .buffered(limit)
            .collect()
            .await
    }

    pub fn detect_patterns(&self, node: &CodeNode, language: &str) -> Vec<CodePattern> {
        self.patterns.detect(node, language)
    }

    /// Detection on every node of the tree, pre-order.
    pub fn detect_patterns_in_tree(&self, root: &CodeNode, language: &str) -> Vec<CodePattern> {
        self.patterns.detect_in_tree(root, language)
    }

    pub fn similarity(&self, a: &CodeNode, b: &CodeNode) -> f64 {
        self.scorer.similarity(a, b)
    }

    pub fn find_similar<'a>(
        &self,
        target: &CodeNode,
        corpus: &[&'a CodeNode],
        threshold: f64,
    ) -> Vec<(&'a CodeNode, f64)> {
        self.scorer.find_similar(target, corpus, threshold)
    }

    /// [`find_similar`](Self::find_similar) with the configured default threshold.
    pub fn find_similar_default<'a>(
        &self,
        target: &CodeNode,
        corpus: &[&'a CodeNode],
    ) -> Vec<(&'a CodeNode, f64)> {
        self.find_similar(target, corpus, self.config.similarity.default_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_rejects_invalid() {
        let mut config = EngineConfig::default();
        config.similarity.default_threshold = -0.1;
        assert!(AnalysisEngine::from_config(config).is_err());
    }

    #[test]
    fn test_disabled_matchers_are_left_out() {
        let mut config = EngineConfig::default();
        config.patterns.disabled = vec!["GodClass".to_string()];
        config.languages = vec!["kotlin".to_string()];
        let engine = AnalysisEngine::from_config(config).unwrap();
        assert!(!engine.patterns().contains("GodClass"));
        assert_eq!(engine.supported_languages(), vec!["kotlin", "kt"]);
    }

    #[tokio::test]
    async fn test_parse_all_keeps_input_order() {
        let engine = AnalysisEngine::new();
        let files = vec![
            SourceFile::new("class A", "kotlin", "A.kt"),
            SourceFile::new("x", "cobol", "B.cbl"),
            SourceFile::new("class C {", "kt", "C.kt"),
        ];
        let results = engine.parse_all(files).await;
        let paths: Vec<&str> = results.iter().map(|r| r.file_path()).collect();
        assert_eq!(paths, vec!["A.kt", "B.cbl", "C.kt"]);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert!(!results[2].is_success());
    }
}
