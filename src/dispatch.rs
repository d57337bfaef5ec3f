//! Multi-language dispatcher.
//!
//! Routes parse and validation requests to the adapter registered for a
//! language tag. Tags are matched case-insensitively; an unknown tag never
//! reaches an adapter.
//!
//! # Thread Safety
//!
//! The registry is a `DashMap`, so lookups and `add_adapter`/`remove_adapter`
//! may run concurrently with in-flight parses. An adapter is cloned out of
//! the map before it is awaited, so no shard lock is held across an await.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::adapter::{LanguageAdapter, ParseResult};
use crate::tree::CodeNode;

/// Concurrent registry mapping lower-cased language tags to adapters.
#[derive(Default)]
pub struct Dispatcher {
    adapters: DashMap<String, Arc<dyn LanguageAdapter>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a dispatcher with every adapter registered under all of its tags.
    pub fn with_adapters<I>(adapters: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn LanguageAdapter>>,
    {
        let dispatcher = Self::new();
        for adapter in adapters {
            dispatcher.register(adapter);
        }
        dispatcher
    }

    /// Register `adapter` under every tag it reports.
    pub fn register(&self, adapter: Arc<dyn LanguageAdapter>) {
        for tag in adapter.supported_languages() {
            self.add_adapter(&tag, Arc::clone(&adapter));
        }
    }

    /// Register `adapter` for `tag`. An existing adapter for the tag is
    /// replaced (last write wins).
    pub fn add_adapter(&self, tag: &str, adapter: Arc<dyn LanguageAdapter>) {
        let key = tag.to_ascii_lowercase();
        tracing::debug!(tag = %key, adapter = adapter.adapter_name(), "registering adapter");
        if let Some(previous) = self.adapters.insert(key.clone(), adapter) {
            tracing::debug!(tag = %key, replaced = previous.adapter_name(), "adapter replaced");
        }
    }

    /// Remove the adapter for `tag`, returning it if one was registered.
    pub fn remove_adapter(&self, tag: &str) -> Option<Arc<dyn LanguageAdapter>> {
        let removed = self
            .adapters
            .remove(&tag.to_ascii_lowercase())
            .map(|(_, adapter)| adapter);
        if removed.is_some() {
            tracing::debug!(tag, "adapter removed");
        }
        removed
    }

    /// The adapter registered for `tag`, if any.
    pub fn adapter_for(&self, tag: &str) -> Option<Arc<dyn LanguageAdapter>> {
        self.adapters
            .get(&tag.to_ascii_lowercase())
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of tag → adapter type name.
    pub fn statistics(&self) -> BTreeMap<String, String> {
        self.adapters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().adapter_name().to_string()))
            .collect()
    }

    /// Registered tags, sorted.
    pub fn languages(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.adapters.iter().map(|e| e.key().clone()).collect();
        tags.sort();
        tags
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

/// The dispatcher is itself an adapter for every registered tag.
#[async_trait]
impl LanguageAdapter for Dispatcher {
    async fn parse(&self, source: &str, language: &str, file_path: &str) -> ParseResult {
        match self.adapter_for(language) {
            Some(adapter) => adapter.parse(source, language, file_path).await,
            None => {
                tracing::debug!(language, file = file_path, "unsupported language");
                ParseResult::unsupported(language, file_path)
            }
        }
    }

    async fn incremental_parse(
        &self,
        existing: &CodeNode,
        changed_text: &str,
        language: &str,
    ) -> ParseResult {
        match self.adapter_for(language) {
            Some(adapter) => adapter.incremental_parse(existing, changed_text, language).await,
            None => {
                tracing::debug!(language, "unsupported language");
                ParseResult::unsupported(language, existing.location().file())
            }
        }
    }

    async fn validate_syntax(&self, source: &str, language: &str) -> bool {
        match self.adapter_for(language) {
            Some(adapter) => adapter.validate_syntax(source, language).await,
            None => false,
        }
    }

    fn supported_languages(&self) -> Vec<String> {
        self.languages()
    }

    fn supports_language(&self, language: &str) -> bool {
        self.adapters.contains_key(&language.to_ascii_lowercase())
    }

    fn adapter_name(&self) -> &'static str {
        "Dispatcher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::IncrementalFidelity;
    use crate::tree::{Attributes, SourceLocation};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct EchoAdapter {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LanguageAdapter for EchoAdapter {
        async fn parse(&self, _source: &str, language: &str, file_path: &str) -> ParseResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let root = CodeNode::module(
                "echo",
                SourceLocation::start_of(file_path),
                vec![],
                Attributes::new(),
            );
            ParseResult::success(root, vec![], language, file_path, Duration::ZERO)
        }

        fn supported_languages(&self) -> Vec<String> {
            vec!["echo".to_string(), "ech".to_string()]
        }

        fn adapter_name(&self) -> &'static str {
            "EchoAdapter"
        }
    }

    fn echo() -> Arc<EchoAdapter> {
        Arc::new(EchoAdapter {
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test]
    async fn test_register_all_tags() {
        let dispatcher = Dispatcher::with_adapters([echo() as Arc<dyn LanguageAdapter>]);
        assert_eq!(dispatcher.languages(), vec!["ech", "echo"]);
        assert!(dispatcher.supports_language("ECHO"));
        assert!(dispatcher.parse("x", "Ech", "a.echo").await.is_success());
    }

    #[tokio::test]
    async fn test_unknown_tag_never_reaches_adapter() {
        let adapter = echo();
        let dispatcher = Dispatcher::with_adapters([adapter.clone() as Arc<dyn LanguageAdapter>]);

        let result = dispatcher.parse("IDENTIFICATION DIVISION.", "cobol", "main.cbl").await;
        assert!(!result.is_success());
        assert_eq!(result.errors().len(), 1);
        assert_eq!(result.errors()[0].message(), "unsupported language: cobol");
        assert!(!dispatcher.validate_syntax("x", "cobol").await);
        assert_eq!(adapter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_add_replaces_and_remove() {
        let dispatcher = Dispatcher::new();
        let first = echo();
        let second = echo();
        dispatcher.add_adapter("echo", first.clone());
        dispatcher.add_adapter("ECHO", second.clone());
        assert_eq!(dispatcher.len(), 1);

        dispatcher.parse("x", "echo", "a").await;
        assert_eq!(first.calls.load(Ordering::SeqCst), 0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 1);

        assert!(dispatcher.remove_adapter("echo").is_some());
        assert!(dispatcher.remove_adapter("echo").is_none());
        assert!(dispatcher.is_empty());
    }

    #[test]
    fn test_languages_visible_through_trait_object() {
        let dispatcher = Arc::new(Dispatcher::new());
        let as_adapter: Arc<dyn LanguageAdapter> = dispatcher.clone();
        assert!(as_adapter.supported_languages().is_empty());

        dispatcher.add_adapter("Echo", echo());
        assert_eq!(as_adapter.supported_languages(), vec!["echo"]);
        assert!(as_adapter.supports_language("ECHO"));

        dispatcher.remove_adapter("echo");
        assert!(as_adapter.supported_languages().is_empty());
    }

    #[tokio::test]
    async fn test_incremental_uses_existing_file_path() {
        let dispatcher = Dispatcher::with_adapters([echo() as Arc<dyn LanguageAdapter>]);
        let existing = CodeNode::module(
            "old",
            SourceLocation::start_of("src/old.echo"),
            vec![],
            Attributes::new(),
        );

        let result = dispatcher.incremental_parse(&existing, "y", "echo").await;
        assert_eq!(result.file_path(), "src/old.echo");

        let unsupported = dispatcher.incremental_parse(&existing, "y", "cobol").await;
        assert_eq!(unsupported.file_path(), "src/old.echo");
        assert!(!unsupported.is_success());
    }

    #[test]
    fn test_statistics_snapshot() {
        let dispatcher = Dispatcher::with_adapters([echo() as Arc<dyn LanguageAdapter>]);
        let stats = dispatcher.statistics();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats["echo"], "EchoAdapter");
        assert_eq!(echo().incremental_fidelity(), IncrementalFidelity::FullReparse);
    }
}
