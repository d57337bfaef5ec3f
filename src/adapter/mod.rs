//! Per-language adapters that turn source text into canonical trees.
//!
//! This module provides:
//! - `LanguageAdapter` trait: the asynchronous contract every front end implements
//! - `ParseResult` and diagnostics: the data returned by every parse
//! - Shared conversion helpers (kind normalization, complexity counting)
//! - Tree-sitter driver and the built-in language adapters
//!
//! # Failure semantics
//!
//! No adapter operation returns an error or panics across this boundary.
//! Internal failures (`AdapterError`) become a failed `ParseResult` with a
//! diagnostic at the best-known position, `(1,1)` by default.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod convert;
pub mod languages;
mod result;
#[cfg(feature = "tree-sitter")]
pub mod treesitter;

pub use result::{ParseDiagnostic, ParseError, ParseResult, ParseWarning};

use crate::tree::CodeNode;

/// Errors that can occur inside an adapter before they are folded into a
/// failed `ParseResult`.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[cfg(feature = "tree-sitter")]
    #[error("grammar rejected by parser: {0}")]
    Language(#[from] tree_sitter::LanguageError),
    #[cfg(feature = "tree-sitter")]
    #[error("invalid grammar query: {0}")]
    Query(#[from] tree_sitter::QueryError),
    #[error("parser produced no tree")]
    NoTree,
    #[error("parse worker failed: {0}")]
    Worker(String),
}

/// How faithfully an adapter implements `incremental_parse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncrementalFidelity {
    /// The changed text is parsed from scratch; the existing tree only
    /// supplies the file path.
    FullReparse,
    /// The existing tree is reused.
    Incremental,
}

impl IncrementalFidelity {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncrementalFidelity::FullReparse => "full_reparse",
            IncrementalFidelity::Incremental => "incremental",
        }
    }
}

impl std::fmt::Display for IncrementalFidelity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Language-specific front end producing canonical trees.
///
/// # Thread Safety
///
/// One instance services concurrent calls for different files, so
/// implementations must be stateless or internally synchronized.
#[async_trait]
pub trait LanguageAdapter: Send + Sync {
    /// Parse `source` into a canonical tree. Never fails: every problem is
    /// reported through the returned result.
    async fn parse(&self, source: &str, language: &str, file_path: &str) -> ParseResult;

    /// Re-parse after an edit.
    ///
    /// The default degrades to a full parse of `changed_text` using the file
    /// path recorded on `existing`; see [`LanguageAdapter::incremental_fidelity`].
    async fn incremental_parse(
        &self,
        existing: &CodeNode,
        changed_text: &str,
        language: &str,
    ) -> ParseResult {
        let file_path = existing.location().file().to_string();
        self.parse(changed_text, language, &file_path).await
    }

    /// True iff a full parse of `source` would succeed.
    async fn validate_syntax(&self, source: &str, language: &str) -> bool {
        self.parse(source, language, "<validate>").await.is_success()
    }

    /// Lower-cased language tags this adapter handles right now.
    fn supported_languages(&self) -> Vec<String>;

    fn supports_language(&self, language: &str) -> bool {
        self.supported_languages()
            .iter()
            .any(|tag| tag.eq_ignore_ascii_case(language))
    }

    /// The cost profile of `incremental_parse`.
    fn incremental_fidelity(&self) -> IncrementalFidelity {
        IncrementalFidelity::FullReparse
    }

    /// Type name reported in dispatcher statistics.
    fn adapter_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
