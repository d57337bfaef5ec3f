//! Built-in language adapters.
//!
//! # Adding a New Language
//!
//! 1. Create a new module in `src/adapter/languages/` (e.g., `go.rs`)
//! 2. Implement `Grammar` for a tree-sitter grammar, or `LanguageAdapter`
//!    directly for a hand-written front end
//! 3. Add it to [`builtin_adapter`] and [`BUILTIN_LANGUAGES`]
//!
//! See `java.rs` for a reference implementation.

use std::sync::Arc;

use super::LanguageAdapter;

#[cfg(feature = "tree-sitter")]
pub mod java;
pub mod kotlin;
#[cfg(feature = "tree-sitter")]
pub mod python;
#[cfg(feature = "tree-sitter")]
pub mod typescript;

#[cfg(feature = "tree-sitter")]
pub use java::{JavaAdapter, JavaGrammar};
pub use kotlin::KotlinAdapter;
#[cfg(feature = "tree-sitter")]
pub use python::{PythonAdapter, PythonGrammar};
#[cfg(feature = "tree-sitter")]
pub use typescript::{TypeScriptAdapter, TypeScriptGrammar};

/// Language names accepted in configuration, in registration order.
#[cfg(feature = "tree-sitter")]
pub const BUILTIN_LANGUAGES: &[&str] = &["java", "python", "typescript", "kotlin"];

/// Language names accepted in configuration, in registration order.
#[cfg(not(feature = "tree-sitter"))]
pub const BUILTIN_LANGUAGES: &[&str] = &["kotlin"];

/// Construct the built-in adapter for a language name or one of its tags.
///
/// Returns None if no built-in adapter handles the language.
pub fn builtin_adapter(language: &str) -> Option<Arc<dyn LanguageAdapter>> {
    match language.to_ascii_lowercase().as_str() {
        #[cfg(feature = "tree-sitter")]
        "java" => Some(Arc::new(java::new_adapter())),
        #[cfg(feature = "tree-sitter")]
        "python" | "py" => Some(Arc::new(python::new_adapter())),
        #[cfg(feature = "tree-sitter")]
        "typescript" | "ts" => Some(Arc::new(typescript::new_adapter())),
        "kotlin" | "kt" => Some(Arc::new(KotlinAdapter::new())),
        _ => None,
    }
}

/// One instance of every built-in adapter.
pub fn builtin_adapters() -> Vec<Arc<dyn LanguageAdapter>> {
    BUILTIN_LANGUAGES
        .iter()
        .filter_map(|language| builtin_adapter(language))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_builtin_language_resolves() {
        for language in BUILTIN_LANGUAGES {
            let adapter = builtin_adapter(language).unwrap();
            assert!(adapter.supports_language(language));
        }
        assert_eq!(builtin_adapters().len(), BUILTIN_LANGUAGES.len());
    }

    #[test]
    fn test_tags_resolve_case_insensitively() {
        assert!(builtin_adapter("KT").is_some());
        assert!(builtin_adapter("cobol").is_none());
    }

    #[cfg(feature = "tree-sitter")]
    #[test]
    fn test_adapter_names() {
        let names: Vec<_> = builtin_adapters().iter().map(|a| a.adapter_name()).collect();
        assert_eq!(
            names,
            vec!["JavaAdapter", "PythonAdapter", "TypeScriptAdapter", "KotlinAdapter"]
        );
    }
}
