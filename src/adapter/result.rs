//! Outcome of a single parse attempt.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::tree::{CodeNode, SourceLocation};

/// A located message describing a parse problem.
///
/// Diagnostics are data handed back to the caller, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseDiagnostic {
    message: String,
    location: SourceLocation,
}

/// A diagnostic that made the parse fail.
pub type ParseError = ParseDiagnostic;

/// A diagnostic attached to a successful but partial parse.
pub type ParseWarning = ParseDiagnostic;

impl ParseDiagnostic {
    pub fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }

    /// A diagnostic located at `(1,1)` of `file`.
    pub fn at_start(message: impl Into<String>, file: &str) -> Self {
        Self::new(message, SourceLocation::start_of(file))
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn location(&self) -> &SourceLocation {
        &self.location
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.message)
    }
}

/// Result of one parse call. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseResult {
    success: bool,
    root: Option<CodeNode>,
    errors: Vec<ParseError>,
    warnings: Vec<ParseWarning>,
    language: String,
    file_path: String,
    elapsed: Duration,
}

impl ParseResult {
    /// A successful parse, optionally carrying warnings.
    pub fn success(
        root: CodeNode,
        warnings: Vec<ParseWarning>,
        language: impl Into<String>,
        file_path: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: true,
            root: Some(root),
            errors: Vec::new(),
            warnings,
            language: language.into(),
            file_path: file_path.into(),
            elapsed,
        }
    }

    /// A failed parse. `errors` should hold at least one diagnostic; an empty
    /// list is replaced by a generic one at `(1,1)`.
    pub fn failure(
        errors: Vec<ParseError>,
        language: impl Into<String>,
        file_path: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let file_path = file_path.into();
        let errors = if errors.is_empty() {
            vec![ParseDiagnostic::at_start("parse failed", &file_path)]
        } else {
            errors
        };
        Self {
            success: false,
            root: None,
            errors,
            warnings: Vec::new(),
            language: language.into(),
            file_path,
            elapsed,
        }
    }

    /// The uniform result for a language no adapter handles.
    pub fn unsupported(language: &str, file_path: impl Into<String>) -> Self {
        let file_path = file_path.into();
        let error = ParseDiagnostic::at_start(format!("unsupported language: {}", language), &file_path);
        Self::failure(vec![error], language, file_path, Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn root(&self) -> Option<&CodeNode> {
        self.root.as_ref()
    }

    /// Consume the result and take the root node.
    pub fn into_root(self) -> Option<CodeNode> {
        self.root
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn warnings(&self) -> &[ParseWarning] {
        &self.warnings
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Wall-clock time of the parse attempt in milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed.as_millis()
    }
}
