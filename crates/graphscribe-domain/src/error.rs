//! Error classification shared by every layer
//!
//! Each crate keeps its own error enum; all of them map onto one of these kinds
//! so the HTTP layer can pick a status code without knowing crate internals.

use serde::Serialize;
use std::fmt;

/// Kind of failure surfaced to API callers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad or missing input fields
    Validation,

    /// Unknown template id
    NotFound,

    /// Name collision or deletion of an active template
    Conflict,

    /// No template is active for the requested language
    NoActiveTemplate,

    /// The LLM reply does not match the output contract
    ExtractionParse,

    /// The LLM call failed or timed out
    Upstream,

    /// Storage or other internal failure
    Internal,
}

impl ErrorKind {
    /// Stable string form used in API error bodies
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NoActiveTemplate => "no_active_template",
            ErrorKind::ExtractionParse => "extraction_parse",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
