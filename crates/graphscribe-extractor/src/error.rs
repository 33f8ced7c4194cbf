//! Error types for the Extractor

use graphscribe_domain::ErrorKind;
use graphscribe_templates::ManagerError;
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Bad input, or a reply whose graph references do not hold
    #[error("Validation error: {0}")]
    Validation(String),

    /// Template lookup or rendering failed
    #[error(transparent)]
    Template(#[from] ManagerError),

    /// The LLM reply does not match the output contract
    #[error("Could not parse LLM reply: {message}")]
    Parse {
        /// What was wrong with the reply
        message: String,
        /// The reply exactly as received
        raw_reply: String,
    },

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(String),

    /// The LLM call did not finish in time
    #[error("Extraction timed out after {0}s")]
    Timeout(u64),
}

impl ExtractorError {
    /// Classify for API callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractorError::Validation(_) => ErrorKind::Validation,
            ExtractorError::Template(e) => e.kind(),
            ExtractorError::Parse { .. } => ErrorKind::ExtractionParse,
            ExtractorError::Llm(_) | ExtractorError::Timeout(_) => ErrorKind::Upstream,
        }
    }

    /// The unparseable reply, for parse errors
    pub fn raw_reply(&self) -> Option<&str> {
        match self {
            ExtractorError::Parse { raw_reply, .. } => Some(raw_reply),
            _ => None,
        }
    }
}
