//! Evaluator error types

use graphscribe_domain::ErrorKind;
use graphscribe_templates::ManagerError;
use thiserror::Error;

/// Errors that abort a whole evaluation
///
/// Per-text failures are recorded in the report instead.
#[derive(Error, Debug)]
pub enum EvaluatorError {
    /// Bad request: no texts, unknown metric, malformed triplet
    #[error("Validation error: {0}")]
    Validation(String),

    /// Template lookup failed
    #[error(transparent)]
    Template(#[from] ManagerError),
}

impl EvaluatorError {
    /// Classify for API callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            EvaluatorError::Validation(_) => ErrorKind::Validation,
            EvaluatorError::Template(e) => e.kind(),
        }
    }
}
