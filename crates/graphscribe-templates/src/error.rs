//! Template manager error types

use graphscribe_domain::{ErrorKind, RenderError, TemplateId};
use thiserror::Error;

/// Errors that can occur during template management
#[derive(Error, Debug)]
pub enum ManagerError {
    /// Missing or malformed input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown template id
    #[error("Template not found: {0}")]
    NotFound(TemplateId),

    /// Name collision, or deletion of an active template
    #[error("Conflict: {0}")]
    Conflict(String),

    /// No template is active for the language
    #[error("No active template for language '{0}'")]
    NoActiveTemplate(String),

    /// Template text failed to parse or render
    #[error("Template render error: {0}")]
    Render(#[from] RenderError),

    /// The backing store failed; in-memory state was left unchanged
    #[error("Store error: {0}")]
    Store(String),
}

impl ManagerError {
    /// Classify for API callers
    pub fn kind(&self) -> ErrorKind {
        match self {
            ManagerError::Validation(_) | ManagerError::Render(_) => ErrorKind::Validation,
            ManagerError::NotFound(_) => ErrorKind::NotFound,
            ManagerError::Conflict(_) => ErrorKind::Conflict,
            ManagerError::NoActiveTemplate(_) => ErrorKind::NoActiveTemplate,
            ManagerError::Store(_) => ErrorKind::Internal,
        }
    }
}
