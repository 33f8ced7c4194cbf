//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{SchemaSpec, TemplateSet};
use serde::Serialize;
use std::fmt;

/// Trait for persisting the template record set
///
/// Implemented by the infrastructure layer (graphscribe-store). The whole set
/// is read and written at once; callers serialise access.
pub trait TemplateStore {
    /// Error type for store operations
    type Error;

    /// Load the record set; a store with nothing saved yields an empty set
    fn load(&self) -> Result<TemplateSet, Self::Error>;

    /// Replace the saved record set with `set`
    fn persist(&mut self, set: &TemplateSet) -> Result<(), Self::Error>;
}

impl<T: TemplateStore + ?Sized> TemplateStore for Box<T> {
    type Error = T::Error;

    fn load(&self) -> Result<TemplateSet, Self::Error> {
        (**self).load()
    }

    fn persist(&mut self, set: &TemplateSet) -> Result<(), Self::Error> {
        (**self).persist(set)
    }
}

/// Trait for LLM provider operations
///
/// Implemented by the infrastructure layer (graphscribe-llm). Calls block;
/// async callers run them on a blocking thread.
pub trait LlmProvider {
    /// Error type for LLM operations
    type Error;

    /// Send a rendered prompt and return the raw reply text
    fn generate(&self, prompt: &str) -> Result<String, Self::Error>;

    /// Model identifier, for logs and reports
    fn model_name(&self) -> &str;
}

impl<T: LlmProvider + ?Sized> LlmProvider for Box<T> {
    type Error = T::Error;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        (**self).generate(prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// Variables bound when rendering a template
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptVariables {
    /// User text to extract from
    pub text: String,
    /// Schema domain name
    pub schema: String,
    /// Triplet patterns as given in the request
    pub allowed_triplets: Vec<String>,
    /// Source and target types found in the triplets
    pub allowed_node_types: Vec<String>,
    /// Relation types found in the triplets
    pub allowed_relations: Vec<String>,
}

impl PromptVariables {
    /// Bind `text` and everything derived from `schema`
    pub fn new(text: impl Into<String>, schema: &SchemaSpec) -> Self {
        Self {
            text: text.into(),
            schema: schema.name.clone(),
            allowed_triplets: schema.triplets.clone(),
            allowed_node_types: schema.allowed_node_types(),
            allowed_relations: schema.allowed_relations(),
        }
    }
}

/// Template syntax or evaluation failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderError {
    /// Engine-reported reason
    pub message: String,
}

impl RenderError {
    /// Create a render error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template error: {}", self.message)
    }
}

impl std::error::Error for RenderError {}

/// Pure rendering function behind one interface
///
/// Keeps the placeholder syntax swappable without touching template management.
pub trait TemplateRenderer: Send + Sync {
    /// Check that `source` is well-formed template text
    fn validate(&self, source: &str) -> Result<(), RenderError>;

    /// Render `source` with `vars`
    fn render(&self, source: &str, vars: &PromptVariables) -> Result<String, RenderError>;
}
