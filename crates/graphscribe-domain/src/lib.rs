//! GraphScribe Domain Layer
//!
//! Core data model and trait seams for GraphScribe, a service that manages
//! versioned prompt templates and turns LLM replies into node/relationship
//! graphs.
//!
//! ## Key Concepts
//!
//! - **PromptTemplate**: a versioned, parameterized prompt with a language tag
//! - **TemplateSet**: the persisted record set, including the per-language
//!   active slot
//! - **SchemaSpec**: the allowed `source-relation->target` triplets for one request
//! - **ExtractionResult**: the nodes and relationships parsed from an LLM reply
//! - **EvaluationReport**: heuristic scores for a template over sample texts
//!
//! ## Architecture
//!
//! Infrastructure (file storage, HTTP LLM providers, template engines) lives in
//! other crates and plugs in through the traits in [`traits`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod evaluation;
pub mod graph;
pub mod schema;
pub mod template;
pub mod traits;

// Re-exports for convenience
pub use error::ErrorKind;
pub use evaluation::{preview, EvaluationReport, Metric, MetricScore, TextEvaluation};
pub use graph::{ExtractionResult, GraphError, Node, Relationship};
pub use schema::{SchemaSpec, Triplet, TripletError};
pub use template::{unix_now, PromptTemplate, TemplateId, TemplateSet};
pub use traits::{LlmProvider, PromptVariables, RenderError, TemplateRenderer, TemplateStore};
