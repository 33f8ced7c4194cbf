//! GraphScribe Extractor
//!
//! Converts unstructured text into a knowledge-graph fragment using a stored
//! prompt template and an LLM.
//!
//! # Architecture
//!
//! ```text
//! Text + Schema → TemplateManager (resolve, render) → LLM → strict parse → ExtractionResult
//! ```
//!
//! # Key Features
//!
//! - **Template resolution**: the language's active template, or an explicit one
//! - **Off-executor LLM calls**: the blocking provider runs on the blocking
//!   pool under a timeout
//! - **Strict parsing**: the reply is accepted whole or rejected with the raw
//!   text attached; there are no partial results
//!
//! # Example Usage
//!
//! ```no_run
//! use graphscribe_domain::SchemaSpec;
//! use graphscribe_extractor::{Extractor, ExtractorConfig};
//! use graphscribe_llm::MockProvider;
//! use graphscribe_store::MemoryStore;
//! use graphscribe_templates::TemplateManager;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let templates = Arc::new(TemplateManager::open(MemoryStore::new())?);
//! templates.seed_defaults()?;
//!
//! let llm = MockProvider::new(r#"{"nodes": [], "relationships": []}"#);
//! let extractor = Extractor::new(llm, templates, ExtractorConfig::default());
//!
//! let schema = SchemaSpec::new("org", vec!["Person-WORKS_AT->Company".to_string()]);
//! let graph = extractor.extract("Alice works at Acme.", &schema, "en").await?;
//! println!("{} nodes", graph.nodes.len());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
pub mod parser;
mod types;


pub use config::ExtractorConfig;
pub use error::ExtractorError;
pub use extractor::Extractor;
pub use types::ExtractionRequest;
