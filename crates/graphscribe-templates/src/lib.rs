//! GraphScribe Template Manager
//!
//! Owns the versioned prompt templates: creation, lookup, filtered listing,
//! partial updates, per-language activation, duplication, deletion and
//! rendering.
//!
//! # Architecture
//!
//! ```text
//! HTTP handlers ─┐
//!                ├─> TemplateManager ──> TemplateSet (in memory, one lock)
//! Extractor ─────┘         │                   │
//!                          │                   └──> TemplateStore::persist
//!                          └──> TemplateRenderer (JinjaRenderer)
//! ```
//!
//! # Examples
//!
//! ```
//! use graphscribe_store::MemoryStore;
//! use graphscribe_templates::{NewTemplate, TemplateManager};
//!
//! let manager = TemplateManager::open(MemoryStore::new()).unwrap();
//! let template = manager
//!     .create(NewTemplate {
//!         name: "basic".to_string(),
//!         language: "en".to_string(),
//!         content: "Extract entities from: {{ text }}".to_string(),
//!         ..NewTemplate::default()
//!     })
//!     .unwrap();
//!
//! manager.activate(&template.id).unwrap();
//! assert_eq!(manager.active_for("en").unwrap().id, template.id);
//! ```

#![warn(missing_docs)]

pub mod defaults;
pub mod error;
pub mod manager;
pub mod render;
pub mod types;

pub use error::ManagerError;
pub use manager::TemplateManager;
pub use render::JinjaRenderer;
pub use types::{
    LanguageStats, NewTemplate, TemplatePage, TemplateQuery, TemplateStatistics, TemplateUpdate,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
