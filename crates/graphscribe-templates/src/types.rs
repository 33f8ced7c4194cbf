//! Request and response types for template management

use graphscribe_domain::PromptTemplate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Default page size for listings
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Largest accepted page size
pub const MAX_PAGE_SIZE: usize = 100;

/// Fields for a new template
///
/// Missing strings deserialize as empty and are rejected by the manager, so
/// the caller gets one validation error shape for every bad field.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTemplate {
    /// Template name, unique per language
    #[serde(default)]
    pub name: String,
    /// Free-text description
    #[serde(default)]
    pub description: String,
    /// Language tag
    #[serde(default)]
    pub language: String,
    /// Template text
    #[serde(default)]
    pub content: String,
    /// Ordered tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Free-form metadata
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// Partial update; absent fields are left alone
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TemplateUpdate {
    /// New name
    #[serde(default)]
    pub name: Option<String>,
    /// New description
    #[serde(default)]
    pub description: Option<String>,
    /// New template text
    #[serde(default)]
    pub content: Option<String>,
    /// Replacement tag list
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Replacement metadata
    #[serde(default)]
    pub metadata: Option<Map<String, Value>>,
}

impl TemplateUpdate {
    /// True if no field is set
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.metadata.is_none()
    }
}

/// Listing filters and paging
#[derive(Debug, Clone, Default)]
pub struct TemplateQuery {
    /// Only this language
    pub language: Option<String>,
    /// Templates carrying at least one of these tags
    pub tags: Vec<String>,
    /// Case-insensitive substring of name or description
    pub keyword: Option<String>,
    /// 1-based page number (default 1)
    pub page: Option<usize>,
    /// Page size (default [`DEFAULT_PAGE_SIZE`], at most [`MAX_PAGE_SIZE`])
    pub page_size: Option<usize>,
}

impl TemplateQuery {
    /// True if `template` passes every filter
    pub fn matches(&self, template: &PromptTemplate) -> bool {
        if let Some(language) = &self.language {
            if &template.language != language {
                return false;
            }
        }
        if !self.tags.is_empty() && !template.has_any_tag(&self.tags) {
            return false;
        }
        match self.keyword.as_deref().map(str::trim) {
            Some(keyword) if !keyword.is_empty() => template.matches_keyword(keyword),
            _ => true,
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, Serialize)]
pub struct TemplatePage {
    /// Templates on this page, in insertion order
    pub templates: Vec<PromptTemplate>,
    /// Matches across all pages
    pub total: usize,
    /// Page number
    pub page: usize,
    /// Page size
    pub page_size: usize,
}

/// Per-language counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LanguageStats {
    /// Templates in the language
    pub total: usize,
    /// Active templates in the language (0 or 1)
    pub active: usize,
}

/// Summary counts over the whole template set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateStatistics {
    /// All templates
    pub total_templates: usize,
    /// Languages that have an active template
    pub active_templates: usize,
    /// Counts per language tag
    pub languages: BTreeMap<String, LanguageStats>,
    /// Templates created in the last 7 days
    pub recent_created: usize,
    /// Templates updated in the last 7 days
    pub recent_updated: usize,
}
