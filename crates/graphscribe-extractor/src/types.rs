//! Request types for extraction

use graphscribe_domain::SchemaSpec;
use serde::Deserialize;

/// An extraction request
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionRequest {
    /// Text to extract from
    pub text: String,

    /// Allowed triplets for this request
    #[serde(alias = "schema_info")]
    pub schema: SchemaSpec,

    /// Language whose active template is used (service default when absent)
    #[serde(default)]
    pub language: Option<String>,

    /// Explicit template, overriding the language's active template
    #[serde(default)]
    pub template_id: Option<String>,
}
