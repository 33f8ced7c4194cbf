//! Evaluation request

use graphscribe_domain::SchemaSpec;
use serde::Deserialize;

/// Texts, schema and metrics for one evaluation run
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationRequest {
    /// Sample texts, scored independently
    #[serde(default)]
    pub test_texts: Vec<String>,

    /// Allowed triplets used for rendering and for the accuracy metric
    pub schema_info: SchemaSpec,

    /// Metric names; empty means all four
    #[serde(default)]
    pub evaluation_metrics: Vec<String>,
}
