//! Evaluation reports for prompt templates

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Maximum characters of a test text echoed back in a report
pub const PREVIEW_CHARS: usize = 100;

/// Heuristic evaluation metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Share of source information units reflected in the output
    Completeness,
    /// Share of relationships whose relation type is allowed
    Accuracy,
    /// Share of output items that match the required JSON shape
    Consistency,
    /// Share of node names found in the source text
    Relevance,
}

impl Metric {
    /// All metrics, in report order
    pub const ALL: [Metric; 4] = [
        Metric::Completeness,
        Metric::Accuracy,
        Metric::Consistency,
        Metric::Relevance,
    ];

    /// Lowercase metric name
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Completeness => "completeness",
            Metric::Accuracy => "accuracy",
            Metric::Consistency => "consistency",
            Metric::Relevance => "relevance",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "completeness" => Ok(Metric::Completeness),
            "accuracy" => Ok(Metric::Accuracy),
            "consistency" => Ok(Metric::Consistency),
            "relevance" => Ok(Metric::Relevance),
            other => Err(format!("unknown evaluation metric: {}", other)),
        }
    }
}

/// One metric's score for one text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Score in [0, 1]
    pub score: f64,
    /// How the score was reached
    pub note: String,
}

impl MetricScore {
    /// Build a score, clamping into [0, 1]
    pub fn new(score: f64, note: impl Into<String>) -> Self {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        Self {
            score,
            note: note.into(),
        }
    }

    /// Zero score for a text whose extraction failed
    pub fn failed(reason: &str) -> Self {
        Self::new(0.0, format!("extraction failed: {}", reason))
    }
}

/// Scores for one test text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextEvaluation {
    /// Position of the text in the request
    pub test_index: usize,

    /// Start of the test text
    pub text: String,

    /// Per-metric scores
    pub scores: BTreeMap<Metric, MetricScore>,

    /// Failure note when extraction did not produce JSON
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Raw JSON returned by the LLM, when it parsed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_result: Option<Value>,
}

impl TextEvaluation {
    /// True if the text was scored rather than failed
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregated evaluation of one template version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Evaluated template
    pub template_id: String,

    /// Template name at evaluation time
    pub template_name: String,

    /// Template version at evaluation time
    pub template_version: u32,

    /// Mean score per metric over all texts (failed texts count as zero)
    pub evaluation_results: BTreeMap<Metric, f64>,

    /// Per-text details
    pub detailed_results: Vec<TextEvaluation>,

    /// Human-readable summary with a recommendation
    pub summary: String,
}

impl EvaluationReport {
    /// Number of texts that produced a scorable extraction
    pub fn succeeded(&self) -> usize {
        self.detailed_results.iter().filter(|r| r.succeeded()).count()
    }

    /// Fraction of texts that produced a scorable extraction
    pub fn success_rate(&self) -> f64 {
        if self.detailed_results.is_empty() {
            return 0.0;
        }
        self.succeeded() as f64 / self.detailed_results.len() as f64
    }

    /// Mean of the per-metric averages
    pub fn average_score(&self) -> f64 {
        if self.evaluation_results.is_empty() {
            return 0.0;
        }
        self.evaluation_results.values().sum::<f64>() / self.evaluation_results.len() as f64
    }
}

/// First [`PREVIEW_CHARS`] characters of `text`, with `...` when truncated
pub fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}
