//! Template evaluation over sample texts

use crate::error::EvaluatorError;
use crate::scoring;
use crate::types::EvaluationRequest;
use graphscribe_domain::traits::{LlmProvider, TemplateStore};
use graphscribe_domain::{
    preview, EvaluationReport, Metric, MetricScore, PromptTemplate, SchemaSpec, TextEvaluation,
};
use graphscribe_extractor::parser::parse_reply_value;
use graphscribe_extractor::Extractor;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

/// Parse metric names; an empty list selects every metric
pub fn parse_metrics(names: &[String]) -> Result<Vec<Metric>, EvaluatorError> {
    if names.is_empty() {
        return Ok(Metric::ALL.to_vec());
    }
    let mut metrics = names
        .iter()
        .map(|name| name.parse::<Metric>().map_err(EvaluatorError::Validation))
        .collect::<Result<Vec<_>, _>>()?;
    metrics.sort();
    metrics.dedup();
    Ok(metrics)
}

/// Recommendation band for an overall score
pub fn recommendation(average: f64) -> &'static str {
    if average >= 0.8 {
        "excellent, keep using this template"
    } else if average >= 0.6 {
        "good, minor tuning may help"
    } else if average >= 0.4 {
        "fair, needs further optimization"
    } else {
        "poor, consider redesigning the template"
    }
}

/// Human-readable summary of a report
pub fn summarize(report: &EvaluationReport) -> String {
    let mut lines = vec![format!(
        "Evaluation of template '{}' (version {}):",
        report.template_name, report.template_version
    )];
    for (metric, score) in &report.evaluation_results {
        lines.push(format!("- {}: {:.2}", metric, score));
    }
    lines.push(format!(
        "- success rate: {:.2} ({}/{})",
        report.success_rate(),
        report.succeeded(),
        report.detailed_results.len()
    ));
    lines.push(format!(
        "Recommendation: {}",
        recommendation(report.average_score())
    ));
    lines.join("\n")
}

/// Scores a stored template against sample texts
///
/// Each text is rendered, sent to the LLM and scored on its own; a failure on
/// one text zeroes that text's scores and never aborts the run. The template
/// itself is only read.
pub struct Evaluator<L, S>
where
    L: LlmProvider,
    S: TemplateStore,
{
    extractor: Arc<Extractor<L, S>>,
}

impl<L, S> Evaluator<L, S>
where
    L: LlmProvider + Send + Sync + 'static,
    S: TemplateStore,
    L::Error: Display,
    S::Error: Display,
{
    /// Create an evaluator that calls the LLM through `extractor`
    pub fn new(extractor: Arc<Extractor<L, S>>) -> Self {
        Self { extractor }
    }

    /// Evaluate template `template_id`
    pub async fn evaluate(
        &self,
        template_id: &str,
        request: &EvaluationRequest,
    ) -> Result<EvaluationReport, EvaluatorError> {
        if request.test_texts.is_empty() {
            return Err(EvaluatorError::Validation(
                "test_texts must not be empty".to_string(),
            ));
        }
        let metrics = parse_metrics(&request.evaluation_metrics)?;
        let schema = &request.schema_info;
        schema
            .parse_triplets()
            .map_err(|e| EvaluatorError::Validation(e.to_string()))?;
        let template = self.extractor.templates().get(template_id)?;

        info!(
            "Evaluating template {} ('{}' v{}) on {} texts",
            template.id,
            template.name,
            template.version,
            request.test_texts.len()
        );

        let mut detailed_results = Vec::with_capacity(request.test_texts.len());
        for (index, text) in request.test_texts.iter().enumerate() {
            detailed_results.push(self.score_text(&template, index, text, schema, &metrics).await);
        }

        let count = detailed_results.len() as f64;
        let evaluation_results: BTreeMap<Metric, f64> = metrics
            .iter()
            .map(|metric| {
                let total: f64 = detailed_results
                    .iter()
                    .filter_map(|r| r.scores.get(metric))
                    .map(|s| s.score)
                    .sum();
                (*metric, total / count)
            })
            .collect();

        let mut report = EvaluationReport {
            template_id: template.id.clone(),
            template_name: template.name.clone(),
            template_version: template.version,
            evaluation_results,
            detailed_results,
            summary: String::new(),
        };
        report.summary = summarize(&report);

        info!(
            "Evaluation of template {} done: {}/{} texts scored, average {:.2}",
            report.template_id,
            report.succeeded(),
            report.detailed_results.len(),
            report.average_score()
        );
        Ok(report)
    }

    async fn score_text(
        &self,
        template: &PromptTemplate,
        index: usize,
        text: &str,
        schema: &SchemaSpec,
        metrics: &[Metric],
    ) -> TextEvaluation {
        let outcome = match self.extractor.complete(template, text, schema).await {
            Ok(reply) => parse_reply_value(&reply).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(value) => TextEvaluation {
                test_index: index,
                text: preview(text),
                scores: metrics
                    .iter()
                    .map(|m| (*m, scoring::score(*m, &value, text, schema)))
                    .collect(),
                error: None,
                extraction_result: Some(value),
            },
            Err(reason) => {
                warn!("Evaluation text {} failed: {}", index, reason);
                TextEvaluation {
                    test_index: index,
                    text: preview(text),
                    scores: metrics
                        .iter()
                        .map(|m| (*m, MetricScore::failed(&reason)))
                        .collect(),
                    error: Some(reason),
                    extraction_result: None,
                }
            }
        }
    }
}
