//! Core Extractor implementation

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::parser::parse_extraction;
use graphscribe_domain::traits::{LlmProvider, TemplateStore};
use graphscribe_domain::{ExtractionResult, PromptTemplate, SchemaSpec};
use graphscribe_templates::TemplateManager;
use std::fmt::Display;
use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, info};

/// Turns text into a node/relationship graph through a stored template and an LLM
pub struct Extractor<L, S>
where
    L: LlmProvider,
    S: TemplateStore,
{
    llm_provider: Arc<L>,
    templates: Arc<TemplateManager<S>>,
    config: ExtractorConfig,
}

impl<L, S> Extractor<L, S>
where
    L: LlmProvider + Send + Sync + 'static,
    S: TemplateStore,
    L::Error: Display,
    S::Error: Display,
{
    /// Create a new Extractor
    pub fn new(llm_provider: L, templates: Arc<TemplateManager<S>>, config: ExtractorConfig) -> Self {
        Self {
            llm_provider: Arc::new(llm_provider),
            templates,
            config,
        }
    }

    /// The template manager this extractor resolves templates from
    pub fn templates(&self) -> &Arc<TemplateManager<S>> {
        &self.templates
    }

    /// Extraction settings
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extract with the active template for `language`
    pub async fn extract(
        &self,
        text: &str,
        schema: &SchemaSpec,
        language: &str,
    ) -> Result<ExtractionResult, ExtractorError> {
        self.check_input(text, schema)?;
        let template = self.templates.active_for(language)?;
        self.run(&template, text, schema).await
    }

    /// Extract with an explicit template
    pub async fn extract_with_template(
        &self,
        template_id: &str,
        text: &str,
        schema: &SchemaSpec,
    ) -> Result<ExtractionResult, ExtractorError> {
        self.check_input(text, schema)?;
        let template = self.templates.get(template_id)?;
        self.run(&template, text, schema).await
    }

    /// Render `template`, send it to the LLM and return the raw reply
    pub async fn complete(
        &self,
        template: &PromptTemplate,
        text: &str,
        schema: &SchemaSpec,
    ) -> Result<String, ExtractorError> {
        self.check_input(text, schema)?;
        let prompt = self.templates.render(template, text, schema)?;
        debug!("Prompt length: {} chars", prompt.chars().count());

        let reply = timeout(self.config.extraction_timeout(), self.call_llm(prompt))
            .await
            .map_err(|_| ExtractorError::Timeout(self.config.extraction_timeout_secs))??;

        debug!("LLM reply length: {} chars", reply.chars().count());
        Ok(reply)
    }

    async fn run(
        &self,
        template: &PromptTemplate,
        text: &str,
        schema: &SchemaSpec,
    ) -> Result<ExtractionResult, ExtractorError> {
        info!(
            "Starting extraction with template {} ('{}' v{}), text length {}",
            template.id,
            template.name,
            template.version,
            text.chars().count()
        );

        let reply = self.complete(template, text, schema).await?;
        let result = parse_extraction(&reply)?;

        info!(
            "Extraction complete: {} nodes, {} relationships",
            result.nodes.len(),
            result.relationships.len()
        );
        Ok(result)
    }

    fn check_input(&self, text: &str, schema: &SchemaSpec) -> Result<(), ExtractorError> {
        if text.trim().is_empty() {
            return Err(ExtractorError::Validation("text must not be blank".to_string()));
        }
        let length = text.chars().count();
        if length > self.config.max_text_length {
            return Err(ExtractorError::Validation(format!(
                "text too long: {} chars (max: {})",
                length, self.config.max_text_length
            )));
        }
        schema
            .parse_triplets()
            .map_err(|e| ExtractorError::Validation(e.to_string()))?;
        Ok(())
    }

    async fn call_llm(&self, prompt: String) -> Result<String, ExtractorError> {
        let llm = Arc::clone(&self.llm_provider);

        // LlmProvider is blocking
        tokio::task::spawn_blocking(move || {
            llm.generate(&prompt)
                .map_err(|e| ExtractorError::Llm(e.to_string()))
        })
        .await
        .map_err(|e| ExtractorError::Llm(format!("Task join error: {}", e)))?
    }
}
