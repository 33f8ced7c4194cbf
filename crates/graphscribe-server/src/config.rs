//! Configuration file parsing for the server.
//!
//! Loads bind address, storage location, LLM connection and extraction limits
//! from a TOML file. Every key has a default, so an empty file is a valid
//! configuration. `LLM_API_BASE_URL` and `MODEL_NAME` override the `[llm]`
//! section.

use graphscribe_extractor::ExtractorConfig;
use graphscribe_llm::openai::{DEFAULT_TIMEOUT_SECS, MAX_RETRIES_CAP, RETRY_DELAY_SECS};
use graphscribe_llm::ChatCompletionsConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `llm.base_url`
pub const BASE_URL_ENV: &str = "LLM_API_BASE_URL";

/// Environment variable overriding `llm.model`
pub const MODEL_ENV: &str = "MODEL_NAME";

/// Server configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse TOML
    #[error("Failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value is out of range or missing
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration loaded from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub bind_address: String,

    /// Bind port
    pub bind_port: u16,

    /// JSON file holding the templates
    pub storage_file: PathBuf,

    /// Language used by `/extract` when the request names none
    pub default_language: String,

    /// Create the built-in templates when the store is empty
    pub seed_defaults: bool,

    /// LLM connection
    pub llm: LlmSettings,

    /// Extraction limits
    pub extractor: ExtractorConfig,
}

/// `[llm]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// API base URL, without `/chat/completions`
    pub base_url: String,

    /// Model or endpoint identifier
    pub model: String,

    /// Name of the environment variable holding the API key
    pub api_key_env: String,

    /// Per-request HTTP timeout (seconds)
    pub timeout_secs: u64,

    /// Retries after a transient failure (0 or 1)
    pub max_retries: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            bind_port: 8000,
            storage_file: PathBuf::from("prompt_templates.json"),
            default_language: "zh".to_string(),
            seed_defaults: true,
            llm: LlmSettings::default(),
            extractor: ExtractorConfig::default(),
        }
    }
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://ark.cn-beijing.volces.com/api/v3".to_string(),
            model: "ep-20250716102319-wdqpt".to_string(),
            api_key_env: "ARK_API_KEY".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: MAX_RETRIES_CAP,
        }
    }
}

impl ServerConfig {
    /// Load, apply environment overrides and validate
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&contents)?;
        config.apply_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(MODEL_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, for running without a file
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_overrides(
            std::env::var(BASE_URL_ENV).ok(),
            std::env::var(MODEL_ENV).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document without validating it
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Replace the LLM base URL and model with non-blank overrides
    pub fn apply_overrides(&mut self, base_url: Option<String>, model: Option<String>) {
        if let Some(base_url) = base_url.filter(|v| !v.trim().is_empty()) {
            self.llm.base_url = base_url;
        }
        if let Some(model) = model.filter(|v| !v.trim().is_empty()) {
            self.llm.model = model;
        }
    }

    /// Check ranges and required values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_language.trim().is_empty() {
            return Err(ConfigError::Invalid("default_language must not be empty".to_string()));
        }
        if self.llm.model.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.model must not be empty".to_string()));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.base_url must not be empty".to_string()));
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::Invalid("llm.timeout_secs must be greater than 0".to_string()));
        }
        if self.llm.max_retries > MAX_RETRIES_CAP {
            return Err(ConfigError::Invalid(format!(
                "llm.max_retries must be at most {}",
                MAX_RETRIES_CAP
            )));
        }
        self.extractor.validate().map_err(ConfigError::Invalid)?;

        let worst_case = self.llm_worst_case_secs();
        if self.extractor.extraction_timeout_secs < worst_case {
            return Err(ConfigError::Invalid(format!(
                "extractor.extraction_timeout_secs ({}) is shorter than the LLM worst case of {}s \
                 (timeout_secs per attempt, max_retries retries, {}s pause)",
                self.extractor.extraction_timeout_secs, worst_case, RETRY_DELAY_SECS
            )));
        }
        Ok(())
    }

    /// Longest one LLM call can take, retry included
    pub fn llm_worst_case_secs(&self) -> u64 {
        let retries = u64::from(self.llm.max_retries);
        (retries + 1) * self.llm.timeout_secs + retries * RETRY_DELAY_SECS
    }

    /// Get the full bind address (address:port)
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.bind_port)
    }

    /// Provider settings, with the API key read from `llm.api_key_env`
    pub fn chat_completions(&self) -> ChatCompletionsConfig {
        let api_key = std::env::var(&self.llm.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty());
        ChatCompletionsConfig {
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            api_key,
            timeout_secs: self.llm.timeout_secs,
            max_retries: self.llm.max_retries,
        }
    }
}
