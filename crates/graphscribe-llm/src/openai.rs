//! OpenAI-compatible chat completions provider
//!
//! Sends the rendered prompt as a single system message to
//! `POST {base_url}/chat/completions` and returns
//! `choices[0].message.content`.
//!
//! # Features
//!
//! - Async HTTP communication through `reqwest`
//! - Per-request timeout
//! - At most one retry, and only for transient failures (connect errors,
//!   timeouts, HTTP 429 and 5xx)
//!
//! # Examples
//!
//! ```no_run
//! use graphscribe_llm::{ChatCompletionsConfig, ChatCompletionsProvider};
//!
//! let config = ChatCompletionsConfig {
//!     model: "my-model".to_string(),
//!     api_key: std::env::var("ARK_API_KEY").ok(),
//!     ..ChatCompletionsConfig::default()
//! };
//! let provider = ChatCompletionsProvider::new(config).unwrap();
//! ```

use crate::LlmError;
use graphscribe_domain::traits::LlmProvider as LlmProviderTrait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Default timeout for one HTTP request
pub const DEFAULT_TIMEOUT_SECS: u64 = 50;

/// Upper bound on retries
pub const MAX_RETRIES_CAP: u32 = 1;

/// Pause before the retry, in seconds
pub const RETRY_DELAY_SECS: u64 = 1;

const RETRY_DELAY: Duration = Duration::from_secs(RETRY_DELAY_SECS);

/// Connection settings for [`ChatCompletionsProvider`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatCompletionsConfig {
    /// API base URL, without the `/chat/completions` suffix
    pub base_url: String,
    /// Model or endpoint identifier
    pub model: String,
    /// Bearer token, if the API wants one
    pub api_key: Option<String>,
    /// Timeout for one HTTP request
    pub timeout_secs: u64,
    /// Retries after a transient failure (capped at [`MAX_RETRIES_CAP`])
    pub max_retries: u32,
}

impl Default for ChatCompletionsConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: String::new(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: MAX_RETRIES_CAP,
        }
    }
}

/// Provider for OpenAI-compatible chat completion APIs
pub struct ChatCompletionsProvider {
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout_secs: u64,
    max_retries: u32,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

enum Attempt {
    Done(String),
    Retryable(LlmError),
    Fatal(LlmError),
}

/// True for statuses worth one more try
fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl ChatCompletionsProvider {
    /// Create a provider
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] for an empty model or base URL, or
    /// if the HTTP client cannot be built.
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, LlmError> {
        if config.model.trim().is_empty() {
            return Err(LlmError::Configuration("model must not be empty".to_string()));
        }
        let base_url = config.base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(LlmError::Configuration("base_url must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Configuration(format!("cannot build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!("{}/chat/completions", base_url),
            model: config.model,
            api_key: config.api_key.filter(|k| !k.is_empty()),
            timeout_secs: config.timeout_secs,
            max_retries: config.max_retries.min(MAX_RETRIES_CAP),
            client,
        })
    }

    /// Full URL requests are posted to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `prompt` as a system message and return the reply text
    ///
    /// # Errors
    ///
    /// - [`LlmError::Timeout`] or [`LlmError::Communication`] when the API is
    ///   unreachable after the allowed retry
    /// - [`LlmError::RateLimitExceeded`] when the API keeps answering 429
    /// - [`LlmError::InvalidResponse`] when the body has no reply text
    pub async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        debug!(
            "Sending prompt of {} chars to {} ({})",
            prompt.chars().count(),
            self.endpoint,
            self.model
        );

        let mut attempt = 0;
        loop {
            match self.attempt(prompt).await {
                Attempt::Done(content) => {
                    debug!("Received reply of {} chars", content.chars().count());
                    return Ok(content);
                }
                Attempt::Fatal(e) => return Err(e),
                Attempt::Retryable(e) if attempt < self.max_retries => {
                    attempt += 1;
                    warn!("Transient LLM failure, retrying once: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Attempt::Retryable(e) => return Err(e),
            }
        }
    }

    async fn attempt(&self, prompt: &str) -> Attempt {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "system",
                content: prompt,
            }],
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => return Attempt::Retryable(LlmError::Timeout(self.timeout_secs)),
            Err(e) if e.is_connect() => {
                return Attempt::Retryable(LlmError::Communication(format!("Request failed: {}", e)))
            }
            Err(e) => return Attempt::Fatal(LlmError::Communication(format!("Request failed: {}", e))),
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let error = if status == StatusCode::TOO_MANY_REQUESTS {
                LlmError::RateLimitExceeded
            } else {
                LlmError::Communication(format!("HTTP {}: {}", status, error_text))
            };
            return if is_transient_status(status) {
                Attempt::Retryable(error)
            } else {
                Attempt::Fatal(error)
            };
        }

        let parsed = match response.json::<ChatResponse>().await {
            Ok(parsed) => parsed,
            Err(e) if e.is_timeout() => return Attempt::Retryable(LlmError::Timeout(self.timeout_secs)),
            Err(e) => {
                return Attempt::Fatal(LlmError::InvalidResponse(format!(
                    "Failed to parse response: {}",
                    e
                )))
            }
        };

        match parsed.choices.into_iter().next() {
            Some(choice) => Attempt::Done(choice.message.content.unwrap_or_default().trim().to_string()),
            None => Attempt::Fatal(LlmError::InvalidResponse("response has no choices".to_string())),
        }
    }
}

impl LlmProviderTrait for ChatCompletionsProvider {
    type Error = LlmError;

    /// Blocking wrapper around [`ChatCompletionsProvider::complete`]
    ///
    /// Inside a Tokio runtime this must run on a blocking thread
    /// (`spawn_blocking`); outside one a private runtime is started.
    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle.block_on(self.complete(prompt)),
            Err(_) => tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| LlmError::Other(format!("cannot start runtime: {}", e)))?
                .block_on(self.complete(prompt)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
