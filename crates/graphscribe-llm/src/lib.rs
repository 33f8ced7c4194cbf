//! GraphScribe LLM Provider Layer
//!
//! Implementations of the `LlmProvider` trait from `graphscribe-domain`.
//!
//! # Providers
//!
//! - `MockProvider`: Deterministic mock for testing
//! - `ChatCompletionsProvider`: Any OpenAI-compatible `/chat/completions` API
//!
//! # Examples
//!
//! ```
//! use graphscribe_llm::MockProvider;
//! use graphscribe_domain::traits::LlmProvider;
//!
//! let provider = MockProvider::new(r#"{"nodes": [], "relationships": []}"#);
//! let reply = provider.generate("rendered prompt").unwrap();
//! assert!(reply.contains("nodes"));
//! ```

#![warn(missing_docs)]

pub mod openai;

use graphscribe_domain::traits::LlmProvider as LlmProviderTrait;
use graphscribe_domain::ErrorKind;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

pub use openai::{ChatCompletionsConfig, ChatCompletionsProvider};

/// Errors that can occur during LLM operations
#[derive(Error, Debug)]
pub enum LlmError {
    /// Network or API communication error
    #[error("Communication error: {0}")]
    Communication(String),

    /// The request did not finish in time
    #[error("LLM request timed out after {0}s")]
    Timeout(u64),

    /// Response body does not have the expected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The provider was misconfigured
    #[error("Provider configuration error: {0}")]
    Configuration(String),

    /// Generic error
    #[error("LLM error: {0}")]
    Other(String),
}

impl LlmError {
    /// Every provider failure surfaces as an upstream error
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Upstream
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Error(String),
}

/// Mock LLM provider for deterministic testing
///
/// Returns pre-configured replies without making any network calls. Clones
/// share replies and the call log.
///
/// # Examples
///
/// ```
/// use graphscribe_llm::MockProvider;
/// use graphscribe_domain::traits::LlmProvider;
///
/// // Simple fixed response
/// let provider = MockProvider::new("Fixed response");
/// assert_eq!(provider.generate("any prompt").unwrap(), "Fixed response");
///
/// // Replies keyed on a prompt substring
/// let provider = MockProvider::default();
/// provider.add_response("Alice", "about Alice");
/// provider.add_error("Bob", "model overloaded");
/// assert_eq!(provider.generate("text: Alice").unwrap(), "about Alice");
/// assert!(provider.generate("text: Bob").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct MockProvider {
    default_reply: Arc<Mutex<MockReply>>,
    replies: Arc<Mutex<Vec<(String, MockReply)>>>,
    prompts: Arc<Mutex<Vec<String>>>,
    model: String,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockProvider {
    /// Create a MockProvider with a fixed reply for all prompts
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            default_reply: Arc::new(Mutex::new(MockReply::Text(response.into()))),
            replies: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
            model: "mock".to_string(),
        }
    }

    /// Create a MockProvider whose every call fails
    pub fn failing(message: impl Into<String>) -> Self {
        let provider = Self::default();
        *lock(&provider.default_reply) = MockReply::Error(message.into());
        provider
    }

    /// Reply with `response` whenever the prompt contains `needle`
    ///
    /// Rules are checked in insertion order; the first match wins.
    pub fn add_response(&self, needle: impl Into<String>, response: impl Into<String>) {
        lock(&self.replies).push((needle.into(), MockReply::Text(response.into())));
    }

    /// Fail with `message` whenever the prompt contains `needle`
    pub fn add_error(&self, needle: impl Into<String>, message: impl Into<String>) {
        lock(&self.replies).push((needle.into(), MockReply::Error(message.into())));
    }

    /// Number of times generate was called
    pub fn call_count(&self) -> usize {
        lock(&self.prompts).len()
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Most recent prompt
    pub fn last_prompt(&self) -> Option<String> {
        lock(&self.prompts).last().cloned()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new("Default mock response")
    }
}

impl LlmProviderTrait for MockProvider {
    type Error = LlmError;

    fn generate(&self, prompt: &str) -> Result<String, Self::Error> {
        lock(&self.prompts).push(prompt.to_string());

        let matched = lock(&self.replies)
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());
        let reply = matched.unwrap_or_else(|| lock(&self.default_reply).clone());

        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Error(message) => Err(LlmError::Other(message)),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
