//! GraphScribe Server
//!
//! HTTP JSON API over the template manager, the extraction façade and the
//! evaluator. Templates live in one JSON file; extraction goes to an
//! OpenAI-compatible chat completions endpoint.

#![warn(missing_docs)]

pub mod config;
pub mod handlers;

use config::{ConfigError, ServerConfig};
use graphscribe_llm::{ChatCompletionsProvider, LlmError};
use graphscribe_store::JsonFileStore;
use graphscribe_templates::ManagerError;
use handlers::{create_router, AppState, DynLlm, DynStore};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Server error
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Template set could not be opened or seeded
    #[error("Template store error: {0}")]
    Templates(#[from] ManagerError),

    /// LLM provider could not be built
    #[error("LLM provider error: {0}")]
    Llm(#[from] LlmError),

    /// Server binding error
    #[error("Failed to bind server: {0}")]
    Bind(#[from] std::io::Error),

    /// Server error
    #[error("Server error: {0}")]
    Server(String),
}

/// Install the global subscriber; `RUST_LOG` wins over the `info` default
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the application state described by `config`
///
/// Opens the template file, seeds the built-in templates into an empty store
/// when `seed_defaults` is set, and connects the chat completions provider.
pub fn build_state(config: &ServerConfig) -> Result<AppState, ServerError> {
    let store: DynStore = Box::new(JsonFileStore::new(&config.storage_file));
    let llm: DynLlm = Box::new(ChatCompletionsProvider::new(config.chat_completions())?);
    let state = AppState::new(
        store,
        llm,
        config.extractor.clone(),
        config.default_language.clone(),
    )?;

    if config.seed_defaults {
        state.templates.seed_defaults()?;
    }
    Ok(state)
}

/// Start the HTTP server and serve until it fails
pub async fn start_server(config: ServerConfig) -> Result<(), ServerError> {
    info!("Starting GraphScribe");
    info!("Bind address: {}", config.bind_addr());
    info!("Template file: {}", config.storage_file.display());
    info!("LLM: {} at {}", config.llm.model, config.llm.base_url);

    let state = build_state(&config)?;
    info!("Loaded {} templates", state.templates.len()?);

    let app = create_router(state);

    let listener = TcpListener::bind(&config.bind_addr()).await?;
    info!("GraphScribe listening on {}", config.bind_addr());

    axum::serve(listener, app)
        .await
        .map_err(|e| ServerError::Server(e.to_string()))?;

    Ok(())
}
