//! HTTP request handlers.
//!
//! Template management under `/prompts`, graph extraction under `/extract`,
//! and a health check. Every failure becomes a JSON [`ErrorResponse`] whose
//! status code follows the error's [`ErrorKind`].

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router as AxumRouter,
};
use graphscribe_domain::{
    ErrorKind, EvaluationReport, ExtractionResult, LlmProvider, PromptTemplate, TemplateStore,
};
use graphscribe_evaluator::{EvaluationRequest, Evaluator, EvaluatorError};
use graphscribe_extractor::{ExtractionRequest, Extractor, ExtractorConfig, ExtractorError};
use graphscribe_llm::LlmError;
use graphscribe_store::StoreError;
use graphscribe_templates::{
    ManagerError, NewTemplate, TemplateManager, TemplatePage, TemplateQuery, TemplateStatistics,
    TemplateUpdate,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// Template store behind the running service
pub type DynStore = Box<dyn TemplateStore<Error = StoreError> + Send>;

/// LLM provider behind the running service
pub type DynLlm = Box<dyn LlmProvider<Error = LlmError> + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Template CRUD and activation
    pub templates: Arc<TemplateManager<DynStore>>,
    /// Extraction façade
    pub extractor: Arc<Extractor<DynLlm, DynStore>>,
    /// Template scoring
    pub evaluator: Arc<Evaluator<DynLlm, DynStore>>,
    /// Language used when an extraction request names none
    pub default_language: String,
}

impl AppState {
    /// Open the template set in `store` and wire the extractor and evaluator to it
    pub fn new(
        store: DynStore,
        llm: DynLlm,
        extractor_config: ExtractorConfig,
        default_language: impl Into<String>,
    ) -> Result<Self, ManagerError> {
        let templates = Arc::new(TemplateManager::open(store)?);
        let extractor = Arc::new(Extractor::new(llm, Arc::clone(&templates), extractor_config));
        let evaluator = Arc::new(Evaluator::new(Arc::clone(&extractor)));
        Ok(Self {
            templates,
            extractor,
            evaluator,
            default_language: default_language.into(),
        })
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "ok" when the service answers
    pub status: String,
    /// Stored templates
    pub template_count: usize,
}

/// Error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error kind, e.g. "not_found"
    pub error: String,
    /// Human-readable detail
    pub message: String,
    /// Unparseable LLM output, for extraction parse failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_reply: Option<String>,
}

/// Listing query string; `tags` is comma-separated
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    /// Only this language
    pub language: Option<String>,
    /// Any of these tags
    pub tags: Option<String>,
    /// Substring of name or description
    pub keyword: Option<String>,
    /// 1-based page
    pub page: Option<usize>,
    /// Page size
    pub page_size: Option<usize>,
}

impl From<ListParams> for TemplateQuery {
    fn from(params: ListParams) -> Self {
        let tags = params
            .tags
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|tag| !tag.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        TemplateQuery {
            language: params.language.filter(|l| !l.trim().is_empty()),
            tags,
            keyword: params.keyword,
            page: params.page,
            page_size: params.page_size,
        }
    }
}

/// Duplicate query string
#[derive(Debug, Deserialize)]
pub struct DuplicateParams {
    /// Name of the copy
    #[serde(default)]
    pub new_name: String,
}

/// Application error type
#[derive(Debug)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    raw_reply: Option<String>,
}

impl AppError {
    /// Error of `kind` with `message`
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            raw_reply: None,
        }
    }

    /// Error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// HTTP status for an error kind
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound | ErrorKind::NoActiveTemplate => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::ExtractionParse | ErrorKind::Upstream => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        if status.is_server_error() {
            error!("{}: {}", self.kind, self.message);
        } else {
            warn!("{}: {}", self.kind, self.message);
        }

        let body = Json(ErrorResponse {
            error: self.kind.as_str().to_string(),
            message: self.message,
            raw_reply: self.raw_reply,
        });
        (status, body).into_response()
    }
}

impl From<ManagerError> for AppError {
    fn from(e: ManagerError) -> Self {
        AppError::new(e.kind(), e.to_string())
    }
}

impl From<ExtractorError> for AppError {
    fn from(e: ExtractorError) -> Self {
        let mut app = AppError::new(e.kind(), e.to_string());
        app.raw_reply = e.raw_reply().map(str::to_string);
        app
    }
}

impl From<EvaluatorError> for AppError {
    fn from(e: EvaluatorError) -> Self {
        AppError::new(e.kind(), e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::new(ErrorKind::Validation, e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::new(ErrorKind::Validation, e.body_text())
    }
}

/// Run a template-manager call on the blocking pool
///
/// Manager calls lock a `std::sync::Mutex`; mutations also fsync the
/// template file.
async fn with_templates<T, F>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&TemplateManager<DynStore>) -> Result<T, ManagerError> + Send + 'static,
    T: Send + 'static,
{
    let templates = Arc::clone(&state.templates);
    tokio::task::spawn_blocking(move || f(&templates))
        .await
        .map_err(|e| AppError::new(ErrorKind::Internal, format!("Task join error: {}", e)))?
        .map_err(AppError::from)
}

/// GET /health
async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        template_count: with_templates(&state, |t| t.len()).await?,
    }))
}

/// POST /extract - Extract a graph with the active or an explicit template
async fn extract(
    State(state): State<AppState>,
    payload: Result<Json<ExtractionRequest>, JsonRejection>,
) -> Result<Json<ExtractionResult>, AppError> {
    let Json(request) = payload?;

    let result = match request.template_id.as_deref() {
        Some(template_id) => {
            state
                .extractor
                .extract_with_template(template_id, &request.text, &request.schema)
                .await?
        }
        None => {
            let language = request
                .language
                .as_deref()
                .unwrap_or(state.default_language.as_str());
            state
                .extractor
                .extract(&request.text, &request.schema, language)
                .await?
        }
    };

    Ok(Json(result))
}

/// POST /prompts - Create a template
async fn create_template(
    State(state): State<AppState>,
    payload: Result<Json<NewTemplate>, JsonRejection>,
) -> Result<(StatusCode, Json<PromptTemplate>), AppError> {
    let Json(new) = payload?;
    let template = with_templates(&state, move |t| t.create(new)).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /prompts - Filtered, paged listing
async fn list_templates(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<TemplatePage>, AppError> {
    let Query(params) = params?;
    let query: TemplateQuery = params.into();
    let page = with_templates(&state, move |t| t.list(&query)).await?;
    Ok(Json(page))
}

/// GET /prompts/:id
async fn get_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, AppError> {
    Ok(Json(with_templates(&state, move |t| t.get(&id)).await?))
}

/// PUT /prompts/:id - Partial update, bumps the version
async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<TemplateUpdate>, JsonRejection>,
) -> Result<Json<PromptTemplate>, AppError> {
    let Json(update) = payload?;
    Ok(Json(with_templates(&state, move |t| t.update(&id, update)).await?))
}

/// DELETE /prompts/:id - Returns the removed template
async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, AppError> {
    Ok(Json(with_templates(&state, move |t| t.delete(&id)).await?))
}

/// POST /prompts/:id/activate
async fn activate_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PromptTemplate>, AppError> {
    Ok(Json(with_templates(&state, move |t| t.activate(&id)).await?))
}

/// POST /prompts/:id/duplicate?new_name=...
async fn duplicate_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<DuplicateParams>, QueryRejection>,
) -> Result<(StatusCode, Json<PromptTemplate>), AppError> {
    let Query(params) = params?;
    let copy = with_templates(&state, move |t| t.duplicate(&id, &params.new_name)).await?;
    Ok((StatusCode::CREATED, Json(copy)))
}

/// POST /prompts/:id/evaluate
async fn evaluate_template(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<EvaluationRequest>, JsonRejection>,
) -> Result<Json<EvaluationReport>, AppError> {
    let Json(request) = payload?;
    let report = state.evaluator.evaluate(&id, &request).await?;
    Ok(Json(report))
}

/// GET /prompts/statistics
async fn template_statistics(
    State(state): State<AppState>,
) -> Result<Json<TemplateStatistics>, AppError> {
    Ok(Json(with_templates(&state, |t| t.statistics()).await?))
}

/// GET /prompts/active/:language
async fn active_template(
    State(state): State<AppState>,
    Path(language): Path<String>,
) -> Result<Json<PromptTemplate>, AppError> {
    Ok(Json(with_templates(&state, move |t| t.active_for(&language)).await?))
}

/// Create the axum router with all routes
pub fn create_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health_check))
        .route("/extract", post(extract))
        .route("/prompts", post(create_template).get(list_templates))
        .route("/prompts/statistics", get(template_statistics))
        .route("/prompts/active/:language", get(active_template))
        .route(
            "/prompts/:id",
            get(get_template).put(update_template).delete(delete_template),
        )
        .route("/prompts/:id/activate", post(activate_template))
        .route("/prompts/:id/duplicate", post(duplicate_template))
        .route("/prompts/:id/evaluate", post(evaluate_template))
        .with_state(state)
}
