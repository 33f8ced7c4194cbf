//! Integration tests for the HTTP API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use graphscribe_extractor::ExtractorConfig;
use graphscribe_llm::MockProvider;
use graphscribe_server::handlers::{
    create_router, AppState, DynLlm, DynStore, ErrorResponse, HealthResponse,
};
use graphscribe_store::MemoryStore;
use serde_json::{json, Value};
use tower::ServiceExt; // for oneshot

const XIAOMING_REPLY: &str = r#"```json
{
  "nodes": [
    {"id": "p1", "name": "小明", "type": "人物", "aliases": [], "definition": "", "attributes": {}},
    {"id": "s1", "name": "清华大学", "type": "学校", "aliases": ["清华"], "definition": "", "attributes": {}},
    {"id": "c1", "name": "字节跳动", "type": "公司", "aliases": [], "definition": "", "attributes": {}}
  ],
  "relationships": [
    {"source": "p1", "target": "s1", "type": "毕业院校"},
    {"source": "p1", "target": "c1", "type": "工作单位"}
  ]
}
```"#;

/// App over an in-memory store; `seed` adds the built-in zh/en templates
fn create_test_app(llm: MockProvider, seed: bool) -> Router {
    let store: DynStore = Box::new(MemoryStore::new());
    let llm: DynLlm = Box::new(llm);
    let state = AppState::new(store, llm, ExtractorConfig::default(), "zh").unwrap();
    if seed {
        state.templates.seed_defaults().unwrap();
    }
    create_router(state)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create(app: &Router, name: &str, language: &str, tags: &[&str]) -> Value {
    let (status, body) = send(
        app,
        "POST",
        "/prompts",
        Some(json!({
            "name": name,
            "description": format!("{} description", name),
            "language": language,
            "content": "Extract from {{ text }}",
            "tags": tags,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

fn error_kind(body: &Value) -> String {
    let error: ErrorResponse = serde_json::from_value(body.clone()).unwrap();
    error.error
}

fn xiaoming_request() -> Value {
    json!({
        "text": "小明毕业于清华大学，目前在字节跳动工作。",
        "schema": {"schema": "人物关系", "triplet": ["人物-毕业院校->学校", "人物-工作单位->公司"]}
    })
}

#[tokio::test]
async fn test_health_check_endpoint() {
    let app = create_test_app(MockProvider::new("{}"), true);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let health: HealthResponse = serde_json::from_value(body).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.template_count, 2);
}

#[tokio::test]
async fn test_create_and_get_template() {
    let app = create_test_app(MockProvider::new("{}"), false);

    let created = create(&app, "news", "en", &["news"]).await;
    assert_eq!(created["version"], 1);
    assert_eq!(created["active"], false);

    let id = created["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/prompts/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_create_rejections() {
    let app = create_test_app(MockProvider::new("{}"), false);
    create(&app, "news", "en", &[]).await;

    let (status, body) = send(
        &app,
        "POST",
        "/prompts",
        Some(json!({"name": "news", "language": "en", "content": "x {{ text }}"})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_kind(&body), "conflict");

    let (status, body) = send(
        &app,
        "POST",
        "/prompts",
        Some(json!({"name": "broken", "language": "en", "content": "{% for x in %}"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");

    let (status, body) = send(&app, "POST", "/prompts", Some(json!({"language": "en"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");
}

#[tokio::test]
async fn test_malformed_json_body_is_validation_error() {
    let app = create_test_app(MockProvider::new("{}"), false);

    let request = Request::builder()
        .method("POST")
        .uri("/prompts")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_template_is_not_found() {
    let app = create_test_app(MockProvider::new("{}"), false);

    let (status, body) = send(&app, "GET", "/prompts/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let app = create_test_app(MockProvider::new("{}"), false);
    create(&app, "a", "en", &["news"]).await;
    create(&app, "b", "en", &["finance"]).await;
    create(&app, "c", "zh", &["news"]).await;

    let (status, page) = send(&app, "GET", "/prompts?language=en", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["total"], 2);

    let (_, page) = send(&app, "GET", "/prompts?tags=news", None).await;
    let names: Vec<&str> = page["templates"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["a", "c"]);

    let (_, page) = send(&app, "GET", "/prompts?page=2&page_size=2", None).await;
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 2);
    assert_eq!(page["templates"].as_array().unwrap().len(), 1);
    assert_eq!(page["templates"][0]["name"], "c");

    let (status, _) = send(&app, "GET", "/prompts?page=abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_increments_version() {
    let app = create_test_app(MockProvider::new("{}"), false);
    let created = create(&app, "a", "en", &[]).await;
    let id = created["id"].as_str().unwrap();

    let (status, updated) = send(
        &app,
        "PUT",
        &format!("/prompts/{}", id),
        Some(json!({"description": "changed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["id"], created["id"]);
    assert_eq!(updated["version"], 2);
    assert_eq!(updated["description"], "changed");

    let (status, body) = send(&app, "PUT", &format!("/prompts/{}", id), Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");
}

#[tokio::test]
async fn test_activate_switches_language_slot() {
    let app = create_test_app(MockProvider::new("{}"), false);
    let first = create(&app, "first", "zh", &[]).await;
    let second = create(&app, "second", "zh", &[]).await;

    let (status, body) = send(&app, "GET", "/prompts/active/zh", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "no_active_template");

    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();
    send(&app, "POST", &format!("/prompts/{}/activate", first_id), None).await;
    let (status, activated) =
        send(&app, "POST", &format!("/prompts/{}/activate", second_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(activated["active"], true);

    let (_, active) = send(&app, "GET", "/prompts/active/zh", None).await;
    assert_eq!(active["id"], second["id"]);

    let (_, first_now) = send(&app, "GET", &format!("/prompts/{}", first_id), None).await;
    assert_eq!(first_now["active"], false);
}

#[tokio::test]
async fn test_delete_active_template_is_conflict() {
    let app = create_test_app(MockProvider::new("{}"), false);
    let active = create(&app, "active", "en", &[]).await;
    let spare = create(&app, "spare", "en", &[]).await;
    let active_id = active["id"].as_str().unwrap();
    let spare_id = spare["id"].as_str().unwrap();
    send(&app, "POST", &format!("/prompts/{}/activate", active_id), None).await;

    let (status, body) = send(&app, "DELETE", &format!("/prompts/{}", active_id), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(error_kind(&body), "conflict");

    let (status, deleted) = send(&app, "DELETE", &format!("/prompts/{}", spare_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["id"], spare["id"]);

    let (status, _) = send(&app, "GET", &format!("/prompts/{}", spare_id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_template() {
    let app = create_test_app(MockProvider::new("{}"), false);
    let original = create(&app, "original", "en", &["news"]).await;
    let id = original["id"].as_str().unwrap();
    send(&app, "POST", &format!("/prompts/{}/activate", id), None).await;

    let (status, copy) = send(
        &app,
        "POST",
        &format!("/prompts/{}/duplicate?new_name=copy", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_ne!(copy["id"], original["id"]);
    assert_eq!(copy["version"], 1);
    assert_eq!(copy["active"], false);
    assert_eq!(copy["content"], original["content"]);
    assert_eq!(copy["tags"], original["tags"]);

    let (status, _) = send(&app, "POST", &format!("/prompts/{}/duplicate", id), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/prompts/{}/duplicate?new_name=copy", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_statistics_endpoint() {
    let app = create_test_app(MockProvider::new("{}"), true);
    create(&app, "extra", "en", &[]).await;

    let (status, stats) = send(&app, "GET", "/prompts/statistics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_templates"], 3);
    assert_eq!(stats["active_templates"], 2);
    assert_eq!(stats["languages"]["en"]["total"], 2);
    assert_eq!(stats["languages"]["en"]["active"], 1);
}

#[tokio::test]
async fn test_extract_with_default_language() {
    let llm = MockProvider::new(XIAOMING_REPLY);
    let app = create_test_app(llm.clone(), true);

    let (status, graph) = send(&app, "POST", "/extract", Some(xiaoming_request())).await;
    assert_eq!(status, StatusCode::OK, "{}", graph);
    assert_eq!(graph["nodes"].as_array().unwrap().len(), 3);
    assert_eq!(graph["relationships"].as_array().unwrap().len(), 2);

    let prompt = llm.last_prompt().unwrap();
    assert!(prompt.contains("小明毕业于清华大学"));
    assert!(prompt.contains("人物-毕业院校->学校"));
}

#[tokio::test]
async fn test_extract_with_explicit_template() {
    let llm = MockProvider::new(XIAOMING_REPLY);
    let app = create_test_app(llm.clone(), false);
    let template = create(&app, "custom", "fr", &[]).await;

    let mut request = xiaoming_request();
    request["template_id"] = template["id"].clone();
    let (status, _) = send(&app, "POST", "/extract", Some(request)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(llm.last_prompt().unwrap().starts_with("Extract from"));
}

#[tokio::test]
async fn test_extract_without_active_template() {
    let app = create_test_app(MockProvider::new(XIAOMING_REPLY), true);

    let mut request = xiaoming_request();
    request["language"] = json!("fr");
    let (status, body) = send(&app, "POST", "/extract", Some(request)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "no_active_template");
}

#[tokio::test]
async fn test_extract_parse_failure_returns_raw_reply() {
    let app = create_test_app(MockProvider::new("Sorry, I cannot help."), true);

    let (status, body) = send(&app, "POST", "/extract", Some(xiaoming_request())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    let error: ErrorResponse = serde_json::from_value(body).unwrap();
    assert_eq!(error.error, "extraction_parse");
    assert_eq!(error.raw_reply.as_deref(), Some("Sorry, I cannot help."));
}

#[tokio::test]
async fn test_extract_upstream_failure() {
    let app = create_test_app(MockProvider::failing("connection refused"), true);

    let (status, body) = send(&app, "POST", "/extract", Some(xiaoming_request())).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(error_kind(&body), "upstream");
}

#[tokio::test]
async fn test_extract_rejects_blank_text() {
    let app = create_test_app(MockProvider::new(XIAOMING_REPLY), true);

    let mut request = xiaoming_request();
    request["text"] = json!("   ");
    let (status, body) = send(&app, "POST", "/extract", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_kind(&body), "validation");
}

#[tokio::test]
async fn test_evaluate_template() {
    let llm = MockProvider::new(XIAOMING_REPLY);
    llm.add_error("第二段", "rate limited");
    let app = create_test_app(llm, true);

    let (_, active) = send(&app, "GET", "/prompts/active/zh", None).await;
    let id = active["id"].as_str().unwrap();

    let (status, report) = send(
        &app,
        "POST",
        &format!("/prompts/{}/evaluate", id),
        Some(json!({
            "test_texts": ["小明毕业于清华大学，目前在字节跳动工作。", "第二段文本"],
            "schema_info": {"schema": "人物关系", "triplet": ["人物-毕业院校->学校", "人物-工作单位->公司"]},
            "evaluation_metrics": ["accuracy", "relevance"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", report);
    assert_eq!(report["template_id"], active["id"]);
    assert_eq!(report["detailed_results"].as_array().unwrap().len(), 2);
    assert_eq!(report["evaluation_results"].as_object().unwrap().len(), 2);
    assert_eq!(report["evaluation_results"]["accuracy"], 0.5);

    let (_, after) = send(&app, "GET", &format!("/prompts/{}", id), None).await;
    assert_eq!(after, active);
}

#[tokio::test]
async fn test_evaluate_rejections() {
    let app = create_test_app(MockProvider::new(XIAOMING_REPLY), true);
    let (_, active) = send(&app, "GET", "/prompts/active/en", None).await;
    let id = active["id"].as_str().unwrap();
    let schema = json!({"schema": "s", "triplet": []});

    let (status, _) = send(
        &app,
        "POST",
        &format!("/prompts/{}/evaluate", id),
        Some(json!({"test_texts": ["text"], "schema_info": schema, "evaluation_metrics": ["fluency"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/prompts/{}/evaluate", id),
        Some(json!({"test_texts": [], "schema_info": schema})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        "POST",
        "/prompts/missing/evaluate",
        Some(json!({"test_texts": ["text"], "schema_info": schema})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_kind(&body), "not_found");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_one_active_template() {
    let app = create_test_app(MockProvider::new("{}"), false);
    let mut ids = Vec::new();
    for i in 0..4 {
        let created = create(&app, &format!("t{}", i), "zh", &[]).await;
        ids.push(created["id"].as_str().unwrap().to_string());
    }

    let mut tasks = tokio::task::JoinSet::new();
    for round in 0..32 {
        let app = app.clone();
        let id = ids[round % ids.len()].clone();
        tasks.spawn(async move {
            let (activated, _) = send(&app, "POST", &format!("/prompts/{}/activate", id), None).await;
            let (updated, _) = send(
                &app,
                "PUT",
                &format!("/prompts/{}", id),
                Some(json!({"description": format!("round {}", round)})),
            )
            .await;
            (activated, updated)
        });
    }
    while let Some(joined) = tasks.join_next().await {
        let (activated, updated) = joined.unwrap();
        assert_eq!(activated, StatusCode::OK);
        assert_eq!(updated, StatusCode::OK);
    }

    let (_, page) = send(&app, "GET", "/prompts?language=zh", None).await;
    let templates = page["templates"].as_array().unwrap();
    let active = templates.iter().filter(|t| t["active"] == true).count();
    assert_eq!(active, 1);
    let bumps: u64 = templates
        .iter()
        .map(|t| t["version"].as_u64().unwrap() - 1)
        .sum();
    assert_eq!(bumps, 32);
}
