//! End-to-end API tests over the in-memory collaborator set

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use icebox_core::{ContextId, DiagnosticContext, ExperimentStatus, UserId};
use icebox_model::{GenerationBackend, GenerationError, GenerationRequest};
use icebox_pipeline::{GenerationPipeline, LifecycleService};
use icebox_service::{build_router, AppState};
use icebox_store::memory::{
    InMemoryContextStore, InMemoryExperimentStore, InMemoryGoalStore, StaticSessionProvider,
};
use icebox_store::ExperimentStore;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const TOKEN: &str = "test-token";

/// Backend returning a fixed completion, or a fixed upstream failure
struct ScriptedBackend {
    output: Result<String, String>,
}

impl ScriptedBackend {
    fn ok(output: impl Into<String>) -> Self {
        Self {
            output: Ok(output.into()),
        }
    }

    fn failing(message: impl Into<String>) -> Self {
        Self {
            output: Err(message.into()),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String, GenerationError> {
        match &self.output {
            Ok(text) => Ok(text.clone()),
            Err(message) => Err(GenerationError::Upstream(message.clone())),
        }
    }
}

struct Harness {
    app: Router,
    user: UserId,
    contexts: Arc<InMemoryContextStore>,
    experiments: Arc<InMemoryExperimentStore>,
}

fn harness(backend: ScriptedBackend) -> Harness {
    let sessions = Arc::new(StaticSessionProvider::new());
    let user = UserId::new();
    sessions.allow(TOKEN, user);

    let contexts = Arc::new(InMemoryContextStore::new());
    let goals = Arc::new(InMemoryGoalStore::new());
    let experiments = Arc::new(InMemoryExperimentStore::new());

    let pipeline = Arc::new(GenerationPipeline::new(
        contexts.clone(),
        goals,
        experiments.clone(),
        Arc::new(backend),
    ));
    let lifecycle = Arc::new(LifecycleService::new(experiments.clone()));
    let state = AppState::new(
        sessions,
        contexts.clone(),
        experiments.clone(),
        pipeline,
        lifecycle,
    );

    Harness {
        app: build_router(state),
        user,
        contexts,
        experiments,
    }
}

fn authed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {TOKEN}"));
    match body {
        Some(value) => builder
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn compliant_output() -> String {
    json!({
        "strategic_vision": "focus on hook quality",
        "experiments": [
            {
                "title": "Testar hook A",
                "hypothesis": "Um hook direto reduz o CPA",
                "metric": "CPA",
                "target": 45.0,
                "cutoff_line": "pausar se CPA > 60 por 3 dias",
                "ice_score": 8
            },
            {
                "title": "Testar criativo B",
                "metric": "CTR",
                "ice_score": 6
            }
        ]
    })
    .to_string()
}

#[tokio::test]
async fn health_is_open() {
    let h = harness(ScriptedBackend::ok(""));
    let response = h
        .app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn generate_requires_a_session() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    let request = Request::post("/api/generate-experiments")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({"structuredAnalysis": {}, "goal_id": 1}).to_string(),
        ))
        .unwrap();
    let response = h.app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn generate_persists_and_returns_batch() {
    let h = harness(ScriptedBackend::ok(format!(
        "```json\n{}\n```",
        compliant_output()
    )));

    let response = h
        .app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({
                "structuredAnalysis": {"diagnostico": "CPA alto"},
                "goal_id": 7,
                "targetMetric": "CPA"
            })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["strategic_vision"], "focus on hook quality");
    let experiments = body["experiments"].as_array().unwrap();
    assert_eq!(experiments.len(), 2);
    assert_eq!(experiments[0]["hypothesis"], "Um hook direto reduz o CPA");
    assert_eq!(experiments[0]["status"], "backlog");
    // hypothesis falls back to the title when absent
    assert_eq!(experiments[1]["hypothesis"], "Testar criativo B");

    let stored = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn generate_without_goal_is_bad_request() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    let response = h
        .app
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("goal"));
}

#[tokio::test]
async fn generate_with_null_analysis_is_bad_request() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    let response = h
        .app
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"goal_id": 1})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_model_output_is_a_retryable_server_error() {
    let h = harness(ScriptedBackend::ok("no json in sight"));
    let response = h
        .app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("try generating again"));

    let stored = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    assert!(stored.is_empty());
}

#[tokio::test]
async fn upstream_failure_is_a_plain_server_error() {
    let h = harness(ScriptedBackend::failing("429 rate limited"));
    let response = h
        .app
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = json_body(response).await;
    assert!(!body["error"]
        .as_str()
        .unwrap()
        .contains("try generating again"));
}

#[tokio::test]
async fn latest_context_round_trip() {
    let h = harness(ScriptedBackend::ok(""));

    let response = h
        .app
        .clone()
        .oneshot(authed("GET", "/api/contexts/latest", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // legacy row: analysis stored JSON-encoded as a string
    let context = DiagnosticContext {
        id: ContextId::new(),
        user_id: h.user,
        raw_input: "CPA subiu 30%".to_string(),
        structured_analysis: json!(r#"{"diagnostico":"CPA alto"}"#),
        goal_ref: Some(json!(7)),
        created_at: Utc::now(),
    };
    let ctx_id = context.id;
    h.contexts.put(context);

    let response = h
        .app
        .oneshot(authed("GET", "/api/contexts/latest", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["id"], json!(ctx_id));
    assert_eq!(body["structured_analysis"]["diagnostico"], "CPA alto");
}

#[tokio::test]
async fn lifecycle_endpoints_move_an_experiment() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    h.app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();

    let backlog = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    let id = backlog[0].id.0;

    let response = h
        .app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/experiments/{id}/activate"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "em_execucao");

    let response = h
        .app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/experiments/{id}/archive"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["status"], "archived");

    // archived is terminal: queueing it back is ignored
    let response = h
        .app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/experiments/{id}/queue"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["status"], "archived");
}

#[tokio::test]
async fn listing_filters_by_status() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    h.app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();

    let backlog = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    let id = backlog[0].id.0;
    h.app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("/api/experiments/{id}/activate"),
            None,
        ))
        .await
        .unwrap();

    let response = h
        .app
        .clone()
        .oneshot(authed("GET", "/api/experiments", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let response = h
        .app
        .oneshot(authed("GET", "/api/experiments?status=em_execucao", None))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], json!(id));
}

#[tokio::test]
async fn patch_edits_card_fields() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    h.app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();

    let backlog = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    let id = backlog[0].id.0;

    let response = h
        .app
        .clone()
        .oneshot(authed(
            "PATCH",
            &format!("/api/experiments/{id}"),
            Some(json!({
                "hypothesis": "Hipótese revisada",
                "variable": "CTR",
                "expected_result": "2.5",
                "cutoff_line": "pausar após 5 dias"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["hypothesis"], "Hipótese revisada");
    assert_eq!(body["variable"], "CTR");
    assert_eq!(body["target_value"], 2.5);

    let response = h
        .app
        .oneshot(authed(
            "PATCH",
            &format!("/api/experiments/{id}"),
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn partial_patch_leaves_other_fields_untouched() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    h.app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();

    let backlog = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    let before = backlog
        .iter()
        .find(|r| r.cutoff_line.is_some())
        .unwrap()
        .clone();

    let response = h
        .app
        .oneshot(authed(
            "PATCH",
            &format!("/api/experiments/{}", before.id.0),
            Some(json!({"hypothesis": "Só a hipótese muda"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["hypothesis"], "Só a hipótese muda");
    assert_eq!(body["variable"], json!(before.variable));
    assert_eq!(body["target_value"], json!(before.target_value));
    assert_eq!(body["cutoff_line"], json!(before.cutoff_line));
}

#[tokio::test]
async fn other_users_experiments_are_invisible() {
    let h = harness(ScriptedBackend::ok(compliant_output()));
    h.app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/generate-experiments",
            Some(json!({"structuredAnalysis": {"x": 1}, "goal_id": 1})),
        ))
        .await
        .unwrap();

    let backlog = h
        .experiments
        .list_by_status(h.user, ExperimentStatus::Backlog)
        .await
        .unwrap();
    let foreign = backlog[0].clone();

    // a different session sees a 404, not someone else's card
    let sessions = Arc::new(StaticSessionProvider::new());
    sessions.allow(TOKEN, UserId::new());
    let pipeline = Arc::new(GenerationPipeline::new(
        h.contexts.clone(),
        Arc::new(InMemoryGoalStore::new()),
        h.experiments.clone(),
        Arc::new(ScriptedBackend::ok("")),
    ));
    let lifecycle = Arc::new(LifecycleService::new(h.experiments.clone()));
    let app = build_router(AppState::new(
        sessions,
        h.contexts,
        h.experiments.clone(),
        pipeline,
        lifecycle,
    ));

    let response = app
        .oneshot(authed(
            "POST",
            &format!("/api/experiments/{}/archive", foreign.id.0),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let untouched = h.experiments.get(foreign.id).await.unwrap().unwrap();
    assert_eq!(untouched.status, ExperimentStatus::Backlog);
}
