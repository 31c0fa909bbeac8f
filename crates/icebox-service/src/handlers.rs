//! Request handlers
//!
//! Thin layer: authenticate, deserialize, delegate to the pipeline or
//! lifecycle service, shape the response. No generation or lifecycle
//! logic lives here.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use icebox_core::{
    ContextId, DiagnosticContext, ExperimentId, ExperimentPatch, ExperimentRecord,
    ExperimentStatus, TrafficContext, UserId,
};
use icebox_pipeline::GenerateRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Resolve the authenticated user from the `Authorization: Bearer` header
async fn authenticate(state: &AppState, headers: &HeaderMap) -> ApiResult<UserId> {
    let token = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(ApiError::unauthorized)?;

    state
        .sessions
        .current_user(token)
        .await?
        .ok_or_else(ApiError::unauthorized)
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "icebox",
        version: state.version,
    })
}

/// Body of `POST /api/generate-experiments`.
///
/// Field casing is part of the wire contract and intentionally mixed:
/// camelCase for the analysis/metric/context keys, snake_case for the
/// goal and traffic block.
#[derive(Debug, Deserialize)]
pub(crate) struct GenerateBody {
    /// Diagnostic payload; must be present and non-null
    #[serde(default, rename = "structuredAnalysis")]
    structured_analysis: Value,
    #[serde(default, rename = "targetMetric")]
    target_metric: Option<String>,
    #[serde(default, rename = "contextId")]
    context_id: Option<ContextId>,
    /// Number or string; classified downstream
    #[serde(default)]
    goal_id: Option<Value>,
    #[serde(default)]
    traffic_context: Option<TrafficContext>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GenerateResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategic_vision: Option<String>,
    experiments: Vec<ExperimentRecord>,
}

pub(crate) async fn generate_experiments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<GenerateBody>,
) -> ApiResult<Json<GenerateResponse>> {
    let user = authenticate(&state, &headers).await?;

    let outcome = state
        .pipeline
        .generate(
            user,
            GenerateRequest {
                structured_analysis: body.structured_analysis,
                target_metric: body.target_metric,
                context_id: body.context_id,
                goal_id: body.goal_id,
                traffic_context: body.traffic_context,
            },
        )
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        strategic_vision: outcome.strategic_vision,
        experiments: outcome.experiments,
    }))
}

pub(crate) async fn latest_context(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<DiagnosticContext>> {
    let user = authenticate(&state, &headers).await?;
    let mut context = state
        .contexts
        .latest_for_user(user)
        .await?
        .ok_or_else(|| ApiError::not_found("no diagnostic context recorded yet"))?;
    // legacy rows store the analysis JSON-encoded as a string
    context.structured_analysis = context.parsed_analysis();
    Ok(Json(context))
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListExperimentsQuery {
    status: Option<ExperimentStatus>,
}

pub(crate) async fn list_experiments(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListExperimentsQuery>,
) -> ApiResult<Json<Vec<ExperimentRecord>>> {
    let user = authenticate(&state, &headers).await?;
    let status = query.status.unwrap_or(ExperimentStatus::Backlog);
    Ok(Json(state.experiments.list_by_status(user, status).await?))
}

/// Fetch `id` and verify it belongs to `user`. An experiment owned by
/// someone else is indistinguishable from a missing one.
async fn owned_experiment(state: &AppState, user: UserId, id: i64) -> ApiResult<ExperimentId> {
    let record = state
        .experiments
        .get(ExperimentId(id))
        .await?
        .filter(|record| record.user_id == user)
        .ok_or_else(|| ApiError::not_found(format!("experiment {id} not found")))?;
    Ok(record.id)
}

async fn transition(
    state: &AppState,
    headers: &HeaderMap,
    id: i64,
    to: ExperimentStatus,
) -> ApiResult<Json<ExperimentRecord>> {
    let user = authenticate(state, headers).await?;
    let id = owned_experiment(state, user, id).await?;
    let record = state
        .lifecycle
        .transition(id, to)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("experiment {id} not found")))?;
    Ok(Json(record))
}

pub(crate) async fn activate_experiment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<ExperimentRecord>> {
    transition(&state, &headers, id, ExperimentStatus::Active).await
}

pub(crate) async fn queue_experiment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<ExperimentRecord>> {
    transition(&state, &headers, id, ExperimentStatus::Backlog).await
}

pub(crate) async fn archive_experiment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> ApiResult<Json<ExperimentRecord>> {
    transition(&state, &headers, id, ExperimentStatus::Archived).await
}

#[derive(Debug, Deserialize)]
pub(crate) struct EditBody {
    hypothesis: Option<String>,
    variable: Option<String>,
    expected_result: Option<String>,
    cutoff_line: Option<String>,
}

pub(crate) async fn edit_experiment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<EditBody>,
) -> ApiResult<Json<ExperimentRecord>> {
    let user = authenticate(&state, &headers).await?;

    if body.hypothesis.is_none()
        && body.variable.is_none()
        && body.expected_result.is_none()
        && body.cutoff_line.is_none()
    {
        return Err(ApiError::bad_request("no fields to update"));
    }

    let id = owned_experiment(&state, user, id).await?;
    let record = state
        .lifecycle
        .edit(
            id,
            ExperimentPatch {
                hypothesis: body.hypothesis,
                variable: body.variable,
                expected_result: body.expected_result,
                cutoff_line: body.cutoff_line,
            },
        )
        .await?
        .ok_or_else(|| ApiError::not_found(format!("experiment {} not found", id)))?;
    Ok(Json(record))
}
