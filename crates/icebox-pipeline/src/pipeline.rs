//! Generation pipeline
//!
//! One sequential chain of awaited operations per request:
//! resolve goal -> enrich -> assemble prompt -> generate -> recover ->
//! map -> persist. Each stage may fail independently; a pipeline-fatal
//! error aborts the whole request and nothing is persisted. There is no
//! in-process shared mutable state and no dedup of concurrent requests
//! for the same context.

use crate::enricher;
use crate::error::PipelineError;
use crate::mapper;
use crate::resolver;
use icebox_core::{ContextId, ExperimentRecord, TrafficContext, UserId};
use icebox_model::{assemble, GenerationBackend, GenerationRequest, PromptInputs};
use icebox_store::{ContextStore, ExperimentStore, GoalStore};
use serde_json::Value;
use std::sync::Arc;

/// One experiment-generation request at the pipeline boundary
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Diagnostic payload, opaque to this layer. Required.
    pub structured_analysis: Value,
    pub target_metric: Option<String>,
    pub context_id: Option<ContextId>,
    /// Raw goal reference from the caller (number or string)
    pub goal_id: Option<Value>,
    pub traffic_context: Option<TrafficContext>,
}

/// Persisted result of a successful run
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub strategic_vision: Option<String>,
    pub experiments: Vec<ExperimentRecord>,
}

/// The end-to-end generation pipeline.
///
/// Owns its collaborators behind trait objects; the generation client is
/// constructed once at startup and passed in, never built from ambient
/// global state.
pub struct GenerationPipeline {
    contexts: Arc<dyn ContextStore>,
    goals: Arc<dyn GoalStore>,
    experiments: Arc<dyn ExperimentStore>,
    backend: Arc<dyn GenerationBackend>,
}

impl GenerationPipeline {
    #[must_use]
    pub fn new(
        contexts: Arc<dyn ContextStore>,
        goals: Arc<dyn GoalStore>,
        experiments: Arc<dyn ExperimentStore>,
        backend: Arc<dyn GenerationBackend>,
    ) -> Self {
        Self {
            contexts,
            goals,
            experiments,
            backend,
        }
    }

    /// Run one generation request for an authenticated user.
    ///
    /// # Workflow
    /// 1. Check the structured-analysis precondition
    /// 2. Resolve the owning goal (explicit id, else context fallback)
    /// 3. Enrich the prompt with goal metadata (best-effort)
    /// 4. Invoke the model once, in JSON-object mode
    /// 5. Recover and validate the candidate batch
    /// 6. Map candidates into rows and persist them atomically
    pub async fn generate(
        &self,
        user: UserId,
        request: GenerateRequest,
    ) -> Result<GenerationOutcome, PipelineError> {
        if request.structured_analysis.is_null() {
            return Err(PipelineError::MissingAnalysis);
        }

        let goal_id = resolver::resolve_goal(
            request.goal_id.as_ref(),
            request.context_id,
            self.contexts.as_ref(),
        )
        .await?;
        tracing::info!(%user, goal = %goal_id, "generating experiment batch");

        let profile = enricher::enrich(
            &goal_id,
            request.target_metric.as_deref(),
            self.goals.as_ref(),
        )
        .await;

        let prompt = assemble(&PromptInputs {
            goal_title: profile.title,
            goal_metric: profile.metric,
            goal_platform: profile.platform,
            traffic: request.traffic_context.clone(),
        });

        let raw = self
            .backend
            .generate(&GenerationRequest::new(
                &prompt,
                &request.structured_analysis,
            ))
            .await?;

        let batch = icebox_recovery::recover(&raw)?;
        tracing::debug!(candidates = batch.candidates.len(), "batch recovered");

        let rows = mapper::map_candidates(user, &batch.candidates, request.context_id, &goal_id)?;
        let experiments = self.experiments.insert_batch(rows).await?;
        tracing::info!(count = experiments.len(), goal = %goal_id, "experiment batch persisted");

        Ok(GenerationOutcome {
            strategic_vision: batch.strategic_vision,
            experiments,
        })
    }
}
