//! Goal resolver
//!
//! Produces exactly one goal identifier for a generation batch or fails.
//! Two-step fallback: the explicit id from the request wins; when it is
//! absent or unusable, the diagnostic context's stored goal reference is
//! classified the same way. The fallback exists because the UI may omit
//! the explicit id when the diagnostic flow already associated a goal
//! with the context.

use crate::error::PipelineError;
use icebox_core::{ContextId, GoalId};
use icebox_store::ContextStore;
use serde_json::Value;

/// Resolve the owning goal for a generation request.
///
/// Failing to resolve is a hard precondition error, not a recoverable
/// pipeline error: there is no default goal.
pub async fn resolve_goal(
    explicit: Option<&Value>,
    context_id: Option<ContextId>,
    contexts: &dyn ContextStore,
) -> Result<GoalId, PipelineError> {
    if let Some(goal_id) = explicit.and_then(GoalId::classify) {
        return Ok(goal_id);
    }

    if let Some(id) = context_id {
        let stored = contexts.get(id).await?.and_then(|ctx| ctx.goal_ref);
        if let Some(goal_id) = stored.as_ref().and_then(GoalId::classify) {
            tracing::debug!(context = %id, goal = %goal_id, "goal resolved from diagnostic context");
            return Ok(goal_id);
        }
    }

    Err(PipelineError::GoalUnresolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use icebox_core::{DiagnosticContext, UserId};
    use icebox_store::memory::InMemoryContextStore;
    use serde_json::json;

    fn context_with_goal(goal_ref: Option<Value>) -> DiagnosticContext {
        DiagnosticContext {
            id: ContextId::new(),
            user_id: UserId::new(),
            raw_input: String::new(),
            structured_analysis: json!({}),
            goal_ref,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn explicit_numeric_string_wins() {
        let contexts = InMemoryContextStore::new();
        let goal = resolve_goal(Some(&json!("7")), None, &contexts).await.unwrap();
        assert_eq!(goal, GoalId::Numeric(7));
    }

    #[tokio::test]
    async fn explicit_uuid_preserved_as_string() {
        let contexts = InMemoryContextStore::new();
        let goal = resolve_goal(
            Some(&json!("a1b2c3d4-e5f6-7890-abcd-ef0123456789")),
            None,
            &contexts,
        )
        .await
        .unwrap();
        assert_eq!(
            goal,
            GoalId::Opaque("a1b2c3d4-e5f6-7890-abcd-ef0123456789".to_string())
        );
    }

    #[tokio::test]
    async fn falls_back_to_context_goal() {
        let contexts = InMemoryContextStore::new();
        let ctx = context_with_goal(Some(json!("a1b2c3d4-e5f6-7890-abcd-ef0123456789")));
        let ctx_id = ctx.id;
        contexts.put(ctx);

        let goal = resolve_goal(None, Some(ctx_id), &contexts).await.unwrap();
        assert_eq!(
            goal,
            GoalId::Opaque("a1b2c3d4-e5f6-7890-abcd-ef0123456789".to_string())
        );
    }

    #[tokio::test]
    async fn unusable_explicit_falls_back_to_context() {
        let contexts = InMemoryContextStore::new();
        let ctx = context_with_goal(Some(json!(42)));
        let ctx_id = ctx.id;
        contexts.put(ctx);

        // "abc" coerces to no number, so the context reference is used
        let goal = resolve_goal(Some(&json!("abc")), Some(ctx_id), &contexts)
            .await
            .unwrap();
        assert_eq!(goal, GoalId::Numeric(42));
    }

    #[tokio::test]
    async fn unresolved_goal_is_precondition_failure() {
        let contexts = InMemoryContextStore::new();
        let err = resolve_goal(None, None, &contexts).await.unwrap_err();
        assert!(matches!(err, PipelineError::GoalUnresolved));
    }

    #[tokio::test]
    async fn context_without_goal_does_not_resolve() {
        let contexts = InMemoryContextStore::new();
        let ctx = context_with_goal(None);
        let ctx_id = ctx.id;
        contexts.put(ctx);

        let err = resolve_goal(None, Some(ctx_id), &contexts).await.unwrap_err();
        assert!(matches!(err, PipelineError::GoalUnresolved));
    }

    #[tokio::test]
    async fn empty_string_goal_ref_is_unusable() {
        let contexts = InMemoryContextStore::new();
        let ctx = context_with_goal(Some(json!("")));
        let ctx_id = ctx.id;
        contexts.put(ctx);

        let err = resolve_goal(Some(&json!("")), Some(ctx_id), &contexts)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::GoalUnresolved));
    }
}
