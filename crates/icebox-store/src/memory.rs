//! In-memory store implementations
//!
//! Back the test suite and local runs. The experiment store keeps its
//! rows under one lock so batch inserts are genuinely all-or-nothing,
//! and exposes a failure toggle so callers can exercise the persistence
//! error path.

use crate::{ContextStore, ExperimentStore, GoalStore, SessionProvider, StoreError};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use icebox_core::{
    ContextId, DiagnosticContext, ExperimentId, ExperimentPatch, ExperimentRecord,
    ExperimentStatus, Goal, GoalId, NewExperiment, Scalar, UserId,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// Token -> user session provider
#[derive(Debug, Default)]
pub struct StaticSessionProvider {
    sessions: DashMap<String, UserId>,
}

impl StaticSessionProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a token as an authenticated session
    pub fn allow(&self, token: impl Into<String>, user: UserId) {
        self.sessions.insert(token.into(), user);
    }
}

#[async_trait]
impl SessionProvider for StaticSessionProvider {
    async fn current_user(&self, bearer_token: &str) -> Result<Option<UserId>, StoreError> {
        Ok(self.sessions.get(bearer_token).map(|entry| *entry.value()))
    }
}

/// In-memory diagnostic-context store
#[derive(Debug, Default)]
pub struct InMemoryContextStore {
    contexts: DashMap<ContextId, DiagnosticContext>,
}

impl InMemoryContextStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, context: DiagnosticContext) {
        self.contexts.insert(context.id, context);
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get(&self, id: ContextId) -> Result<Option<DiagnosticContext>, StoreError> {
        Ok(self.contexts.get(&id).map(|entry| entry.value().clone()))
    }

    async fn latest_for_user(
        &self,
        user: UserId,
    ) -> Result<Option<DiagnosticContext>, StoreError> {
        Ok(self
            .contexts
            .iter()
            .filter(|entry| entry.value().user_id == user)
            .max_by_key(|entry| entry.value().created_at)
            .map(|entry| entry.value().clone()))
    }
}

/// In-memory goal store
#[derive(Debug, Default)]
pub struct InMemoryGoalStore {
    goals: DashMap<GoalId, Goal>,
}

impl InMemoryGoalStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, goal: Goal) {
        self.goals.insert(goal.id.clone(), goal);
    }
}

#[async_trait]
impl GoalStore for InMemoryGoalStore {
    async fn get(&self, id: &GoalId) -> Result<Option<Goal>, StoreError> {
        Ok(self.goals.get(id).map(|entry| entry.value().clone()))
    }
}

/// In-memory experiment store with sequential row ids
#[derive(Debug, Default)]
pub struct InMemoryExperimentStore {
    rows: Mutex<Vec<ExperimentRecord>>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl InMemoryExperimentStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Default::default()
        }
    }

    /// Make every subsequent operation fail, to exercise the persistence
    /// error path
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ExperimentStore for InMemoryExperimentStore {
    async fn insert_batch(
        &self,
        rows: Vec<NewExperiment>,
    ) -> Result<Vec<ExperimentRecord>, StoreError> {
        self.check_available()?;

        // Goal reference is a hard constraint, like a foreign key
        if let Some(bad) = rows.iter().find(|row| !row.goal_id.is_well_formed()) {
            return Err(StoreError::ConstraintViolation(format!(
                "experiments.goal_id rejected value {}",
                bad.goal_id
            )));
        }

        let mut stored = self.rows.lock();
        let inserted: Vec<ExperimentRecord> = rows
            .into_iter()
            .map(|row| ExperimentRecord {
                id: ExperimentId(self.next_id.fetch_add(1, Ordering::SeqCst)),
                user_id: row.user_id,
                hypothesis: row.hypothesis,
                variable: row.variable,
                expected_result: row.expected_result,
                target_value: row.target_value,
                cutoff_line: row.cutoff_line,
                context_id: row.context_id,
                goal_id: row.goal_id,
                status: row.status,
                created_at: Utc::now(),
            })
            .collect();
        stored.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn get(&self, id: ExperimentId) -> Result<Option<ExperimentRecord>, StoreError> {
        Ok(self.rows.lock().iter().find(|r| r.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: ExperimentId,
        status: ExperimentStatus,
    ) -> Result<Option<ExperimentRecord>, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock();
        Ok(rows.iter_mut().find(|r| r.id == id).map(|row| {
            row.status = status;
            row.clone()
        }))
    }

    async fn update_fields(
        &self,
        id: ExperimentId,
        patch: ExperimentPatch,
    ) -> Result<Option<ExperimentRecord>, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.lock();
        // Merge semantics: absent fields stay untouched, present fields
        // overwrite, empty input clears the column
        Ok(rows.iter_mut().find(|r| r.id == id).map(|row| {
            if let Some(value) = patch.hypothesis.as_deref() {
                row.hypothesis = normalize_text(value).unwrap_or_default();
            }
            if let Some(value) = patch.variable.as_deref() {
                row.variable = normalize_text(value).unwrap_or_default();
            }
            if let Some(value) = patch.expected_result.as_deref() {
                let expected = normalize_text(value);
                row.target_value = expected.as_deref().and_then(|s| s.parse().ok());
                row.expected_result = expected.map(Scalar::Text);
            }
            if let Some(value) = patch.cutoff_line.as_deref() {
                row.cutoff_line = normalize_text(value);
            }
            row.clone()
        }))
    }

    async fn list_by_status(
        &self,
        user: UserId,
        status: ExperimentStatus,
    ) -> Result<Vec<ExperimentRecord>, StoreError> {
        let mut rows: Vec<ExperimentRecord> = self
            .rows
            .lock()
            .iter()
            .filter(|r| r.user_id == user && r.status == status)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(rows)
    }
}

/// Trimmed text, with empty input clearing the field
fn normalize_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
