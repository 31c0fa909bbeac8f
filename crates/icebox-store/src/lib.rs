//! Icebox Store - collaborator interfaces
//!
//! The pipeline treats authentication, diagnostic contexts, goals, and
//! experiment persistence as external collaborators specified only at
//! their interface boundary. Each boundary is one object-safe async
//! trait; the in-memory implementations in [`memory`] back the tests and
//! local runs.

#![warn(unreachable_pub)]

pub mod memory;

use async_trait::async_trait;
use icebox_core::{
    ContextId, DiagnosticContext, ExperimentId, ExperimentPatch, ExperimentRecord,
    ExperimentStatus, Goal, GoalId, NewExperiment, UserId,
};

/// Errors surfaced by any store collaborator.
///
/// Persistence errors carry the underlying message verbatim: they usually
/// indicate a goal/context misconfiguration an operator must fix.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Store unreachable or internal failure
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Foreign-key or type constraint rejected the write
    #[error("constraint violation: {0}")]
    ConstraintViolation(String),
}

/// Authentication/session collaborator: yields the authenticated identity
/// for a bearer token, or none
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_user(&self, bearer_token: &str) -> Result<Option<UserId>, StoreError>;
}

/// Diagnostic-context collaborator
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Fetch a context by id
    async fn get(&self, id: ContextId) -> Result<Option<DiagnosticContext>, StoreError>;

    /// Most recent context for a user, by creation time
    async fn latest_for_user(&self, user: UserId)
        -> Result<Option<DiagnosticContext>, StoreError>;
}

/// Goal collaborator. Read-only from the pipeline's perspective.
#[async_trait]
pub trait GoalStore: Send + Sync {
    async fn get(&self, id: &GoalId) -> Result<Option<Goal>, StoreError>;
}

/// Experiment persistence collaborator
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    /// Atomic batch insert: either every row is stored or none is.
    /// Returns the inserted rows with their generated identifiers.
    async fn insert_batch(
        &self,
        rows: Vec<NewExperiment>,
    ) -> Result<Vec<ExperimentRecord>, StoreError>;

    /// Fetch a single record
    async fn get(&self, id: ExperimentId) -> Result<Option<ExperimentRecord>, StoreError>;

    /// Unconditional single-row status update (last writer wins).
    /// Returns the updated record, or `None` for an unknown id.
    async fn update_status(
        &self,
        id: ExperimentId,
        status: ExperimentStatus,
    ) -> Result<Option<ExperimentRecord>, StoreError>;

    /// Single-row field edit; never touches status or goal reference
    async fn update_fields(
        &self,
        id: ExperimentId,
        patch: ExperimentPatch,
    ) -> Result<Option<ExperimentRecord>, StoreError>;

    /// Records for a user filtered by status, newest first
    async fn list_by_status(
        &self,
        user: UserId,
        status: ExperimentStatus,
    ) -> Result<Vec<ExperimentRecord>, StoreError>;
}
