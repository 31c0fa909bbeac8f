//! Pipeline error taxonomy
//!
//! One layered error type over the component errors, mirroring the
//! remedy classes: precondition failures need new input, generation
//! failures need operator attention, recovery failures need another
//! generation attempt, persistence failures usually mean a goal or
//! context misconfiguration.

use icebox_model::GenerationError;
use icebox_recovery::RecoveryError;
use icebox_store::StoreError;
use serde_json::Value;

/// Top-level pipeline error
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Structured analysis absent from the request
    #[error("structured analysis is required")]
    MissingAnalysis,

    /// No usable goal id from the request or the diagnostic context.
    /// A goal is mandatory; there is no default.
    #[error("a goal is required: supply goal_id or a diagnostic context with an associated goal")]
    GoalUnresolved,

    /// Upstream model call failed
    #[error(transparent)]
    Generation(#[from] GenerationError),

    /// Model output could not be recovered into a valid batch.
    /// Distinct from [`PipelineError::Generation`]: the remedy is to
    /// generate again, not to fix the input.
    #[error("malformed model output: {0}")]
    Recovery(#[from] RecoveryError),

    /// A validated candidate violated a mapping invariant
    #[error("mapping failed: {0}")]
    Mapping(#[from] MappingError),

    /// Store collaborator failed; underlying message preserved
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PipelineError {
    /// Whether re-invoking generation unchanged could plausibly succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Recovery(_) | Self::Generation(GenerationError::EmptyCompletion))
    }

    /// Whether the caller must change the request before retrying
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::MissingAnalysis | Self::GoalUnresolved)
    }
}

/// Candidate-to-row mapping errors
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// Last-line guard: the resolved goal id degraded before persist
    #[error("goal reference missing or malformed at persist time")]
    MalformedGoalRef,

    /// The store would reject a non-integer score; fail early instead
    #[error("ice_score must be an integer, got {0}")]
    NonIntegerIceScore(Value),
}
