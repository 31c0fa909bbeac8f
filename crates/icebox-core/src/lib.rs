//! Icebox Core - domain model
//!
//! Shared domain types for the experiment generation pipeline:
//! - Goal identifiers (numeric or UUID-shaped, distinguished by shape)
//! - Diagnostic contexts and goals
//! - Transient experiment candidates and persisted records
//! - The experiment lifecycle state machine (backlog / active / archived)

#![warn(unreachable_pub)]

pub mod lifecycle;
pub mod types;

pub use lifecycle::{allowed_transitions, apply_transition};
pub use types::{
    ContextId, DiagnosticContext, ExperimentCandidate, ExperimentId, ExperimentPatch,
    ExperimentRecord, ExperimentStatus, Goal, GoalId, NewExperiment, Scalar, TrafficContext,
    UserId,
};

/// Hard cap on candidates persisted per generation batch, regardless of
/// how many the model returns
pub const MAX_EXPERIMENTS_PER_BATCH: usize = 5;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
