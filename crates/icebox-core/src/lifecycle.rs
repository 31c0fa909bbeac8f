//! Experiment lifecycle state machine
//!
//! Governs which status transitions a persisted experiment may take.
//! Transitions never delete a record and never touch its goal reference;
//! `archived` is terminal.

use crate::types::ExperimentStatus;

/// Statuses reachable in one transition from `from`
#[must_use]
pub fn allowed_transitions(from: ExperimentStatus) -> Vec<ExperimentStatus> {
    use ExperimentStatus::*;
    match from {
        Backlog => vec![Active, Archived],
        Active => vec![Backlog, Archived],
        Archived => vec![],
    }
}

/// Resulting status if the transition is allowed, `None` otherwise.
///
/// Callers treat `None` as a no-op: the record stays unchanged rather
/// than erroring, so a stale archive button cannot corrupt state.
#[must_use]
pub fn apply_transition(
    from: ExperimentStatus,
    to: ExperimentStatus,
) -> Option<ExperimentStatus> {
    if allowed(from, to) {
        Some(to)
    } else {
        None
    }
}

fn allowed(from: ExperimentStatus, to: ExperimentStatus) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
