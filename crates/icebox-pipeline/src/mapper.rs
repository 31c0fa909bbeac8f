//! Experiment mapper
//!
//! Maps validated candidates into storable rows under the insert
//! invariants: mandatory well-formed goal reference, integer-only ice
//! score, fixed initial status, and the 5-per-batch cap. Mapping is
//! all-or-nothing; a single bad candidate aborts the whole batch so the
//! store never sees a partial insert attempt.

use crate::error::MappingError;
use icebox_core::{
    ContextId, ExperimentCandidate, ExperimentStatus, GoalId, NewExperiment, Scalar, UserId,
    MAX_EXPERIMENTS_PER_BATCH,
};
use serde_json::Value;

/// Map a recovered candidate batch into rows ready for one atomic insert.
pub fn map_candidates(
    user: UserId,
    candidates: &[ExperimentCandidate],
    context_id: Option<ContextId>,
    goal_id: &GoalId,
) -> Result<Vec<NewExperiment>, MappingError> {
    // Last-line guard: resolution happened before generation, but an
    // insert with a broken goal reference must never reach the store.
    if !goal_id.is_well_formed() {
        return Err(MappingError::MalformedGoalRef);
    }

    candidates
        .iter()
        .take(MAX_EXPERIMENTS_PER_BATCH)
        .map(|candidate| map_one(user, candidate, context_id, goal_id))
        .collect()
}

fn map_one(
    user: UserId,
    candidate: &ExperimentCandidate,
    context_id: Option<ContextId>,
    goal_id: &GoalId,
) -> Result<NewExperiment, MappingError> {
    validate_ice_score(candidate.ice_score.as_ref())?;

    let hypothesis = candidate
        .hypothesis
        .clone()
        .or_else(|| candidate.title.clone())
        .unwrap_or_default();

    Ok(NewExperiment {
        user_id: user,
        hypothesis,
        variable: candidate.metric.clone().unwrap_or_default(),
        expected_result: candidate.target.map(Scalar::Number),
        target_value: candidate.target,
        cutoff_line: candidate.cutoff_line.clone(),
        context_id,
        goal_id: goal_id.clone(),
        status: ExperimentStatus::Backlog,
    })
}

/// An absent score is tolerated (it is not persisted); a present score
/// must be a whole number. Never coerced silently: a fractional or
/// textual score would otherwise surface as an opaque store failure.
fn validate_ice_score(score: Option<&Value>) -> Result<(), MappingError> {
    match score {
        None | Some(Value::Null) => Ok(()),
        Some(Value::Number(n)) => {
            let whole = n.as_i64().is_some()
                || n.as_u64().is_some()
                || n.as_f64().is_some_and(|f| f.fract() == 0.0);
            if whole {
                Ok(())
            } else {
                Err(MappingError::NonIntegerIceScore(Value::Number(n.clone())))
            }
        }
        Some(other) => Err(MappingError::NonIntegerIceScore(other.clone())),
    }
}
