//! Lifecycle service
//!
//! Applies status transitions over the fixed backlog / em_execucao /
//! archived machine. The store write is unconditional (last writer
//! wins); the transition table is consulted against the record as read,
//! and a disallowed transition leaves the row untouched.

use crate::error::PipelineError;
use icebox_core::{lifecycle, ExperimentId, ExperimentPatch, ExperimentRecord, ExperimentStatus};
use icebox_store::ExperimentStore;
use std::sync::Arc;

pub struct LifecycleService {
    experiments: Arc<dyn ExperimentStore>,
}

impl LifecycleService {
    #[must_use]
    pub fn new(experiments: Arc<dyn ExperimentStore>) -> Self {
        Self { experiments }
    }

    /// Move an experiment to `to` if the machine allows it.
    ///
    /// Returns `Ok(None)` for an unknown id. A disallowed transition is
    /// not an error: the record is returned unchanged, so repeated
    /// archive clicks and races against a concurrent archive stay
    /// harmless.
    pub async fn transition(
        &self,
        id: ExperimentId,
        to: ExperimentStatus,
    ) -> Result<Option<ExperimentRecord>, PipelineError> {
        let Some(record) = self.experiments.get(id).await? else {
            return Ok(None);
        };

        match lifecycle::apply_transition(record.status, to) {
            Some(next) => {
                let updated = self.experiments.update_status(id, next).await?;
                tracing::info!(experiment = %id, from = %record.status, to = %next, "status transition applied");
                Ok(updated)
            }
            None => {
                tracing::warn!(experiment = %id, from = %record.status, to = %to, "disallowed status transition ignored");
                Ok(Some(record))
            }
        }
    }

    /// Apply a direct field edit to one experiment.
    pub async fn edit(
        &self,
        id: ExperimentId,
        patch: ExperimentPatch,
    ) -> Result<Option<ExperimentRecord>, PipelineError> {
        Ok(self.experiments.update_fields(id, patch).await?)
    }
}
