//! Application state for API handlers

use icebox_pipeline::{GenerationPipeline, LifecycleService};
use icebox_store::{ContextStore, ExperimentStore, SessionProvider};
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Bearer-token authentication collaborator
    pub sessions: Arc<dyn SessionProvider>,

    /// Diagnostic-context reads
    pub contexts: Arc<dyn ContextStore>,

    /// Experiment reads and status writes
    pub experiments: Arc<dyn ExperimentStore>,

    /// End-to-end generation pipeline
    pub pipeline: Arc<GenerationPipeline>,

    /// Status-machine service over persisted experiments
    pub lifecycle: Arc<LifecycleService>,

    /// Service version
    pub version: &'static str,
}

impl AppState {
    pub fn new(
        sessions: Arc<dyn SessionProvider>,
        contexts: Arc<dyn ContextStore>,
        experiments: Arc<dyn ExperimentStore>,
        pipeline: Arc<GenerationPipeline>,
        lifecycle: Arc<LifecycleService>,
    ) -> Self {
        Self {
            sessions,
            contexts,
            experiments,
            pipeline,
            lifecycle,
            version: env!("CARGO_PKG_VERSION"),
        }
    }
}
