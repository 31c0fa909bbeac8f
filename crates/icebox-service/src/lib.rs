//! Icebox Service - HTTP surface
//!
//! Axum router, request handlers, and error mapping over the
//! generation pipeline and lifecycle service. The binary wires the
//! in-memory collaborators; deployments swap in real implementations of
//! the store traits.

#![warn(unreachable_pub)]

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;

use icebox_core::UserId;
use icebox_store::memory::{
    InMemoryContextStore, InMemoryExperimentStore, InMemoryGoalStore, StaticSessionProvider,
};
use icebox_store::{ContextStore, ExperimentStore, GoalStore, SessionProvider};
use std::sync::Arc;

/// Build the in-memory collaborator set for local runs.
///
/// When `ICEBOX_DEV_TOKEN` is set, that token is pre-registered as a
/// valid session so the API is usable out of the box; otherwise every
/// request is unauthenticated until a session is registered.
pub fn memory_collaborators() -> (
    Arc<dyn SessionProvider>,
    Arc<dyn ContextStore>,
    Arc<dyn GoalStore>,
    Arc<dyn ExperimentStore>,
) {
    let sessions = StaticSessionProvider::new();
    if let Ok(token) = std::env::var("ICEBOX_DEV_TOKEN") {
        if !token.trim().is_empty() {
            let user = UserId::new();
            tracing::info!(%user, "dev token registered");
            sessions.allow(token, user);
        }
    }

    (
        Arc::new(sessions),
        Arc::new(InMemoryContextStore::new()),
        Arc::new(InMemoryGoalStore::new()),
        Arc::new(InMemoryExperimentStore::new()),
    )
}
