//! API router configuration

use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main API router
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/contexts/latest", get(handlers::latest_context))
        .route("/experiments", get(handlers::list_experiments))
        .route(
            "/generate-experiments",
            post(handlers::generate_experiments),
        )
        .route(
            "/experiments/:id/activate",
            post(handlers::activate_experiment),
        )
        .route("/experiments/:id/queue", post(handlers::queue_experiment))
        .route(
            "/experiments/:id/archive",
            post(handlers::archive_experiment),
        )
        .route("/experiments/:id", patch(handlers::edit_experiment));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
