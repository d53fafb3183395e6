use crate::{handlers, stream, AppState};
use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))

        // Experiments
        .route("/api/experiment/start", post(handlers::start_experiment))
        .route("/api/experiment/{id}/results", get(handlers::get_results))
        .route("/api/experiments", get(handlers::list_experiments))

        // Progress stream
        .route("/api/experiment/stream/{id}", get(stream::stream_experiment))

        // Add state
        .with_state(state)

        // Add middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
}
