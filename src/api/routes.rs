use crate::api::{handlers, AppState};
use axum::{routing::get, Router};
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(handlers::health_check))
        // Read-only search surface
        .route("/api/search", get(handlers::search))
        .route("/api/autocomplete", get(handlers::autocomplete))
        .route("/api/availability", get(handlers::availability))
        .route("/api/test", get(handlers::test_endpoint))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
