//! API route definitions

use super::handlers::{self, RealtimeState};
use super::ws_handlers;
use crate::events::INTERNAL_EVENTS_PATH;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the API router
pub fn create_router(state: RealtimeState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // ====================================================================
        // Realtime
        // ====================================================================
        .route("/api/realtime/stats", get(handlers::realtime_stats))
        .route("/api/realtime/topics/{topic}", get(handlers::get_topic))
        // Events from services running in another process
        .route(INTERNAL_EVENTS_PATH, post(handlers::ingest_event))
        // WebSocket
        .route("/ws", get(ws_handlers::ws_events))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
