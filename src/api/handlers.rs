//! API request handlers

use crate::events::{
    topics_for, Broadcaster, DomainEvent, HubMetricsSnapshot, RealtimeNotifier, Topic,
};
use crate::Config;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Shared server state
pub struct ServerState {
    pub broadcaster: Arc<Broadcaster>,
    pub config: Arc<Config>,
    /// Cancelled on shutdown; live WebSocket sessions close when it fires
    pub shutdown: CancellationToken,
}

/// Shared realtime server state
pub type RealtimeState = Arc<ServerState>;

impl ServerState {
    pub fn new(broadcaster: Arc<Broadcaster>, config: Arc<Config>) -> Self {
        Self {
            broadcaster,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Build a fresh broadcaster sized from `config`
    pub fn from_config(config: Config) -> Self {
        let broadcaster = Arc::new(Broadcaster::new(config.outbox_capacity));
        Self::new(broadcaster, Arc::new(config))
    }
}

// ============================================================================
// Health check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_connections: u64,
    pub topics: usize,
}

/// Health check handler
pub async fn health(State(state): State<RealtimeState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_connections: state.broadcaster.metrics().active_connections(),
        topics: state.broadcaster.registry().topic_count(),
    })
}

// ============================================================================
// Realtime stats
// ============================================================================

/// Hub-wide delivery counters
pub async fn realtime_stats(State(state): State<RealtimeState>) -> Json<HubMetricsSnapshot> {
    Json(state.broadcaster.metrics().snapshot())
}

#[derive(Serialize)]
pub struct TopicInfoResponse {
    pub topic: Topic,
    pub subscribers: usize,
}

/// Current subscriber count of one topic
pub async fn get_topic(
    State(state): State<RealtimeState>,
    Path(topic): Path<String>,
) -> Result<Json<TopicInfoResponse>, AppError> {
    let topic: Topic = topic
        .parse()
        .map_err(|e| AppError::BadRequest(format!("{}", e)))?;
    let subscribers = state.broadcaster.registry().subscriber_count(&topic);
    Ok(Json(TopicInfoResponse { topic, subscribers }))
}

// ============================================================================
// Internal event ingestion
// ============================================================================

#[derive(Serialize)]
pub struct IngestResponse {
    pub event: &'static str,
    pub topics: Vec<Topic>,
}

/// Accept a domain event from an out-of-process service and route it
pub async fn ingest_event(
    State(state): State<RealtimeState>,
    payload: Result<Json<DomainEvent>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestResponse>), AppError> {
    let Json(event) = payload.map_err(|rejection| {
        warn!("Rejected internal event: {}", rejection.body_text());
        AppError::BadRequest(rejection.body_text())
    })?;

    let topics = topics_for(&event);
    debug!(event = event.name(), topics = topics.len(), "Internal event received");
    let name = event.name();
    state.broadcaster.notify(event);

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            event: name,
            topics,
        }),
    ))
}

// ============================================================================
// Error handling
// ============================================================================

/// Application error type
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
