//! WebSocket handlers for real-time POS event delivery

use super::handlers::RealtimeState;
use crate::events::{Broadcaster, Connection, EncodedMessage, MessageSink, Topic, TransportError};
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::interval;
use tracing::{debug, warn};

/// Query parameters for the initial subscription set
#[derive(Debug, Deserialize, Default)]
pub struct WsQuery {
    /// Comma-separated topics to subscribe to on connect (e.g. "kitchen,table:*")
    pub topics: Option<String>,
}

/// Frames a client may send after the upgrade
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
    Ping {
        #[serde(default)]
        id: Option<u64>,
    },
}

/// Control replies, written straight to the socket (never through the outbox)
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlReply {
    Subscribed { topic: Topic },
    Unsubscribed { topic: Topic },
    Pong {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<u64>,
    },
    Error { message: String },
}

/// Parse the `topics` query parameter, skipping entries that are not valid topics
pub fn parse_topic_list(raw: Option<&str>) -> Vec<Topic> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<Topic>() {
            Ok(topic) => Some(topic),
            Err(e) => {
                warn!(topic = s, "Ignoring initial subscription: {}", e);
                None
            }
        })
        .collect()
}

/// Apply one client control frame to the session's subscriptions
pub fn handle_control(
    broadcaster: &Broadcaster,
    connection: &Arc<Connection>,
    text: &str,
) -> ControlReply {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(e) => {
            return ControlReply::Error {
                message: format!("invalid control frame: {}", e),
            }
        }
    };

    match message {
        ClientMessage::Subscribe { topic } => match topic.parse::<Topic>() {
            Ok(topic) => {
                broadcaster.subscribe(topic.clone(), connection);
                ControlReply::Subscribed { topic }
            }
            Err(e) => ControlReply::Error {
                message: e.to_string(),
            },
        },
        ClientMessage::Unsubscribe { topic } => match topic.parse::<Topic>() {
            Ok(topic) => {
                broadcaster.unsubscribe(&topic, connection);
                ControlReply::Unsubscribed { topic }
            }
            Err(e) => ControlReply::Error {
                message: e.to_string(),
            },
        },
        ClientMessage::Ping { id } => ControlReply::Pong { id },
    }
}

#[async_trait]
impl MessageSink for SplitSink<WebSocket, Message> {
    async fn deliver(&mut self, message: &EncodedMessage) -> Result<(), TransportError> {
        self.send(Message::Text(message.frame().to_owned().into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }
}

/// WebSocket upgrade handler for `/ws`
pub async fn ws_events(
    ws: WebSocketUpgrade,
    State(state): State<RealtimeState>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let initial = parse_topic_list(query.topics.as_deref());
    ws.on_upgrade(move |socket| handle_ws(socket, state, initial))
}

/// Handle an individual WebSocket connection
async fn handle_ws(socket: WebSocket, state: RealtimeState, initial: Vec<Topic>) {
    let broadcaster = state.broadcaster.clone();
    let connection = broadcaster.connect();
    for topic in initial {
        broadcaster.subscribe(topic, &connection);
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();

    let mut ping_interval = interval(state.config.ping_interval());
    // Skip the first immediate tick
    ping_interval.tick().await;

    debug!(
        connection_id = %connection.id(),
        topics = ?broadcaster.registry().topics_of(connection.id()),
        "WebSocket client connected"
    );

    loop {
        tokio::select! {
            _ = state.shutdown.cancelled() => {
                debug!(connection_id = %connection.id(), "Server shutting down, closing WebSocket");
                let _ = ws_sender.send(Message::Close(None)).await;
                break;
            }

            // Drain the outbox into the socket
            message = connection.recv() => {
                let Some(message) = message else {
                    break;
                };
                if let Err(e) = connection.deliver_to(&mut ws_sender, &message).await {
                    broadcaster.metrics().transport_failure();
                    debug!(connection_id = %connection.id(), "WebSocket send failed: {}", e);
                    break;
                }
            }

            // Keepalive ping
            _ = ping_interval.tick() => {
                if ws_sender.send(Message::Ping(vec![].into())).await.is_err() {
                    debug!("WebSocket ping failed, client disconnected");
                    break;
                }
            }

            // Control frames from the client
            msg = ws_receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_control(&broadcaster, &connection, text.as_str());
                        match serde_json::to_string(&reply) {
                            Ok(json) => {
                                if ws_sender.send(Message::Text(json.into())).await.is_err() {
                                    debug!("WebSocket send failed, client disconnected");
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Failed to serialize control reply: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket receive error: {}", e);
                        break;
                    }
                    _ => {} // Pong/Binary: ignore
                }
            }
        }
    }

    broadcaster.disconnect(&connection);
}
