//! POS Realtime
//!
//! Real-time event distribution for a restaurant point-of-sale backend:
//! - Typed topics per order, table, kitchen and product
//! - A fixed catalogue of domain events with a stable wire encoding
//! - Topic fan-out into bounded per-connection outboxes
//! - A notification facade for the order, payment and inventory services
//! - An axum WebSocket server exposing the whole thing to POS clients

pub mod api;
pub mod events;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// YAML config structs (deserialization targets)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: ServerYamlConfig,
    pub realtime: RealtimeYamlConfig,
}

/// Server configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerYamlConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerYamlConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5080,
        }
    }
}

/// Realtime delivery section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RealtimeYamlConfig {
    /// Messages buffered per connection before the oldest is dropped
    pub outbox_capacity: usize,
    pub ping_interval_secs: u64,
}

impl Default for RealtimeYamlConfig {
    fn default() -> Self {
        Self {
            outbox_capacity: events::DEFAULT_OUTBOX_CAPACITY,
            ping_interval_secs: 30,
        }
    }
}

// ============================================================================
// Runtime config (what the application actually uses)
// ============================================================================

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub outbox_capacity: usize,
    pub ping_interval_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_yaml(YamlConfig::default())
    }
}

impl Config {
    /// Load configuration from environment variables only.
    /// Equivalent to from_yaml_and_env(None).
    pub fn from_env() -> Result<Self> {
        Self::from_yaml_and_env(None)
    }

    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. A missing file falls
    /// back to env vars and defaults.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> Result<Self> {
        let yaml = Self::load_yaml(yaml_path);
        let defaults = Self::from_yaml(yaml);

        Ok(Self {
            server_host: std::env::var("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: env_parse("SERVER_PORT").unwrap_or(defaults.server_port),
            outbox_capacity: env_parse("REALTIME_OUTBOX_CAPACITY")
                .unwrap_or(defaults.outbox_capacity)
                .max(1),
            ping_interval_secs: env_parse("REALTIME_PING_INTERVAL_SECS")
                .unwrap_or(defaults.ping_interval_secs)
                .max(1),
        })
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        Self {
            server_host: yaml.server.host,
            server_port: yaml.server.port,
            outbox_capacity: yaml.realtime.outbox_capacity,
            ping_interval_secs: yaml.realtime.ping_interval_secs,
        }
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs.max(1))
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

/// Run the HTTP/WebSocket server until ctrl-c
pub async fn start_server(config: Config) -> Result<()> {
    let state = Arc::new(api::handlers::ServerState::from_config(config));
    let broadcaster = state.broadcaster.clone();
    let shutdown = state.shutdown.clone();
    let addr = state.config.bind_addr();
    let outbox_capacity = state.config.outbox_capacity;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    tracing::info!(
        outbox_capacity,
        "Realtime server listening on http://{}",
        addr
    );

    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("Received shutdown signal, closing realtime sessions...");
        // WebSocket sessions hold their connections open; close them first
        shutdown.cancel();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")?;

    let snapshot = broadcaster.metrics().snapshot();
    tracing::info!(
        events_published = snapshot.events_published,
        deliveries = snapshot.deliveries,
        messages_dropped = snapshot.messages_dropped,
        "Realtime server stopped"
    );
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
