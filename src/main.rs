//! POS Realtime - Main Server
//!
//! WebSocket fan-out of order, table, kitchen and stock events.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pos_realtime::{events::DomainEvent, events::HttpNotifier, Config};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pos-realtime")]
#[command(about = "Real-time event server for the restaurant POS")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the realtime server
    Serve {
        /// Port to listen on (overrides config.yaml and SERVER_PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Path to the YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Send one event to a running server
    Emit {
        /// Server root URL
        #[arg(long, default_value = "http://localhost:5080", env = "POS_REALTIME_URL")]
        url: String,

        /// Event JSON, e.g. '{"type":"OrderCancelled","order_id":7}'
        event: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pos_realtime=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, config } => {
            let mut config = Config::from_yaml_and_env(config.as_deref())?;
            if let Some(port) = port {
                config.server_port = port;
            }
            pos_realtime::start_server(config).await
        }
        Commands::Emit { url, event } => run_emit(&url, &event).await,
    }
}

async fn run_emit(url: &str, raw: &str) -> Result<()> {
    let event: DomainEvent = serde_json::from_str(raw).context("Invalid event JSON")?;
    let notifier = HttpNotifier::new(url)?;
    notifier.send(&event).await?;
    tracing::info!(event = event.name(), "Event accepted by {}", notifier.url());
    Ok(())
}
