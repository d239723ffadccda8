//! HTTP notifier for CRUD services running outside the realtime server
//!
//! Posts each `DomainEvent` to the server's `POST /internal/events`, which routes
//! it exactly like an in-process `Broadcaster::notify`.
//! Fire-and-forget: errors are logged but never block the caller.

use super::notifier::RealtimeNotifier;
use super::types::DomainEvent;
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::warn;

/// Path of the ingestion endpoint, relative to the server root
pub const INTERNAL_EVENTS_PATH: &str = "/internal/events";

/// Forwards domain events to a realtime server over HTTP
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
}

impl HttpNotifier {
    /// Create a notifier targeting the given base URL
    ///
    /// The base_url should be the realtime server root (e.g. "http://localhost:5080").
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .context("Failed to create HTTP client")?;

        let url = format!("{}{}", base_url.trim_end_matches('/'), INTERNAL_EVENTS_PATH);

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one event and wait for the server to accept it
    pub async fn send(&self, event: &DomainEvent) -> Result<()> {
        self.client
            .post(&self.url)
            .json(event)
            .send()
            .await
            .with_context(|| format!("Failed to reach {}", self.url))?
            .error_for_status()
            .with_context(|| format!("{} rejected {}", self.url, event.name()))?;
        Ok(())
    }
}

impl RealtimeNotifier for HttpNotifier {
    fn notify(&self, event: DomainEvent) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(
                event = event.name(),
                "No async runtime, realtime notification skipped"
            );
            return;
        };

        let notifier = self.clone();
        runtime.spawn(async move {
            if let Err(e) = notifier.send(&event).await {
                warn!(
                    url = %notifier.url,
                    event = event.name(),
                    "Failed to forward event to realtime server: {:#}",
                    e
                );
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::OrderStatus;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_new_builds_correct_url() {
        let notifier = HttpNotifier::new("http://localhost:5080").unwrap();
        assert_eq!(notifier.url(), "http://localhost:5080/internal/events");
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let notifier = HttpNotifier::new("http://localhost:5080/").unwrap();
        assert_eq!(notifier.url(), "http://localhost:5080/internal/events");
    }

    #[test]
    fn test_notify_outside_runtime_does_not_panic() {
        let notifier = HttpNotifier::new("http://127.0.0.1:1").unwrap();
        notifier.kitchen_update();
    }

    #[tokio::test]
    async fn test_send_posts_event_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/internal/events"))
            .and(body_json(serde_json::json!({
                "type": "OrderStatusChanged",
                "order_id": 12,
                "status": "ready"
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(&server.uri()).unwrap();
        notifier
            .send(&DomainEvent::OrderStatusChanged {
                order_id: 12,
                status: OrderStatus::Ready,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_surfaces_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(&server.uri()).unwrap();
        let err = notifier
            .send(&DomainEvent::KitchenUpdate)
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("KitchenUpdate"));
    }

    #[tokio::test]
    async fn test_notify_is_fire_and_forget() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/internal/events"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = HttpNotifier::new(&server.uri()).unwrap();
        notifier.order_cancelled(3);

        // Give the spawned task a moment to execute
        tokio::time::sleep(Duration::from_millis(200)).await;
        server.verify().await;
    }

    #[tokio::test]
    async fn test_notify_unreachable_server_no_panic() {
        // Nothing listens on port 1
        let notifier = HttpNotifier::new("http://127.0.0.1:1").unwrap();
        notifier.order_cancelled(1);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
