//! Push notification delivery via an ntfy-compatible server.
//!
//! One [`NotificationEvent`] becomes one `POST {server}/{topic}` with a JSON
//! body. Delivery is attempted once; the caller decides what a failure means.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::NotificationEvent;

/// Default public ntfy server.
pub const DEFAULT_NTFY_SERVER: &str = "https://ntfy.sh";

/// High priority on ntfy's 1..=5 scale.
const NOTIFY_PRIORITY: u8 = 4;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The server answered with a non-2xx status.
    #[error("server returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),
}

// ── NtfyMessage ───────────────────────────────────────────────────────────────

/// JSON body accepted by ntfy's publish endpoint (topic travels in the path).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NtfyMessage {
    pub title: String,
    pub message: String,
    pub priority: u8,
    pub tags: Vec<String>,
    /// Opened when the notification is tapped.
    pub click: String,
}

impl NtfyMessage {
    /// Render the standard "new post" alert for `event`.
    pub fn for_event(event: &NotificationEvent) -> Self {
        Self {
            title: format!("New post from @{}", event.account_name),
            message: format!("Check it out: {}", event.url),
            priority: NOTIFY_PRIORITY,
            tags: vec!["bird".to_string(), "twitter".to_string()],
            click: event.url.clone(),
        }
    }
}

// ── NotificationDispatcher ────────────────────────────────────────────────────

/// Delivers a structured alert for a detected change.
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, event: &NotificationEvent) -> Result<(), NotifyError>;
}

// ── NtfyNotifier ──────────────────────────────────────────────────────────────

/// [`NotificationDispatcher`] that publishes to `{server}/{topic}`.
#[derive(Debug, Clone)]
pub struct NtfyNotifier {
    client: reqwest::Client,
    server: String,
    topic: String,
}

impl NtfyNotifier {
    pub fn new(server: impl Into<String>, topic: impl Into<String>) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("x-monitor/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        let server: String = server.into();
        Ok(Self {
            client,
            server: server.trim_end_matches('/').to_string(),
            topic: topic.into(),
        })
    }

    /// Full publish URL.
    pub fn endpoint(&self) -> String {
        format!("{}/{}", self.server, self.topic)
    }

    /// Send a canned alert so the subscriber can verify the setup.
    pub async fn send_test(&self) -> Result<(), NotifyError> {
        tracing::info!(endpoint = %self.endpoint(), "sending test notification");
        let event = NotificationEvent::new("https://x.com/test/status/123456789", "test_user");
        self.dispatch(&event).await
    }
}

#[async_trait]
impl NotificationDispatcher for NtfyNotifier {
    async fn dispatch(&self, event: &NotificationEvent) -> Result<(), NotifyError> {
        let body = NtfyMessage::for_event(event);

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %event.url, "network error sending notification");
                NotifyError::Network(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::info!(url = %event.url, "notification sent");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        tracing::error!(status = status.as_u16(), body = %text, "notification rejected");
        Err(NotifyError::Status {
            status: status.as_u16(),
            body: text,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn event() -> NotificationEvent {
        NotificationEvent::new("https://x.com/someone/status/102", "someone")
    }

    // ── NtfyMessage ───────────────────────────────────────────────────────────

    #[test]
    fn test_message_for_event() {
        let msg = NtfyMessage::for_event(&event());
        assert_eq!(msg.title, "New post from @someone");
        assert_eq!(msg.message, "Check it out: https://x.com/someone/status/102");
        assert_eq!(msg.priority, 4);
        assert_eq!(msg.tags, vec!["bird", "twitter"]);
        assert_eq!(msg.click, "https://x.com/someone/status/102");
    }

    #[test]
    fn test_message_json_has_no_topic() {
        let json = serde_json::to_value(NtfyMessage::for_event(&event())).unwrap();
        assert!(json.get("topic").is_none());
        assert_eq!(json["priority"], 4);
    }

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let notifier = NtfyNotifier::new("https://ntfy.example/", "alerts").unwrap();
        assert_eq!(notifier.endpoint(), "https://ntfy.example/alerts");
    }

    // ── dispatch ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_dispatch_posts_json_to_topic() {
        let server = MockServer::start().await;
        let expected = serde_json::to_value(NtfyMessage::for_event(&event())).unwrap();
        Mock::given(method("POST"))
            .and(path("/x-alerts"))
            .and(body_json(expected))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = NtfyNotifier::new(server.uri(), "x-alerts").unwrap();
        notifier.dispatch(&event()).await.expect("dispatch ok");
    }

    #[tokio::test]
    async fn test_dispatch_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x-alerts"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let notifier = NtfyNotifier::new(server.uri(), "x-alerts").unwrap();
        let err = notifier.dispatch(&event()).await.unwrap_err();
        assert_eq!(
            err,
            NotifyError::Status {
                status: 429,
                body: "slow down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_dispatch_unreachable_server_is_network_error() {
        // Port 9 on localhost is the discard service; nothing listens there in CI.
        let notifier = NtfyNotifier::new("http://127.0.0.1:9", "x-alerts").unwrap();
        let err = notifier.dispatch(&event()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Network(_)));
    }

    #[tokio::test]
    async fn test_send_test_notification() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/x-alerts"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = NtfyNotifier::new(server.uri(), "x-alerts").unwrap();
        notifier.send_test().await.expect("test notification ok");
    }
}
