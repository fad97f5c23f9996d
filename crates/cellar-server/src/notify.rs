//! Best-effort outbound webhook notifications.
//!
//! Delivery failures are logged and dropped; they never fail the operation
//! that triggered them.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use cellar_core::config::NotificationConfig;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook returned status {0}")]
    Status(u16),
}

/// Body posted when a guest joins a tasting session.
#[derive(Debug, Clone, Serialize)]
pub struct GuestJoined {
    pub event: &'static str,
    pub session_id: String,
    pub session_name: String,
    pub guest_id: String,
    pub guest_name: String,
    pub joined_at: i64,
}

impl GuestJoined {
    pub fn new(
        session_id: &str,
        session_name: &str,
        guest_id: &str,
        guest_name: &str,
        joined_at: i64,
    ) -> Self {
        Self {
            event: "guest_joined",
            session_id: session_id.to_string(),
            session_name: session_name.to_string(),
            guest_id: guest_id.to_string(),
            guest_name: guest_name.to_string(),
            joined_at,
        }
    }
}

/// Posts JSON events to a configured webhook. A notifier without a URL does
/// nothing.
#[derive(Debug, Clone, Default)]
pub struct WebhookNotifier {
    target: Option<Target>,
}

#[derive(Debug, Clone)]
struct Target {
    http: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(config: &NotificationConfig) -> Result<Self, NotifyError> {
        let Some(url) = config.webhook_url.as_deref().filter(|u| !u.is_empty()) else {
            return Ok(Self::disabled());
        };

        // reqwest is built with rustls-no-provider; Err means already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            target: Some(Target {
                http,
                url: url.to_string(),
            }),
        })
    }

    pub const fn is_enabled(&self) -> bool {
        self.target.is_some()
    }

    /// Announce a new guest from a background task.
    ///
    /// Returns the delivery task, or `None` when no webhook is configured.
    /// Failures are logged by the task.
    pub fn guest_joined(&self, event: GuestJoined) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            return None;
        }
        let notifier = self.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = notifier.post(&event).await {
                warn!(
                    error = %e,
                    session_id = %event.session_id,
                    guest_id = %event.guest_id,
                    "Guest-joined webhook failed"
                );
            }
        }))
    }

    async fn post<T: Serialize + Sync>(&self, body: &T) -> Result<(), NotifyError> {
        let Some(target) = &self.target else {
            return Ok(());
        };

        let resp = target.http.post(&target.url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status.as_u16()));
        }
        debug!(url = %target.url, "Webhook delivered");
        Ok(())
    }
}
