//! Notification collaborator: short, non-blocking notices surfaced to the
//! person running the capture (silence advisories, fatal capture errors,
//! ingestion auth failures). Fire-and-forget, no acknowledgment.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::nats::{NatsClient, NoticeMessage};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
        }
    }
}

/// A single user-facing notice.
#[derive(Debug, Clone)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }
}

/// Display surface for notices. Implementations must not block capture:
/// delivery failures are logged and swallowed by the caller.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, session_id: &str, notice: Notice) -> Result<()>;
}

/// Publishes notices to `class.notices.<session>` for the dashboard to render.
pub struct NatsNotifier {
    client: Arc<NatsClient>,
}

impl NatsNotifier {
    pub fn new(client: Arc<NatsClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Notifier for NatsNotifier {
    async fn notify(&self, session_id: &str, notice: Notice) -> Result<()> {
        let message = NoticeMessage {
            id: uuid::Uuid::new_v4(),
            session_id: session_id.to_string(),
            severity: notice.severity.as_str().to_string(),
            message: notice.message,
            timestamp: Utc::now().to_rfc3339(),
        };

        info!(
            "Publishing {} notice for session {}: {}",
            message.severity, session_id, message.message
        );

        self.client.publish_notice(&message).await
    }
}
