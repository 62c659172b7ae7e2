//! Transcript sink: fire-and-forget hand-off of finished chunks to the
//! ingestion service. A failed chunk is logged and dropped, not retried or
//! queued; only auth/session failures are surfaced to the user.

mod nats;

pub use nats::NatsTranscriptSink;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bounded unit of finalized transcript text, flushed on a timer or size
/// boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkEvent {
    pub transcript: String,
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    /// Strictly increasing per session, starting at 0.
    pub chunk_index: u64,
    pub speaker_id: String,
}

/// Delivery failure reported by the ingestion collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("ingestion rejected the chunk: unauthorized")]
    Unauthorized,
    #[error("ingestion rejected the chunk: unknown or closed session")]
    SessionInvalid,
    #[error("chunk delivery failed: {0}")]
    Delivery(String),
}

impl SinkError {
    /// Only the auth/session subset is surfaced to the user; everything else
    /// is logged and swallowed.
    pub fn user_visible(&self) -> bool {
        matches!(self, SinkError::Unauthorized | SinkError::SessionInvalid)
    }
}

/// Ingestion collaborator interface.
#[async_trait::async_trait]
pub trait TranscriptSink: Send + Sync {
    async fn deliver(&self, chunk: ChunkEvent) -> Result<(), SinkError>;
}
