use std::sync::Arc;
use tracing::debug;

use super::{ChunkEvent, SinkError, TranscriptSink};
use crate::nats::{ChunkIngestMessage, NatsClient};

/// Sends chunks to the ingestion service as NATS request/reply.
pub struct NatsTranscriptSink {
    client: Arc<NatsClient>,
}

impl NatsTranscriptSink {
    pub fn new(client: Arc<NatsClient>) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl TranscriptSink for NatsTranscriptSink {
    async fn deliver(&self, chunk: ChunkEvent) -> Result<(), SinkError> {
        let message = ChunkIngestMessage {
            transcript: chunk.transcript,
            timestamp: chunk.timestamp.to_rfc3339(),
            session_id: chunk.session_id,
            chunk_index: chunk.chunk_index,
            speaker_id: chunk.speaker_id,
        };

        let reply = self
            .client
            .request_chunk_ingest(&message)
            .await
            .map_err(|e| SinkError::Delivery(e.to_string()))?;

        if reply.ok {
            debug!(
                "Chunk {} for session {} accepted by ingestion",
                message.chunk_index, message.session_id
            );
            return Ok(());
        }

        match reply.error.as_deref() {
            Some("unauthorized") => Err(SinkError::Unauthorized),
            Some("session-invalid") => Err(SinkError::SessionInvalid),
            Some(other) => Err(SinkError::Delivery(other.to_string())),
            None => Err(SinkError::Delivery("ingestion returned ok=false".to_string())),
        }
    }
}
