use anyhow::{Context, Result};
use async_nats::Client;
use tracing::{debug, info};

use super::messages::{ChunkIngestMessage, ChunkIngestReply, EngineControlMessage, NoticeMessage};

/// Subject the ingestion service answers chunk requests on.
const INGEST_SUBJECT: &str = "class.transcripts.ingest";

/// Thin wrapper around the NATS connection shared by the engine bridge, the
/// transcript sink and the notifier.
pub struct NatsClient {
    client: Client,
}

impl NatsClient {
    /// Connect to the NATS server.
    pub async fn connect(url: &str) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self { client })
    }

    /// Subscribe to transcript events.
    ///
    /// The STT service publishes to `stt.text.partial` and `stt.text.final`;
    /// we subscribe to both and filter by session_id in the payload.
    pub async fn subscribe_transcripts(&self) -> Result<async_nats::Subscriber> {
        let subject = "stt.text.>";

        info!("Subscribing to transcripts on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to transcripts")
    }

    /// Subscribe to engine lifecycle events for one session.
    pub async fn subscribe_engine_status(&self, session_id: &str) -> Result<async_nats::Subscriber> {
        let subject = format!("stt.engine.{}", session_id);

        info!("Subscribing to engine status on {}", subject);

        self.client
            .subscribe(subject)
            .await
            .context("Failed to subscribe to engine status")
    }

    /// Ask the STT service to start or stop recognizing for a session.
    pub async fn publish_engine_control(&self, session_id: &str, action: &str) -> Result<()> {
        let subject = format!("stt.control.{}", session_id);

        let message = EngineControlMessage {
            session_id: session_id.to_string(),
            action: action.to_string(),
        };

        let payload = serde_json::to_vec(&message)?;

        self.client
            .publish(subject.clone(), payload.into())
            .await
            .context("Failed to publish engine control")?;

        info!("Published engine control to {} (action={})", subject, action);

        Ok(())
    }

    /// Send a finished chunk to the ingestion service and wait for its reply.
    pub async fn request_chunk_ingest(&self, chunk: &ChunkIngestMessage) -> Result<ChunkIngestReply> {
        let payload = serde_json::to_vec(chunk)?;

        debug!(
            "Requesting ingest of chunk {} for session {} ({} chars)",
            chunk.chunk_index,
            chunk.session_id,
            chunk.transcript.len()
        );

        let response = self
            .client
            .request(INGEST_SUBJECT, payload.into())
            .await
            .context("Failed to send chunk to ingestion service")?;

        serde_json::from_slice(&response.payload).context("Failed to parse ingestion reply")
    }

    /// Publish a user-facing notice for one session.
    pub async fn publish_notice(&self, notice: &NoticeMessage) -> Result<()> {
        let subject = format!("class.notices.{}", notice.session_id);

        let payload = serde_json::to_vec(notice)?;

        self.client
            .publish(subject, payload.into())
            .await
            .context("Failed to publish notice")?;

        Ok(())
    }
}
