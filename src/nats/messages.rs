use serde::{Deserialize, Serialize};

/// Transcript event received from the STT service.
///
/// Interim (partial) results only count as speaker activity; final results are
/// accumulated into chunks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub session_id: String,
    pub text: String,
    pub partial: bool,
    pub timestamp: String,
    pub confidence: Option<f32>,
}

/// Engine lifecycle event published by the STT service on
/// `stt.engine.<session>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatusMessage {
    pub session_id: String,
    /// "started", "ended" or "error"
    pub event: String,
    /// Error kind string, present when `event == "error"`
    pub kind: Option<String>,
    pub message: Option<String>,
}

/// Control command published to the STT service on `stt.control.<session>`.
#[derive(Debug, Serialize, Deserialize)]
pub struct EngineControlMessage {
    pub session_id: String,
    /// "start" or "stop"
    pub action: String,
}

/// Finished transcript chunk sent to the ingestion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkIngestMessage {
    pub transcript: String,
    pub timestamp: String,
    pub session_id: String,
    pub chunk_index: u64,
    pub speaker_id: String,
}

/// Reply from the ingestion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkIngestReply {
    pub ok: bool,
    /// Error code when `ok == false`: "unauthorized", "session-invalid", or a
    /// free-form delivery failure.
    pub error: Option<String>,
}

/// User-facing notice published for the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoticeMessage {
    pub id: uuid::Uuid,
    pub session_id: String,
    pub severity: String,
    pub message: String,
    pub timestamp: String,
}
