//! NATS plumbing shared by the external collaborators: the STT engine bridge,
//! the transcript ingestion sink and the notice publisher.

mod client;
mod messages;

pub use client::NatsClient;
pub use messages::{
    ChunkIngestMessage, ChunkIngestReply, EngineControlMessage, EngineStatusMessage, NoticeMessage,
    TranscriptMessage,
};
