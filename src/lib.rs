pub mod capture;
pub mod config;
pub mod engine;
pub mod http;
pub mod nats;
pub mod notify;
pub mod sink;

pub use capture::{
    CaptureController, CaptureError, CaptureHandle, CaptureState, CaptureTuning, RestartPolicy,
    Role, SessionStatus, SilencePolicy,
};
pub use config::Config;
pub use engine::{EngineErrorKind, EngineEvent, NatsSpeechEngine, SpeechEngine};
pub use http::{create_router, AppState};
pub use nats::NatsClient;
pub use notify::{NatsNotifier, Notice, Notifier, Severity};
pub use sink::{ChunkEvent, NatsTranscriptSink, SinkError, TranscriptSink};
