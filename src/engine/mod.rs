//! Continuous speech engine contract.
//!
//! The engine converts live classroom audio into interim/final transcript
//! events. Its acoustic internals are out of scope here; the capture
//! controller only consumes this contract: `start()` yields a stream of
//! [`EngineEvent`]s, `stop()` tears the instance down. The concrete
//! implementation bridges to the STT service over NATS.

mod nats;

pub use nats::NatsSpeechEngine;

use anyhow::Result;
use std::fmt;
use tokio::sync::mpsc;

/// Event emitted by a running speech engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The engine is live and listening.
    Started,
    /// A recognition result. Interim results carry `is_final = false` and only
    /// count as activity; final results are appended to the transcript buffer.
    Result { text: String, is_final: bool },
    /// A classified engine failure.
    Error {
        kind: EngineErrorKind,
        message: String,
    },
    /// The engine stopped on its own (end of stream, service restart, ...).
    Ended,
}

/// Closed set of engine failure kinds.
///
/// The wire protocol reports errors as strings; [`EngineErrorKind::classify`]
/// is the single place those strings are mapped into the taxonomy, so the
/// controller never dispatches on raw literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineErrorKind {
    /// Microphone/audio permission revoked. Fatal: capture stops and the user
    /// must restart explicitly.
    PermissionDenied,
    /// The engine gave up waiting for speech. Not an error for capture.
    NoSpeech,
    /// Network failure between engine and audio/STT backend.
    Network,
    /// The engine aborted the recognition stream.
    Aborted,
    /// Audio device capture failed.
    AudioCapture,
    /// Anything the wire protocol reports that we do not recognize.
    Unknown,
}

/// How the controller reacts to an engine error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorDisposition {
    /// Stop capture and surface a notice.
    Fatal,
    /// Hand to the restart controller.
    Restart,
    /// Bump a soft counter, change nothing.
    Ignore,
}

impl EngineErrorKind {
    /// Map a wire-level error string onto the closed taxonomy.
    pub fn classify(raw: &str) -> Self {
        match raw {
            "permission-denied" | "not-allowed" | "service-not-allowed" => Self::PermissionDenied,
            "no-speech" => Self::NoSpeech,
            "network" => Self::Network,
            "aborted" => Self::Aborted,
            "audio-capture" => Self::AudioCapture,
            _ => Self::Unknown,
        }
    }

    pub fn disposition(&self) -> ErrorDisposition {
        match self {
            Self::PermissionDenied => ErrorDisposition::Fatal,
            Self::NoSpeech => ErrorDisposition::Ignore,
            Self::Network | Self::Aborted | Self::AudioCapture | Self::Unknown => {
                ErrorDisposition::Restart
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "permission-denied",
            Self::NoSpeech => "no-speech",
            Self::Network => "network",
            Self::Aborted => "aborted",
            Self::AudioCapture => "audio-capture",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EngineErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure starting or stopping the engine itself.
#[derive(Debug, thiserror::Error)]
#[error("speech engine error ({kind}): {message}")]
pub struct EngineError {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineError {
    pub fn new(kind: EngineErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Continuous speech engine collaborator.
///
/// Mirrors the shape of an audio capture backend: `start()` returns a channel
/// receiver the controller drains, `stop()` shuts the instance down. At most
/// one recognition stream exists per engine at a time; `start()` on a running
/// engine replaces the previous stream.
#[async_trait::async_trait]
pub trait SpeechEngine: Send {
    /// Begin recognizing speech for the given session.
    async fn start(&mut self, session_id: &str) -> Result<mpsc::Receiver<EngineEvent>, EngineError>;

    /// Stop recognizing. Idempotent.
    async fn stop(&mut self) -> Result<()>;

    /// Engine name for logging.
    fn name(&self) -> &str;
}
