use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Lifecycle of one capture session.
///
/// `Stopped` is terminal for the session; a new `start()` creates a fresh
/// session and returns to `Listening`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureState {
    Idle,
    Listening,
    Paused,
    Stopped,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Listening => "listening",
            CaptureState::Paused => "paused",
            CaptureState::Stopped => "stopped",
        }
    }
}

/// Classroom role of the caller requesting capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Professor,
    Ta,
    Student,
}

impl Role {
    /// Only teaching staff may run voice capture.
    pub fn can_capture(&self) -> bool {
        matches!(self, Role::Professor | Role::Ta)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Professor => "professor",
            Role::Ta => "ta",
            Role::Student => "student",
        }
    }
}

/// Rejected capture commands.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("role '{0}' is not allowed to start capture")]
    PermissionDenied(String),

    #[error("session id must not be empty")]
    EmptySessionId,

    #[error("a capture session is already active: {0}")]
    SessionActive(String),

    #[error("cannot {action} while {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("capture engine could not start: {0}")]
    EngineStart(String),

    #[error("capture controller is no longer running")]
    ControllerClosed,
}

/// All mutable per-session state, owned exclusively by the controller task.
#[derive(Debug)]
pub struct CaptureSession {
    pub session_id: String,
    pub speaker_id: String,
    pub state: CaptureState,
    pub started_at: DateTime<Utc>,
    /// Instant of the most recent engine activity (any result or start).
    pub last_activity_at: Instant,
    pub manually_paused: bool,
    /// Index assigned to the next flushed chunk.
    pub next_chunk_index: u64,
    pub chunks_emitted: u64,
    /// Soft counter for no-speech engine timeouts; never stops capture.
    pub no_speech_count: u64,
}

impl CaptureSession {
    pub fn new(session_id: String, speaker_id: String) -> Self {
        Self {
            session_id,
            speaker_id,
            state: CaptureState::Listening,
            started_at: Utc::now(),
            last_activity_at: Instant::now(),
            manually_paused: false,
            next_chunk_index: 0,
            chunks_emitted: 0,
            no_speech_count: 0,
        }
    }

    pub fn touch_activity(&mut self) {
        self.last_activity_at = Instant::now();
    }

    /// Claim the next chunk index (strictly increasing per session).
    pub fn claim_chunk_index(&mut self) -> u64 {
        let index = self.next_chunk_index;
        self.next_chunk_index += 1;
        index
    }
}

/// Snapshot of the controller state, answered on the status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub state: CaptureState,
    pub session_id: Option<String>,
    pub speaker_id: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    /// Seconds since the engine last produced activity
    pub seconds_since_activity: Option<f64>,
    pub restart_attempts: u32,
    pub chunks_emitted: u64,
    pub no_speech_count: u64,
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            state: CaptureState::Idle,
            session_id: None,
            speaker_id: None,
            started_at: None,
            seconds_since_activity: None,
            restart_attempts: 0,
            chunks_emitted: 0,
            no_speech_count: 0,
        }
    }
}
