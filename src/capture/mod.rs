//! Voice-capture control pipeline
//!
//! This module is the core of the service:
//! - `controller`: single-consumer state machine orchestrating the speech
//!   engine, timers and collaborators (Idle, Listening, Paused, Stopped)
//! - `buffer`: accumulates finalized fragments into timed chunks
//! - `backoff`: capped exponential restart delays that never give up
//! - `silence`: advisory, rate-limited inactivity notices
//!
//! Capture is controlled through [`CaptureHandle`]; all state lives inside
//! the [`CaptureController`] task.

mod backoff;
mod buffer;
mod controller;
mod session;
mod silence;

pub use backoff::{RestartBackoff, RestartPolicy};
pub use buffer::TranscriptBuffer;
pub use controller::{CaptureController, CaptureHandle, CaptureTuning};
pub use session::{CaptureError, CaptureSession, CaptureState, Role, SessionStatus};
pub use silence::{SilencePolicy, SilenceState};
