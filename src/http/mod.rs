//! HTTP API server for external control (classroom dashboard)
//!
//! This module provides a REST API for controlling the capture session:
//! - POST /capture/start - Start voice capture for a session
//! - POST /capture/pause - Pause capture (buffer preserved)
//! - POST /capture/resume - Resume a paused capture
//! - POST /capture/stop - Stop capture (idempotent)
//! - GET /capture/status - Query session status
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
