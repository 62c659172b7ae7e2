use super::state::AppState;
use crate::capture::{CaptureError, Role};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartCaptureRequest {
    /// Classroom session to capture for
    pub session_id: String,

    /// Role of the caller; only teaching staff may start capture
    pub role: Role,

    /// Optional speaker identity attached to emitted chunks
    pub speaker_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CaptureActionResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_status(e: &CaptureError) -> StatusCode {
    match e {
        CaptureError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        CaptureError::EmptySessionId => StatusCode::BAD_REQUEST,
        CaptureError::SessionActive(_) | CaptureError::InvalidTransition { .. } => {
            StatusCode::CONFLICT
        }
        CaptureError::EngineStart(_) | CaptureError::ControllerClosed => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /capture/start
/// Start voice capture for a classroom session
pub async fn start_capture(
    State(state): State<AppState>,
    Json(req): Json<StartCaptureRequest>,
) -> impl IntoResponse {
    info!("Capture start requested for session: {}", req.session_id);

    match state
        .capture
        .start(req.session_id.clone(), req.role, req.speaker_id)
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(CaptureActionResponse {
                status: "listening".to_string(),
                message: format!("Capture started for session {}", req.session_id),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to start capture: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /capture/pause
pub async fn pause_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.capture.pause().await {
        Ok(()) => (
            StatusCode::OK,
            Json(CaptureActionResponse {
                status: "paused".to_string(),
                message: "Capture paused".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to pause capture: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /capture/resume
pub async fn resume_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.capture.resume().await {
        Ok(()) => (
            StatusCode::OK,
            Json(CaptureActionResponse {
                status: "listening".to_string(),
                message: "Capture resumed".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to resume capture: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// POST /capture/stop
/// Stop capture; idempotent, flushes any buffered text as a final chunk
pub async fn stop_capture(State(state): State<AppState>) -> impl IntoResponse {
    match state.capture.stop().await {
        Ok(()) => (
            StatusCode::OK,
            Json(CaptureActionResponse {
                status: "stopped".to_string(),
                message: "Capture stopped".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            error!("Failed to stop capture: {}", e);
            (
                error_status(&e),
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /capture/status
pub async fn capture_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.capture.status().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => {
            error!("Failed to get capture status: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
