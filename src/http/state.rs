use crate::capture::CaptureHandle;

/// Shared application state for HTTP handlers.
///
/// Only one capture session exists at a time, so the state is just the handle
/// to the controller task.
#[derive(Clone)]
pub struct AppState {
    pub capture: CaptureHandle,
}

impl AppState {
    pub fn new(capture: CaptureHandle) -> Self {
        Self { capture }
    }
}
