// Shared test doubles for the capture controller tests: a scripted speech
// engine the test feeds events into, plus recording implementations of the
// sink and notifier collaborators.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant};

use lectern_capture::capture::{CaptureController, CaptureHandle, CaptureTuning};
use lectern_capture::engine::{EngineError, EngineErrorKind, EngineEvent, SpeechEngine};
use lectern_capture::notify::{Notice, Notifier, Severity};
use lectern_capture::sink::{ChunkEvent, SinkError, TranscriptSink};

#[derive(Default)]
struct EngineProbeInner {
    start_calls: Vec<Instant>,
    stop_calls: usize,
    senders: Vec<mpsc::Sender<EngineEvent>>,
    fail_next_start: Option<EngineErrorKind>,
}

/// Test-side view into the scripted engine: records start/stop calls and
/// hands out the sender for the current recognition stream.
#[derive(Clone, Default)]
pub struct EngineProbe {
    inner: Arc<Mutex<EngineProbeInner>>,
}

impl EngineProbe {
    pub fn start_times(&self) -> Vec<Instant> {
        self.inner.lock().unwrap().start_calls.clone()
    }

    pub fn start_count(&self) -> usize {
        self.inner.lock().unwrap().start_calls.len()
    }

    pub fn stop_count(&self) -> usize {
        self.inner.lock().unwrap().stop_calls
    }

    /// Sender for the most recent `start()` call.
    pub fn events(&self) -> mpsc::Sender<EngineEvent> {
        self.inner
            .lock()
            .unwrap()
            .senders
            .last()
            .expect("engine was never started")
            .clone()
    }

    /// Make the next `start()` call fail synchronously with the given kind.
    pub fn fail_next_start(&self, kind: EngineErrorKind) {
        self.inner.lock().unwrap().fail_next_start = Some(kind);
    }
}

/// Speech engine driven entirely by the test.
pub struct ScriptedEngine {
    probe: EngineProbe,
}

impl ScriptedEngine {
    pub fn new() -> (Self, EngineProbe) {
        let probe = EngineProbe::default();
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

#[async_trait::async_trait]
impl SpeechEngine for ScriptedEngine {
    async fn start(&mut self, _session_id: &str) -> Result<mpsc::Receiver<EngineEvent>, EngineError> {
        let mut inner = self.probe.inner.lock().unwrap();
        inner.start_calls.push(Instant::now());

        if let Some(kind) = inner.fail_next_start.take() {
            return Err(EngineError::new(kind, "scripted start failure"));
        }

        let (tx, rx) = mpsc::channel(64);
        inner.senders.push(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.probe.inner.lock().unwrap().stop_calls += 1;
        Ok(())
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Sink that records delivered chunks, optionally failing every delivery.
#[derive(Clone, Default)]
pub struct RecordingSink {
    chunks: Arc<Mutex<Vec<ChunkEvent>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl RecordingSink {
    pub fn chunks(&self) -> Vec<ChunkEvent> {
        self.chunks.lock().unwrap().clone()
    }

    /// Fail deliveries with the given ingestion error code ("unauthorized",
    /// "session-invalid", or anything else for a plain delivery failure).
    pub fn fail_with(&self, code: &str) {
        *self.fail_with.lock().unwrap() = Some(code.to_string());
    }
}

#[async_trait::async_trait]
impl TranscriptSink for RecordingSink {
    async fn deliver(&self, chunk: ChunkEvent) -> Result<(), SinkError> {
        let failure = self.fail_with.lock().unwrap().clone();
        match failure.as_deref() {
            Some("unauthorized") => Err(SinkError::Unauthorized),
            Some("session-invalid") => Err(SinkError::SessionInvalid),
            Some(other) => Err(SinkError::Delivery(other.to_string())),
            None => {
                self.chunks.lock().unwrap().push(chunk);
                Ok(())
            }
        }
    }
}

/// Notifier that records every notice.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<(Severity, String)>>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<(Severity, String)> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count_of(&self, severity: Severity) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(sev, _)| *sev == severity)
            .count()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _session_id: &str, notice: Notice) -> anyhow::Result<()> {
        self.notices
            .lock()
            .unwrap()
            .push((notice.severity, notice.message));
        Ok(())
    }
}

/// Spawn a controller wired to scripted collaborators.
pub fn spawn_capture(
    tuning: CaptureTuning,
) -> (CaptureHandle, EngineProbe, RecordingSink, RecordingNotifier) {
    let (engine, probe) = ScriptedEngine::new();
    let sink = RecordingSink::default();
    let notifier = RecordingNotifier::default();

    let (handle, controller) = CaptureController::new(
        Box::new(engine),
        Arc::new(sink.clone()),
        Arc::new(notifier.clone()),
        tuning,
    );
    tokio::spawn(controller.run());

    (handle, probe, sink, notifier)
}

/// Let the controller and any spawned hand-off tasks drain. Advances virtual
/// time by a hair, which is negligible next to the second-scale tunings used
/// in these tests.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
