use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use super::backoff::{RestartBackoff, RestartPolicy};
use super::buffer::TranscriptBuffer;
use super::session::{CaptureError, CaptureSession, CaptureState, Role, SessionStatus};
use super::silence::{SilencePolicy, SilenceState};
use crate::engine::{EngineErrorKind, EngineEvent, ErrorDisposition, SpeechEngine};
use crate::notify::{Notice, Notifier};
use crate::sink::{ChunkEvent, TranscriptSink};

/// Timing and size constants for the capture pipeline.
#[derive(Debug, Clone)]
pub struct CaptureTuning {
    /// How long a buffer accumulates before its chunk is flushed
    pub chunk_duration: Duration,
    /// Buffer length that forces an early flush
    pub max_buffer_chars: usize,
    pub restart: RestartPolicy,
    pub silence: SilencePolicy,
}

impl Default for CaptureTuning {
    fn default() -> Self {
        Self {
            chunk_duration: Duration::from_secs(7),
            max_buffer_chars: 1000,
            restart: RestartPolicy::default(),
            silence: SilencePolicy::default(),
        }
    }
}

/// Commands accepted by the controller task.
enum CaptureCommand {
    Start {
        session_id: String,
        role: Role,
        speaker_id: Option<String>,
        reply: oneshot::Sender<Result<(), CaptureError>>,
    },
    Pause {
        reply: oneshot::Sender<Result<(), CaptureError>>,
    },
    Resume {
        reply: oneshot::Sender<Result<(), CaptureError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<SessionStatus>,
    },
}

/// Cloneable client for the capture controller task.
#[derive(Clone)]
pub struct CaptureHandle {
    tx: mpsc::Sender<CaptureCommand>,
}

impl CaptureHandle {
    pub async fn start(
        &self,
        session_id: impl Into<String>,
        role: Role,
        speaker_id: Option<String>,
    ) -> Result<(), CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureCommand::Start {
                session_id: session_id.into(),
                role,
                speaker_id,
                reply,
            })
            .await
            .map_err(|_| CaptureError::ControllerClosed)?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }

    pub async fn pause(&self) -> Result<(), CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureCommand::Pause { reply })
            .await
            .map_err(|_| CaptureError::ControllerClosed)?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }

    pub async fn resume(&self) -> Result<(), CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureCommand::Resume { reply })
            .await
            .map_err(|_| CaptureError::ControllerClosed)?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)?
    }

    /// Stop capture. Idempotent: stopping an already stopped controller is a
    /// no-op.
    pub async fn stop(&self) -> Result<(), CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureCommand::Stop { reply })
            .await
            .map_err(|_| CaptureError::ControllerClosed)?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)
    }

    pub async fn status(&self) -> Result<SessionStatus, CaptureError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(CaptureCommand::Status { reply })
            .await
            .map_err(|_| CaptureError::ControllerClosed)?;
        rx.await.map_err(|_| CaptureError::ControllerClosed)
    }
}

/// What woke the controller loop up.
enum Wake {
    Command(Option<CaptureCommand>),
    Engine(Option<EngineEvent>),
    FlushTimer,
    RestartTimer,
    SilencePoll,
}

/// Single-consumer state machine driving one capture session at a time.
///
/// All mutation happens inside this task: user commands, engine events and
/// timer firings are serialized through one `select!` loop, so each handler
/// runs to completion before the next event is processed. Chunk hand-off and
/// notices are spawned, never awaited on the control path.
pub struct CaptureController {
    commands: mpsc::Receiver<CaptureCommand>,
    engine: Box<dyn SpeechEngine>,
    sink: Arc<dyn TranscriptSink>,
    notifier: Arc<dyn Notifier>,
    tuning: CaptureTuning,

    session: Option<CaptureSession>,
    buffer: TranscriptBuffer,
    backoff: RestartBackoff,

    engine_rx: Option<mpsc::Receiver<EngineEvent>>,
    flush_at: Option<Instant>,
    restart_at: Option<Instant>,
    silence_ticker: Option<Interval>,
    silence_state: SilenceState,
}

impl CaptureController {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        sink: Arc<dyn TranscriptSink>,
        notifier: Arc<dyn Notifier>,
        tuning: CaptureTuning,
    ) -> (CaptureHandle, Self) {
        let (tx, commands) = mpsc::channel(32);

        let controller = Self {
            commands,
            engine,
            sink,
            notifier,
            buffer: TranscriptBuffer::new(tuning.max_buffer_chars),
            backoff: RestartBackoff::new(tuning.restart.clone()),
            tuning,
            session: None,
            engine_rx: None,
            flush_at: None,
            restart_at: None,
            silence_ticker: None,
            silence_state: SilenceState::default(),
        };

        (CaptureHandle { tx }, controller)
    }

    /// Run the controller until every handle is dropped.
    pub async fn run(mut self) {
        info!("Capture controller started (engine: {})", self.engine.name());

        loop {
            let wake = tokio::select! {
                cmd = self.commands.recv() => Wake::Command(cmd),
                event = recv_engine(&mut self.engine_rx) => Wake::Engine(event),
                _ = sleep_until_opt(self.flush_at) => Wake::FlushTimer,
                _ = sleep_until_opt(self.restart_at) => Wake::RestartTimer,
                _ = tick_opt(&mut self.silence_ticker) => Wake::SilencePoll,
            };

            match wake {
                Wake::Command(Some(cmd)) => self.handle_command(cmd).await,
                Wake::Command(None) => {
                    // All handles dropped: shut the session down and exit.
                    self.stop_session("controller shutdown").await;
                    break;
                }
                Wake::Engine(Some(event)) => self.handle_engine_event(event).await,
                Wake::Engine(None) => {
                    // Forwarder task died without an explicit Ended event.
                    self.engine_rx = None;
                    self.handle_engine_ended().await;
                }
                Wake::FlushTimer => self.flush_chunk("timer"),
                Wake::RestartTimer => self.fire_restart().await,
                Wake::SilencePoll => self.poll_silence(),
            }
        }

        info!("Capture controller stopped");
    }

    // ------------------------------------------------------------------
    // User commands
    // ------------------------------------------------------------------

    async fn handle_command(&mut self, cmd: CaptureCommand) {
        match cmd {
            CaptureCommand::Start {
                session_id,
                role,
                speaker_id,
                reply,
            } => {
                let result = self.cmd_start(session_id, role, speaker_id).await;
                let _ = reply.send(result);
            }
            CaptureCommand::Pause { reply } => {
                let _ = reply.send(self.cmd_pause().await);
            }
            CaptureCommand::Resume { reply } => {
                let _ = reply.send(self.cmd_resume().await);
            }
            CaptureCommand::Stop { reply } => {
                self.stop_session("user stop").await;
                let _ = reply.send(());
            }
            CaptureCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
        }
    }

    async fn cmd_start(
        &mut self,
        session_id: String,
        role: Role,
        speaker_id: Option<String>,
    ) -> Result<(), CaptureError> {
        let session_id = session_id.trim().to_string();
        if session_id.is_empty() {
            return Err(CaptureError::EmptySessionId);
        }
        if !role.can_capture() {
            warn!("Capture start rejected for role '{}'", role.as_str());
            return Err(CaptureError::PermissionDenied(role.as_str().to_string()));
        }
        if let Some(session) = &self.session {
            if matches!(session.state, CaptureState::Listening | CaptureState::Paused) {
                return Err(CaptureError::SessionActive(session.session_id.clone()));
            }
        }

        info!("Starting capture for session {} (role={})", session_id, role.as_str());

        let speaker_id = speaker_id.unwrap_or_else(|| role.as_str().to_string());
        self.session = Some(CaptureSession::new(session_id.clone(), speaker_id));
        self.buffer.clear();
        self.backoff.reset();

        match self.engine.start(&session_id).await {
            Ok(rx) => {
                self.engine_rx = Some(rx);
                Ok(())
            }
            Err(e) if e.kind.disposition() == ErrorDisposition::Fatal => {
                error!("Engine refused to start: {}", e);
                self.session = None;
                Err(CaptureError::EngineStart(e.to_string()))
            }
            Err(e) => {
                // Transient failure on the very first start: the session is
                // live, the restart controller takes it from here.
                warn!("Engine start failed, scheduling restart: {}", e);
                self.schedule_restart();
                Ok(())
            }
        }
    }

    async fn cmd_pause(&mut self) -> Result<(), CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::InvalidTransition {
            action: "pause",
            state: CaptureState::Idle.as_str(),
        })?;
        if session.state != CaptureState::Listening {
            return Err(CaptureError::InvalidTransition {
                action: "pause",
                state: session.state.as_str(),
            });
        }

        info!("Pausing capture for session {}", session.session_id);

        session.state = CaptureState::Paused;
        session.manually_paused = true;

        // Buffer contents survive the pause; only the timers are cancelled.
        self.flush_at = None;
        self.restart_at = None;
        self.silence_ticker = None;
        self.engine_rx = None;

        if let Err(e) = self.engine.stop().await {
            warn!("Engine stop during pause failed: {}", e);
        }

        Ok(())
    }

    async fn cmd_resume(&mut self) -> Result<(), CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::InvalidTransition {
            action: "resume",
            state: CaptureState::Idle.as_str(),
        })?;
        if session.state != CaptureState::Paused {
            return Err(CaptureError::InvalidTransition {
                action: "resume",
                state: session.state.as_str(),
            });
        }

        info!("Resuming capture for session {}", session.session_id);

        session.state = CaptureState::Listening;
        session.manually_paused = false;
        session.touch_activity();
        self.backoff.reset();

        let session_id = session.session_id.clone();
        match self.engine.start(&session_id).await {
            Ok(rx) => {
                self.engine_rx = Some(rx);
                Ok(())
            }
            Err(e) if e.kind.disposition() == ErrorDisposition::Fatal => {
                error!("Engine refused to resume: {}", e);
                self.stop_session("fatal engine error on resume").await;
                Err(CaptureError::EngineStart(e.to_string()))
            }
            Err(e) => {
                warn!("Engine resume failed, scheduling restart: {}", e);
                self.schedule_restart();
                Ok(())
            }
        }
    }

    /// Tear the session down. Safe to call in any state; a second call while
    /// already stopped changes nothing and emits nothing.
    async fn stop_session(&mut self, reason: &str) {
        let Some(session) = &self.session else {
            return;
        };
        if session.state == CaptureState::Stopped {
            return;
        }

        info!(
            "Stopping capture for session {} ({})",
            session.session_id, reason
        );

        // Pending text goes out as a final chunk rather than being discarded.
        self.flush_chunk("stop");

        self.flush_at = None;
        self.restart_at = None;
        self.silence_ticker = None;
        self.engine_rx = None;
        self.backoff.reset();

        if let Err(e) = self.engine.stop().await {
            warn!("Engine stop failed: {}", e);
        }

        if let Some(session) = &mut self.session {
            session.state = CaptureState::Stopped;
            session.manually_paused = false;
        }
    }

    fn status(&self) -> SessionStatus {
        match &self.session {
            None => SessionStatus::idle(),
            Some(session) => SessionStatus {
                state: session.state,
                session_id: Some(session.session_id.clone()),
                speaker_id: Some(session.speaker_id.clone()),
                started_at: Some(session.started_at),
                seconds_since_activity: Some(
                    Instant::now()
                        .saturating_duration_since(session.last_activity_at)
                        .as_secs_f64(),
                ),
                restart_attempts: self.backoff.attempts(),
                chunks_emitted: session.chunks_emitted,
                no_speech_count: session.no_speech_count,
            },
        }
    }

    // ------------------------------------------------------------------
    // Engine events
    // ------------------------------------------------------------------

    async fn handle_engine_event(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Started => self.handle_engine_started(),
            EngineEvent::Result { text, is_final } => self.handle_engine_result(&text, is_final),
            EngineEvent::Error { kind, message } => {
                self.handle_engine_error(kind, &message).await;
            }
            EngineEvent::Ended => {
                self.engine_rx = None;
                self.handle_engine_ended().await;
            }
        }
    }

    fn handle_engine_started(&mut self) {
        let Some(session) = &mut self.session else {
            return;
        };

        debug!("Engine started for session {}", session.session_id);

        session.touch_activity();
        self.backoff.reset();

        if session.state == CaptureState::Listening {
            let mut ticker = time::interval_at(
                Instant::now() + self.tuning.silence.poll_interval,
                self.tuning.silence.poll_interval,
            );
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.silence_ticker = Some(ticker);
            self.silence_state = SilenceState::default();
        }
    }

    fn handle_engine_result(&mut self, text: &str, is_final: bool) {
        let Some(session) = &mut self.session else {
            return;
        };

        session.touch_activity();
        self.backoff.reset();

        // Interim results only count as activity.
        if !is_final || session.state != CaptureState::Listening {
            return;
        }

        if self.buffer.append(text) && self.flush_at.is_none() {
            self.flush_at = Some(Instant::now() + self.tuning.chunk_duration);
        }

        if self.buffer.over_limit() {
            self.flush_chunk("size");
        }
    }

    async fn handle_engine_error(&mut self, kind: EngineErrorKind, message: &str) {
        let Some(session) = &mut self.session else {
            return;
        };

        match kind.disposition() {
            ErrorDisposition::Fatal => {
                error!(
                    "Fatal engine error for session {}: {} ({})",
                    session.session_id, kind, message
                );
                self.spawn_notice(Notice::warning(
                    "Microphone access was denied. Voice capture has stopped; \
                     re-enable the microphone and start capture again.",
                ));
                self.stop_session("permission denied").await;
            }
            ErrorDisposition::Ignore => {
                session.no_speech_count += 1;
                debug!(
                    "Engine reported no speech for session {} (count={})",
                    session.session_id, session.no_speech_count
                );
            }
            ErrorDisposition::Restart => {
                warn!(
                    "Recoverable engine error for session {}: {} ({})",
                    session.session_id, kind, message
                );
                self.schedule_restart();
            }
        }
    }

    async fn handle_engine_ended(&mut self) {
        let Some(session) = &self.session else {
            return;
        };

        match session.state {
            CaptureState::Listening if !session.manually_paused => {
                debug!(
                    "Engine ended while listening for session {}; scheduling restart",
                    session.session_id
                );
                self.schedule_restart();
            }
            CaptureState::Paused => {
                // Expected tail of a manual pause; stay paused.
                debug!("Engine ended after manual pause");
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Restart scheduling
    // ------------------------------------------------------------------

    fn schedule_restart(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if session.state != CaptureState::Listening || session.manually_paused {
            return;
        }

        let delay = self.backoff.next_delay();
        info!(
            "Scheduling engine restart for session {} in {:?} (attempt {})",
            session.session_id,
            delay,
            self.backoff.attempts()
        );
        self.restart_at = Some(Instant::now() + delay);
    }

    async fn fire_restart(&mut self) {
        self.restart_at = None;

        let Some(session) = &self.session else {
            return;
        };
        if session.state != CaptureState::Listening || session.manually_paused {
            return;
        }

        let session_id = session.session_id.clone();
        match self.engine.start(&session_id).await {
            Ok(rx) => {
                info!("Engine restarted for session {}", session_id);
                self.engine_rx = Some(rx);
            }
            Err(e) if e.kind.disposition() == ErrorDisposition::Fatal => {
                error!("Fatal error on engine restart: {}", e);
                self.spawn_notice(Notice::warning(
                    "Microphone access was denied. Voice capture has stopped; \
                     re-enable the microphone and start capture again.",
                ));
                self.stop_session("permission denied").await;
            }
            Err(e) => {
                // A synchronous start failure is just the next failure in the
                // progression: one increment, one new timer.
                warn!("Engine restart failed: {}", e);
                self.schedule_restart();
            }
        }
    }

    // ------------------------------------------------------------------
    // Chunk flushing and silence polling
    // ------------------------------------------------------------------

    /// Flush the buffer as a chunk. Buffer and timer state are reset before
    /// the hand-off so fragments arriving during delivery start a fresh
    /// buffer instead of racing the in-flight chunk.
    fn flush_chunk(&mut self, trigger: &str) {
        self.flush_at = None;

        let Some(session) = &mut self.session else {
            self.buffer.clear();
            return;
        };

        let Some(transcript) = self.buffer.take() else {
            return;
        };

        let chunk = ChunkEvent {
            transcript,
            timestamp: chrono::Utc::now(),
            session_id: session.session_id.clone(),
            chunk_index: session.claim_chunk_index(),
            speaker_id: session.speaker_id.clone(),
        };
        session.chunks_emitted += 1;

        info!(
            "Flushing chunk {} for session {} ({} chars, trigger={})",
            chunk.chunk_index,
            chunk.session_id,
            chunk.transcript.len(),
            trigger
        );

        let sink = Arc::clone(&self.sink);
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            let session_id = chunk.session_id.clone();
            let index = chunk.chunk_index;

            match sink.deliver(chunk).await {
                Ok(()) => debug!("Chunk {} delivered for session {}", index, session_id),
                Err(e) if e.user_visible() => {
                    error!("Dropping chunk {} for session {}: {}", index, session_id, e);
                    let notice =
                        Notice::warning(format!("Transcript could not be saved: {}", e));
                    if let Err(err) = notifier.notify(&session_id, notice).await {
                        warn!("Failed to publish delivery notice: {}", err);
                    }
                }
                // Dropped, not retried. Known limitation of the hand-off.
                Err(e) => error!("Dropping chunk {} for session {}: {}", index, session_id, e),
            }
        });
    }

    fn poll_silence(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        if session.state != CaptureState::Listening {
            return;
        }

        let notices = self.silence_state.check(
            &self.tuning.silence,
            Instant::now(),
            session.last_activity_at,
        );

        for (severity, message) in notices {
            info!(
                "Silence notice ({}) for session {}: {}",
                severity.as_str(),
                session.session_id,
                message
            );
            self.spawn_notice(Notice { severity, message });
        }
    }

    /// Publish a notice without blocking the control loop.
    fn spawn_notice(&self, notice: Notice) {
        let Some(session) = &self.session else {
            return;
        };
        let session_id = session.session_id.clone();
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            if let Err(e) = notifier.notify(&session_id, notice).await {
                warn!("Failed to publish notice for session {}: {}", session_id, e);
            }
        });
    }
}

// Select helpers: absent sources park their arm on a pending future instead
// of needing unwraps inside the select arms.

async fn recv_engine(rx: &mut Option<mpsc::Receiver<EngineEvent>>) -> Option<EngineEvent> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn tick_opt(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
