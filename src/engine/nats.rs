use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::{EngineError, EngineErrorKind, EngineEvent, SpeechEngine};
use crate::nats::{EngineStatusMessage, NatsClient, TranscriptMessage};

/// Speech engine bridged to the STT service over NATS.
///
/// `start()` asks the service to begin recognizing for a session, then maps
/// its transcript and lifecycle subjects onto [`EngineEvent`]s. The event
/// channel closing counts as the engine ending, which routes the controller
/// into its restart path.
pub struct NatsSpeechEngine {
    client: Arc<NatsClient>,
    session_id: Option<String>,
    forward_task: Option<JoinHandle<()>>,
}

impl NatsSpeechEngine {
    pub fn new(client: Arc<NatsClient>) -> Self {
        Self {
            client,
            session_id: None,
            forward_task: None,
        }
    }

    fn stop_forwarding(&mut self) {
        if let Some(task) = self.forward_task.take() {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl SpeechEngine for NatsSpeechEngine {
    async fn start(&mut self, session_id: &str) -> Result<mpsc::Receiver<EngineEvent>, EngineError> {
        // One recognition stream at a time: drop any previous forwarder.
        self.stop_forwarding();

        let mut status_sub = self
            .client
            .subscribe_engine_status(session_id)
            .await
            .map_err(|e| EngineError::new(EngineErrorKind::Network, e.to_string()))?;

        let mut transcript_sub = self
            .client
            .subscribe_transcripts()
            .await
            .map_err(|e| EngineError::new(EngineErrorKind::Network, e.to_string()))?;

        self.client
            .publish_engine_control(session_id, "start")
            .await
            .map_err(|e| EngineError::new(EngineErrorKind::Network, e.to_string()))?;

        let (tx, rx) = mpsc::channel(64);
        let session_id_owned = session_id.to_string();
        let session_id = session_id_owned.clone();

        let task = tokio::spawn(async move {
            info!("Engine event forwarder started for session {}", session_id);

            loop {
                let event = tokio::select! {
                    msg = status_sub.next() => match msg {
                        Some(msg) => match serde_json::from_slice::<EngineStatusMessage>(&msg.payload) {
                            Ok(status) if status.session_id == session_id => {
                                map_status(status)
                            }
                            Ok(_) => continue,
                            Err(e) => {
                                warn!("Failed to parse engine status message: {}", e);
                                continue;
                            }
                        },
                        // Subscription gone: treat as the engine ending.
                        None => Some(EngineEvent::Ended),
                    },
                    msg = transcript_sub.next() => match msg {
                        Some(msg) => match serde_json::from_slice::<TranscriptMessage>(&msg.payload) {
                            Ok(transcript) if transcript.session_id == session_id => {
                                Some(EngineEvent::Result {
                                    text: transcript.text,
                                    is_final: !transcript.partial,
                                })
                            }
                            Ok(_) => continue,
                            Err(e) => {
                                warn!("Failed to parse transcript message: {}", e);
                                continue;
                            }
                        },
                        None => Some(EngineEvent::Ended),
                    },
                };

                let Some(event) = event else { continue };
                let ended = event == EngineEvent::Ended;

                if tx.send(event).await.is_err() {
                    // Controller dropped the receiver; nothing left to do.
                    break;
                }
                if ended {
                    break;
                }
            }

            info!("Engine event forwarder stopped for session {}", session_id);
        });

        self.forward_task = Some(task);
        self.session_id = Some(session_id_owned);

        Ok(rx)
    }

    async fn stop(&mut self) -> anyhow::Result<()> {
        self.stop_forwarding();

        if let Some(session_id) = self.session_id.take() {
            self.client
                .publish_engine_control(&session_id, "stop")
                .await?;
        }

        Ok(())
    }

    fn name(&self) -> &str {
        "nats-stt"
    }
}

fn map_status(status: EngineStatusMessage) -> Option<EngineEvent> {
    match status.event.as_str() {
        "started" => Some(EngineEvent::Started),
        "ended" => Some(EngineEvent::Ended),
        "error" => {
            let raw = status.kind.unwrap_or_else(|| "unknown".to_string());
            Some(EngineEvent::Error {
                kind: EngineErrorKind::classify(&raw),
                message: status.message.unwrap_or_else(|| raw.clone()),
            })
        }
        other => {
            error!("Unknown engine status event: {}", other);
            None
        }
    }
}
