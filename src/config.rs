use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;

use crate::capture::{CaptureTuning, RestartPolicy, SilencePolicy};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub nats: NatsConfig,
    pub capture: CaptureConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct NatsConfig {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct CaptureConfig {
    pub chunk_duration_secs: u64,
    pub max_buffer_chars: usize,
    pub restart_base_delay_ms: u64,
    pub restart_max_delay_ms: u64,
    pub restart_max_attempts: u32,
    pub silence_poll_interval_secs: u64,
    pub silence_notify_after_secs: u64,
    pub silence_suggest_pause_after_secs: u64,
}

impl Config {
    /// Load configuration from an optional TOML file layered over defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "lectern-capture")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 3030)?
            .set_default("nats.url", "nats://localhost:4222")?
            .set_default("capture.chunk_duration_secs", 7)?
            .set_default("capture.max_buffer_chars", 1000)?
            .set_default("capture.restart_base_delay_ms", 1000)?
            .set_default("capture.restart_max_delay_ms", 30000)?
            .set_default("capture.restart_max_attempts", 6)?
            .set_default("capture.silence_poll_interval_secs", 30)?
            .set_default("capture.silence_notify_after_secs", 120)?
            .set_default("capture.silence_suggest_pause_after_secs", 300)?
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

impl CaptureConfig {
    pub fn tuning(&self) -> CaptureTuning {
        CaptureTuning {
            chunk_duration: Duration::from_secs(self.chunk_duration_secs),
            max_buffer_chars: self.max_buffer_chars,
            restart: RestartPolicy {
                base_delay: Duration::from_millis(self.restart_base_delay_ms),
                max_delay: Duration::from_millis(self.restart_max_delay_ms),
                max_attempts: self.restart_max_attempts,
            },
            silence: SilencePolicy {
                poll_interval: Duration::from_secs(self.silence_poll_interval_secs),
                notify_after: Duration::from_secs(self.silence_notify_after_secs),
                suggest_pause_after: Duration::from_secs(self.silence_suggest_pause_after_secs),
            },
        }
    }
}
