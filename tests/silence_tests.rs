// Integration tests for the advisory silence monitor, run against the full
// controller with virtual time.

mod common;

use common::{settle, spawn_capture};
use std::time::Duration;
use tokio::time::sleep;

use lectern_capture::capture::{CaptureState, CaptureTuning, RestartPolicy, Role, SilencePolicy};
use lectern_capture::engine::EngineEvent;
use lectern_capture::notify::Severity;

fn tuning() -> CaptureTuning {
    CaptureTuning {
        chunk_duration: Duration::from_secs(7),
        max_buffer_chars: 1000,
        restart: RestartPolicy::default(),
        silence: SilencePolicy {
            poll_interval: Duration::from_secs(30),
            notify_after: Duration::from_secs(120),
            suggest_pause_after: Duration::from_secs(300),
        },
    }
}

#[tokio::test(start_paused = true)]
async fn continuous_silence_emits_rate_limited_notices() {
    let (capture, engine, _sink, notifier) = spawn_capture(tuning());

    capture.start("S1", Role::Professor, None).await.unwrap();
    settle().await;
    engine.events().send(EngineEvent::Started).await.unwrap();
    settle().await;

    // Ten minutes of dead air. Info notices are due at 2m, 4m, 6m, 8m, 10m;
    // warnings at 5m and 10m. Each tier respects its own window, so the 5m
    // warning fires even though an info notice fired at 4m.
    sleep(Duration::from_secs(601)).await;
    settle().await;

    assert_eq!(notifier.count_of(Severity::Info), 5);
    assert_eq!(notifier.count_of(Severity::Warning), 2);

    // Advisory only: capture is still listening.
    assert_eq!(capture.status().await.unwrap().state, CaptureState::Listening);
}

#[tokio::test(start_paused = true)]
async fn below_threshold_silence_stays_quiet() {
    let (capture, engine, _sink, notifier) = spawn_capture(tuning());

    capture.start("S1", Role::Professor, None).await.unwrap();
    settle().await;
    engine.events().send(EngineEvent::Started).await.unwrap();
    settle().await;

    sleep(Duration::from_secs(110)).await;
    settle().await;

    assert!(notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn any_recognition_activity_resets_the_silence_clock() {
    let (capture, engine, _sink, notifier) = spawn_capture(tuning());

    capture.start("S1", Role::Professor, None).await.unwrap();
    settle().await;
    engine.events().send(EngineEvent::Started).await.unwrap();
    settle().await;

    // Interim results count as activity even though they never reach the
    // buffer.
    sleep(Duration::from_secs(100)).await;
    engine
        .events()
        .send(EngineEvent::Result {
            text: "still here".to_string(),
            is_final: false,
        })
        .await
        .unwrap();
    settle().await;

    sleep(Duration::from_secs(100)).await;
    settle().await;

    assert!(notifier.notices().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_tears_the_monitor_down() {
    let (capture, engine, _sink, notifier) = spawn_capture(tuning());

    capture.start("S1", Role::Professor, None).await.unwrap();
    settle().await;
    engine.events().send(EngineEvent::Started).await.unwrap();
    settle().await;

    capture.stop().await.unwrap();
    settle().await;

    sleep(Duration::from_secs(900)).await;
    settle().await;

    assert!(notifier.notices().is_empty());
}
