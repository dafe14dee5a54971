//! Replays a recorded sensor trace through the capture loop.
//!
//! Usage: `copycat-capture <trace.jsonl> <phrase> [config.json]`

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

use copycat_capture::capture::{CaptureEvent, CaptureLoop, RecordingSwitch, ReplayTrace};
use copycat_capture::CaptureConfig;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    copycat_capture::init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: copycat-capture <trace.jsonl> <phrase> [config.json]");
    }

    let config = match args.get(2) {
        Some(path) => CaptureConfig::load(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => CaptureConfig::default(),
    }
    .with_env_overrides();

    let trace = ReplayTrace::load(Path::new(&args[0]))
        .with_context(|| format!("Failed to load trace from {}", args[0]))?;
    let ticks = trace.len();

    let switch = RecordingSwitch::new();
    let (bodies, gestures) = trace.into_sources(config.body_count, switch.clone());
    let tick_interval_ms = config.tick_interval_ms;

    let mut capture =
        CaptureLoop::new(config, Box::new(bodies), Box::new(gestures))?.with_switch(switch);
    capture.set_phrase(&args[1])?;

    let mut events = capture.subscribe();
    let logger = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Event log fell behind, {} events missed", missed)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut interval = (tick_interval_ms > 0)
        .then(|| tokio::time::interval(Duration::from_millis(tick_interval_ms)));

    for _ in 0..ticks {
        if let Some(interval) = interval.as_mut() {
            interval.tick().await;
        }
        capture.tick()?;
        tokio::task::yield_now().await;
    }

    let status = capture.status();
    capture.shutdown()?;
    drop(capture);
    logger.await?;

    tracing::info!(
        "Replay finished: next session {}, {} frames rejected",
        status.next_session,
        status.frames_rejected
    );
    Ok(())
}

fn log_event(event: &CaptureEvent) {
    match event {
        CaptureEvent::SessionStarted { phrase, number, path } => {
            tracing::info!("Session {} of '{}' started at {:?}", number, phrase, path)
        }
        CaptureEvent::SessionCommitted(summary) => tracing::info!(
            "Session {} of '{}' kept with {} frames",
            summary.number,
            summary.phrase,
            summary.frames_written
        ),
        CaptureEvent::SessionDiscarded { phrase, number, outcome } => {
            tracing::info!("Session {} of '{}' discarded ({:?})", number, phrase, outcome)
        }
        CaptureEvent::SessionFailed { phrase, number, message } => {
            tracing::error!("Session {} of '{}' failed: {}", number, phrase, message)
        }
        CaptureEvent::StartGesture { slot, tracking_id } => {
            tracing::info!("Body {} in slot {} is ready to sign", tracking_id, slot)
        }
        CaptureEvent::FrameRejected { slot, tracking_id, norm } => tracing::debug!(
            "Rejected frame from body {} in slot {} (norm {})",
            tracking_id,
            slot,
            norm
        ),
    }
}
