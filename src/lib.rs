//! CopyCat capture core - skeletal frame capture and session recording.
//!
//! Turns the depth sensor's per-tick skeleton stream into normalized text
//! records, gates recording on gesture confirmation, and keeps one durable
//! session file per signing attempt.

pub mod capture;
pub mod config;
pub mod gesture;
pub mod progress;
pub mod recorder;
pub mod skeleton;
pub mod utils;

pub use capture::{CaptureEvent, CaptureLoop, RecordingSwitch};
pub use config::CaptureConfig;
pub use utils::error::{CaptureError, CaptureResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the tracing subscriber for a host process
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "copycat_capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting CopyCat capture v{}", env!("CARGO_PKG_VERSION"));
}
