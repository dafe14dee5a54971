//! Session recording module
//!
//! This module implements durable storage of captured frames:
//! - SessionRecorder owning the one open session file
//! - Recorder state machine and session bookkeeping
//! - Deterministic on-disk layout of phrases and sessions

pub mod layout;
pub mod session;
pub mod state;

pub use session::{open_session_file, SessionRecorder, SessionSink, SinkOpener};
pub use state::{DiscardOutcome, RecorderState, SessionInfo, SessionSummary};
