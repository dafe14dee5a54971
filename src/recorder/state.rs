//! Recorder state management
//!
//! Defines the session recorder state machine and session bookkeeping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current state of the session recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecorderState {
    /// No phrase chosen yet
    Idle,
    /// Phrase chosen, no session written yet
    PhraseSet,
    /// A session file is open for appending
    Writing,
    /// Last session was closed and kept
    Committed,
    /// Last session was closed and deleted
    Discarded,
}

impl RecorderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecorderState::Idle => "idle",
            RecorderState::PhraseSet => "phrase set",
            RecorderState::Writing => "writing",
            RecorderState::Committed => "committed",
            RecorderState::Discarded => "discarded",
        }
    }

    /// Whether a new session may be opened from this state
    pub fn can_start_session(&self) -> bool {
        matches!(
            self,
            RecorderState::PhraseSet | RecorderState::Committed | RecorderState::Discarded
        )
    }
}

impl Default for RecorderState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Information about the open session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    /// Phrase being signed
    pub phrase: String,

    /// Session number within the phrase (1, 2, 3, ...)
    pub number: u32,

    /// Session file being written
    pub path: PathBuf,

    /// Lines appended so far
    pub frames_written: usize,

    /// Bytes appended so far (UTF-16)
    pub bytes_written: u64,

    /// When the session file was opened
    pub started_at: DateTime<Utc>,
}

/// Result of a committed session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub phrase: String,
    pub number: u32,
    pub path: PathBuf,
    pub frames_written: usize,
    pub bytes_written: u64,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Wall-clock length of the session in milliseconds
    pub fn duration_ms(&self) -> i64 {
        (self.ended_at - self.started_at).num_milliseconds()
    }
}

/// What `discard` actually did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscardOutcome {
    /// The session file was closed and deleted
    Deleted,
    /// The session was closed but its file had already been removed
    AlreadyGone,
    /// No session was open; nothing changed
    NothingOpen,
}
