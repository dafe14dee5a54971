//! External recording toggle
//!
//! The host UI (record button, debug key, start gesture) flips this; the
//! capture loop samples it once per tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared on/off recording flag
#[derive(Debug, Clone, Default)]
pub struct RecordingSwitch {
    on: Arc<AtomicBool>,
}

impl RecordingSwitch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }

    pub fn set(&self, on: bool) {
        self.on.store(on, Ordering::SeqCst);
    }

    /// Flip the flag, returning the new value
    pub fn toggle(&self) -> bool {
        !self.on.fetch_xor(true, Ordering::SeqCst)
    }
}
