//! Capture loop
//!
//! Per-tick orchestrator: pulls the latest body frame, writes normalized
//! frames into the open session, feeds gesture results into each body's
//! gate, and opens/commits/discards sessions as the recording switch flips.
//!
//! Everything runs on the caller's thread. Do not hand frames to other
//! threads without putting the recorder and the gates behind a lock.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::switch::RecordingSwitch;
use super::traits::{BodyFrameSource, GestureSource};
use crate::config::CaptureConfig;
use crate::gesture::{GateState, GestureGate};
use crate::recorder::{DiscardOutcome, SessionRecorder, SessionSummary, SinkOpener};
use crate::skeleton::{normalize, BodyFrame, TrackedBody};
use crate::utils::error::{CaptureError, CaptureResult};

/// Events emitted during capture
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// A session file was opened
    SessionStarted {
        phrase: String,
        number: u32,
        path: PathBuf,
    },
    /// Recording stopped with the attempt confirmed
    SessionCommitted(SessionSummary),
    /// Recording stopped without confirmation
    SessionDiscarded {
        phrase: String,
        number: u32,
        outcome: DiscardOutcome,
    },
    /// The session could not be written and was marked bad
    SessionFailed {
        phrase: String,
        number: u32,
        message: String,
    },
    /// A body completed the start gesture chain
    StartGesture { slot: usize, tracking_id: u64 },
    /// A frame was skipped because the pose was degenerate
    FrameRejected {
        slot: usize,
        tracking_id: u64,
        norm: f64,
    },
}

/// Where the loop is in the recording cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RunState {
    /// Waiting for the switch to turn on
    NotRunning,
    /// A session is open and frames are being appended
    Recording,
    /// The session failed; waiting for the switch to turn off
    Failed,
}

/// Snapshot for the host UI
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureStatus {
    pub run_state: RunState,
    pub phrase: Option<String>,
    pub session: Option<u32>,
    pub next_session: u32,
    pub frames_in_session: usize,
    pub tracked_bodies: usize,
    pub frames_rejected: u64,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self {
            run_state: RunState::NotRunning,
            phrase: None,
            session: None,
            next_session: 1,
            frames_in_session: 0,
            tracked_bodies: 0,
            frames_rejected: 0,
        }
    }
}

struct BodySlot {
    tracking_id: u64,
    gate: GestureGate,
}

/// Drives capture from sensor frames to session files
pub struct CaptureLoop {
    config: CaptureConfig,
    bodies: Box<dyn BodyFrameSource>,
    gestures: Box<dyn GestureSource>,
    recorder: SessionRecorder,
    slots: Vec<BodySlot>,
    switch: RecordingSwitch,
    run_state: RunState,
    phrase: Option<String>,
    frames_rejected: u64,
    status: Arc<RwLock<CaptureStatus>>,
    event_tx: broadcast::Sender<CaptureEvent>,
    closed: bool,
}

impl CaptureLoop {
    /// Register the gesture catalog and put every slot in the paused,
    /// untracked state.
    pub fn new(
        config: CaptureConfig,
        bodies: Box<dyn BodyFrameSource>,
        mut gestures: Box<dyn GestureSource>,
    ) -> CaptureResult<Self> {
        config.validate()?;
        config.gestures.register_all(gestures.as_mut())?;

        let catalog = Arc::new(config.gestures.clone());
        let slot_count = bodies.body_count();
        let slots = (0..slot_count)
            .map(|slot| {
                gestures.bind(slot, 0);
                gestures.set_paused(slot, true);
                BodySlot {
                    tracking_id: 0,
                    gate: GestureGate::new(catalog.clone()),
                }
            })
            .collect();

        let recorder = SessionRecorder::new(&config.file_extension, config.writer_buffer_bytes);
        let (event_tx, _) = broadcast::channel(100);

        tracing::info!(
            "Capture loop ready: {} body slots, data root {:?}",
            slot_count,
            config.data_root
        );

        Ok(Self {
            config,
            bodies,
            gestures,
            recorder,
            slots,
            switch: RecordingSwitch::new(),
            run_state: RunState::NotRunning,
            phrase: None,
            frames_rejected: 0,
            status: Arc::new(RwLock::new(CaptureStatus::default())),
            event_tx,
            closed: false,
        })
    }

    /// Handle for toggling recording from outside the loop
    pub fn switch(&self) -> RecordingSwitch {
        self.switch.clone()
    }

    /// Use an externally owned switch
    pub fn with_switch(mut self, switch: RecordingSwitch) -> Self {
        self.switch = switch;
        self
    }

    /// Create session files through `opener` instead of the filesystem default
    pub fn with_sink_opener(mut self, opener: SinkOpener) -> Self {
        self.recorder.set_opener(opener);
        self
    }

    /// Subscribe to capture events
    pub fn subscribe(&self) -> broadcast::Receiver<CaptureEvent> {
        self.event_tx.subscribe()
    }

    pub fn status(&self) -> CaptureStatus {
        self.status.read().clone()
    }

    /// Shared status handle, refreshed every tick
    pub fn status_handle(&self) -> Arc<RwLock<CaptureStatus>> {
        self.status.clone()
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn recorder(&self) -> &SessionRecorder {
        &self.recorder
    }

    /// Gate state of one body slot
    pub fn gate_state(&self, slot: usize) -> Option<GateState> {
        self.slots.get(slot).map(|s| s.gate.state())
    }

    /// Phrase the next session will record
    pub fn set_phrase(&mut self, phrase: &str) -> CaptureResult<()> {
        if self.run_state == RunState::Recording {
            return Err(CaptureError::InvalidTransition {
                operation: "change phrase",
                state: "recording",
            });
        }
        crate::recorder::layout::validate_phrase(phrase)?;
        self.phrase = Some(phrase.to_string());
        self.publish_status();
        Ok(())
    }

    /// Process the latest sensor frame, if one arrived.
    ///
    /// Returns whether a frame was processed.
    pub fn tick(&mut self) -> CaptureResult<bool> {
        match self.bodies.acquire_latest() {
            Some(frame) => {
                self.process(&frame)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Run one tick's worth of work on `frame`.
    ///
    /// Only orchestration mistakes are returned (switching recording on with
    /// no phrase chosen); recording faults are reported as events. Tracking
    /// and gestures are updated either way.
    pub fn process(&mut self, frame: &BodyFrame) -> CaptureResult<()> {
        let switched = self.apply_switch();

        for slot in 0..self.slots.len() {
            let body = frame.bodies.get(slot).filter(|b| b.is_tracked());

            if let Some(body) = body {
                if self.run_state == RunState::Recording {
                    self.record_body(slot, body);
                }
            }

            self.sync_tracking(slot, body.map_or(0, |b| b.tracking_id));
        }

        for slot in 0..self.slots.len() {
            if self.slots[slot].tracking_id != 0 {
                self.observe_gestures(slot);
            }
        }

        self.publish_status();
        switched
    }

    /// Discard any partial session and release the sources.
    pub fn shutdown(&mut self) -> CaptureResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let result = match self.recorder.active_session().map(|s| s.number) {
            Some(number) => {
                tracing::info!("Shutting down mid-session, discarding session {}", number);
                self.recorder
                    .discard(number, &self.config.data_root)
                    .map(|_| ())
            }
            None => Ok(()),
        };
        self.run_state = RunState::NotRunning;

        self.gestures.close();
        self.bodies.close();
        self.publish_status();

        tracing::info!("Capture loop shut down");
        result
    }

    fn apply_switch(&mut self) -> CaptureResult<()> {
        match (self.run_state, self.switch.is_on()) {
            (RunState::NotRunning, true) => self.begin_session(),
            (RunState::Recording, false) => {
                self.end_session();
                Ok(())
            }
            (RunState::Failed, false) => {
                self.run_state = RunState::NotRunning;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn begin_session(&mut self) -> CaptureResult<()> {
        let Some(phrase) = self.phrase.clone() else {
            return Err(CaptureError::InvalidTransition {
                operation: "start recording",
                state: "no phrase chosen",
            });
        };

        if self.recorder.phrase() != Some(phrase.as_str()) {
            self.recorder.set_phrase(&phrase)?;
        }

        let number = self.recorder.next_free_session(&self.config.data_root);
        if number != self.recorder.next_session_number() {
            tracing::debug!(
                "Sessions {}..{} of '{}' already on disk, using {}",
                self.recorder.next_session_number(),
                number - 1,
                phrase,
                number
            );
        }
        match self.recorder.start_session(number, &self.config.data_root) {
            Ok(path) => {
                self.run_state = RunState::Recording;
                let _ = self.event_tx.send(CaptureEvent::SessionStarted {
                    phrase,
                    number,
                    path,
                });
            }
            Err(e) => {
                tracing::error!("Could not open session {} of '{}': {}", number, phrase, e);
                self.run_state = RunState::Failed;
                let _ = self.event_tx.send(CaptureEvent::SessionFailed {
                    phrase,
                    number,
                    message: e.to_string(),
                });
            }
        }
        Ok(())
    }

    fn end_session(&mut self) {
        let Some(session) = self.recorder.active_session().cloned() else {
            self.run_state = RunState::NotRunning;
            return;
        };
        self.run_state = RunState::NotRunning;

        let confirmed = self
            .slots
            .iter()
            .any(|s| s.tracking_id != 0 && s.gate.state().commit_confirmed());

        if confirmed {
            match self.recorder.commit() {
                Ok(Some(summary)) => {
                    let _ = self.event_tx.send(CaptureEvent::SessionCommitted(summary));
                }
                Ok(None) => {}
                Err(e) => {
                    let root = self.config.data_root.clone();
                    if let Err(mark) = self.recorder.mark_bad(session.number, &root) {
                        tracing::error!("Could not mark session {} bad: {}", session.number, mark);
                    }
                    self.report_failure(&session.phrase, session.number, &e)
                }
            }
        } else {
            match self.recorder.discard(session.number, &self.config.data_root) {
                Ok(outcome) => {
                    let _ = self.event_tx.send(CaptureEvent::SessionDiscarded {
                        phrase: session.phrase,
                        number: session.number,
                        outcome,
                    });
                }
                Err(e) => self.report_failure(&session.phrase, session.number, &e),
            }
        }
    }

    fn record_body(&mut self, slot: usize, body: &TrackedBody) {
        let record = match normalize(body) {
            Ok(record) => record,
            Err(CaptureError::DegeneratePose { norm }) => {
                self.frames_rejected += 1;
                tracing::warn!(
                    "Skipping degenerate pose for body {} in slot {}",
                    body.tracking_id,
                    slot
                );
                let _ = self.event_tx.send(CaptureEvent::FrameRejected {
                    slot,
                    tracking_id: body.tracking_id,
                    norm,
                });
                return;
            }
            Err(e) => {
                tracing::warn!("Skipping frame for slot {}: {}", slot, e);
                return;
            }
        };

        if let Err(e) = self.recorder.append(&record.to_line()) {
            self.fail_session(e);
        }
    }

    /// Stop recording after a write fault: flag the sample bad and close it.
    fn fail_session(&mut self, error: CaptureError) {
        let Some(session) = self.recorder.active_session().cloned() else {
            return;
        };
        let root = self.config.data_root.clone();

        if let Err(e) = self.recorder.mark_bad(session.number, &root) {
            tracing::error!("Could not mark session {} bad: {}", session.number, e);
        }
        if let Err(e) = self.recorder.commit() {
            tracing::error!("Could not close session {}: {}", session.number, e);
        }

        self.report_failure(&session.phrase, session.number, &error);
    }

    fn report_failure(&mut self, phrase: &str, number: u32, error: &CaptureError) {
        tracing::error!("Session {} of '{}' failed: {}", number, phrase, error);
        self.run_state = RunState::Failed;
        let _ = self.event_tx.send(CaptureEvent::SessionFailed {
            phrase: phrase.to_string(),
            number,
            message: error.to_string(),
        });
    }

    /// A new tracking id in a slot means a different person: fresh gate.
    fn sync_tracking(&mut self, slot: usize, tracking_id: u64) {
        let entry = &mut self.slots[slot];
        if entry.tracking_id == tracking_id {
            return;
        }

        tracing::debug!(
            "Slot {} tracking id {} -> {}",
            slot,
            entry.tracking_id,
            tracking_id
        );
        entry.tracking_id = tracking_id;
        entry.gate.reset();
        self.gestures.bind(slot, tracking_id);
        self.gestures.set_paused(slot, tracking_id == 0);
    }

    fn observe_gestures(&mut self, slot: usize) {
        let samples = self.gestures.poll(slot);
        let entry = &mut self.slots[slot];
        let before = entry.gate.state();

        for sample in &samples {
            entry.gate.observe(&sample.name, sample.confidence);
        }

        if !before.start_triggered() && entry.gate.state().start_triggered() {
            let tracking_id = entry.tracking_id;
            tracing::info!("Start gesture from body {} in slot {}", tracking_id, slot);
            let _ = self
                .event_tx
                .send(CaptureEvent::StartGesture { slot, tracking_id });

            if self.config.auto_start_on_gesture && !self.switch.is_on() {
                self.switch.set(true);
            }
        }
    }

    fn publish_status(&self) {
        let active = self.recorder.active_session();
        let mut status = self.status.write();
        status.run_state = self.run_state;
        status.phrase = self.phrase.clone();
        status.session = active.map(|s| s.number);
        status.next_session = self.recorder.next_session_number();
        status.frames_in_session = active.map_or(0, |s| s.frames_written);
        status.tracked_bodies = self.slots.iter().filter(|s| s.tracking_id != 0).count();
        status.frames_rejected = self.frames_rejected;
    }
}

impl Drop for CaptureLoop {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!("Error during capture shutdown: {}", e);
        }
    }
}
