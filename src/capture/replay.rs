//! Recorded trace replay
//!
//! Plays back a JSON-lines capture trace as if it came from the sensor.
//! Each line is one tick:
//!
//! ```json
//! {"frame": {"bodies": [...]}, "gestures": [{"trackingId": 7, "name": "sw1", "confidence": 0.3}], "recording": true}
//! ```
//!
//! `frame` may be null (no frame that tick), `recording` flips the
//! recording switch before the frame is handed out.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::rc::Rc;

use super::switch::RecordingSwitch;
use super::traits::{BodyFrameSource, GestureSample, GestureSource};
use crate::gesture::GestureSpec;
use crate::skeleton::BodyFrame;
use crate::utils::error::{CaptureError, CaptureResult};

/// Gesture result attached to a body by tracking id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceGesture {
    pub tracking_id: u64,
    pub name: String,
    #[serde(default)]
    pub detected: bool,
    pub confidence: f32,
}

/// One line of a trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReplayTick {
    pub frame: Option<BodyFrame>,
    pub gestures: Vec<TraceGesture>,
    pub recording: Option<bool>,
}

/// A parsed trace
#[derive(Debug, Clone, Default)]
pub struct ReplayTrace {
    ticks: Vec<ReplayTick>,
}

struct Playhead {
    ticks: Vec<ReplayTick>,
    current: Option<usize>,
}

impl ReplayTrace {
    pub fn new(ticks: Vec<ReplayTick>) -> Self {
        Self { ticks }
    }

    pub fn load(path: &Path) -> CaptureResult<Self> {
        let file = File::open(path)?;
        let trace = Self::from_reader(BufReader::new(file))?;
        tracing::info!("Loaded {} ticks from {:?}", trace.len(), path);
        Ok(trace)
    }

    /// Parse JSON lines; blank lines are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> CaptureResult<Self> {
        let mut ticks = Vec::new();
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let tick: ReplayTick = serde_json::from_str(&line)
                .map_err(|e| CaptureError::Config(format!("trace line {}: {}", i + 1, e)))?;
            ticks.push(tick);
        }
        Ok(Self { ticks })
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Split into the two sensor-side sources, sharing one playhead.
    pub fn into_sources(
        self,
        body_count: usize,
        switch: RecordingSwitch,
    ) -> (ReplayBodySource, ReplayGestureSource) {
        let playhead = Rc::new(RefCell::new(Playhead {
            ticks: self.ticks,
            current: None,
        }));

        let bodies = ReplayBodySource {
            playhead: playhead.clone(),
            body_count,
            switch,
            next: 0,
        };
        let gestures = ReplayGestureSource {
            playhead,
            registered: Vec::new(),
            slots: vec![(0, true); body_count],
        };
        (bodies, gestures)
    }
}

/// Body frames from a trace
pub struct ReplayBodySource {
    playhead: Rc<RefCell<Playhead>>,
    body_count: usize,
    switch: RecordingSwitch,
    next: usize,
}

impl ReplayBodySource {
    pub fn is_finished(&self) -> bool {
        self.next >= self.playhead.borrow().ticks.len()
    }
}

impl BodyFrameSource for ReplayBodySource {
    fn body_count(&self) -> usize {
        self.body_count
    }

    fn acquire_latest(&mut self) -> Option<BodyFrame> {
        let mut playhead = self.playhead.borrow_mut();
        let index = self.next;
        let tick = playhead.ticks.get(index)?;

        if let Some(on) = tick.recording {
            self.switch.set(on);
        }
        let frame = tick.frame.clone();

        playhead.current = Some(index);
        self.next += 1;
        frame
    }

    fn close(&mut self) {
        self.next = self.playhead.borrow().ticks.len();
    }
}

/// Gesture results from a trace, honouring slot binding and pausing
pub struct ReplayGestureSource {
    playhead: Rc<RefCell<Playhead>>,
    registered: Vec<String>,
    /// (tracking id, paused) per slot
    slots: Vec<(u64, bool)>,
}

impl GestureSource for ReplayGestureSource {
    fn register(&mut self, spec: &GestureSpec) -> CaptureResult<()> {
        self.registered.push(spec.name.clone());
        Ok(())
    }

    fn bind(&mut self, slot: usize, tracking_id: u64) {
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.0 = tracking_id;
        }
    }

    fn set_paused(&mut self, slot: usize, paused: bool) {
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.1 = paused;
        }
    }

    fn poll(&mut self, slot: usize) -> Vec<GestureSample> {
        let Some(&(tracking_id, paused)) = self.slots.get(slot) else {
            return Vec::new();
        };
        if paused || tracking_id == 0 {
            return Vec::new();
        }

        let playhead = self.playhead.borrow();
        let Some(tick) = playhead.current.and_then(|i| playhead.ticks.get(i)) else {
            return Vec::new();
        };

        tick.gestures
            .iter()
            .filter(|g| g.tracking_id == tracking_id && self.registered.contains(&g.name))
            .map(|g| GestureSample {
                name: g.name.clone(),
                detected: g.detected,
                confidence: g.confidence,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::GestureCatalog;

    const TRACE: &str = r#"
{"frame": {"bodies": []}, "recording": true}
{"frame": null}

{"frame": {"bodies": []}, "gestures": [{"trackingId": 9, "name": "sw1", "confidence": 0.5}, {"trackingId": 9, "name": "bg1", "confidence": 1.0}]}
"#;

    #[test]
    fn test_parse_skips_blank_lines() {
        let trace = ReplayTrace::from_reader(TRACE.as_bytes()).unwrap();
        assert_eq!(trace.len(), 3);
        assert!(ReplayTrace::from_reader("{oops".as_bytes()).is_err());
    }

    #[test]
    fn test_sources_share_playhead() {
        let switch = RecordingSwitch::new();
        let trace = ReplayTrace::from_reader(TRACE.as_bytes()).unwrap();
        let (mut bodies, mut gestures) = trace.into_sources(2, switch.clone());
        GestureCatalog::default().register_all(&mut gestures).unwrap();

        assert!(bodies.acquire_latest().is_some());
        assert!(switch.is_on());
        assert!(bodies.acquire_latest().is_none());
        assert!(bodies.acquire_latest().is_some());
        assert!(bodies.is_finished());

        // Paused slot yields nothing
        gestures.bind(0, 9);
        assert!(gestures.poll(0).is_empty());

        gestures.set_paused(0, false);
        let samples = gestures.poll(0);
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].name, "sw1");

        gestures.bind(0, 10);
        assert!(gestures.poll(0).is_empty());
    }
}
