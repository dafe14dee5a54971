//! Capture trait definitions
//!
//! Sensor-agnostic traits for the body tracker and the gesture classifier.
//! Both are driven from the capture loop's thread only.

use serde::{Deserialize, Serialize};

use crate::gesture::GestureSpec;
use crate::skeleton::BodyFrame;
use crate::utils::error::CaptureResult;

/// One classifier result for one gesture on one body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureSample {
    /// Gesture name as registered
    pub name: String,

    /// Classifier's own detected flag
    pub detected: bool,

    /// Confidence in 0.0-1.0
    pub confidence: f32,
}

/// Source of body tracking frames
pub trait BodyFrameSource {
    /// Number of body slots in every frame
    fn body_count(&self) -> usize;

    /// Latest frame since the last call, if any arrived
    fn acquire_latest(&mut self) -> Option<BodyFrame>;

    /// Release the underlying sensor handles
    fn close(&mut self) {}
}

/// Per-slot discrete gesture classifier
pub trait GestureSource {
    /// Load one gesture from its trained database
    fn register(&mut self, spec: &GestureSpec) -> CaptureResult<()>;

    /// Point a slot's classifier at a tracking id (0 = no body)
    fn bind(&mut self, slot: usize, tracking_id: u64);

    /// Pause or resume a slot's classifier
    fn set_paused(&mut self, slot: usize, paused: bool);

    /// Results produced for a slot since the last poll
    fn poll(&mut self, slot: usize) -> Vec<GestureSample>;

    /// Release the underlying classifier handles
    fn close(&mut self) {}
}
