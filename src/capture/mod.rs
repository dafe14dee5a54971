//! Sensor capture
//!
//! The per-tick capture loop and the traits it uses to talk to the body
//! tracker and the gesture classifier.

pub mod coordinator;
pub mod replay;
pub mod switch;
pub mod traits;

pub use coordinator::{CaptureEvent, CaptureLoop, CaptureStatus, RunState};
pub use replay::{ReplayBodySource, ReplayGestureSource, ReplayTrace};
pub use switch::RecordingSwitch;
pub use traits::{BodyFrameSource, GestureSample, GestureSource};
