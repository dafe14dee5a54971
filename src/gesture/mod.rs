//! Gesture gating
//!
//! Turns the external classifier's discrete-gesture confidences into the
//! start and commit triggers that drive capture.

pub mod catalog;
pub mod gate;

pub use catalog::{GestureCatalog, GestureSpec, GestureStage, Threshold};
pub use gate::{GateState, GestureGate};
