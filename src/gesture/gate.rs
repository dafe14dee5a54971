//! Per-body gesture gate
//!
//! Folds the classifier's per-frame confidence scores into four latching
//! flags. A flag only latches when its own threshold is crossed and, for a
//! second stage, when the first stage of its chain has already latched.
//! Nothing unlatches except `reset`, which the capture loop calls when the
//! body slot is reassigned to a different tracking id.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::catalog::{GestureCatalog, GestureStage};

/// Latched flags for one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateState {
    pub g1_done: bool,
    pub g2_done: bool,
    pub g3_done: bool,
    pub g4_done: bool,
}

impl GateState {
    pub fn is_done(&self, stage: GestureStage) -> bool {
        match stage {
            GestureStage::ConfirmFirst => self.g1_done,
            GestureStage::ConfirmSecond => self.g2_done,
            GestureStage::StartFirst => self.g3_done,
            GestureStage::StartSecond => self.g4_done,
        }
    }

    fn latch(&mut self, stage: GestureStage) {
        match stage {
            GestureStage::ConfirmFirst => self.g1_done = true,
            GestureStage::ConfirmSecond => self.g2_done = true,
            GestureStage::StartFirst => self.g3_done = true,
            GestureStage::StartSecond => self.g4_done = true,
        }
    }

    /// The attempt should be kept when recording stops.
    pub fn commit_confirmed(&self) -> bool {
        self.g2_done
    }

    /// The player signalled they are ready to sign.
    pub fn start_triggered(&self) -> bool {
        self.g4_done
    }
}

/// Gesture gate for one body slot.
#[derive(Debug, Clone)]
pub struct GestureGate {
    catalog: Arc<GestureCatalog>,
    state: GateState,
}

impl GestureGate {
    pub fn new(catalog: Arc<GestureCatalog>) -> Self {
        Self {
            catalog,
            state: GateState::default(),
        }
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    /// Feed one confidence sample. Unknown gesture names are ignored.
    pub fn observe(&mut self, gesture: &str, confidence: f32) -> GateState {
        let Some(spec) = self.catalog.find(gesture) else {
            return self.state;
        };

        if self.state.is_done(spec.stage) || !spec.threshold.passes(confidence) {
            return self.state;
        }

        let unlocked = spec
            .stage
            .prerequisite()
            .map_or(true, |required| self.state.is_done(required));

        if unlocked {
            self.state.latch(spec.stage);
            tracing::debug!(
                "Gesture '{}' latched {} at confidence {:.3}",
                spec.name,
                spec.stage.as_str(),
                confidence
            );
        }

        self.state
    }

    /// Forget everything; used when a different body takes the slot.
    pub fn reset(&mut self) {
        self.state = GateState::default();
    }
}
