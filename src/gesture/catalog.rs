//! Gesture catalog
//!
//! The table of discrete gestures the classifier is asked to report, which
//! trained database each comes from, and the confidence each needs to count.

use serde::{Deserialize, Serialize};

use crate::capture::traits::GestureSource;
use crate::utils::error::CaptureResult;

/// Position of a gesture in the two unlock chains.
///
/// The confirm chain marks a signed attempt as good enough to keep; the
/// start chain is the "ready to sign" cue. A second stage only counts once
/// the first stage of the same chain has counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GestureStage {
    ConfirmFirst,
    ConfirmSecond,
    StartFirst,
    StartSecond,
}

impl GestureStage {
    /// The stage that must already be done before this one can count.
    pub fn prerequisite(&self) -> Option<GestureStage> {
        match self {
            Self::ConfirmSecond => Some(Self::ConfirmFirst),
            Self::StartSecond => Some(Self::StartFirst),
            Self::ConfirmFirst | Self::StartFirst => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfirmFirst => "confirm-first",
            Self::ConfirmSecond => "confirm-second",
            Self::StartFirst => "start-first",
            Self::StartSecond => "start-second",
        }
    }
}

/// Confidence cut-off for one gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub value: f32,
    /// `true` counts `confidence >= value`, `false` needs `confidence > value`
    pub inclusive: bool,
}

impl Threshold {
    pub const fn above(value: f32) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }

    pub const fn at_least(value: f32) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn passes(&self, confidence: f32) -> bool {
        if self.inclusive {
            confidence >= self.value
        } else {
            confidence > self.value
        }
    }
}

/// Confirm chain, first gesture.
pub const CONFIRM_FIRST_THRESHOLD: Threshold = Threshold::above(0.25);
/// Confirm chain, second gesture.
pub const CONFIRM_SECOND_THRESHOLD: Threshold = Threshold::above(0.23);
/// Start chain, both gestures.
pub const START_THRESHOLD: Threshold = Threshold::at_least(0.95);

/// One registered discrete gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GestureSpec {
    /// Gesture name as reported by the classifier
    pub name: String,
    /// Trained database the gesture is loaded from
    pub database: String,
    pub stage: GestureStage,
    pub threshold: Threshold,
}

impl GestureSpec {
    pub fn new(name: &str, database: &str, stage: GestureStage, threshold: Threshold) -> Self {
        Self {
            name: name.to_string(),
            database: database.to_string(),
            stage,
            threshold,
        }
    }
}

/// Every gesture the capture loop tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GestureCatalog {
    specs: Vec<GestureSpec>,
}

impl Default for GestureCatalog {
    fn default() -> Self {
        Self {
            specs: vec![
                GestureSpec::new("sw1", "sw1.gbd", GestureStage::ConfirmFirst, CONFIRM_FIRST_THRESHOLD),
                GestureSpec::new("sw2", "sw2.gbd", GestureStage::ConfirmSecond, CONFIRM_SECOND_THRESHOLD),
                GestureSpec::new("ct_Left", "ct.gbd", GestureStage::StartFirst, START_THRESHOLD),
                GestureSpec::new("ct2", "ct2.gbd", GestureStage::StartSecond, START_THRESHOLD),
            ],
        }
    }
}

impl GestureCatalog {
    pub fn new(specs: Vec<GestureSpec>) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &[GestureSpec] {
        &self.specs
    }

    pub fn find(&self, name: &str) -> Option<&GestureSpec> {
        self.specs.iter().find(|spec| spec.name == name)
    }

    /// Check the table is usable: unique names, each stage at most once,
    /// and every second stage backed by its first stage.
    pub fn validate(&self) -> Result<(), String> {
        for (i, spec) in self.specs.iter().enumerate() {
            for other in &self.specs[i + 1..] {
                if other.name == spec.name {
                    return Err(format!("gesture '{}' listed twice", spec.name));
                }
                if other.stage == spec.stage {
                    return Err(format!(
                        "gestures '{}' and '{}' share stage {}",
                        spec.name,
                        other.name,
                        spec.stage.as_str()
                    ));
                }
            }
            if let Some(required) = spec.stage.prerequisite() {
                if !self.specs.iter().any(|s| s.stage == required) {
                    return Err(format!(
                        "gesture '{}' needs a {} gesture",
                        spec.name,
                        required.as_str()
                    ));
                }
            }
        }
        Ok(())
    }

    /// Load every gesture into the classifier, one database at a time.
    pub fn register_all(&self, source: &mut dyn GestureSource) -> CaptureResult<()> {
        for spec in &self.specs {
            source.register(spec)?;
            tracing::debug!("Registered gesture '{}' from {}", spec.name, spec.database);
        }
        tracing::info!("Registered {} gestures", self.specs.len());
        Ok(())
    }
}
