//! Frame normalization
//!
//! Turns one tracked body into the fixed-layout text record written to
//! session files. Joint positions are divided by a body-size factor so that
//! recordings of different people at different distances are comparable.
//!
//! Line layout (consumed by the offline analysis pipeline, keep it exact):
//!
//! ```text
//! w x y z w x y z ... (18 joints)  ||| x y z x y z ... (18 joints)
//! ```
//!
//! Every value is followed by a single space, and the two blocks are
//! joined by ` ||| `.

use std::fmt;

use super::joints::{TrackedBody, ANCHOR_BONES, RECORDED_JOINTS, RECORDED_JOINT_COUNT};
use crate::utils::error::{CaptureError, CaptureResult};

/// Decimal places kept for positions and bone lengths.
pub const POSITION_DECIMALS: i32 = 5;

/// Decimal places kept for quaternion components.
pub const ORIENTATION_DECIMALS: i32 = 7;

/// Separator between the orientation block and the position block.
pub const BLOCK_DELIMITER: &str = "|||";

/// A normalized, immutable view of one body at one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    /// Half the summed anchor bone lengths
    pub norm: f64,
    /// Rounded (w, x, y, z) per recorded joint
    pub orientations: [[f64; 4]; RECORDED_JOINT_COUNT],
    /// Rounded position / norm per recorded joint
    pub positions: [[f64; 3]; RECORDED_JOINT_COUNT],
}

impl NormalizedRecord {
    /// The record as one newline-terminated session file line.
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for NormalizedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for quat in &self.orientations {
            for value in quat {
                write!(f, "{} ", format_value(*value))?;
            }
        }
        write!(f, " {} ", BLOCK_DELIMITER)?;
        for position in &self.positions {
            for value in position {
                write!(f, "{} ", format_value(*value))?;
            }
        }
        Ok(())
    }
}

/// Normalize one tracked body.
///
/// Fails with `DegeneratePose` when the anchor bones collapse to zero
/// length (or the sensor produced non-finite coordinates).
pub fn normalize(body: &TrackedBody) -> CaptureResult<NormalizedRecord> {
    let norm = body_scale(body);
    if norm == 0.0 || !norm.is_finite() {
        return Err(CaptureError::DegeneratePose { norm });
    }

    let mut orientations = [[0.0; 4]; RECORDED_JOINT_COUNT];
    let mut positions = [[0.0; 3]; RECORDED_JOINT_COUNT];

    for (i, joint) in RECORDED_JOINTS.iter().enumerate() {
        let q = body.orientation(*joint);
        orientations[i] = [
            round_to(q.w, ORIENTATION_DECIMALS),
            round_to(q.x, ORIENTATION_DECIMALS),
            round_to(q.y, ORIENTATION_DECIMALS),
            round_to(q.z, ORIENTATION_DECIMALS),
        ];

        let p = body.joint(*joint);
        positions[i] = [
            round_to(p.x / norm, POSITION_DECIMALS),
            round_to(p.y / norm, POSITION_DECIMALS),
            round_to(p.z / norm, POSITION_DECIMALS),
        ];
    }

    Ok(NormalizedRecord {
        norm,
        orientations,
        positions,
    })
}

/// Half the sum of the six anchor bone lengths, each rounded first.
pub fn body_scale(body: &TrackedBody) -> f64 {
    let total: f64 = ANCHOR_BONES
        .iter()
        .map(|(a, b)| round_to(body.joint(*a).distance(&body.joint(*b)), POSITION_DECIMALS))
        .sum();
    total / 2.0
}

/// Round half to even at `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round_ties_even() / scale
}

fn format_value(value: f64) -> String {
    // Adding 0.0 folds -0.0 into 0.0
    (value + 0.0).to_string()
}
