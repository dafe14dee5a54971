//! Body skeleton data structures
//!
//! Models the 25 joints reported per tracked body by the depth sensor,
//! along with per-joint orientation quaternions.

use serde::{Deserialize, Serialize};

// ── Joint definitions ──────────────────────────────────────

/// The 25 body joints reported by the sensor, in sensor index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointType {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

/// Total number of joints per body.
pub const JOINT_COUNT: usize = 25;

impl JointType {
    /// Sensor array index (0-24).
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SpineBase => "spine-base",
            Self::SpineMid => "spine-mid",
            Self::Neck => "neck",
            Self::Head => "head",
            Self::ShoulderLeft => "shoulder-left",
            Self::ElbowLeft => "elbow-left",
            Self::WristLeft => "wrist-left",
            Self::HandLeft => "hand-left",
            Self::ShoulderRight => "shoulder-right",
            Self::ElbowRight => "elbow-right",
            Self::WristRight => "wrist-right",
            Self::HandRight => "hand-right",
            Self::HipLeft => "hip-left",
            Self::KneeLeft => "knee-left",
            Self::AnkleLeft => "ankle-left",
            Self::FootLeft => "foot-left",
            Self::HipRight => "hip-right",
            Self::KneeRight => "knee-right",
            Self::AnkleRight => "ankle-right",
            Self::FootRight => "foot-right",
            Self::SpineShoulder => "spine-shoulder",
            Self::HandTipLeft => "hand-tip-left",
            Self::ThumbLeft => "thumb-left",
            Self::HandTipRight => "hand-tip-right",
            Self::ThumbRight => "thumb-right",
        }
    }
}

/// Number of joints written per recorded line.
pub const RECORDED_JOINT_COUNT: usize = 18;

/// Joints written to every recorded line, in wire order.
///
/// The same list drives both the orientation block and the position block.
pub const RECORDED_JOINTS: [JointType; RECORDED_JOINT_COUNT] = [
    JointType::Head,
    JointType::Neck,
    JointType::ShoulderRight,
    JointType::ShoulderLeft,
    JointType::SpineShoulder,
    JointType::ElbowRight,
    JointType::ElbowLeft,
    JointType::WristRight,
    JointType::WristLeft,
    JointType::HandRight,
    JointType::HandLeft,
    JointType::ThumbRight,
    JointType::ThumbLeft,
    JointType::HandTipRight,
    JointType::HandTipLeft,
    JointType::HipRight,
    JointType::HipLeft,
    JointType::SpineBase,
];

/// Bones whose lengths define the body scale: neck to each shoulder,
/// each upper arm, each forearm.
pub const ANCHOR_BONES: [(JointType, JointType); 6] = [
    (JointType::Neck, JointType::ShoulderLeft),
    (JointType::Neck, JointType::ShoulderRight),
    (JointType::ShoulderLeft, JointType::ElbowLeft),
    (JointType::ShoulderRight, JointType::ElbowRight),
    (JointType::ElbowLeft, JointType::WristLeft),
    (JointType::ElbowRight, JointType::WristRight),
];

// ── Geometry ───────────────────────────────────────────────

/// Camera-space position in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean distance to another point.
    pub fn distance(&self, other: &Vector3) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }
}

/// Joint orientation quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub const IDENTITY: Quaternion = Quaternion {
        w: 1.0,
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ── Frames ─────────────────────────────────────────────────

/// One body slot of a sensor frame.
///
/// A tracking id of 0 means the slot holds no body; its joint data is
/// meaningless and must not be recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackedBody {
    pub tracking_id: u64,
    pub joints: [Vector3; JOINT_COUNT],
    pub orientations: [Quaternion; JOINT_COUNT],
}

impl TrackedBody {
    /// An empty slot.
    pub fn untracked() -> Self {
        Self {
            tracking_id: 0,
            joints: [Vector3::default(); JOINT_COUNT],
            orientations: [Quaternion::IDENTITY; JOINT_COUNT],
        }
    }

    pub fn is_tracked(&self) -> bool {
        self.tracking_id != 0
    }

    pub fn joint(&self, joint: JointType) -> Vector3 {
        self.joints[joint.index()]
    }

    pub fn orientation(&self, joint: JointType) -> Quaternion {
        self.orientations[joint.index()]
    }
}

/// Snapshot of every body slot at one sensor tick.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BodyFrame {
    pub bodies: Vec<TrackedBody>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_joint_indices_match_sensor_order() {
        assert_eq!(JointType::SpineBase.index(), 0);
        assert_eq!(JointType::Head.index(), 3);
        assert_eq!(JointType::HandRight.index(), 11);
        assert_eq!(JointType::SpineShoulder.index(), 20);
        assert_eq!(JointType::ThumbRight.index(), JOINT_COUNT - 1);
    }

    #[test]
    fn test_recorded_joints_are_unique() {
        for (i, a) in RECORDED_JOINTS.iter().enumerate() {
            for b in &RECORDED_JOINTS[i + 1..] {
                assert_ne!(a, b, "{} listed twice", a.as_str());
            }
        }
    }

    #[test]
    fn test_distance() {
        let a = Vector3::new(0.0, 0.0, 0.0);
        let b = Vector3::new(3.0, 4.0, 0.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_untracked_body() {
        let body = TrackedBody::untracked();
        assert!(!body.is_tracked());
        assert_eq!(body.orientation(JointType::Head), Quaternion::IDENTITY);
    }
}
