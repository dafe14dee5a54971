//! Skeleton model and frame normalization
//!
//! - Joint, position and orientation types for one sensor frame
//! - Normalizer producing the recorded line for one body

pub mod joints;
pub mod normalizer;

pub use joints::{BodyFrame, JointType, Quaternion, TrackedBody, Vector3, JOINT_COUNT};
pub use normalizer::{normalize, NormalizedRecord};
