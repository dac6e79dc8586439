use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GestureError;

/// Which hand a pose or gesture belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    pub const BOTH: [Hand; 2] = [Hand::Left, Hand::Right];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Position and rotation of a single joint.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq)]
pub struct JointPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl JointPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Euclidean distance between the two joint positions.
    #[inline]
    pub fn distance(&self, other: &Self) -> f32 {
        Vec3::distance(self.position, other.position)
    }

    /// `1 - |q0 · q1|`.
    ///
    /// The unsigned dot treats a quaternion and its negation as the same rotation,
    /// so the cost lies in `[0, 1]` for unit quaternions.
    #[inline]
    pub fn angle_cost(&self, other: &Self) -> f32 {
        1.0 - Quat::dot(self.rotation, other.rotation).abs()
    }
}

/// Snapshot of every tracked joint of one hand, relative to the hand root.
///
/// Joint order must be consistent with the templates the sample is compared against.
#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq, Deref, DerefMut)]
pub struct PoseSample(pub Vec<JointPose>);

impl PoseSample {
    /// Express world space joints in the frame of `root`.
    ///
    /// Rigidly moving the whole hand (root and joints together) leaves the result unchanged.
    pub fn from_world(root: &Transform, joints: impl IntoIterator<Item = JointPose>) -> Self {
        let root_inv_matrix = root.compute_matrix().inverse();
        let root_inv_rot = root.rotation.inverse();

        Self(
            joints
                .into_iter()
                .map(|joint| JointPose {
                    position: root_inv_matrix.transform_point3(joint.position),
                    rotation: (root_inv_rot * joint.rotation).normalize(),
                })
                .collect(),
        )
    }

    pub fn num_joints(&self) -> usize {
        self.0.len()
    }

    /// Make sure this sample can be compared joint by joint against `template`.
    pub fn check_compatible(&self, template: &PoseSample) -> Result<(), GestureError> {
        if self.is_empty() {
            return Err(GestureError::EmptyPose);
        }
        if self.len() != template.len() {
            return Err(GestureError::JointCountMismatch {
                expected: template.len(),
                found: self.len(),
            });
        }

        Ok(())
    }
}

impl FromIterator<JointPose> for PoseSample {
    fn from_iter<T: IntoIterator<Item = JointPose>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
