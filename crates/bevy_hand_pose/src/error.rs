use thiserror::Error;

use crate::library::GestureId;

/// Possible errors produced while matching poses or building a [`GestureLibrary`].
///
/// [`EmptyPose`](Self::EmptyPose), [`JointCountMismatch`](Self::JointCountMismatch)
/// and [`EmptySequence`](Self::EmptySequence) are invalid input: the call fails
/// before any partial matching happens.
///
/// [`GestureLibrary`]: crate::library::GestureLibrary
#[non_exhaustive]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GestureError {
    #[error("Pose has no joints.")]
    EmptyPose,
    #[error("Joint count mismatch: template has {expected} joints, sample has {found}.")]
    JointCountMismatch { expected: usize, found: usize },
    #[error("Dynamic gesture \"{name}\" must contain at least one step.")]
    EmptySequence { name: String },
    #[error("Invalid recognition config: {0}")]
    InvalidConfig(String),
    #[error("No gesture with id {0:?} in the library.")]
    UnknownGesture(GestureId),
}
