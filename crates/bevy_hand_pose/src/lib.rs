//! Static hand pose matching and gesture sequence tracking.

pub mod prelude {
    pub use crate::config::{MatchThresholds, RecognitionConfig, RecognitionMode};
    pub use crate::error::GestureError;
    pub use crate::library::{
        DynamicGestureTemplate, GestureId, GestureLibrary, GestureLibraryDef, GestureTemplate,
    };
    pub use crate::matcher::{match_pose, MatchCost};
    pub use crate::pose::{Hand, JointPose, PoseSample};
    pub use crate::recognizer::{HandRecognizer, StaticEdgeDetector};
    pub use crate::sequence::{SequencePhase, SequenceTracker};
    pub use crate::signal::GestureSignal;
}

pub mod config;
pub mod error;
pub mod library;
pub mod matcher;
pub mod pose;
pub mod recognizer;
pub mod sequence;
pub mod signal;
