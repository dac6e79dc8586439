use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GestureError;

/// Which kind of gesture each hand is recognizing.
#[derive(Serialize, Deserialize, Default, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionMode {
    /// Match every static gesture each tick and report edges.
    Static,
    /// Track progress through dynamic gesture sequences.
    #[default]
    Sequence,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct MatchThresholds {
    /// Max distance allowed between a joint and its template joint.
    pub distance: f32,
    /// Max `1 - |q0 · q1|` allowed between a joint and its template joint.
    pub angle: f32,
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            distance: 0.1,
            angle: 0.25,
        }
    }
}

#[derive(Resource, Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct RecognitionConfig {
    pub thresholds: MatchThresholds,
    /// Seconds allowed between two steps of a dynamic gesture before it is abandoned.
    pub max_time_next_step: f32,
    pub mode: RecognitionMode,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            thresholds: MatchThresholds::default(),
            max_time_next_step: 1.5,
            mode: RecognitionMode::default(),
        }
    }
}

impl RecognitionConfig {
    pub fn validate(&self) -> Result<(), GestureError> {
        let distance = self.thresholds.distance;
        let angle = self.thresholds.angle;

        if (distance > 0.0) == false {
            return Err(GestureError::InvalidConfig(format!(
                "distance threshold must be greater than 0, got {distance}"
            )));
        }
        if (0.0..=2.0).contains(&angle) == false {
            return Err(GestureError::InvalidConfig(format!(
                "angle threshold must be within [0, 2], got {angle}"
            )));
        }
        if (self.max_time_next_step > 0.0) == false {
            return Err(GestureError::InvalidConfig(format!(
                "max time to next step must be greater than 0, got {}",
                self.max_time_next_step
            )));
        }

        Ok(())
    }
}
