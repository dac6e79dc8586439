use bevy::prelude::*;

use crate::config::{RecognitionConfig, RecognitionMode};
use crate::error::GestureError;
use crate::library::{GestureId, GestureLibrary};
use crate::matcher::match_pose;
use crate::pose::{Hand, PoseSample};
use crate::sequence::SequenceTracker;
use crate::signal::GestureSignal;

/// Turns a stream of best matches into recognized / recognized-end edges.
#[derive(Debug, Default, Clone)]
pub struct StaticEdgeDetector {
    previous: Option<GestureId>,
}

impl StaticEdgeDetector {
    /// Feed the best match of the current frame.
    pub fn update(&mut self, current: Option<GestureId>) -> Vec<GestureSignal> {
        let mut signals = Vec::new();
        if current == self.previous {
            return signals;
        }

        if let Some(template) = self.previous {
            signals.push(GestureSignal::StaticRecognizedEnd { template });
        }
        if let Some(template) = current {
            signals.push(GestureSignal::StaticRecognized { template });
        }
        self.previous = current;

        signals
    }

    pub fn recognized(&self) -> Option<GestureId> {
        self.previous
    }

    pub fn reset(&mut self) -> Option<GestureSignal> {
        self.previous
            .take()
            .map(|template| GestureSignal::StaticRecognizedEnd { template })
    }
}

/// All recognition state of one hand.
#[derive(Component, Debug, Clone)]
pub struct HandRecognizer {
    hand: Hand,
    edges: StaticEdgeDetector,
    sequence: SequenceTracker,
    /// Mode of the last tick, the other state machine is idle.
    mode: Option<RecognitionMode>,
}

impl HandRecognizer {
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            edges: StaticEdgeDetector::default(),
            sequence: SequenceTracker::new(hand),
            mode: None,
        }
    }

    /// Run one frame of recognition in the configured [`RecognitionMode`].
    pub fn tick(
        &mut self,
        delta_seconds: f32,
        sample: Option<&PoseSample>,
        library: &GestureLibrary,
        config: &RecognitionConfig,
    ) -> Result<Vec<GestureSignal>, GestureError> {
        // End whatever the previous mode had recognized.
        let mut signals = match self.mode.replace(config.mode) {
            Some(RecognitionMode::Static) if config.mode != RecognitionMode::Static => {
                self.edges.reset().into_iter().collect()
            }
            Some(RecognitionMode::Sequence) if config.mode != RecognitionMode::Sequence => {
                self.sequence.reset().into_iter().collect()
            }
            _ => Vec::new(),
        };

        match config.mode {
            RecognitionMode::Static => {
                let Some(sample) = sample else {
                    return Ok(signals);
                };
                let candidates = library.gestures_for(self.hand);
                let current = match_pose(sample, candidates, &config.thresholds)?;

                signals.extend(self.edges.update(current.map(|g| g.id())));
            }
            RecognitionMode::Sequence => {
                signals.extend(self.sequence.tick(delta_seconds, sample, library, config)?);
            }
        }

        Ok(signals)
    }

    /// Forget everything, ending whatever was recognized.
    pub fn reset(&mut self) -> Vec<GestureSignal> {
        self.edges
            .reset()
            .into_iter()
            .chain(self.sequence.reset())
            .collect()
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn sequence(&self) -> &SequenceTracker {
        &self.sequence
    }

    pub fn recognized_gesture(&self) -> Option<GestureId> {
        self.edges.recognized()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::JointPose;

    fn pose_at(x: f32) -> PoseSample {
        PoseSample(vec![JointPose::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)])
    }

    fn static_config() -> RecognitionConfig {
        RecognitionConfig {
            mode: RecognitionMode::Static,
            ..default()
        }
    }

    #[test]
    fn edge_detector_fires_on_transitions_only() {
        let mut library = GestureLibrary::new();
        let a = library.add_gesture("a", Hand::Left, pose_at(0.0)).unwrap();
        let b = library.add_gesture("b", Hand::Left, pose_at(1.0)).unwrap();

        let mut edges = StaticEdgeDetector::default();
        let stream = [Some(a), Some(a), Some(b), Some(b), None, Some(a)];
        let fired = stream
            .into_iter()
            .map(|current| edges.update(current))
            .collect::<Vec<_>>();

        assert_eq!(fired[0], vec![GestureSignal::StaticRecognized { template: a }]);
        assert!(fired[1].is_empty());
        assert_eq!(
            fired[2],
            vec![
                GestureSignal::StaticRecognizedEnd { template: a },
                GestureSignal::StaticRecognized { template: b },
            ]
        );
        assert!(fired[3].is_empty());
        assert_eq!(fired[4], vec![GestureSignal::StaticRecognizedEnd { template: b }]);
        assert_eq!(fired[5], vec![GestureSignal::StaticRecognized { template: a }]);
    }

    #[test]
    fn static_mode_matches_own_hand_only() {
        let mut library = GestureLibrary::new();
        let fist = library.add_gesture("fist", Hand::Left, pose_at(0.0)).unwrap();
        library.add_gesture("fist", Hand::Right, pose_at(0.0)).unwrap();

        let mut recognizer = HandRecognizer::new(Hand::Left);
        let signals = recognizer
            .tick(0.016, Some(&pose_at(0.01)), &library, &static_config())
            .unwrap();

        assert_eq!(signals, vec![GestureSignal::StaticRecognized { template: fist }]);
        assert_eq!(recognizer.recognized_gesture(), Some(fist));

        // Untracked frame keeps the recognized gesture.
        let signals = recognizer.tick(0.016, None, &library, &static_config()).unwrap();
        assert!(signals.is_empty());

        assert_eq!(
            recognizer.reset(),
            vec![GestureSignal::StaticRecognizedEnd { template: fist }]
        );
        assert_eq!(recognizer.recognized_gesture(), None);
    }

    #[test]
    fn sequence_mode_uses_dynamic_gestures() {
        let mut library = GestureLibrary::new();
        library.add_gesture("a", Hand::Right, pose_at(0.0)).unwrap();
        let wave = library
            .add_dynamic_gesture("wave", Hand::Right, vec![pose_at(0.0), pose_at(0.5)])
            .unwrap();

        let mut recognizer = HandRecognizer::new(Hand::Right);
        let config = RecognitionConfig::default();
        recognizer
            .tick(0.016, Some(&pose_at(0.0)), &library, &config)
            .unwrap();
        let signals = recognizer
            .tick(0.016, Some(&pose_at(0.5)), &library, &config)
            .unwrap();

        assert!(signals.contains(&GestureSignal::SequenceRecognized { sequence: wave }));
        assert!(recognizer.sequence().is_casting());
        assert_eq!(recognizer.recognized_gesture(), None);
    }

    #[test]
    fn switching_mode_ends_previous_recognition() {
        let mut library = GestureLibrary::new();
        let fist = library.add_gesture("fist", Hand::Left, pose_at(0.0)).unwrap();
        let wave = library
            .add_dynamic_gesture("wave", Hand::Left, vec![pose_at(0.0), pose_at(0.5)])
            .unwrap();

        let mut recognizer = HandRecognizer::new(Hand::Left);
        let mut config = RecognitionConfig::default();
        recognizer
            .tick(0.016, Some(&pose_at(0.0)), &library, &config)
            .unwrap();
        recognizer
            .tick(0.016, Some(&pose_at(0.5)), &library, &config)
            .unwrap();
        assert!(recognizer.sequence().is_casting());

        // Hand released right as the mode changes.
        config.mode = RecognitionMode::Static;
        let signals = recognizer
            .tick(0.016, Some(&pose_at(3.0)), &library, &config)
            .unwrap();
        assert_eq!(signals, vec![GestureSignal::SequenceEnded { sequence: wave }]);
        assert!(recognizer.sequence().is_casting() == false);

        let signals = recognizer
            .tick(0.016, Some(&pose_at(0.0)), &library, &config)
            .unwrap();
        assert_eq!(signals, vec![GestureSignal::StaticRecognized { template: fist }]);

        config.mode = RecognitionMode::Sequence;
        let signals = recognizer.tick(0.016, None, &library, &config).unwrap();
        assert_eq!(signals, vec![GestureSignal::StaticRecognizedEnd { template: fist }]);
        assert_eq!(recognizer.recognized_gesture(), None);
    }
}
