//! Per hand state machine that follows a dynamic gesture step by step.

use crate::config::RecognitionConfig;
use crate::error::GestureError;
use crate::library::{DynamicGestureTemplate, GestureId, GestureLibrary};
use crate::matcher::match_pose;
use crate::pose::{Hand, PoseSample};
use crate::signal::GestureSignal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencePhase {
    /// No candidate, waiting for the first step of any dynamic gesture.
    Idle,
    /// Candidate chosen, waiting for the next step.
    Tracking,
    /// Every step matched, the final pose is being held.
    Completed,
}

/// Tracks one hand's progress through a [`DynamicGestureTemplate`].
///
/// A frame that misses the expected step does not lose progress. Only a stall
/// longer than [`RecognitionConfig::max_time_next_step`] abandons the attempt.
#[derive(Debug, Clone)]
pub struct SequenceTracker {
    hand: Hand,
    /// Dynamic gesture being attempted.
    candidate: Option<GestureId>,
    /// Index of the next expected step, equals the sequence length once completed.
    step_index: usize,
    /// Seconds since the last successful step.
    elapsed: f32,
    /// Set once the completion signal has fired.
    casting: bool,
}

impl SequenceTracker {
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            candidate: None,
            step_index: 0,
            elapsed: 0.0,
            casting: false,
        }
    }

    /// Advance the state machine by one frame.
    ///
    /// `sample` is `None` when the hand was not tracked this frame, in which case
    /// nothing happens, the timer included.
    pub fn tick(
        &mut self,
        delta_seconds: f32,
        sample: Option<&PoseSample>,
        library: &GestureLibrary,
        config: &RecognitionConfig,
    ) -> Result<Vec<GestureSignal>, GestureError> {
        let mut signals = Vec::new();

        let Some(sample) = sample else {
            return Ok(signals);
        };

        let Some(candidate) = self.candidate else {
            self.tick_idle(sample, library, config, &mut signals)?;
            return Ok(signals);
        };

        let Some(sequence) = library.get_dynamic_gesture(candidate) else {
            self.clear();
            return Err(GestureError::UnknownGesture(candidate));
        };

        match self.casting {
            false => self.tick_tracking(delta_seconds, sample, sequence, config, &mut signals)?,
            true => self.tick_completed(sample, sequence, config, &mut signals)?,
        }

        Ok(signals)
    }

    /// Drop the current attempt.
    ///
    /// [`GestureSignal::SequenceEnded`] is only produced for a completed sequence.
    pub fn reset(&mut self) -> Option<GestureSignal> {
        let ended = match (self.candidate, self.casting) {
            (Some(sequence), true) => Some(GestureSignal::SequenceEnded { sequence }),
            _ => None,
        };
        self.clear();

        ended
    }

    fn tick_idle(
        &mut self,
        sample: &PoseSample,
        library: &GestureLibrary,
        config: &RecognitionConfig,
        signals: &mut Vec<GestureSignal>,
    ) -> Result<(), GestureError> {
        let sequences = library
            .dynamic_gestures_for(self.hand)
            .collect::<Vec<_>>();

        let first_steps = sequences.iter().map(|s| s.first_step());
        let Some(matched) = match_pose(sample, first_steps, &config.thresholds)? else {
            return Ok(());
        };
        let Some(sequence) = sequences
            .iter()
            .find(|s| s.first_step().id() == matched.id())
        else {
            return Ok(());
        };

        self.candidate = Some(sequence.id());
        self.advance(sequence, signals);

        Ok(())
    }

    fn tick_tracking(
        &mut self,
        delta_seconds: f32,
        sample: &PoseSample,
        sequence: &DynamicGestureTemplate,
        config: &RecognitionConfig,
        signals: &mut Vec<GestureSignal>,
    ) -> Result<(), GestureError> {
        let Some(expected) = sequence.step(self.step_index) else {
            // Out of range index, only possible if the library changed underneath us.
            self.clear();
            return Ok(());
        };

        if match_pose(sample, [expected], &config.thresholds)?.is_some() {
            self.advance(sequence, signals);
            return Ok(());
        }

        self.elapsed += delta_seconds;
        if self.elapsed >= config.max_time_next_step {
            signals.push(GestureSignal::SequenceEnded {
                sequence: sequence.id(),
            });
            self.clear();
        }

        Ok(())
    }

    fn tick_completed(
        &mut self,
        sample: &PoseSample,
        sequence: &DynamicGestureTemplate,
        config: &RecognitionConfig,
        signals: &mut Vec<GestureSignal>,
    ) -> Result<(), GestureError> {
        let final_steps = sequence.steps().last();
        if match_pose(sample, final_steps, &config.thresholds)?.is_some() {
            // Still holding the final pose.
            return Ok(());
        }

        signals.push(GestureSignal::SequenceEnded {
            sequence: sequence.id(),
        });
        self.clear();

        Ok(())
    }

    /// Record a successful match of the step at `step_index`.
    fn advance(&mut self, sequence: &DynamicGestureTemplate, signals: &mut Vec<GestureSignal>) {
        let template = sequence.steps()[self.step_index].id();
        signals.push(GestureSignal::StepRecognized {
            sequence: sequence.id(),
            step: self.step_index,
            template,
        });

        self.elapsed = 0.0;
        self.step_index += 1;

        if self.step_index == sequence.len() {
            self.casting = true;
            signals.push(GestureSignal::SequenceRecognized {
                sequence: sequence.id(),
            });
        }
    }

    fn clear(&mut self) {
        *self = Self::new(self.hand);
    }
}

// Getter functions
impl SequenceTracker {
    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn candidate(&self) -> Option<GestureId> {
        self.candidate
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_casting(&self) -> bool {
        self.casting
    }

    pub fn phase(&self) -> SequencePhase {
        match (self.candidate, self.casting) {
            (None, _) => SequencePhase::Idle,
            (Some(_), false) => SequencePhase::Tracking,
            (Some(_), true) => SequencePhase::Completed,
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::prelude::*;

    use super::*;
    use crate::pose::JointPose;

    const DT: f32 = 1.0 / 60.0;

    fn pose_at(y: f32) -> PoseSample {
        PoseSample(vec![
            JointPose::new(Vec3::ZERO, Quat::IDENTITY),
            JointPose::new(Vec3::new(0.0, y, 0.0), Quat::IDENTITY),
        ])
    }

    fn config() -> RecognitionConfig {
        RecognitionConfig {
            max_time_next_step: 0.5,
            ..default()
        }
    }

    /// Library with a 3 step "fireball" on the left hand (poses at 0.0, 0.3, 0.6)
    /// and a 2 step "shield" on the right hand.
    fn library() -> (GestureLibrary, GestureId) {
        let mut library = GestureLibrary::new();
        let fireball = library
            .add_dynamic_gesture(
                "fireball",
                Hand::Left,
                vec![pose_at(0.0), pose_at(0.3), pose_at(0.6)],
            )
            .unwrap();
        library
            .add_dynamic_gesture("shield", Hand::Right, vec![pose_at(0.9), pose_at(1.2)])
            .unwrap();

        (library, fireball)
    }

    fn tick(
        tracker: &mut SequenceTracker,
        library: &GestureLibrary,
        sample: Option<&PoseSample>,
        dt: f32,
    ) -> Vec<GestureSignal> {
        tracker.tick(dt, sample, library, &config()).unwrap()
    }

    fn count_recognized(signals: &[GestureSignal]) -> usize {
        signals
            .iter()
            .filter(|s| matches!(s, GestureSignal::SequenceRecognized { .. }))
            .count()
    }

    #[test]
    fn completes_exactly_once() {
        let (library, fireball) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);
        let mut signals = Vec::new();

        for y in [0.0, 0.3, 0.6] {
            signals.extend(tick(&mut tracker, &library, Some(&pose_at(y)), DT));
        }
        assert_eq!(tracker.phase(), SequencePhase::Completed);
        assert_eq!(tracker.step_index(), 3);

        // Hold the final pose for a while.
        for _ in 0..30 {
            signals.extend(tick(&mut tracker, &library, Some(&pose_at(0.6)), DT));
        }

        assert_eq!(count_recognized(&signals), 1);
        let steps = signals
            .iter()
            .filter_map(|s| match s {
                GestureSignal::StepRecognized { sequence, step, .. } => {
                    assert_eq!(*sequence, fireball);
                    Some(*step)
                }
                _ => None,
            })
            .collect::<Vec<_>>();
        assert_eq!(steps, vec![0, 1, 2]);
        assert!(tracker.is_casting());
    }

    #[test]
    fn releasing_final_pose_ends_sequence() {
        let (library, fireball) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        for y in [0.0, 0.3, 0.6] {
            tick(&mut tracker, &library, Some(&pose_at(y)), DT);
        }

        let signals = tick(&mut tracker, &library, Some(&pose_at(2.0)), DT);
        assert_eq!(
            signals,
            vec![GestureSignal::SequenceEnded { sequence: fireball }]
        );
        assert_eq!(tracker.phase(), SequencePhase::Idle);
        assert_eq!(tracker.step_index(), 0);
        assert!(tracker.is_casting() == false);
    }

    #[test]
    fn timeout_abandons_stalled_attempt() {
        let (library, fireball) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        tick(&mut tracker, &library, Some(&pose_at(0.0)), DT);
        assert_eq!(tracker.phase(), SequencePhase::Tracking);
        assert_eq!(tracker.step_index(), 1);

        // Still waiting, below the timeout.
        let signals = tick(&mut tracker, &library, Some(&pose_at(2.0)), 0.3);
        assert!(signals.is_empty());
        assert_eq!(tracker.step_index(), 1);

        let signals = tick(&mut tracker, &library, Some(&pose_at(2.0)), 0.3);
        assert_eq!(
            signals,
            vec![GestureSignal::SequenceEnded { sequence: fireball }]
        );
        assert_eq!(tracker.phase(), SequencePhase::Idle);
        assert_eq!(tracker.candidate(), None);
    }

    #[test]
    fn single_missed_frame_keeps_progress() {
        let (library, _) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        tick(&mut tracker, &library, Some(&pose_at(0.0)), DT);
        tick(&mut tracker, &library, Some(&pose_at(0.3)), DT);
        // Transient mis-read.
        tick(&mut tracker, &library, Some(&pose_at(1.5)), DT);
        assert_eq!(tracker.step_index(), 2);

        let signals = tick(&mut tracker, &library, Some(&pose_at(0.6)), DT);
        assert_eq!(count_recognized(&signals), 1);
    }

    #[test]
    fn successful_step_resets_timer() {
        let (library, _) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        tick(&mut tracker, &library, Some(&pose_at(0.0)), DT);
        tick(&mut tracker, &library, Some(&pose_at(1.5)), 0.4);
        assert!(tracker.elapsed() > 0.0);

        tick(&mut tracker, &library, Some(&pose_at(0.3)), DT);
        assert_eq!(tracker.elapsed(), 0.0);

        // Would have timed out without the reset.
        tick(&mut tracker, &library, Some(&pose_at(1.5)), 0.4);
        assert_eq!(tracker.phase(), SequencePhase::Tracking);
    }

    #[test]
    fn missing_sample_is_a_no_op() {
        let (library, _) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        tick(&mut tracker, &library, Some(&pose_at(0.0)), DT);
        let signals = tick(&mut tracker, &library, None, 10.0);

        assert!(signals.is_empty());
        assert_eq!(tracker.phase(), SequencePhase::Tracking);
        assert_eq!(tracker.elapsed(), 0.0);
    }

    #[test]
    fn ignores_other_hands_gestures() {
        let (library, _) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        // First step of the right hand "shield".
        let signals = tick(&mut tracker, &library, Some(&pose_at(0.9)), DT);
        assert!(signals.is_empty());
        assert_eq!(tracker.phase(), SequencePhase::Idle);
    }

    #[test]
    fn single_step_gesture_completes_immediately() {
        let mut library = GestureLibrary::new();
        let snap = library
            .add_dynamic_gesture("snap", Hand::Right, vec![pose_at(0.2)])
            .unwrap();
        let mut tracker = SequenceTracker::new(Hand::Right);

        let signals = tick(&mut tracker, &library, Some(&pose_at(0.2)), DT);
        assert_eq!(signals.len(), 2);
        assert_eq!(
            signals[1],
            GestureSignal::SequenceRecognized { sequence: snap }
        );
        assert_eq!(tracker.phase(), SequencePhase::Completed);
    }

    #[test]
    fn reset_only_ends_completed_sequences() {
        let (library, fireball) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);

        tick(&mut tracker, &library, Some(&pose_at(0.0)), DT);
        assert_eq!(tracker.reset(), None);
        assert_eq!(tracker.phase(), SequencePhase::Idle);

        for y in [0.0, 0.3, 0.6] {
            tick(&mut tracker, &library, Some(&pose_at(y)), DT);
        }
        assert_eq!(
            tracker.reset(),
            Some(GestureSignal::SequenceEnded { sequence: fireball })
        );
        assert_eq!(tracker.phase(), SequencePhase::Idle);
    }

    #[test]
    fn replaced_library_reports_unknown_candidate() {
        let (library, fireball) = library();
        let mut tracker = SequenceTracker::new(Hand::Left);
        tick(&mut tracker, &library, Some(&pose_at(0.0)), DT);

        let result = tracker.tick(DT, Some(&pose_at(0.3)), &GestureLibrary::new(), &config());
        assert_eq!(result, Err(GestureError::UnknownGesture(fireball)));
        assert_eq!(tracker.phase(), SequencePhase::Idle);
    }
}
