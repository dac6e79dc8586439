//! Per frame gesture recognition for every hand entity.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_hand_pose::prelude::*;

use crate::hand_skeleton::HandPose;

pub struct RecognitionPlugin;

impl Plugin for RecognitionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RecognitionConfig>()
            .init_resource::<GestureLibrary>()
            .insert_resource(RecognitionDelay::new(2.5))
            .add_event::<StepRecognized>()
            .add_event::<SequenceRecognized>()
            .add_event::<SequenceEnded>()
            .add_event::<StaticRecognized>()
            .add_event::<StaticRecognizedEnd>()
            .add_event::<ResetRecognizers>()
            .add_systems(
                Update,
                (
                    validate_config.run_if(resource_changed::<RecognitionConfig>),
                    tick_recognition_delay,
                    reset_recognizers,
                    recognize_gestures.run_if(recognition_ready),
                )
                    .chain()
                    .in_set(RecognitionSet),
            );
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecognitionSet;

/// Time to wait before the first recognition, giving the skeleton provider a chance to start.
#[derive(Resource, Debug, Deref, DerefMut)]
pub struct RecognitionDelay(pub Timer);

impl RecognitionDelay {
    pub fn new(seconds: f32) -> Self {
        Self(Timer::from_seconds(seconds, TimerMode::Once))
    }
}

fn tick_recognition_delay(mut delay: ResMut<RecognitionDelay>, time: Res<Time>) {
    if delay.finished() {
        return;
    }

    delay.tick(time.delta());
    if delay.finished() {
        info!("Gesture recognition started.");
    }
}

fn recognition_ready(delay: Res<RecognitionDelay>) -> bool {
    delay.finished()
}

fn validate_config(config: Res<RecognitionConfig>) {
    if let Err(err) = config.validate() {
        warn!("Recognition is paused: {err}");
    }
}

fn recognize_gestures(
    mut q_hands: Query<(Entity, &HandPose, &mut HandRecognizer)>,
    library: Res<GestureLibrary>,
    config: Res<RecognitionConfig>,
    time: Res<Time>,
    mut signal_writers: GestureSignalWriters,
) {
    if config.validate().is_err() {
        return;
    }

    for (entity, pose, mut recognizer) in q_hands.iter_mut() {
        let hand = recognizer.hand();

        match recognizer.tick(time.delta_seconds(), pose.sample(), &library, &config) {
            Ok(signals) => {
                for signal in signals {
                    signal_writers.send(entity, hand, signal, &library);
                }
            }
            Err(err) => warn!("Skipping {} hand this frame: {err}", hand.as_str()),
        }
    }
}

fn reset_recognizers(
    mut reset_evr: EventReader<ResetRecognizers>,
    mut q_recognizers: Query<(Entity, &mut HandRecognizer)>,
    library: Res<GestureLibrary>,
    mut signal_writers: GestureSignalWriters,
) {
    if reset_evr.is_empty() {
        return;
    }
    reset_evr.clear();

    signal_writers.reset_all(&mut q_recognizers, &library);
}

/// Publishes [`GestureSignal`]s as events.
#[derive(SystemParam)]
pub struct GestureSignalWriters<'w> {
    step: EventWriter<'w, StepRecognized>,
    sequence_recognized: EventWriter<'w, SequenceRecognized>,
    sequence_ended: EventWriter<'w, SequenceEnded>,
    static_recognized: EventWriter<'w, StaticRecognized>,
    static_recognized_end: EventWriter<'w, StaticRecognizedEnd>,
}

impl GestureSignalWriters<'_> {
    /// `library` must be the one the signal was produced with, it resolves gesture names.
    pub fn send(&mut self, entity: Entity, hand: Hand, signal: GestureSignal, library: &GestureLibrary) {
        let gesture = RecognizedGesture {
            entity,
            hand,
            gesture: signal.gesture(),
            name: library
                .name_of(signal.gesture())
                .unwrap_or_default()
                .to_string(),
        };
        debug!("{:?} ({} hand, \"{}\")", signal, hand.as_str(), gesture.name);

        match signal {
            GestureSignal::StepRecognized { step, template, .. } => {
                self.step.send(StepRecognized {
                    gesture,
                    step,
                    template,
                });
            }
            GestureSignal::SequenceRecognized { .. } => {
                self.sequence_recognized.send(SequenceRecognized(gesture));
            }
            GestureSignal::SequenceEnded { .. } => {
                self.sequence_ended.send(SequenceEnded(gesture));
            }
            GestureSignal::StaticRecognized { .. } => {
                self.static_recognized.send(StaticRecognized(gesture));
            }
            GestureSignal::StaticRecognizedEnd { .. } => {
                self.static_recognized_end.send(StaticRecognizedEnd(gesture));
            }
        }
    }

    /// Reset every recognizer, publishing the end of whatever was recognized.
    pub fn reset_all(
        &mut self,
        q_recognizers: &mut Query<(Entity, &mut HandRecognizer)>,
        library: &GestureLibrary,
    ) {
        for (entity, mut recognizer) in q_recognizers.iter_mut() {
            let hand = recognizer.hand();
            for signal in recognizer.reset() {
                self.send(entity, hand, signal, library);
            }
        }
    }
}

/// Which gesture was involved in a recognition event, and on which hand.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedGesture {
    /// Hand entity owning the [`HandRecognizer`].
    pub entity: Entity,
    pub hand: Hand,
    /// Dynamic gesture id for sequence events, template id for static events.
    pub gesture: GestureId,
    pub name: String,
}

/// One step of a dynamic gesture was performed.
#[derive(Event, Debug, Clone)]
pub struct StepRecognized {
    pub gesture: RecognizedGesture,
    pub step: usize,
    pub template: GestureId,
}

/// A dynamic gesture was completed.
#[derive(Event, Debug, Clone, Deref)]
pub struct SequenceRecognized(pub RecognizedGesture);

/// A completed dynamic gesture was released, or an attempt timed out.
#[derive(Event, Debug, Clone, Deref)]
pub struct SequenceEnded(pub RecognizedGesture);

#[derive(Event, Debug, Clone, Deref)]
pub struct StaticRecognized(pub RecognizedGesture);

#[derive(Event, Debug, Clone, Deref)]
pub struct StaticRecognizedEnd(pub RecognizedGesture);

/// Drop all in-progress recognition on every hand.
#[derive(Event, Debug, Clone, Copy, Default)]
pub struct ResetRecognizers;
