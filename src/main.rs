//! Headless demo: scripted hands perform the spells of `assets/gestures/spells.gestures.json`.

use std::time::Duration;

use bevy::app::{AppExit, ScheduleRunnerPlugin};
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_gesture_casting::prelude::*;

/// Time spent on each step of a gesture.
const STEP_SECONDS: f32 = 0.3;
/// Time the final pose of a gesture is held.
const HOLD_SECONDS: f32 = 1.0;

fn main() {
    App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
                1.0 / 60.0,
            ))),
            LogPlugin::default(),
            AssetPlugin::default(),
            GestureCastingPlugin::default(),
        ))
        .insert_resource(RecognitionDelay::new(0.5))
        .add_systems(Startup, (spawn_hands, bind_spells))
        .add_systems(
            PreUpdate,
            (start_script, play_script)
                .chain()
                .before(HandSkeletonSet),
        )
        .add_systems(
            Update,
            (log_sequences.after(RecognitionSet), exit_when_done),
        )
        .run();
}

fn spawn_hands(mut commands: Commands) {
    for (hand, x) in [(Hand::Left, -0.1), (Hand::Right, 0.1)] {
        let mut bundle = HandBundle::new(hand);
        bundle.skeleton.root = Transform::from_xyz(x, 1.2, 0.3);
        // The wrist doubles as the palm joint.
        bundle.skeleton.palm_index = Some(0);
        commands.spawn(bundle);
    }
}

fn bind_spells(mut bindings: ResMut<SpellBindings>) {
    bindings
        .bind("fireball", Spell::one_handed("fireball"))
        .bind("electricity", Spell::one_handed("electricity"))
        .bind("fire_beam", Spell::two_handed("fire_beam"));
}

/// A pose applied to one hand at a given time.
struct Keyframe {
    at: f32,
    hand: Hand,
    pose: PoseSample,
}

#[derive(Resource)]
struct DemoScript {
    keyframes: Vec<Keyframe>,
    cursor: usize,
    time: f32,
    duration: f32,
}

impl DemoScript {
    fn from_library(library: &GestureLibrary) -> Self {
        let mut script = Self {
            keyframes: Vec::new(),
            cursor: 0,
            time: 0.0,
            duration: 0.0,
        };

        let mut at = 0.0;
        at = script.perform(library, &[Hand::Left], "fireball", at);
        at = script.perform(library, &[Hand::Right], "electricity", at);
        at = script.perform(library, &Hand::BOTH, "fire_beam", at);
        script.duration = at + 0.5;

        script
            .keyframes
            .sort_by(|k0, k1| k0.at.total_cmp(&k1.at));
        script
    }

    /// Queue every step of the dynamic gesture `name` on `hands`, hold it, then let go.
    ///
    /// Returns the time at which the performance is over.
    fn perform(&mut self, library: &GestureLibrary, hands: &[Hand], name: &str, start: f32) -> f32 {
        let mut end = start;

        for &hand in hands {
            let Some(gesture) = library
                .dynamic_gestures_for(hand)
                .find(|g| g.name() == name)
            else {
                warn!("No {} hand gesture named \"{}\".", hand.as_str(), name);
                continue;
            };

            let mut at = start;
            for step in gesture.steps() {
                self.keyframes.push(Keyframe {
                    at,
                    hand,
                    pose: step.pose().clone(),
                });
                at += STEP_SECONDS;
            }

            at += HOLD_SECONDS;
            let released = gesture
                .steps()
                .last()
                .map(|step| released_pose(step.pose()))
                .unwrap_or_default();
            self.keyframes.push(Keyframe {
                at,
                hand,
                pose: released,
            });

            end = f32::max(end, at + STEP_SECONDS);
        }

        end
    }
}

/// Same hand shape, lifted far enough to not match anything.
fn released_pose(pose: &PoseSample) -> PoseSample {
    pose.iter()
        .map(|joint| JointPose {
            position: joint.position + Vec3::Y * 0.3,
            rotation: joint.rotation,
        })
        .collect()
}

fn start_script(
    mut commands: Commands,
    library: Res<GestureLibrary>,
    delay: Res<RecognitionDelay>,
    script: Option<Res<DemoScript>>,
) {
    if script.is_some() || library.is_empty() || delay.finished() == false {
        return;
    }

    let script = DemoScript::from_library(&library);
    info!(
        "Playing {} keyframes over {:.1}s.",
        script.keyframes.len(),
        script.duration
    );
    commands.insert_resource(script);
}

fn play_script(
    script: Option<ResMut<DemoScript>>,
    mut q_skeletons: Query<&mut HandSkeleton>,
    time: Res<Time>,
) {
    let Some(script) = script else {
        return;
    };
    let script = script.into_inner();
    script.time += time.delta_seconds();

    while let Some(keyframe) = script.keyframes.get(script.cursor) {
        if keyframe.at > script.time {
            break;
        }

        for mut skeleton in q_skeletons
            .iter_mut()
            .filter(|skeleton| skeleton.hand == keyframe.hand)
        {
            skeleton.is_tracked = true;
            skeleton.set_local_pose(&keyframe.pose);
        }
        script.cursor += 1;
    }
}

fn log_sequences(
    mut step_evr: EventReader<StepRecognized>,
    mut ended_evr: EventReader<SequenceEnded>,
) {
    for step in step_evr.read() {
        info!(
            "{} hand: step {} of {}",
            step.gesture.hand.as_str(),
            step.step,
            step.gesture.name
        );
    }
    for ended in ended_evr.read() {
        info!("{} hand: {} ended", ended.hand.as_str(), ended.name);
    }
}

fn exit_when_done(script: Option<Res<DemoScript>>, mut exit_evw: EventWriter<AppExit>) {
    let Some(script) = script else {
        return;
    };

    if script.time > script.duration {
        exit_evw.send(AppExit::Success);
    }
}
