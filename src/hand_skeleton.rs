//! Skeleton provider surface: whatever tracks the hands writes [`HandSkeleton`],
//! and [`HandPose`] is derived from it for recognition.

use bevy::prelude::*;
use bevy_hand_pose::prelude::*;

pub struct HandSkeletonPlugin;

impl Plugin for HandSkeletonPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PreUpdate, sample_hand_poses.in_set(HandSkeletonSet));
    }
}

/// Runs in [`PreUpdate`]. Skeleton providers should write before this set.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandSkeletonSet;

/// Convert world space skeletons into root relative samples.
fn sample_hand_poses(mut q_hands: Query<(&HandSkeleton, &mut HandPose), Changed<HandSkeleton>>) {
    for (skeleton, mut pose) in q_hands.iter_mut() {
        let sample = skeleton.sample();

        if pose.is_none() && sample.is_some() {
            log_bones(skeleton);
        }

        pose.0 = sample;
    }
}

fn log_bones(skeleton: &HandSkeleton) {
    debug!("{} hand tracked:", skeleton.hand.as_str());
    for (i, bone) in skeleton.bones.iter().enumerate() {
        debug!("  bone {i} | pos -> {} | rot -> {}", bone.position, bone.rotation);
    }
}

/// Latest skeleton of one hand, in world space.
#[derive(Component, Debug, Clone)]
pub struct HandSkeleton {
    pub hand: Hand,
    /// World transform of the hand root, samples are expressed relative to it.
    pub root: Transform,
    /// World space joints, in template joint order.
    pub bones: Vec<JointPose>,
    pub is_tracked: bool,
    /// Index of the palm joint inside [`Self::bones`], if the skeleton has one.
    pub palm_index: Option<usize>,
}

impl HandSkeleton {
    pub fn new(hand: Hand) -> Self {
        Self {
            hand,
            root: Transform::IDENTITY,
            bones: Vec::new(),
            is_tracked: false,
            palm_index: None,
        }
    }

    /// Root relative sample, `None` while the hand is not tracked.
    pub fn sample(&self) -> Option<PoseSample> {
        if self.is_tracked == false || self.bones.is_empty() {
            return None;
        }

        Some(PoseSample::from_world(&self.root, self.bones.iter().copied()))
    }

    /// World position of the palm joint.
    pub fn palm_position(&self) -> Option<Vec3> {
        if self.is_tracked == false {
            return None;
        }

        self.palm_index
            .and_then(|i| self.bones.get(i))
            .map(|bone| bone.position)
    }

    /// Place a root relative pose at [`Self::root`], mostly useful for scripted hands.
    pub fn set_local_pose(&mut self, pose: &PoseSample) {
        self.bones = pose
            .iter()
            .map(|joint| JointPose {
                position: self.root.transform_point(joint.position),
                rotation: self.root.rotation * joint.rotation,
            })
            .collect();
    }
}

/// Root relative pose of the hand for the current frame.
#[derive(Component, Default, Debug, Clone, Deref)]
pub struct HandPose(pub Option<PoseSample>);

impl HandPose {
    pub fn sample(&self) -> Option<&PoseSample> {
        self.0.as_ref()
    }
}

#[derive(Bundle)]
pub struct HandBundle {
    pub skeleton: HandSkeleton,
    pub pose: HandPose,
    pub recognizer: HandRecognizer,
}

impl HandBundle {
    pub fn new(hand: Hand) -> Self {
        Self {
            skeleton: HandSkeleton::new(hand),
            pose: HandPose::default(),
            recognizer: HandRecognizer::new(hand),
        }
    }
}
