use bevy::prelude::*;

pub use bevy_hand_pose;

pub mod gesture_library;
pub mod hand_skeleton;
pub mod recognition;
pub mod spell_caster;

pub mod prelude {
    pub use bevy_hand_pose::prelude::*;

    pub use crate::gesture_library::{GestureLibraryAsset, GestureLibraryAssetPlugin};
    pub use crate::hand_skeleton::{HandBundle, HandPose, HandSkeleton, HandSkeletonSet};
    pub use crate::recognition::{
        RecognitionDelay, RecognitionSet, RecognizedGesture, ResetRecognizers, SequenceEnded,
        SequenceRecognized, StaticRecognized, StaticRecognizedEnd, StepRecognized,
    };
    pub use crate::spell_caster::{
        CastTarget, CastedSpells, HandsProximity, Spell, SpellBindings, SpellCast,
        SpellCasterConfig, SpellCleared,
    };
    pub use crate::GestureCastingPlugin;
}

/// Everything needed to cast spells from hand gestures.
///
/// Gesture templates are loaded from `library_path` through the [`AssetPlugin`],
/// which must be added before this plugin.
pub struct GestureCastingPlugin {
    pub library_path: String,
}

impl Default for GestureCastingPlugin {
    fn default() -> Self {
        Self {
            library_path: gesture_library::GestureLibraryAssetPlugin::default().path,
        }
    }
}

impl Plugin for GestureCastingPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            hand_skeleton::HandSkeletonPlugin,
            recognition::RecognitionPlugin,
            gesture_library::GestureLibraryAssetPlugin {
                path: self.library_path.clone(),
            },
            spell_caster::SpellCasterPlugin,
        ));
    }
}
