use bevy::asset::io::Reader;
use bevy::asset::{AssetLoader, AsyncReadExt, LoadContext};
use bevy::prelude::*;
use bevy_hand_pose::prelude::*;
use thiserror::Error;

use crate::recognition::{GestureSignalWriters, RecognitionSet};

/// Loads a [`GestureLibraryAsset`] from `path` and installs it as the active [`GestureLibrary`].
///
/// Requires the [`AssetPlugin`].
pub struct GestureLibraryAssetPlugin {
    /// Asset path of the library, relative to the assets folder.
    pub path: String,
}

impl Default for GestureLibraryAssetPlugin {
    fn default() -> Self {
        Self {
            path: "gestures/spells.gestures.json".to_string(),
        }
    }
}

impl Plugin for GestureLibraryAssetPlugin {
    fn build(&self, app: &mut App) {
        app.init_asset::<GestureLibraryAsset>()
            .init_asset_loader::<GestureLibraryAssetLoader>()
            .insert_resource(GestureLibraryPath(self.path.clone()))
            .add_systems(Startup, load_gesture_library)
            .add_systems(Update, install_gesture_library.before(RecognitionSet));
    }
}

#[derive(Resource, Debug, Deref)]
pub struct GestureLibraryPath(pub String);

#[derive(Resource, Debug, Deref, DerefMut)]
pub struct GestureLibraryHandle(pub Handle<GestureLibraryAsset>);

pub fn load_gesture_library(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    path: Res<GestureLibraryPath>,
) {
    info!("Loading gesture library: {}", **path);
    let handle = asset_server.load::<GestureLibraryAsset>(path.0.clone());

    commands.insert_resource(GestureLibraryHandle(handle));
}

/// Replace the active library whenever the asset finishes loading or is modified.
///
/// Every recognizer is reset first, so no id from the old library survives.
fn install_gesture_library(
    mut asset_evr: EventReader<AssetEvent<GestureLibraryAsset>>,
    assets: Res<Assets<GestureLibraryAsset>>,
    handle: Option<Res<GestureLibraryHandle>>,
    mut library: ResMut<GestureLibrary>,
    mut q_recognizers: Query<(Entity, &mut HandRecognizer)>,
    mut signal_writers: GestureSignalWriters,
) {
    let Some(handle) = handle else {
        asset_evr.clear();
        return;
    };
    let id = handle.id();

    for event in asset_evr.read() {
        if event.is_loaded_with_dependencies(id) == false && event.is_modified(id) == false {
            continue;
        }
        let Some(asset) = assets.get(id) else {
            continue;
        };

        match GestureLibrary::from_def(asset) {
            Ok(new_library) => {
                signal_writers.reset_all(&mut q_recognizers, &library);
                info!(
                    "Installed gesture library: {} gestures, {} dynamic gestures.",
                    new_library.gestures().len(),
                    new_library.dynamic_gestures().len()
                );
                *library = new_library;
            }
            Err(err) => error!("Failed to build gesture library: {err}"),
        }
    }
}

/// Serialized gesture templates, see [`GestureLibraryDef`].
#[derive(Asset, TypePath, Debug, Deref)]
pub struct GestureLibraryAsset(pub GestureLibraryDef);

#[derive(Default)]
pub struct GestureLibraryAssetLoader;

impl AssetLoader for GestureLibraryAssetLoader {
    type Asset = GestureLibraryAsset;
    type Settings = ();
    type Error = GestureLibraryLoaderError;

    async fn load<'a>(
        &'a self,
        reader: &'a mut Reader<'_>,
        _settings: &'a (),
        _load_context: &'a mut LoadContext<'_>,
    ) -> Result<Self::Asset, Self::Error> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes).await?;

        parse_gesture_library(&bytes)
    }

    fn extensions(&self) -> &[&str] {
        &["gestures.json"]
    }
}

/// Deserialize a library, rejecting one that could never be installed.
pub fn parse_gesture_library(bytes: &[u8]) -> Result<GestureLibraryAsset, GestureLibraryLoaderError> {
    let def = serde_json::from_slice::<GestureLibraryDef>(bytes)?;
    GestureLibrary::from_def(&def)?;

    Ok(GestureLibraryAsset(def))
}

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum GestureLibraryLoaderError {
    #[error("Could not load gesture library file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Could not deserialize using serde: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Invalid gesture library: {0}")]
    Gesture(#[from] GestureError),
}

#[cfg(test)]
mod tests {
    use bevy::ecs::event::ManualEventReader;
    use bevy_hand_pose::library::{DynamicGestureDef, GestureDef};

    use super::*;
    use crate::recognition::{RecognitionDelay, RecognitionPlugin, SequenceEnded};

    fn pose_at(x: f32) -> PoseSample {
        PoseSample(vec![JointPose::new(Vec3::new(x, 0.0, 0.0), Quat::IDENTITY)])
    }

    /// App with every recognizer and the asset storage, but no asset server.
    fn install_app(library: GestureLibrary) -> App {
        let mut app = App::new();
        app.init_resource::<Time>()
            .add_plugins(RecognitionPlugin)
            // Recognition stays off, recognizers are driven by hand.
            .insert_resource(RecognitionDelay::new(1000.0))
            .insert_resource(library)
            .init_resource::<Assets<GestureLibraryAsset>>()
            .add_event::<AssetEvent<GestureLibraryAsset>>()
            .add_systems(Update, install_gesture_library.before(RecognitionSet));
        app
    }

    #[test]
    fn installing_library_ends_sequences_of_the_old_one() {
        let mut old_library = GestureLibrary::new();
        old_library
            .add_dynamic_gesture("wave", Hand::Left, vec![pose_at(0.0), pose_at(0.5)])
            .unwrap();

        let mut recognizer = HandRecognizer::new(Hand::Left);
        let config = RecognitionConfig::default();
        for x in [0.0, 0.5] {
            recognizer
                .tick(0.016, Some(&pose_at(x)), &old_library, &config)
                .unwrap();
        }
        assert!(recognizer.sequence().is_casting());

        let mut app = install_app(old_library);
        let hand = app.world_mut().spawn(recognizer).id();

        let def = GestureLibraryDef {
            gestures: vec![GestureDef {
                name: "fist".to_string(),
                hand: Hand::Left,
                pose: pose_at(0.0),
            }],
            dynamic_gestures: Vec::new(),
        };
        let handle = app
            .world_mut()
            .resource_mut::<Assets<GestureLibraryAsset>>()
            .add(GestureLibraryAsset(def));
        let id = handle.id();
        app.insert_resource(GestureLibraryHandle(handle));

        let mut ended = ManualEventReader::<SequenceEnded>::default();
        app.world_mut()
            .send_event(AssetEvent::LoadedWithDependencies { id });
        app.update();

        let all_ended = ended
            .read(app.world().resource::<Events<SequenceEnded>>())
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(all_ended.len(), 1);
        // Named by the library that produced it.
        assert_eq!(all_ended[0].name, "wave");
        assert_eq!(all_ended[0].entity, hand);

        let recognizer = app.world().get::<HandRecognizer>(hand).unwrap();
        assert_eq!(recognizer.sequence().phase(), SequencePhase::Idle);

        let library = app.world().resource::<GestureLibrary>();
        assert_eq!(library.gestures().len(), 1);
        assert!(library.dynamic_gestures().is_empty());
    }

    #[test]
    fn invalid_modification_keeps_active_library() {
        let mut app = install_app(GestureLibrary::new());

        let def = GestureLibraryDef {
            gestures: Vec::new(),
            dynamic_gestures: vec![DynamicGestureDef {
                name: "wave".to_string(),
                hand: Hand::Right,
                steps: vec![pose_at(0.0), pose_at(0.5)],
            }],
        };
        let handle = app
            .world_mut()
            .resource_mut::<Assets<GestureLibraryAsset>>()
            .add(GestureLibraryAsset(def));
        let id = handle.id();
        app.insert_resource(GestureLibraryHandle(handle));

        app.world_mut()
            .send_event(AssetEvent::LoadedWithDependencies { id });
        app.update();
        assert_eq!(app.world().resource::<GestureLibrary>().dynamic_gestures().len(), 1);

        // A sequence without steps cannot be built.
        app.world_mut()
            .resource_mut::<Assets<GestureLibraryAsset>>()
            .get_mut(id)
            .unwrap()
            .0
            .dynamic_gestures[0]
            .steps
            .clear();
        app.world_mut().send_event(AssetEvent::Modified { id });
        app.update();

        let library = app.world().resource::<GestureLibrary>();
        assert_eq!(library.dynamic_gestures().len(), 1);
        assert_eq!(library.dynamic_gestures()[0].name(), "wave");
    }

    #[test]
    fn parse_rejects_uninstallable_library() {
        let empty_sequence = br#"{
            "dynamic_gestures": [{ "name": "wave", "hand": "left", "steps": [] }]
        }"#;
        assert!(matches!(
            parse_gesture_library(empty_sequence),
            Err(GestureLibraryLoaderError::Gesture(GestureError::EmptySequence { .. }))
        ));

        assert!(matches!(
            parse_gesture_library(b"{ \"gestures\": 3 }"),
            Err(GestureLibraryLoaderError::Serde(_))
        ));

        let asset = parse_gesture_library(br#"{ "gestures": [] }"#).unwrap();
        assert!(asset.gestures.is_empty());
    }

    #[test]
    fn bundled_library_parses() {
        let bytes = include_bytes!("../assets/gestures/spells.gestures.json");
        let asset = parse_gesture_library(bytes).unwrap();
        let library = GestureLibrary::from_def(&asset).unwrap();

        assert_eq!(library.dynamic_gestures_for(Hand::Left).count(), 2);
        assert_eq!(library.dynamic_gestures_for(Hand::Right).count(), 2);
    }
}
