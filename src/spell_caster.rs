//! Turns recognized gestures into spell casts.
//!
//! One handed spells are cast as soon as their gesture is recognized. Two handed
//! spells need both hands to cast the same spell while the palms are close together.

use bevy::prelude::*;
use bevy::utils::HashMap;
use bevy_hand_pose::prelude::*;
use serde::{Deserialize, Serialize};

use crate::hand_skeleton::HandSkeleton;
use crate::recognition::{
    RecognitionSet, RecognizedGesture, SequenceEnded, SequenceRecognized, StaticRecognized,
    StaticRecognizedEnd,
};

pub struct SpellCasterPlugin;

impl Plugin for SpellCasterPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(SpellCasterConfig {
            max_hands_distance: 0.3,
        })
        .init_resource::<SpellBindings>()
        .init_resource::<CastedSpells>()
        .init_resource::<HandsProximity>()
        .add_event::<SpellCast>()
        .add_event::<SpellCleared>()
        .add_systems(
            Update,
            (update_hands_proximity, cast_spells, clear_spells)
                .chain()
                .after(RecognitionSet),
        );
    }
}

#[derive(Resource, Serialize, Deserialize, Debug, Clone, Copy)]
pub struct SpellCasterConfig {
    /// Palms closer than this along the x axis count as together.
    pub max_hands_distance: f32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Spell {
    pub name: String,
    /// Needs both hands casting it together.
    pub two_handed: bool,
}

impl Spell {
    pub fn one_handed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            two_handed: false,
        }
    }

    pub fn two_handed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            two_handed: true,
        }
    }
}

/// Maps gesture names to the spell they cast.
#[derive(Resource, Default, Debug, Clone, Deref, DerefMut)]
pub struct SpellBindings(pub HashMap<String, Spell>);

impl SpellBindings {
    pub fn bind(&mut self, gesture: impl Into<String>, spell: Spell) -> &mut Self {
        self.0.insert(gesture.into(), spell);
        self
    }
}

/// Spell currently held by each hand, plus the active two handed spell.
#[derive(Resource, Default, Debug, Clone)]
pub struct CastedSpells {
    left: Option<Spell>,
    right: Option<Spell>,
    both: Option<Spell>,
}

impl CastedSpells {
    pub fn get(&self, hand: Hand) -> Option<&Spell> {
        match hand {
            Hand::Left => self.left.as_ref(),
            Hand::Right => self.right.as_ref(),
        }
    }

    pub fn both(&self) -> Option<&Spell> {
        self.both.as_ref()
    }

    fn set(&mut self, hand: Hand, spell: Option<Spell>) {
        match hand {
            Hand::Left => self.left = spell,
            Hand::Right => self.right = spell,
        }
    }

    pub fn is_casting_with_both_hands(&self, spell: &Spell) -> bool {
        self.left.as_ref() == Some(spell) && self.right.as_ref() == Some(spell)
    }
}

/// Whether both palms are currently close together.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq, Deref)]
pub struct HandsProximity(pub bool);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastTarget {
    Hand(Hand),
    BothHands,
}

#[derive(Event, Debug, Clone)]
pub struct SpellCast {
    pub target: CastTarget,
    pub spell: Spell,
    /// World position of the casting palm, zero when unknown.
    pub position: Vec3,
}

#[derive(Event, Debug, Clone)]
pub struct SpellCleared {
    pub target: CastTarget,
    pub spell: Spell,
}

fn update_hands_proximity(
    q_skeletons: Query<&HandSkeleton>,
    config: Res<SpellCasterConfig>,
    mut proximity: ResMut<HandsProximity>,
) {
    let mut palms = [None; 2];
    for skeleton in q_skeletons.iter() {
        let index = match skeleton.hand {
            Hand::Left => 0,
            Hand::Right => 1,
        };
        palms[index] = skeleton.palm_position();
    }

    let together = match palms {
        [Some(left), Some(right)] => (left.x - right.x).abs() < config.max_hands_distance,
        _ => false,
    };
    proximity.set_if_neq(HandsProximity(together));
}

fn cast_spells(
    mut sequence_evr: EventReader<SequenceRecognized>,
    mut static_evr: EventReader<StaticRecognized>,
    q_skeletons: Query<&HandSkeleton>,
    bindings: Res<SpellBindings>,
    proximity: Res<HandsProximity>,
    mut casted_spells: ResMut<CastedSpells>,
    mut cast_evw: EventWriter<SpellCast>,
) {
    let recognized = sequence_evr
        .read()
        .map(|e| &e.0)
        .chain(static_evr.read().map(|e| &e.0));

    for RecognizedGesture {
        entity, hand, name, ..
    } in recognized
    {
        let Some(spell) = bindings.get(name) else {
            continue;
        };
        let position = q_skeletons
            .get(*entity)
            .ok()
            .and_then(|skeleton| skeleton.palm_position())
            .unwrap_or(Vec3::ZERO);

        casted_spells.set(*hand, Some(spell.clone()));

        if spell.two_handed == false {
            info!("Casting {} with the {} hand.", spell.name, hand.as_str());
            cast_evw.send(SpellCast {
                target: CastTarget::Hand(*hand),
                spell: spell.clone(),
                position,
            });
            continue;
        }

        if **proximity
            && casted_spells.is_casting_with_both_hands(spell)
            && casted_spells.both.is_none()
        {
            info!("Casting {} with both hands.", spell.name);
            casted_spells.both = Some(spell.clone());
            cast_evw.send(SpellCast {
                target: CastTarget::BothHands,
                spell: spell.clone(),
                position,
            });
        }
    }
}

fn clear_spells(
    mut sequence_evr: EventReader<SequenceEnded>,
    mut static_evr: EventReader<StaticRecognizedEnd>,
    bindings: Res<SpellBindings>,
    mut casted_spells: ResMut<CastedSpells>,
    mut cleared_evw: EventWriter<SpellCleared>,
) {
    let ended = sequence_evr
        .read()
        .map(|e| &e.0)
        .chain(static_evr.read().map(|e| &e.0));

    for RecognizedGesture { hand, name, .. } in ended {
        let Some(spell) = bindings.get(name) else {
            continue;
        };

        if spell.two_handed && casted_spells.both() == Some(spell) {
            info!("Clearing {} from both hands.", spell.name);
            casted_spells.both = None;
            casted_spells.left = None;
            casted_spells.right = None;
            cleared_evw.send(SpellCleared {
                target: CastTarget::BothHands,
                spell: spell.clone(),
            });
            continue;
        }

        if casted_spells.get(*hand) == Some(spell) {
            info!("Clearing {} from the {} hand.", spell.name, hand.as_str());
            casted_spells.set(*hand, None);
            cleared_evw.send(SpellCleared {
                target: CastTarget::Hand(*hand),
                spell: spell.clone(),
            });
        }
    }
}
