use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::GestureError;
use crate::pose::{Hand, PoseSample};

/// Stable identifier of a template inside a [`GestureLibrary`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GestureId(u32);

impl GestureId {
    pub fn index(&self) -> u32 {
        self.0
    }
}

/// A single stored hand pose.
#[derive(Debug, Clone)]
pub struct GestureTemplate {
    id: GestureId,
    name: String,
    hand: Hand,
    pose: PoseSample,
}

impl GestureTemplate {
    pub fn id(&self) -> GestureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn pose(&self) -> &PoseSample {
        &self.pose
    }
}

/// An ordered sequence of poses that must be performed one after another.
#[derive(Debug, Clone)]
pub struct DynamicGestureTemplate {
    id: GestureId,
    name: String,
    hand: Hand,
    /// Never empty.
    steps: Vec<GestureTemplate>,
}

impl DynamicGestureTemplate {
    pub fn id(&self) -> GestureId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hand(&self) -> Hand {
        self.hand
    }

    pub fn steps(&self) -> &[GestureTemplate] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always `false`, the library refuses empty sequences.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn first_step(&self) -> &GestureTemplate {
        &self.steps[0]
    }

    pub fn step(&self, index: usize) -> Option<&GestureTemplate> {
        self.steps.get(index)
    }
}

/// Append-only store of static and dynamic gesture templates.
///
/// Templates are never mutated once added. A new library replaces the old one wholesale.
#[derive(Resource, Default, Debug, Clone)]
pub struct GestureLibrary {
    gestures: Vec<GestureTemplate>,
    dynamic_gestures: Vec<DynamicGestureTemplate>,
    next_id: u32,
}

impl GestureLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a library from its serialized definition.
    pub fn from_def(def: &GestureLibraryDef) -> Result<Self, GestureError> {
        let mut library = Self::new();

        for gesture in def.gestures.iter() {
            library.add_gesture(&gesture.name, gesture.hand, gesture.pose.clone())?;
        }
        for dynamic in def.dynamic_gestures.iter() {
            library.add_dynamic_gesture(&dynamic.name, dynamic.hand, dynamic.steps.clone())?;
        }

        Ok(library)
    }

    /// Store a static gesture and return its id.
    pub fn add_gesture(
        &mut self,
        name: &str,
        hand: Hand,
        pose: PoseSample,
    ) -> Result<GestureId, GestureError> {
        let template = self.new_template(name, hand, pose)?;
        let id = template.id;
        self.gestures.push(template);

        Ok(id)
    }

    /// Store a dynamic gesture made of `steps` in order and return its id.
    ///
    /// Each step gets its own id, named `"{name}[{step}]"`.
    pub fn add_dynamic_gesture(
        &mut self,
        name: &str,
        hand: Hand,
        steps: Vec<PoseSample>,
    ) -> Result<GestureId, GestureError> {
        if steps.is_empty() {
            return Err(GestureError::EmptySequence {
                name: name.to_string(),
            });
        }

        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, pose)| self.new_template(&format!("{name}[{i}]"), hand, pose))
            .collect::<Result<Vec<_>, _>>()?;

        let id = self.alloc_id();
        self.dynamic_gestures.push(DynamicGestureTemplate {
            id,
            name: name.to_string(),
            hand,
            steps,
        });

        Ok(id)
    }

    pub fn gestures(&self) -> &[GestureTemplate] {
        &self.gestures
    }

    pub fn dynamic_gestures(&self) -> &[DynamicGestureTemplate] {
        &self.dynamic_gestures
    }

    /// Static gestures owned by `hand`, in insertion order.
    pub fn gestures_for(&self, hand: Hand) -> impl Iterator<Item = &GestureTemplate> {
        self.gestures.iter().filter(move |g| g.hand == hand)
    }

    /// Dynamic gestures owned by `hand`, in insertion order.
    pub fn dynamic_gestures_for(
        &self,
        hand: Hand,
    ) -> impl Iterator<Item = &DynamicGestureTemplate> {
        self.dynamic_gestures.iter().filter(move |g| g.hand == hand)
    }

    pub fn get_gesture(&self, id: GestureId) -> Option<&GestureTemplate> {
        self.gestures.iter().find(|g| g.id == id).or_else(|| {
            self.dynamic_gestures
                .iter()
                .flat_map(|d| d.steps.iter())
                .find(|g| g.id == id)
        })
    }

    pub fn get_dynamic_gesture(&self, id: GestureId) -> Option<&DynamicGestureTemplate> {
        self.dynamic_gestures.iter().find(|g| g.id == id)
    }

    /// Name of either a static gesture, a dynamic gesture or one of its steps.
    pub fn name_of(&self, id: GestureId) -> Option<&str> {
        self.get_dynamic_gesture(id)
            .map(|d| d.name())
            .or_else(|| self.get_gesture(id).map(|g| g.name()))
    }

    pub fn is_empty(&self) -> bool {
        self.gestures.is_empty() && self.dynamic_gestures.is_empty()
    }

    fn new_template(
        &mut self,
        name: &str,
        hand: Hand,
        pose: PoseSample,
    ) -> Result<GestureTemplate, GestureError> {
        if pose.is_empty() {
            return Err(GestureError::EmptyPose);
        }

        Ok(GestureTemplate {
            id: self.alloc_id(),
            name: name.to_string(),
            hand,
            pose,
        })
    }

    fn alloc_id(&mut self) -> GestureId {
        let id = GestureId(self.next_id);
        self.next_id += 1;
        id
    }
}

/// Serializable form of a [`GestureLibrary`].
#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct GestureLibraryDef {
    #[serde(default)]
    pub gestures: Vec<GestureDef>,
    #[serde(default)]
    pub dynamic_gestures: Vec<DynamicGestureDef>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GestureDef {
    pub name: String,
    pub hand: Hand,
    pub pose: PoseSample,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DynamicGestureDef {
    pub name: String,
    pub hand: Hand,
    pub steps: Vec<PoseSample>,
}
