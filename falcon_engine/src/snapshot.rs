use std::collections::BTreeMap;

use serde::Serialize;

use crate::instance::InstanceState;
use crate::types::{BlendMode, ColorTransform, DefinitionId, Depth};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceKind {
    Shape,
    MovieClip,
}

/// Serializable view of an instance and, for movie clips, its whole
/// subtree. Two snapshots compare equal when the display lists they were
/// taken from are observably identical.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstanceSnapshot {
    pub kind: InstanceKind,
    pub definition_id: DefinitionId,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Column-major `[a, b, c, d, tx, ty]`.
    pub transform: [f32; 6],
    pub color_transform: ColorTransform,
    pub alpha: f32,
    pub clip_depth: Depth,
    pub blend_mode: BlendMode,
    pub visible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_frame: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playing: Option<bool>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub children: BTreeMap<Depth, InstanceSnapshot>,
}

impl InstanceSnapshot {
    fn from_state(kind: InstanceKind, state: &InstanceState) -> Self {
        Self {
            kind,
            definition_id: state.definition_id(),
            name: state.name().to_string(),
            transform: state.transform().to_cols_array(),
            color_transform: state.color_transform(),
            alpha: state.alpha(),
            clip_depth: state.clip_depth(),
            blend_mode: state.blend_mode(),
            visible: state.visible(),
            current_frame: None,
            playing: None,
            children: BTreeMap::new(),
        }
    }

    pub(crate) fn shape(state: &InstanceState) -> Self {
        Self::from_state(InstanceKind::Shape, state)
    }

    pub(crate) fn movie_clip(
        state: &InstanceState,
        current_frame: i32,
        playing: bool,
        children: BTreeMap<Depth, InstanceSnapshot>,
    ) -> Self {
        Self {
            current_frame: Some(current_frame),
            playing: Some(playing),
            children,
            ..Self::from_state(InstanceKind::MovieClip, state)
        }
    }

    /// Number of instances in this subtree, this one included.
    pub fn instance_count(&self) -> usize {
        1 + self
            .children
            .values()
            .map(InstanceSnapshot::instance_count)
            .sum::<usize>()
    }
}
