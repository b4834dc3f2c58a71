//! Display list tags: the compiled form of a movie clip timeline.
//!
//! Each tag mutates a [`DisplayList`] through [`DisplayListTag::apply`]. The
//! forward sequence replays a timeline frame by frame; the reverse sequence,
//! derived at load time, undoes it one tag at a time.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use glam::Affine2;
use log::{trace, warn};

use crate::definition::Definition;
use crate::display_list::DisplayList;
use crate::instance::InstanceState;
use crate::observer::{ParentInfo, TimelineObserver};
use crate::types::{BlendMode, ColorTransform, Depth};

bitflags! {
    /// Which fields of an [`UpdateObjectData`] carry a value.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UpdateFlags: u16 {
        const COLOR_TRANSFORM = 1 << 0;
        const TRANSFORM = 1 << 1;
        const CLIP_DEPTH = 1 << 2;
        const NAME = 1 << 3;
        const BLEND_MODE = 1 << 4;
    }
}

/// Field updates for the child at `depth`. Only fields whose flag is set are
/// meaningful; the rest hold their identity values.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateObjectData {
    pub depth: Depth,
    pub flags: UpdateFlags,
    pub color_transform: ColorTransform,
    pub alpha: f32,
    pub blend_mode: BlendMode,
    pub transform: Affine2,
    pub clip_depth: Depth,
    pub name: String,
}

impl UpdateObjectData {
    pub fn new(depth: Depth) -> Self {
        Self {
            depth,
            flags: UpdateFlags::empty(),
            color_transform: ColorTransform::IDENTITY,
            alpha: 1.0,
            blend_mode: BlendMode::Normal0,
            transform: Affine2::IDENTITY,
            clip_depth: 0,
            name: String::new(),
        }
    }

    pub fn has_color_transform(&self) -> bool {
        self.flags.contains(UpdateFlags::COLOR_TRANSFORM)
    }

    pub fn has_transform(&self) -> bool {
        self.flags.contains(UpdateFlags::TRANSFORM)
    }

    pub fn has_clip_depth(&self) -> bool {
        self.flags.contains(UpdateFlags::CLIP_DEPTH)
    }

    pub fn has_name(&self) -> bool {
        self.flags.contains(UpdateFlags::NAME)
    }

    pub fn has_blend_mode(&self) -> bool {
        self.flags.contains(UpdateFlags::BLEND_MODE)
    }

    pub fn set_color_transform(&mut self, color_transform: ColorTransform, alpha: f32) {
        self.color_transform = color_transform;
        self.alpha = alpha;
        self.flags |= UpdateFlags::COLOR_TRANSFORM;
    }

    pub fn set_transform(&mut self, transform: Affine2) {
        self.transform = transform;
        self.flags |= UpdateFlags::TRANSFORM;
    }

    pub fn set_clip_depth(&mut self, clip_depth: Depth) {
        self.clip_depth = clip_depth;
        self.flags |= UpdateFlags::CLIP_DEPTH;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.flags |= UpdateFlags::NAME;
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
        self.flags |= UpdateFlags::BLEND_MODE;
    }

    pub fn with_color_transform(mut self, color_transform: ColorTransform, alpha: f32) -> Self {
        self.set_color_transform(color_transform, alpha);
        self
    }

    pub fn with_transform(mut self, transform: Affine2) -> Self {
        self.set_transform(transform);
        self
    }

    pub fn with_clip_depth(mut self, clip_depth: Depth) -> Self {
        self.set_clip_depth(clip_depth);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.set_blend_mode(blend_mode);
        self
    }

    /// Per-field last-write-wins merge of `other` into `self`. The depth is
    /// left alone.
    pub fn accumulate_with(&mut self, other: &UpdateObjectData) {
        self.flags |= other.flags;
        if other.has_color_transform() {
            self.color_transform = other.color_transform;
            self.alpha = other.alpha;
        }
        if other.has_transform() {
            self.transform = other.transform;
        }
        if other.has_clip_depth() {
            self.clip_depth = other.clip_depth;
        }
        if other.has_name() {
            self.name.clone_from(&other.name);
        }
        if other.has_blend_mode() {
            self.blend_mode = other.blend_mode;
        }
    }

    /// Writes the flagged fields, leaving everything else untouched.
    pub fn apply_to(&self, state: &mut InstanceState) {
        if self.has_clip_depth() {
            state.set_clip_depth(self.clip_depth);
        }
        if self.has_color_transform() {
            state.set_color_transform(self.color_transform);
            state.set_alpha(self.alpha);
        }
        if self.has_transform() {
            state.set_transform(self.transform);
        }
        if self.has_name() {
            state.set_name(&self.name);
        }
        if self.has_blend_mode() {
            state.set_blend_mode(self.blend_mode);
        }
    }

    /// Writes every timeline-driven field: flagged fields take the tag's
    /// value, the others fall back to their defaults.
    pub fn apply_with_defaults_to(&self, state: &mut InstanceState) {
        state.set_clip_depth(if self.has_clip_depth() {
            self.clip_depth
        } else {
            0
        });
        if self.has_color_transform() {
            state.set_color_transform(self.color_transform);
            state.set_alpha(self.alpha);
        } else {
            state.set_color_transform(ColorTransform::IDENTITY);
            state.set_alpha(1.0);
        }
        state.set_transform(if self.has_transform() {
            self.transform
        } else {
            Affine2::IDENTITY
        });
        state.set_name(if self.has_name() { self.name.as_str() } else { "" });
        state.set_blend_mode(if self.has_blend_mode() {
            self.blend_mode
        } else {
            BlendMode::Normal0
        });
    }
}

/// Places an instance of `definition` at `data.depth`.
#[derive(Debug, Clone)]
pub struct AddObject {
    pub definition: Definition,
    pub data: UpdateObjectData,
}

impl AddObject {
    pub fn new(definition: Definition, data: UpdateObjectData) -> Self {
        Self { definition, data }
    }

    fn apply(&self, cx: &mut TagContext<'_>, list: &mut DisplayList) {
        let depth = self.data.depth;

        // Replaying frame 0 after the last frame wraps around finds the
        // instance from the previous loop still in its slot.
        if let Some(existing) = list.get_at_depth(depth) {
            let same_definition = existing.borrow().definition_id() == self.definition.id();
            if same_definition {
                trace!(
                    "{}: add at depth {depth} reuses existing {}",
                    cx.owner,
                    self.definition
                );
                list.apply_update(&existing, &self.data, true);
                return;
            }
        }

        let instance = Rc::new(RefCell::new(self.definition.create_instance()));
        list.set_at_depth(cx, depth, Rc::clone(&instance));
        if !self.data.flags.is_empty() {
            list.apply_update(&instance, &self.data, false);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    AddObject,
    UpdateObject,
    RemoveObject,
    ShowFrame,
    Noop,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TagKind::AddObject => "add",
            TagKind::UpdateObject => "update",
            TagKind::RemoveObject => "remove",
            TagKind::ShowFrame => "show_frame",
            TagKind::Noop => "noop",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub enum DisplayListTag {
    AddObject(AddObject),
    UpdateObject(UpdateObjectData),
    RemoveObject { depth: Depth },
    ShowFrame,
    /// Placeholder for an elided tag; keeps forward and reverse indices
    /// aligned.
    Noop,
}

impl DisplayListTag {
    pub fn kind(&self) -> TagKind {
        match self {
            DisplayListTag::AddObject(_) => TagKind::AddObject,
            DisplayListTag::UpdateObject(_) => TagKind::UpdateObject,
            DisplayListTag::RemoveObject { .. } => TagKind::RemoveObject,
            DisplayListTag::ShowFrame => TagKind::ShowFrame,
            DisplayListTag::Noop => TagKind::Noop,
        }
    }

    pub fn depth(&self) -> Option<Depth> {
        match self {
            DisplayListTag::AddObject(add) => Some(add.data.depth),
            DisplayListTag::UpdateObject(data) => Some(data.depth),
            DisplayListTag::RemoveObject { depth } => Some(*depth),
            DisplayListTag::ShowFrame | DisplayListTag::Noop => None,
        }
    }

    /// Field data carried by add and update tags.
    pub fn data(&self) -> Option<&UpdateObjectData> {
        match self {
            DisplayListTag::AddObject(add) => Some(&add.data),
            DisplayListTag::UpdateObject(data) => Some(data),
            _ => None,
        }
    }

    pub fn apply(&self, cx: &mut TagContext<'_>, list: &mut DisplayList) {
        trace!("{}: {self}", cx.owner);
        match self {
            DisplayListTag::AddObject(add) => add.apply(cx, list),
            DisplayListTag::UpdateObject(data) => match list.get_at_depth(data.depth) {
                Some(instance) => list.apply_update(&instance, data, false),
                None => warn!(
                    "{}: no child at depth {} to update, either a child was removed by code \
                     while the timeline still expects it, or the movie clip contains invalid tags",
                    cx.owner, data.depth
                ),
            },
            DisplayListTag::RemoveObject { depth } => {
                let _ = list.remove_at_depth(*depth);
            }
            DisplayListTag::ShowFrame | DisplayListTag::Noop => {}
        }
    }
}

impl fmt::Display for DisplayListTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayListTag::AddObject(add) => {
                write!(f, "add depth={} {}", add.data.depth, add.definition)?;
                write_fields(f, &add.data)
            }
            DisplayListTag::UpdateObject(data) => {
                write!(f, "update depth={}", data.depth)?;
                write_fields(f, data)
            }
            DisplayListTag::RemoveObject { depth } => write!(f, "remove depth={depth}"),
            DisplayListTag::ShowFrame => f.write_str("show_frame"),
            DisplayListTag::Noop => f.write_str("noop"),
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, data: &UpdateObjectData) -> fmt::Result {
    if data.has_name() {
        write!(f, " name={:?}", data.name)?;
    }
    if data.has_transform() {
        let [a, b, c, d, tx, ty] = data.transform.to_cols_array();
        write!(f, " matrix=[{a} {b} {c} {d} {tx} {ty}]")?;
    }
    if data.has_color_transform() {
        write!(f, " alpha={}", data.alpha)?;
    }
    if data.has_clip_depth() {
        write!(f, " clip_depth={}", data.clip_depth)?;
    }
    if data.has_blend_mode() {
        write!(f, " blend={:?}", data.blend_mode)?;
    }
    Ok(())
}

/// Call-scoped context for [`DisplayListTag::apply`]: the host observer and
/// a description of the movie clip that owns the display list.
pub struct TagContext<'a> {
    pub observer: &'a mut dyn TimelineObserver,
    pub owner: ParentInfo<'a>,
}

impl<'a> TagContext<'a> {
    pub fn new(observer: &'a mut dyn TimelineObserver, owner: ParentInfo<'a>) -> Self {
        Self { observer, owner }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn accumulate_is_last_write_wins_per_field() {
        let mut data = UpdateObjectData::new(4)
            .with_name("first")
            .with_transform(Affine2::from_translation(Vec2::new(1.0, 2.0)));
        let later = UpdateObjectData::new(4)
            .with_name("second")
            .with_clip_depth(9);
        data.accumulate_with(&later);

        assert_eq!(data.name, "second");
        assert_eq!(data.clip_depth, 9);
        assert_eq!(data.transform, Affine2::from_translation(Vec2::new(1.0, 2.0)));
        assert!(data.has_name() && data.has_clip_depth() && data.has_transform());
        assert!(!data.has_color_transform());
        assert!(!data.has_blend_mode());
    }

    #[test]
    fn accumulate_ignores_unflagged_values() {
        let mut data = UpdateObjectData::new(1).with_blend_mode(BlendMode::Add);
        let mut other = UpdateObjectData::new(1);
        other.blend_mode = BlendMode::Multiply;
        data.accumulate_with(&other);
        assert_eq!(data.blend_mode, BlendMode::Add);
    }

    #[test]
    fn apply_to_only_touches_flagged_fields() {
        let mut state = InstanceState::new(3);
        state.set_name("keep");
        state.set_clip_depth(7);

        let data = UpdateObjectData::new(1).with_blend_mode(BlendMode::Add);
        data.apply_to(&mut state);

        assert_eq!(state.name(), "keep");
        assert_eq!(state.clip_depth(), 7);
        assert_eq!(state.blend_mode(), BlendMode::Add);
    }

    #[test]
    fn apply_with_defaults_resets_unflagged_fields() {
        let mut state = InstanceState::new(3);
        state.set_name("stale");
        state.set_clip_depth(7);
        state.set_alpha(0.25);
        state.set_blend_mode(BlendMode::Add);
        state.set_transform(Affine2::from_scale(Vec2::splat(2.0)));

        let data = UpdateObjectData::new(1).with_clip_depth(2);
        data.apply_with_defaults_to(&mut state);

        assert_eq!(state.clip_depth(), 2);
        assert_eq!(state.name(), "");
        assert_eq!(state.alpha(), 1.0);
        assert_eq!(state.blend_mode(), BlendMode::Normal0);
        assert_eq!(state.transform(), Affine2::IDENTITY);
        assert_eq!(state.color_transform(), ColorTransform::IDENTITY);
    }

    #[test]
    fn tag_kind_and_depth() {
        let update = DisplayListTag::UpdateObject(UpdateObjectData::new(6));
        assert_eq!(update.kind(), TagKind::UpdateObject);
        assert_eq!(update.depth(), Some(6));
        assert_eq!(DisplayListTag::ShowFrame.depth(), None);
        assert_eq!(DisplayListTag::RemoveObject { depth: 2 }.to_string(), "remove depth=2");
        assert_eq!(TagKind::ShowFrame.to_string(), "show_frame");
    }
}
