//! Compiles raw timeline operations into forward and reverse display list
//! tags.
//!
//! Placements are resolved into add/update tags as they arrive; the reverse
//! stream is derived in [`MovieClipBuilder::finish`] from the finished
//! forward stream, so tags rewritten after the fact are reflected in both.

use log::{debug, trace};

use crate::actions::SimpleActions;
use crate::definition::Definition;
use crate::error::LoadError;
use crate::movie_clip_definition::{normalize_class_name, MovieClipDefinition};
use crate::tag::{AddObject, DisplayListTag, TagKind, UpdateObjectData};
use crate::types::{DefinitionId, Depth};

/// One PlaceObject operation: the fields it carries, the definition it
/// places (if any) and whether it replaces the occupant of its depth.
#[derive(Debug, Clone)]
pub struct PlaceObject {
    pub data: UpdateObjectData,
    pub definition: Option<Definition>,
    pub is_move: bool,
}

impl PlaceObject {
    pub fn add(definition: Definition, data: UpdateObjectData) -> Self {
        Self {
            data,
            definition: Some(definition),
            is_move: false,
        }
    }

    pub fn update(data: UpdateObjectData) -> Self {
        Self {
            data,
            definition: None,
            is_move: false,
        }
    }

    pub fn with_move(mut self) -> Self {
        self.is_move = true;
        self
    }
}

pub struct MovieClipBuilder {
    id: DefinitionId,
    frame_count: u16,
    class_name: String,
    tags: Vec<DisplayListTag>,
    frame_offsets: Vec<usize>,
    frame_labels: Vec<(String, u16)>,
    simple_actions: SimpleActions,
}

impl MovieClipBuilder {
    pub fn new(id: DefinitionId, frame_count: u16) -> Self {
        Self {
            id,
            frame_count,
            class_name: String::new(),
            tags: Vec::new(),
            frame_offsets: Vec::new(),
            frame_labels: Vec::new(),
            simple_actions: SimpleActions::new(),
        }
    }

    /// Sets the exported class name; package prefixes are stripped.
    pub fn set_class_name(&mut self, exported: &str) {
        self.class_name = normalize_class_name(exported);
    }

    pub fn set_simple_actions(&mut self, actions: SimpleActions) {
        self.simple_actions = actions;
    }

    /// Index of the frame currently being compiled.
    pub fn current_frame(&self) -> u16 {
        u16::try_from(self.frame_offsets.len()).unwrap_or(u16::MAX)
    }

    /// Appends a placement and reports what it compiled to.
    pub fn place(&mut self, place: PlaceObject) -> TagKind {
        let tag = self.resolve_placement(place);
        let kind = tag.kind();
        self.tags.push(tag);
        kind
    }

    pub fn remove(&mut self, depth: Depth) {
        self.tags.push(DisplayListTag::RemoveObject { depth });
    }

    pub fn show_frame(&mut self) {
        self.tags.push(DisplayListTag::ShowFrame);
        self.frame_offsets.push(self.tags.len());
    }

    /// Attaches `label` to the frame currently being compiled.
    pub fn frame_label(&mut self, label: &str) -> Result<(), LoadError> {
        let frame = self.current_frame();
        if self.frame_labels.iter().any(|(existing, _)| existing == label) {
            return Err(LoadError::DuplicateFrameLabel {
                definition: self.id,
                label: label.to_string(),
                frame,
            });
        }
        self.frame_labels.push((label.to_string(), frame));
        Ok(())
    }

    pub fn finish(self) -> Result<MovieClipDefinition, LoadError> {
        let reverse_tags = derive_reverse_tags(self.id, &self.tags)?;
        let max_depth = self
            .tags
            .iter()
            .filter_map(DisplayListTag::depth)
            .max()
            .unwrap_or(0);
        debug!(
            "compiled definition {}: {} frames, {} tags, max depth {}",
            self.id,
            self.frame_count.max(1),
            self.tags.len(),
            max_depth
        );
        Ok(MovieClipDefinition {
            id: self.id,
            class_name: self.class_name,
            frame_count: self.frame_count.max(1),
            frame_offsets: self.frame_offsets,
            frame_labels: self.frame_labels,
            tags: self.tags,
            reverse_tags,
            simple_actions: self.simple_actions,
            max_depth,
        })
    }

    /// A placement of a definition is an add unless the instance already at
    /// that depth came from the same definition, in which case the timeline
    /// is only adjusting it. A named re-placement that directly follows a
    /// removal in the same frame cancels the removal so the instance keeps
    /// its identity.
    fn resolve_placement(&mut self, place: PlaceObject) -> DisplayListTag {
        let PlaceObject {
            data,
            definition,
            is_move,
        } = place;
        let Some(definition) = definition else {
            return DisplayListTag::UpdateObject(data);
        };
        if is_move {
            return DisplayListTag::AddObject(AddObject::new(definition, data));
        }

        let depth = data.depth;
        let mut crossed_show_frame = false;
        let mut absorbed_remove = None;
        let mut same_instance = false;
        for (index, tag) in self.tags.iter().enumerate().rev() {
            match tag {
                // Only ends absorption; a prior add in an earlier frame still matches.
                DisplayListTag::ShowFrame => crossed_show_frame = true,
                DisplayListTag::AddObject(add) if add.data.depth == depth => {
                    same_instance = add.definition.ptr_eq(&definition);
                    break;
                }
                DisplayListTag::RemoveObject { depth: removed } if *removed == depth => {
                    if !crossed_show_frame && absorbed_remove.is_none() && data.has_name() {
                        absorbed_remove = Some(index);
                        continue;
                    }
                    break;
                }
                _ => {}
            }
        }

        if !same_instance {
            return DisplayListTag::AddObject(AddObject::new(definition, data));
        }
        if let Some(index) = absorbed_remove {
            trace!(
                "definition {}: re-placement at depth {depth} cancels remove at tag {index}",
                self.id
            );
            self.tags[index] = DisplayListTag::Noop;
        }
        DisplayListTag::UpdateObject(data)
    }
}

/// Derives, for every forward tag, the tag that undoes it. Index `i` of the
/// result reverses index `i` of `tags`.
pub(crate) fn derive_reverse_tags(
    definition: DefinitionId,
    tags: &[DisplayListTag],
) -> Result<Vec<DisplayListTag>, LoadError> {
    tags.iter()
        .enumerate()
        .map(|(index, tag)| reverse_tag(definition, tags, index, tag))
        .collect()
}

fn reverse_tag(
    definition: DefinitionId,
    tags: &[DisplayListTag],
    index: usize,
    tag: &DisplayListTag,
) -> Result<DisplayListTag, LoadError> {
    match tag {
        DisplayListTag::AddObject(add) => Ok(match prior_occupant(tags, add.data.depth, index) {
            Some((previous, data)) => DisplayListTag::AddObject(AddObject::new(previous, data)),
            None => DisplayListTag::RemoveObject {
                depth: add.data.depth,
            },
        }),
        DisplayListTag::RemoveObject { depth } => prior_occupant(tags, *depth, index)
            .map(|(previous, data)| DisplayListTag::AddObject(AddObject::new(previous, data)))
            .ok_or(LoadError::OrphanRemove {
                definition,
                depth: *depth,
                index,
            }),
        DisplayListTag::UpdateObject(forward) => {
            let (_, mut data) =
                prior_occupant(tags, forward.depth, index).ok_or(LoadError::OrphanUpdate {
                    definition,
                    depth: forward.depth,
                    index,
                })?;
            restore_defaults(&mut data, forward);
            Ok(DisplayListTag::UpdateObject(data))
        }
        DisplayListTag::ShowFrame => Ok(DisplayListTag::ShowFrame),
        DisplayListTag::Noop => Ok(DisplayListTag::Noop),
    }
}

/// The definition occupying `depth` just before tag `before`, together with
/// every field the timeline has given it since it was added.
fn prior_occupant(
    tags: &[DisplayListTag],
    depth: Depth,
    before: usize,
) -> Option<(Definition, UpdateObjectData)> {
    let add_index = tags[..before].iter().rposition(|tag| match tag {
        DisplayListTag::AddObject(add) => add.data.depth == depth,
        DisplayListTag::RemoveObject { depth: removed } => *removed == depth,
        _ => false,
    })?;
    let DisplayListTag::AddObject(add) = &tags[add_index] else {
        return None;
    };

    let mut data = UpdateObjectData::new(depth);
    for tag in &tags[add_index..before] {
        if let Some(fields) = tag.data() {
            if fields.depth == depth {
                data.accumulate_with(fields);
            }
        }
    }
    Some((add.definition.clone(), data))
}

/// Fields the forward update sets that were never set before it go back to
/// their defaults when undone.
fn restore_defaults(data: &mut UpdateObjectData, forward: &UpdateObjectData) {
    let defaults = UpdateObjectData::new(data.depth);
    if forward.has_clip_depth() && !data.has_clip_depth() {
        data.set_clip_depth(defaults.clip_depth);
    }
    if forward.has_color_transform() && !data.has_color_transform() {
        data.set_color_transform(defaults.color_transform, defaults.alpha);
    }
    if forward.has_name() && !data.has_name() {
        data.set_name(defaults.name);
    }
    if forward.has_transform() && !data.has_transform() {
        data.set_transform(defaults.transform);
    }
    if forward.has_blend_mode() && !data.has_blend_mode() {
        data.set_blend_mode(defaults.blend_mode);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ShapeDefinition;
    use crate::types::BlendMode;
    use glam::{Affine2, Vec2};
    use std::sync::Arc;

    fn shape(id: u16) -> Definition {
        Definition::Shape(Arc::new(ShapeDefinition::new(id, None)))
    }

    fn kinds(tags: &[DisplayListTag]) -> Vec<TagKind> {
        tags.iter().map(DisplayListTag::kind).collect()
    }

    #[test]
    fn same_definition_placement_becomes_update() {
        let a = shape(1);
        let mut builder = MovieClipBuilder::new(9, 2);
        assert_eq!(
            builder.place(PlaceObject::add(a.clone(), UpdateObjectData::new(5))),
            TagKind::AddObject
        );
        builder.show_frame();
        let moved = UpdateObjectData::new(5)
            .with_transform(Affine2::from_translation(Vec2::new(3.0, 0.0)));
        assert_eq!(
            builder.place(PlaceObject::add(a, moved)),
            TagKind::UpdateObject
        );
    }

    #[test]
    fn move_flag_always_adds() {
        let a = shape(1);
        let mut builder = MovieClipBuilder::new(9, 1);
        builder.place(PlaceObject::add(a.clone(), UpdateObjectData::new(5)));
        assert_eq!(
            builder.place(PlaceObject::add(a, UpdateObjectData::new(5)).with_move()),
            TagKind::AddObject
        );
    }

    #[test]
    fn different_definition_placement_adds() {
        let mut builder = MovieClipBuilder::new(9, 1);
        builder.place(PlaceObject::add(shape(1), UpdateObjectData::new(5)));
        assert_eq!(
            builder.place(PlaceObject::add(shape(1), UpdateObjectData::new(5))),
            TagKind::AddObject,
            "identity is by loaded definition, not by id"
        );
    }

    #[test]
    fn named_replacement_absorbs_remove_in_same_frame() {
        let a = shape(1);
        let mut builder = MovieClipBuilder::new(9, 1);
        builder.place(PlaceObject::add(a.clone(), UpdateObjectData::new(5)));
        builder.remove(5);
        builder.place(PlaceObject::add(a, UpdateObjectData::new(5).with_name("x")));
        builder.show_frame();
        let definition = builder.finish().expect("compiles");

        assert_eq!(
            kinds(definition.tags()),
            vec![
                TagKind::AddObject,
                TagKind::Noop,
                TagKind::UpdateObject,
                TagKind::ShowFrame
            ]
        );
        assert_eq!(
            kinds(definition.reverse_tags()),
            vec![
                TagKind::RemoveObject,
                TagKind::Noop,
                TagKind::UpdateObject,
                TagKind::ShowFrame
            ]
        );
    }

    #[test]
    fn remove_is_kept_across_frames_or_without_name() {
        let a = shape(1);
        let mut builder = MovieClipBuilder::new(9, 2);
        builder.place(PlaceObject::add(a.clone(), UpdateObjectData::new(5)));
        builder.remove(5);
        assert_eq!(
            builder.place(PlaceObject::add(a.clone(), UpdateObjectData::new(5))),
            TagKind::AddObject
        );

        builder.remove(5);
        builder.show_frame();
        assert_eq!(
            builder.place(PlaceObject::add(a, UpdateObjectData::new(5).with_name("late"))),
            TagKind::AddObject
        );
    }

    #[test]
    fn reverse_of_update_restores_prior_fields() {
        let a = shape(1);
        let mut builder = MovieClipBuilder::new(9, 3);
        builder.place(PlaceObject::add(
            a,
            UpdateObjectData::new(2).with_name("hero"),
        ));
        builder.show_frame();
        builder.place(PlaceObject::update(
            UpdateObjectData::new(2).with_blend_mode(BlendMode::Add),
        ));
        builder.show_frame();
        builder.place(PlaceObject::update(
            UpdateObjectData::new(2)
                .with_blend_mode(BlendMode::Screen)
                .with_clip_depth(4),
        ));
        builder.show_frame();
        let definition = builder.finish().expect("compiles");

        let DisplayListTag::UpdateObject(first) = &definition.reverse_tags()[2] else {
            panic!("expected update");
        };
        assert_eq!(first.name, "hero");
        assert!(first.has_blend_mode());
        assert_eq!(first.blend_mode, BlendMode::Normal0);

        let DisplayListTag::UpdateObject(second) = &definition.reverse_tags()[4] else {
            panic!("expected update");
        };
        assert_eq!(second.blend_mode, BlendMode::Add);
        assert!(second.has_clip_depth());
        assert_eq!(second.clip_depth, 0);
    }

    #[test]
    fn reverse_of_replacing_add_restores_previous_definition() {
        let mut builder = MovieClipBuilder::new(9, 2);
        builder.place(PlaceObject::add(
            shape(1),
            UpdateObjectData::new(3).with_name("old"),
        ));
        builder.show_frame();
        builder.place(PlaceObject::add(shape(2), UpdateObjectData::new(3)));
        builder.show_frame();
        let definition = builder.finish().expect("compiles");

        let DisplayListTag::AddObject(undo) = &definition.reverse_tags()[2] else {
            panic!("expected add");
        };
        assert_eq!(undo.definition.id(), 1);
        assert_eq!(undo.data.name, "old");
    }

    #[test]
    fn orphan_tags_are_rejected() {
        let mut builder = MovieClipBuilder::new(4, 1);
        builder.remove(8);
        assert_eq!(
            builder.finish().unwrap_err(),
            LoadError::OrphanRemove {
                definition: 4,
                depth: 8,
                index: 0
            }
        );

        let mut builder = MovieClipBuilder::new(4, 1);
        builder.place(PlaceObject::update(UpdateObjectData::new(2).with_name("x")));
        assert!(matches!(
            builder.finish(),
            Err(LoadError::OrphanUpdate { depth: 2, .. })
        ));
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let mut builder = MovieClipBuilder::new(4, 2);
        builder.frame_label("intro").expect("first label");
        builder.show_frame();
        let err = builder.frame_label("intro").unwrap_err();
        assert_eq!(
            err,
            LoadError::DuplicateFrameLabel {
                definition: 4,
                label: "intro".to_string(),
                frame: 1
            }
        );
    }

    #[test]
    fn frame_count_is_at_least_one() {
        let definition = MovieClipBuilder::new(4, 0).finish().expect("compiles");
        assert_eq!(definition.frame_count(), 1);
    }
}
