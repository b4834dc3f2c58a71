use std::ops::Range;
use std::sync::Arc;

use crate::actions::SimpleActions;
use crate::compiler::MovieClipBuilder;
use crate::movie_clip::MovieClipInstance;
use crate::tag::DisplayListTag;
use crate::types::{DefinitionId, Depth};

/// Immutable, compiled movie clip timeline. Built once by
/// [`MovieClipBuilder`] and shared by every instance through an `Arc`.
#[derive(Debug)]
pub struct MovieClipDefinition {
    pub(crate) id: DefinitionId,
    pub(crate) class_name: String,
    pub(crate) frame_count: u16,
    /// `frame_offsets[f]` is one past the index of frame `f`'s ShowFrame tag.
    pub(crate) frame_offsets: Vec<usize>,
    /// Labels in authoring order, so frames never decrease along the list.
    pub(crate) frame_labels: Vec<(String, u16)>,
    pub(crate) tags: Vec<DisplayListTag>,
    pub(crate) reverse_tags: Vec<DisplayListTag>,
    pub(crate) simple_actions: SimpleActions,
    pub(crate) max_depth: Depth,
}

impl MovieClipDefinition {
    pub fn builder(id: DefinitionId, frame_count: u16) -> MovieClipBuilder {
        MovieClipBuilder::new(id, frame_count)
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// Exported class name, empty when the clip was never exported.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Always at least 1.
    pub fn frame_count(&self) -> u16 {
        self.frame_count
    }

    pub fn frame_offsets(&self) -> &[usize] {
        &self.frame_offsets
    }

    pub fn tags(&self) -> &[DisplayListTag] {
        &self.tags
    }

    pub fn reverse_tags(&self) -> &[DisplayListTag] {
        &self.reverse_tags
    }

    pub fn simple_actions(&self) -> &SimpleActions {
        &self.simple_actions
    }

    /// Highest depth any tag touches.
    pub fn max_depth(&self) -> Depth {
        self.max_depth
    }

    pub fn frame_labels(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.frame_labels
            .iter()
            .map(|(label, frame)| (label.as_str(), *frame))
    }

    pub fn frame_for_label(&self, label: &str) -> Option<u16> {
        self.frame_labels
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, frame)| *frame)
    }

    /// The label in effect on `frame`: the one attached to the nearest frame
    /// at or before it. A frame carrying several labels reports the first
    /// one authored.
    pub fn label_for_frame(&self, frame: i32) -> Option<&str> {
        let mut current: Option<(&str, u16)> = None;
        for (label, label_frame) in &self.frame_labels {
            if i32::from(*label_frame) > frame {
                continue;
            }
            if current.map_or(true, |(_, best)| *label_frame > best) {
                current = Some((label.as_str(), *label_frame));
            }
        }
        current.map(|(label, _)| label)
    }

    /// One past the last tag of `frame`. Frames before the first have no
    /// tags, frames past the last ShowFrame run to the end of the stream.
    pub fn frame_end(&self, frame: i32) -> usize {
        match usize::try_from(frame) {
            Err(_) => 0,
            Ok(frame) => self
                .frame_offsets
                .get(frame)
                .copied()
                .unwrap_or(self.tags.len()),
        }
    }

    pub fn frame_start(&self, frame: i32) -> usize {
        self.frame_end(frame.saturating_sub(1))
    }

    /// Forward tags that take the display list from frame `frame - 1` to
    /// `frame`.
    pub fn frame_tag_range(&self, frame: i32) -> Range<usize> {
        let start = self.frame_start(frame);
        start..self.frame_end(frame).max(start)
    }

    pub fn create_instance(self: &Arc<Self>) -> MovieClipInstance {
        MovieClipInstance::new(Arc::clone(self))
    }
}

/// Class name as exposed to hosts: anything up to and including a `$` is a
/// package prefix, and dotted names are not addressable classes.
pub(crate) fn normalize_class_name(exported: &str) -> String {
    let name = match exported.rfind('$') {
        Some(index) => &exported[index + 1..],
        None => exported,
    };
    if name.contains('.') {
        String::new()
    } else {
        name.to_string()
    }
}
