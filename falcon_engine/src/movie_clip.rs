//! Movie clip instances: the playhead state machine and the child
//! management surface hosts use to drive a timeline.

use std::cell::RefCell;
use std::ops::Range;
use std::rc::Rc;
use std::sync::Arc;

use glam::{Affine2, Vec2};
use log::{debug, warn};

use crate::display_list::DisplayList;
use crate::hit_test::{self, HitTestMask, HitTestResult, HIT_TEST_ALL, HIT_TEST_NONE};
use crate::instance::{Instance, InstanceRef, InstanceState};
use crate::movie_clip_definition::MovieClipDefinition;
use crate::observer::{ParentInfo, TimelineObserver};
use crate::snapshot::InstanceSnapshot;
use crate::tag::{DisplayListTag, TagContext};
use crate::types::{Depth, Rectangle, MOVIE_CLIP_CLASS_NAME};

#[derive(Debug)]
pub struct MovieClipInstance {
    state: InstanceState,
    definition: Arc<MovieClipDefinition>,
    display_list: DisplayList,
    /// -1 until the first frame has been entered.
    current_frame: i32,
    playing: bool,
    after_goto: bool,
    enable_enter_frame: bool,
    hit_test_self_mask: HitTestMask,
    hit_test_children_mask: HitTestMask,
    absorb_other_input: bool,
}

impl MovieClipInstance {
    pub fn new(definition: Arc<MovieClipDefinition>) -> Self {
        Self {
            state: InstanceState::new(definition.id()),
            definition,
            display_list: DisplayList::new(),
            current_frame: -1,
            playing: true,
            after_goto: false,
            enable_enter_frame: false,
            hit_test_self_mask: HIT_TEST_NONE,
            hit_test_children_mask: HIT_TEST_ALL,
            absorb_other_input: false,
        }
    }

    pub fn state(&self) -> &InstanceState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut InstanceState {
        &mut self.state
    }

    pub fn definition(&self) -> &Arc<MovieClipDefinition> {
        &self.definition
    }

    pub fn display_list(&self) -> &DisplayList {
        &self.display_list
    }

    pub(crate) fn display_list_mut(&mut self) -> &mut DisplayList {
        &mut self.display_list
    }

    pub fn current_frame(&self) -> i32 {
        self.current_frame
    }

    pub fn total_frames(&self) -> u16 {
        self.definition.frame_count()
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_after_goto(&self) -> bool {
        self.after_goto
    }

    pub fn play(&mut self) {
        self.playing = true;
    }

    pub fn stop(&mut self) {
        self.playing = false;
    }

    pub fn enable_enter_frame(&self) -> bool {
        self.enable_enter_frame
    }

    /// Opts this instance into per-advance enter-frame notifications.
    pub fn set_enable_enter_frame(&mut self, enable: bool) {
        self.enable_enter_frame = enable;
    }

    /// Class name as hosts see it; unexported clips report `MovieClip`.
    pub fn class_name(&self) -> &str {
        match self.definition.class_name() {
            "" => MOVIE_CLIP_CLASS_NAME,
            name => name,
        }
    }

    /// Label attached to the current frame or the nearest labelled frame
    /// before it.
    pub fn current_label(&self) -> Option<&str> {
        self.definition.label_for_frame(self.current_frame)
    }

    fn as_parent(&self) -> ParentInfo<'_> {
        ParentInfo::new(self.state.name(), self.definition.class_name())
    }

    /// Advances a root movie clip (one without a parent) by one tick.
    pub fn advance(&mut self, observer: &mut dyn TimelineObserver) {
        self.advance_in(observer, None);
    }

    pub(crate) fn advance_in(
        &mut self,
        observer: &mut dyn TimelineObserver,
        parent: Option<ParentInfo<'_>>,
    ) {
        if !self.state.visible() {
            return;
        }

        if self.after_goto || self.playing {
            let previous = self.current_frame;
            if !self.after_goto {
                self.current_frame += 1;
                if self.current_frame >= i32::from(self.definition.frame_count()) {
                    self.current_frame = 0;
                }
            }

            let changed = previous != self.current_frame;
            if changed {
                let range = self.definition.frame_tag_range(self.current_frame);
                self.apply_forward(observer, range);
            }
            if previous < 0 {
                self.report_on_add_to_parent_if_needed(observer, parent);
            }
            if self.after_goto || changed {
                self.after_goto = false;
                if changed {
                    self.apply_non_event_frame_actions();
                }
                self.dispatch_frame_events(observer);
            }
        }

        if self.enable_enter_frame {
            observer.dispatch_enter_frame(self);
        }

        let owner = ParentInfo::new(self.state.name(), self.definition.class_name());
        self.display_list.advance(observer, owner);
    }

    /// Enters frame 0 if this instance has not entered any frame yet.
    pub fn advance_to_frame0(&mut self, observer: &mut dyn TimelineObserver) {
        self.advance_to_frame0_in(observer, None);
    }

    pub(crate) fn advance_to_frame0_in(
        &mut self,
        observer: &mut dyn TimelineObserver,
        parent: Option<ParentInfo<'_>>,
    ) {
        if self.current_frame < 0 {
            self.goto_frame(observer, 0);
            self.report_on_add_to_parent_if_needed(observer, parent);
        }
    }

    /// Moves the playhead to `frame` (clamped to the timeline) by replaying
    /// forward tags or undoing with reverse tags, whichever direction the
    /// target lies in. Frame events fire on the next advance.
    pub fn goto_frame(&mut self, observer: &mut dyn TimelineObserver, frame: i32) {
        let last = i32::from(self.definition.frame_count()) - 1;
        let target = frame.clamp(0, last);
        if target != frame {
            debug!(
                "{}: goto frame {frame} clamped to {target}",
                self.as_parent()
            );
        }

        if target == self.current_frame {
            self.apply_non_event_frame_actions();
            self.after_goto = true;
            return;
        }

        let from = self.definition.frame_end(self.current_frame);
        let to = self.definition.frame_end(target);
        if target < self.current_frame {
            self.apply_reverse(observer, to..from);
        } else {
            self.apply_forward(observer, from..to);
        }

        self.current_frame = target;
        self.apply_non_event_frame_actions();
        self.after_goto = true;

        let owner = ParentInfo::new(self.state.name(), self.definition.class_name());
        self.display_list.advance_to_frame0(observer, owner);
    }

    pub fn goto_and_play(&mut self, observer: &mut dyn TimelineObserver, frame: i32) {
        self.playing = true;
        self.goto_frame(observer, frame);
    }

    pub fn goto_and_stop(&mut self, observer: &mut dyn TimelineObserver, frame: i32) {
        self.playing = false;
        self.goto_frame(observer, frame);
    }

    /// Returns false, leaving the playhead alone, when the label is unknown.
    pub fn goto_label(&mut self, observer: &mut dyn TimelineObserver, label: &str) -> bool {
        match self.definition.frame_for_label(label) {
            Some(frame) => {
                self.goto_frame(observer, i32::from(frame));
                true
            }
            None => {
                warn!("{}: no frame labelled '{label}'", self.as_parent());
                false
            }
        }
    }

    pub fn goto_and_play_label(&mut self, observer: &mut dyn TimelineObserver, label: &str) -> bool {
        let found = self.goto_label(observer, label);
        if found {
            self.playing = true;
        }
        found
    }

    pub fn goto_and_stop_label(&mut self, observer: &mut dyn TimelineObserver, label: &str) -> bool {
        let found = self.goto_label(observer, label);
        if found {
            self.playing = false;
        }
        found
    }

    fn apply_forward(&mut self, observer: &mut dyn TimelineObserver, range: Range<usize>) {
        let tags = &self.definition.tags()[range];
        let owner = ParentInfo::new(self.state.name(), self.definition.class_name());
        let mut cx = TagContext::new(observer, owner);
        for tag in tags {
            tag.apply(&mut cx, &mut self.display_list);
        }
    }

    /// Undoes `range` of the forward stream, last tag first.
    fn apply_reverse(&mut self, observer: &mut dyn TimelineObserver, range: Range<usize>) {
        let tags: &[DisplayListTag] = &self.definition.reverse_tags()[range];
        let owner = ParentInfo::new(self.state.name(), self.definition.class_name());
        let mut cx = TagContext::new(observer, owner);
        for tag in tags.iter().rev() {
            tag.apply(&mut cx, &mut self.display_list);
        }
    }

    fn apply_non_event_frame_actions(&mut self) {
        let Some(actions) = self.definition.simple_actions().frame(self.current_frame) else {
            return;
        };
        if actions.stop {
            self.playing = false;
        }
        if let Some(visible) = actions.visible {
            self.state.set_visible(visible);
        }
    }

    fn dispatch_frame_events(&self, observer: &mut dyn TimelineObserver) {
        let Some(actions) = self.definition.simple_actions().frame(self.current_frame) else {
            return;
        };
        for event in &actions.events {
            observer.dispatch_event(&event.name, event.kind, self);
        }
    }

    pub(crate) fn report_on_add_to_parent_if_needed(
        &self,
        observer: &mut dyn TimelineObserver,
        parent: Option<ParentInfo<'_>>,
    ) {
        let Some(parent) = parent else {
            return;
        };
        let class_name = self.definition.class_name();
        if self.current_frame >= 0 && !class_name.is_empty() && class_name != MOVIE_CLIP_CLASS_NAME
        {
            observer.on_add_to_parent(parent, self, class_name);
        }
    }

    pub fn child_count(&self) -> usize {
        self.display_list.len()
    }

    pub fn child_at(&self, index: usize) -> Option<InstanceRef> {
        self.display_list.get_at_index(index)
    }

    pub fn child_at_depth(&self, depth: Depth) -> Option<InstanceRef> {
        self.display_list.get_at_depth(depth)
    }

    pub fn child_by_name(&self, name: &str) -> Option<InstanceRef> {
        self.display_list.get_by_name(name)
    }

    pub fn child_name_at_depth(&self, depth: Depth) -> Option<&str> {
        self.display_list.name_at_depth(depth)
    }

    pub fn has_child_at_depth(&self, depth: Depth) -> bool {
        self.display_list.has_at_depth(depth)
    }

    /// Breadth-first search of the whole subtree for a child called `name`.
    pub fn child_by_name_from_subtree(&self, name: &str) -> Option<InstanceRef> {
        if let Some(found) = self.display_list.get_by_name(name) {
            return Some(found);
        }
        self.display_list.iter().find_map(|(_, child)| {
            child
                .borrow()
                .as_movie_clip()
                .and_then(|clip| clip.child_by_name_from_subtree(name))
        })
    }

    /// Places a host-created instance at `depth`, evicting any occupant.
    pub fn set_child_at_depth(
        &mut self,
        observer: &mut dyn TimelineObserver,
        depth: Depth,
        child: InstanceRef,
    ) {
        let owner = ParentInfo::new(self.state.name(), self.definition.class_name());
        let mut cx = TagContext::new(observer, owner);
        self.display_list.set_at_depth(&mut cx, depth, child);
    }

    /// Wraps `child` in a fresh handle and places it at `depth`.
    pub fn add_child_at_depth(
        &mut self,
        observer: &mut dyn TimelineObserver,
        depth: Depth,
        child: Instance,
    ) -> InstanceRef {
        let child = Rc::new(RefCell::new(child));
        self.set_child_at_depth(observer, depth, Rc::clone(&child));
        child
    }

    pub fn set_child_name(&mut self, depth: Depth, name: &str) -> bool {
        self.display_list.set_name_at_depth(depth, name)
    }

    pub fn remove_child_at_depth(&mut self, depth: Depth) -> Option<InstanceRef> {
        self.display_list.remove_at_depth(depth)
    }

    pub fn remove_child_at(&mut self, index: usize) -> Option<InstanceRef> {
        self.display_list.remove_at_index(index)
    }

    pub fn remove_child_by_name(&mut self, name: &str) -> Option<InstanceRef> {
        self.display_list.remove_by_name(name)
    }

    pub fn remove_all_children(&mut self) {
        self.display_list.remove_all();
    }

    pub fn remove_all_children_recursive(&mut self) {
        self.display_list.remove_all_recursive();
    }

    /// See [`DisplayList::increase_all_child_depth_by_one`].
    pub fn increase_all_child_depth_by_one(&mut self) -> Depth {
        self.display_list.increase_all_child_depth_by_one()
    }

    /// Bounds of the visible children in this clip's own coordinate space.
    pub fn compute_local_bounds(&self) -> Option<Rectangle> {
        self.display_list.compute_bounds()
    }

    /// Input categories for which this clip captures points over its own
    /// shapes. Nothing by default.
    pub fn hit_test_self_mask(&self) -> HitTestMask {
        self.hit_test_self_mask
    }

    pub fn set_hit_test_self_mask(&mut self, mask: HitTestMask) {
        self.hit_test_self_mask = mask;
    }

    /// Input categories passed down to child clips. Everything by default.
    pub fn hit_test_children_mask(&self) -> HitTestMask {
        self.hit_test_children_mask
    }

    pub fn set_hit_test_children_mask(&mut self, mask: HitTestMask) {
        self.hit_test_children_mask = mask;
    }

    /// Whether points over this clip's shapes stop the search even when the
    /// self mask rejects them.
    pub fn absorb_other_input(&self) -> bool {
        self.absorb_other_input
    }

    pub fn set_absorb_other_input(&mut self, absorb: bool) {
        self.absorb_other_input = absorb;
    }

    /// Finds what captures `point`, given in the coordinate space of this
    /// clip's parent.
    pub fn hit_test(&self, mask: HitTestMask, point: Vec2) -> HitTestResult {
        hit_test::hit_test_clip(self, mask, &Affine2::IDENTITY, point)
    }

    pub fn compute_hit_testable_local_bounds(&self, mask: HitTestMask) -> Option<Rectangle> {
        hit_test::hit_testable_bounds(self, mask)
    }

    /// Like [`Self::compute_hit_testable_local_bounds`], in the parent's space.
    pub fn compute_hit_testable_bounds(&self, mask: HitTestMask) -> Option<Rectangle> {
        self.compute_hit_testable_local_bounds(mask)
            .map(|bounds| bounds.transformed(&self.state.transform()))
    }

    /// Deep copy: same definition, playhead and fields, with every child
    /// cloned into a fresh handle.
    pub fn clone_instance(&self, observer: &mut dyn TimelineObserver) -> MovieClipInstance {
        let clone = MovieClipInstance {
            state: self.state.detached(),
            definition: Arc::clone(&self.definition),
            display_list: self.display_list.deep_clone(observer),
            current_frame: self.current_frame,
            playing: self.playing,
            after_goto: self.after_goto,
            enable_enter_frame: self.enable_enter_frame,
            hit_test_self_mask: self.hit_test_self_mask,
            hit_test_children_mask: self.hit_test_children_mask,
            absorb_other_input: self.absorb_other_input,
        };
        observer.on_clone(&self.state, &clone.state);
        clone
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        InstanceSnapshot::movie_clip(
            &self.state,
            self.current_frame,
            self.playing,
            self.display_list.snapshot(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::{EventKind, FrameActions, FrameEvent, SimpleActions};
    use crate::compiler::PlaceObject;
    use crate::definition::{Definition, ShapeDefinition};
    use crate::observer::{NullObserver, ObservedEvent, RecordingObserver};
    use crate::tag::UpdateObjectData;

    fn shape(id: u16) -> Definition {
        Definition::Shape(Arc::new(ShapeDefinition::new(id, None)))
    }

    /// Three frames: depth 1 added on frame 0, renamed on frame 1, removed
    /// on frame 2.
    fn three_frames(actions: SimpleActions) -> Arc<MovieClipDefinition> {
        let mut builder = MovieClipDefinition::builder(10, 3);
        builder.set_simple_actions(actions);
        builder.place(PlaceObject::add(
            shape(1),
            UpdateObjectData::new(1).with_name("a"),
        ));
        builder.show_frame();
        builder.place(PlaceObject::update(UpdateObjectData::new(1).with_name("b")));
        builder.show_frame();
        builder.remove(1);
        builder.show_frame();
        Arc::new(builder.finish().expect("compiles"))
    }

    #[test]
    fn first_advance_enters_frame_zero() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        assert_eq!(clip.current_frame(), -1);
        clip.advance(&mut NullObserver);
        assert_eq!(clip.current_frame(), 0);
        assert_eq!(clip.child_name_at_depth(1), Some("a"));
    }

    #[test]
    fn playback_wraps_to_first_frame() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = NullObserver;
        for _ in 0..3 {
            clip.advance(&mut observer);
        }
        assert_eq!(clip.current_frame(), 2);
        assert_eq!(clip.child_count(), 0);

        clip.advance(&mut observer);
        assert_eq!(clip.current_frame(), 0);
        assert_eq!(clip.child_name_at_depth(1), Some("a"));
    }

    #[test]
    fn stopped_clip_holds_its_frame() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = NullObserver;
        clip.advance(&mut observer);
        clip.stop();
        clip.advance(&mut observer);
        assert_eq!(clip.current_frame(), 0);
        assert!(!clip.is_playing());
    }

    #[test]
    fn stop_action_halts_playhead() {
        let mut actions = SimpleActions::new();
        actions.insert(
            1,
            FrameActions {
                stop: true,
                ..FrameActions::default()
            },
        );
        let mut clip = three_frames(actions).create_instance();
        let mut observer = NullObserver;
        for _ in 0..5 {
            clip.advance(&mut observer);
        }
        assert_eq!(clip.current_frame(), 1);
    }

    #[test]
    fn visibility_action_hides_clip_and_freezes_it() {
        let mut actions = SimpleActions::new();
        actions.insert(
            1,
            FrameActions {
                visible: Some(false),
                ..FrameActions::default()
            },
        );
        let mut clip = three_frames(actions).create_instance();
        let mut observer = NullObserver;
        clip.advance(&mut observer);
        clip.advance(&mut observer);
        assert!(!clip.state().visible());
        clip.advance(&mut observer);
        assert_eq!(clip.current_frame(), 1);
    }

    #[test]
    fn goto_defers_events_to_next_advance() {
        let mut actions = SimpleActions::new();
        actions.insert(
            2,
            FrameActions {
                events: vec![FrameEvent {
                    name: "done".to_string(),
                    kind: EventKind::Dispatch,
                }],
                ..FrameActions::default()
            },
        );
        let mut clip = three_frames(actions).create_instance();
        let mut observer = RecordingObserver::new();
        clip.advance(&mut observer);
        clip.goto_and_stop(&mut observer, 2);
        assert!(observer.event_names().is_empty());
        assert!(clip.is_after_goto());

        clip.advance(&mut observer);
        assert_eq!(observer.event_names(), vec!["done"]);
        assert_eq!(clip.current_frame(), 2);
        assert!(!clip.is_after_goto());

        clip.advance(&mut observer);
        assert_eq!(observer.event_names(), vec!["done"]);
    }

    #[test]
    fn goto_clamps_out_of_range_frames() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = NullObserver;
        clip.goto_frame(&mut observer, 99);
        assert_eq!(clip.current_frame(), 2);
        clip.goto_frame(&mut observer, -4);
        assert_eq!(clip.current_frame(), 0);
        assert_eq!(clip.child_name_at_depth(1), Some("a"));
    }

    #[test]
    fn reverse_goto_restores_earlier_state() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = NullObserver;
        clip.goto_frame(&mut observer, 1);
        let at_one = clip.snapshot();
        clip.goto_frame(&mut observer, 2);
        assert_eq!(clip.child_count(), 0);
        clip.goto_frame(&mut observer, 1);
        assert_eq!(clip.snapshot(), at_one);
        assert_eq!(clip.child_name_at_depth(1), Some("b"));
    }

    #[test]
    fn unknown_label_leaves_playhead() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = NullObserver;
        clip.advance(&mut observer);
        assert!(!clip.goto_and_stop_label(&mut observer, "missing"));
        assert_eq!(clip.current_frame(), 0);
        assert!(clip.is_playing());
    }

    #[test]
    fn enter_frame_is_opt_in() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = RecordingObserver::new();
        clip.advance(&mut observer);
        assert!(observer.events().is_empty());

        clip.set_enable_enter_frame(true);
        clip.advance(&mut observer);
        assert!(matches!(
            observer.events(),
            [ObservedEvent::EnterFrame { frame: 1, .. }]
        ));
    }

    #[test]
    fn host_children_and_subtree_lookup() {
        let inner = Arc::new(
            MovieClipDefinition::builder(20, 1)
                .finish()
                .expect("compiles"),
        );
        let mut root = three_frames(SimpleActions::new()).create_instance();
        let mut observer = NullObserver;
        root.advance(&mut observer);

        let mut nested = inner.create_instance();
        nested.add_child_at_depth(&mut observer, 1, shape(3).create_instance());
        assert!(nested.set_child_name(1, "deep"));
        let nested = root.add_child_at_depth(&mut observer, 7, Instance::MovieClip(nested));

        let found = root
            .child_by_name_from_subtree("deep")
            .expect("found in subtree");
        assert_eq!(found.borrow().definition_id(), 3);
        assert_eq!(root.child_count(), 2);
        assert!(Rc::ptr_eq(&root.child_at(1).expect("index 1"), &nested));

        root.remove_all_children_recursive();
        assert_eq!(root.child_count(), 0);
        let nested = nested.borrow();
        let nested = nested.as_movie_clip().expect("movie clip");
        assert_eq!(nested.child_count(), 0);
    }

    #[test]
    fn clone_copies_playhead_and_children() {
        let mut clip = three_frames(SimpleActions::new()).create_instance();
        let mut observer = RecordingObserver::new();
        clip.goto_and_stop(&mut observer, 1);
        clip.state_mut().set_name("original");
        clip.set_hit_test_self_mask(0b100);
        clip.set_absorb_other_input(true);

        let clone = clip.clone_instance(&mut observer);
        assert_eq!(clone.current_frame(), 1);
        assert!(!clone.is_playing());
        assert_eq!(clone.hit_test_self_mask(), 0b100);
        assert_eq!(clone.hit_test_children_mask(), HIT_TEST_ALL);
        assert!(clone.absorb_other_input());
        assert_eq!(clone.snapshot().children, clip.snapshot().children);
        let original_child = clip.child_at_depth(1).expect("child");
        let cloned_child = clone.child_at_depth(1).expect("child");
        assert!(!Rc::ptr_eq(&original_child, &cloned_child));
        assert_eq!(observer.events().len(), 2);
    }
}
