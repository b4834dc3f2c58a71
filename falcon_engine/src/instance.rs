use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use glam::Affine2;

use crate::definition::ShapeDefinition;
use crate::movie_clip::MovieClipInstance;
use crate::observer::{ParentInfo, TimelineObserver};
use crate::snapshot::InstanceSnapshot;
use crate::types::{BlendMode, ColorTransform, DefinitionId, Depth, Rectangle};

/// Shared, mutable handle to a placed instance. Display lists and host code
/// both hold these; identity is `Rc::ptr_eq`.
pub type InstanceRef = Rc<RefCell<Instance>>;

/// Fields shared by every instance kind. The timeline drives all of them
/// except `visible`, which only frame actions and host code change.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceState {
    definition_id: DefinitionId,
    name: String,
    transform: Affine2,
    color_transform: ColorTransform,
    alpha: f32,
    clip_depth: Depth,
    blend_mode: BlendMode,
    visible: bool,
    depth_in_parent: Option<Depth>,
}

impl InstanceState {
    pub fn new(definition_id: DefinitionId) -> Self {
        Self {
            definition_id,
            name: String::new(),
            transform: Affine2::IDENTITY,
            color_transform: ColorTransform::IDENTITY,
            alpha: 1.0,
            clip_depth: 0,
            blend_mode: BlendMode::Normal0,
            visible: true,
            depth_in_parent: None,
        }
    }

    pub fn definition_id(&self) -> DefinitionId {
        self.definition_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames without touching the parent's name index; callers holding a
    /// parent go through `MovieClipInstance::set_child_name` instead.
    pub(crate) fn set_name(&mut self, name: &str) {
        if self.name != name {
            self.name.clear();
            self.name.push_str(name);
        }
    }

    pub fn transform(&self) -> Affine2 {
        self.transform
    }

    pub fn set_transform(&mut self, transform: Affine2) {
        self.transform = transform;
    }

    pub fn color_transform(&self) -> ColorTransform {
        self.color_transform
    }

    pub fn set_color_transform(&mut self, color_transform: ColorTransform) {
        self.color_transform = color_transform;
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha;
    }

    pub fn clip_depth(&self) -> Depth {
        self.clip_depth
    }

    pub fn set_clip_depth(&mut self, clip_depth: Depth) {
        self.clip_depth = clip_depth;
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn set_blend_mode(&mut self, blend_mode: BlendMode) {
        self.blend_mode = blend_mode;
    }

    pub fn blending_factor(&self) -> f32 {
        self.blend_mode.blending_factor()
    }

    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    /// Depth in the owning display list, `None` while unparented.
    pub fn depth_in_parent(&self) -> Option<Depth> {
        self.depth_in_parent
    }

    pub(crate) fn set_depth_in_parent(&mut self, depth: Option<Depth>) {
        self.depth_in_parent = depth;
    }

    /// Copy for a clone: same fields, no parent.
    pub(crate) fn detached(&self) -> Self {
        Self {
            depth_in_parent: None,
            ..self.clone()
        }
    }
}

#[derive(Debug)]
pub struct ShapeInstance {
    state: InstanceState,
    definition: Arc<ShapeDefinition>,
}

impl ShapeInstance {
    pub fn new(definition: Arc<ShapeDefinition>) -> Self {
        Self {
            state: InstanceState::new(definition.id()),
            definition,
        }
    }

    pub fn definition(&self) -> &Arc<ShapeDefinition> {
        &self.definition
    }

    fn clone_instance(&self) -> Self {
        Self {
            state: self.state.detached(),
            definition: Arc::clone(&self.definition),
        }
    }
}

#[derive(Debug)]
pub enum Instance {
    Shape(ShapeInstance),
    MovieClip(MovieClipInstance),
}

impl Instance {
    pub fn state(&self) -> &InstanceState {
        match self {
            Instance::Shape(shape) => &shape.state,
            Instance::MovieClip(clip) => clip.state(),
        }
    }

    pub fn state_mut(&mut self) -> &mut InstanceState {
        match self {
            Instance::Shape(shape) => &mut shape.state,
            Instance::MovieClip(clip) => clip.state_mut(),
        }
    }

    pub fn definition_id(&self) -> DefinitionId {
        self.state().definition_id()
    }

    pub fn name(&self) -> &str {
        self.state().name()
    }

    pub fn as_movie_clip(&self) -> Option<&MovieClipInstance> {
        match self {
            Instance::MovieClip(clip) => Some(clip),
            Instance::Shape(_) => None,
        }
    }

    pub fn as_movie_clip_mut(&mut self) -> Option<&mut MovieClipInstance> {
        match self {
            Instance::MovieClip(clip) => Some(clip),
            Instance::Shape(_) => None,
        }
    }

    pub fn is_movie_clip(&self) -> bool {
        matches!(self, Instance::MovieClip(_))
    }

    pub(crate) fn advance(
        &mut self,
        observer: &mut dyn TimelineObserver,
        parent: Option<ParentInfo<'_>>,
    ) {
        if let Instance::MovieClip(clip) = self {
            clip.advance_in(observer, parent);
        }
    }

    pub(crate) fn advance_to_frame0(
        &mut self,
        observer: &mut dyn TimelineObserver,
        parent: Option<ParentInfo<'_>>,
    ) {
        if let Instance::MovieClip(clip) = self {
            clip.advance_to_frame0_in(observer, parent);
        }
    }

    /// Deep copy with fresh handles for every descendant. The observer hears
    /// about each copied instance.
    pub fn clone_instance(&self, observer: &mut dyn TimelineObserver) -> Instance {
        match self {
            Instance::Shape(shape) => {
                let clone = shape.clone_instance();
                observer.on_clone(&shape.state, &clone.state);
                Instance::Shape(clone)
            }
            Instance::MovieClip(clip) => Instance::MovieClip(clip.clone_instance(observer)),
        }
    }

    /// Bounds in the parent's coordinate space. Invisible instances have
    /// none.
    pub fn compute_bounds(&self) -> Option<Rectangle> {
        let state = self.state();
        if !state.visible() {
            return None;
        }
        let local = match self {
            Instance::Shape(shape) => shape.definition.bounds(),
            Instance::MovieClip(clip) => clip.compute_local_bounds(),
        }?;
        Some(local.transformed(&state.transform()))
    }

    pub fn snapshot(&self) -> InstanceSnapshot {
        match self {
            Instance::Shape(shape) => InstanceSnapshot::shape(&shape.state),
            Instance::MovieClip(clip) => clip.snapshot(),
        }
    }
}
