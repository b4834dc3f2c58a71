use std::fmt;
use std::sync::Arc;

use crate::instance::{Instance, ShapeInstance};
use crate::movie_clip::MovieClipInstance;
use crate::movie_clip_definition::MovieClipDefinition;
use crate::types::{DefinitionId, Rectangle};

/// Immutable shape definition. Only its bounds matter to the timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeDefinition {
    id: DefinitionId,
    bounds: Option<Rectangle>,
}

impl ShapeDefinition {
    pub fn new(id: DefinitionId, bounds: Option<Rectangle>) -> Self {
        Self { id, bounds }
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    pub fn bounds(&self) -> Option<Rectangle> {
        self.bounds
    }
}

/// Shared handle to a loaded definition. Cloning is cheap and keeps pointer
/// identity, which the timeline compiler relies on.
#[derive(Debug, Clone)]
pub enum Definition {
    Shape(Arc<ShapeDefinition>),
    MovieClip(Arc<MovieClipDefinition>),
}

impl Definition {
    pub fn id(&self) -> DefinitionId {
        match self {
            Definition::Shape(shape) => shape.id(),
            Definition::MovieClip(clip) => clip.id(),
        }
    }

    pub fn create_instance(&self) -> Instance {
        match self {
            Definition::Shape(shape) => Instance::Shape(ShapeInstance::new(Arc::clone(shape))),
            Definition::MovieClip(clip) => {
                Instance::MovieClip(MovieClipInstance::new(Arc::clone(clip)))
            }
        }
    }

    /// True when both handles point at the same loaded definition.
    pub fn ptr_eq(&self, other: &Definition) -> bool {
        match (self, other) {
            (Definition::Shape(a), Definition::Shape(b)) => Arc::ptr_eq(a, b),
            (Definition::MovieClip(a), Definition::MovieClip(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_movie_clip(&self) -> Option<&Arc<MovieClipDefinition>> {
        match self {
            Definition::MovieClip(clip) => Some(clip),
            Definition::Shape(_) => None,
        }
    }

    pub fn is_movie_clip(&self) -> bool {
        matches!(self, Definition::MovieClip(_))
    }
}

impl fmt::Display for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Definition::Shape(shape) => write!(f, "shape#{}", shape.id()),
            Definition::MovieClip(clip) => write!(f, "movie_clip#{}", clip.id()),
        }
    }
}
