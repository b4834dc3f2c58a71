//! Timeline runtime for SWF-derived movie clips.
//!
//! Definitions are compiled once from a [`falcon_formats::MovieDocument`]
//! into forward and reverse display list tags, then shared by any number of
//! [`MovieClipInstance`]s that advance, seek and report to a
//! [`TimelineObserver`].

pub mod actions;
pub mod compiler;
pub mod definition;
pub mod display_list;
pub mod error;
pub mod instance;
pub mod library;
pub mod movie_clip;
pub mod movie_clip_definition;
pub mod observer;
pub mod snapshot;
pub mod tag;
pub mod types;

pub use actions::{EventKind, FrameActions, FrameEvent, SimpleActions};
pub use compiler::{MovieClipBuilder, PlaceObject};
pub use definition::{Definition, ShapeDefinition};
pub use display_list::DisplayList;
pub use error::LoadError;
pub use hit_test::{Hit, HitTestMask, HitTestResult, HIT_TEST_ALL, HIT_TEST_NONE};
pub use instance::{Instance, InstanceRef, InstanceState, ShapeInstance};
pub use library::{load_library, MovieLibrary, MAIN_TIMELINE_ID};
pub use movie_clip::MovieClipInstance;
pub use movie_clip_definition::MovieClipDefinition;
pub use observer::{NullObserver, ObservedEvent, ParentInfo, RecordingObserver, TimelineObserver};
pub use snapshot::{InstanceKind, InstanceSnapshot};
pub use tag::{AddObject, DisplayListTag, TagContext, TagKind, UpdateFlags, UpdateObjectData};
pub use types::{BlendMode, ColorTransform, DefinitionId, Depth, Rectangle, MOVIE_CLIP_CLASS_NAME};
