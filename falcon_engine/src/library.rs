//! Turns a [`MovieDocument`] into a dictionary of shared runtime
//! definitions.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use falcon_formats::{
    ColorTransformRecord, DefinitionDocument, MovieDocument, PlaceObjectRecord, RawTag,
    TimelineDocument,
};
use glam::Affine2;
use log::{debug, info};

use crate::actions::SimpleActions;
use crate::compiler::{MovieClipBuilder, PlaceObject};
use crate::definition::{Definition, ShapeDefinition};
use crate::error::LoadError;
use crate::movie_clip::MovieClipInstance;
use crate::movie_clip_definition::MovieClipDefinition;
use crate::tag::UpdateObjectData;
use crate::types::{BlendMode, ColorTransform, DefinitionId, Rectangle};

/// Dictionary id reserved for the main timeline.
pub const MAIN_TIMELINE_ID: DefinitionId = 0;

#[derive(Debug)]
pub struct MovieLibrary {
    frame_rate: f32,
    dictionary: HashMap<DefinitionId, Definition>,
    exports: HashMap<String, DefinitionId>,
    main_timeline: Arc<MovieClipDefinition>,
}

impl MovieLibrary {
    pub fn from_document(document: &MovieDocument) -> Result<Self, LoadError> {
        let mut exports = HashMap::new();
        let mut class_names: HashMap<DefinitionId, &str> = HashMap::new();
        for symbol in &document.symbols {
            if exports.insert(symbol.name.clone(), symbol.id).is_some() {
                return Err(LoadError::DuplicateExport(symbol.name.clone()));
            }
            class_names.insert(symbol.id, symbol.name.as_str());
        }

        let mut actions: HashMap<DefinitionId, SimpleActions> = HashMap::new();
        for (name, document_actions) in &document.actions {
            let id = *exports
                .get(name)
                .ok_or_else(|| LoadError::ActionsWithoutSymbol(name.clone()))?;
            if document.sprite(id).is_none() {
                return Err(LoadError::ActionsOnNonMovieClip {
                    name: name.clone(),
                    id,
                });
            }
            actions.insert(id, SimpleActions::from_document(document_actions));
        }

        let mut library = Loader {
            dictionary: HashMap::new(),
            exports: &exports,
        };
        for definition in &document.definitions {
            let id = definition.id();
            if id == MAIN_TIMELINE_ID || library.dictionary.contains_key(&id) {
                return Err(LoadError::DuplicateDefinition(id));
            }
            let compiled = match definition {
                DefinitionDocument::Shape(shape) => Definition::Shape(Arc::new(
                    ShapeDefinition::new(id, shape.bounds.map(Rectangle::from_ltrb)),
                )),
                DefinitionDocument::Sprite(sprite) => {
                    Definition::MovieClip(Arc::new(library.compile_timeline(
                        id,
                        &sprite.timeline(),
                        class_names.get(&id).copied(),
                        actions.remove(&id),
                    )?))
                }
            };
            library.dictionary.insert(id, compiled);
        }

        for (name, id) in &exports {
            if !library.dictionary.contains_key(id) {
                return Err(LoadError::UnknownExport {
                    name: name.clone(),
                    id: *id,
                });
            }
        }

        let main_timeline = Arc::new(library.compile_timeline(
            MAIN_TIMELINE_ID,
            &document.timeline,
            None,
            None,
        )?);
        info!(
            "loaded movie library: {} definitions, {} exports, main timeline {} frames",
            library.dictionary.len(),
            exports.len(),
            main_timeline.frame_count()
        );

        Ok(Self {
            frame_rate: document.frame_rate,
            dictionary: library.dictionary,
            exports,
            main_timeline,
        })
    }

    pub fn frame_rate(&self) -> f32 {
        self.frame_rate
    }

    pub fn main_timeline(&self) -> &Arc<MovieClipDefinition> {
        &self.main_timeline
    }

    /// Fresh root instance of the main timeline.
    pub fn create_main_instance(&self) -> MovieClipInstance {
        self.main_timeline.create_instance()
    }

    pub fn definition(&self, id: DefinitionId) -> Option<&Definition> {
        self.dictionary.get(&id)
    }

    pub fn definition_count(&self) -> usize {
        self.dictionary.len()
    }

    pub fn exported_definition(&self, name: &str) -> Option<&Definition> {
        self.exports
            .get(name)
            .and_then(|id| self.dictionary.get(id))
    }

    pub fn exported_movie_clip(&self, name: &str) -> Option<&Arc<MovieClipDefinition>> {
        self.exported_definition(name)
            .and_then(Definition::as_movie_clip)
    }

    /// Exported symbol names, sorted.
    pub fn export_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.exports.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Reads and compiles the movie document at `path`.
pub fn load_library<P: AsRef<Path>>(path: P) -> Result<MovieLibrary> {
    let path = path.as_ref();
    let document = MovieDocument::from_path(path)?;
    MovieLibrary::from_document(&document)
        .with_context(|| format!("compiling movie library {}", path.display()))
}

struct Loader<'a> {
    dictionary: HashMap<DefinitionId, Definition>,
    exports: &'a HashMap<String, DefinitionId>,
}

impl Loader<'_> {
    fn compile_timeline(
        &self,
        id: DefinitionId,
        timeline: &TimelineDocument,
        class_name: Option<&str>,
        actions: Option<SimpleActions>,
    ) -> Result<MovieClipDefinition, LoadError> {
        let mut builder = MovieClipBuilder::new(id, timeline.frame_count);
        if let Some(class_name) = class_name {
            builder.set_class_name(class_name);
        }
        if let Some(actions) = actions {
            builder.set_simple_actions(actions);
        }

        for tag in &timeline.tags {
            match tag {
                RawTag::Place(record) => {
                    let place = self.resolve_place(id, record)?;
                    let kind = builder.place(place);
                    debug!(
                        "definition {id}: placement at depth {} compiled to {kind}",
                        record.depth
                    );
                }
                RawTag::Remove { depth } => builder.remove(*depth),
                RawTag::ShowFrame => builder.show_frame(),
                RawTag::FrameLabel { label } => builder.frame_label(label)?,
                RawTag::Unsupported { code } => {
                    return Err(LoadError::UnsupportedTag {
                        definition: id,
                        code: *code,
                    })
                }
            }
        }

        let declared = usize::from(timeline.frame_count.max(1));
        let shown = timeline.show_frame_count();
        if shown != declared {
            debug!("definition {id}: declares {declared} frames but shows {shown}");
        }
        builder.finish()
    }

    fn resolve_place(
        &self,
        id: DefinitionId,
        record: &PlaceObjectRecord,
    ) -> Result<PlaceObject, LoadError> {
        let depth = record.depth;
        if record.clip_actions {
            return Err(LoadError::ClipActions {
                definition: id,
                depth,
            });
        }
        if record.filters {
            return Err(LoadError::FilterList {
                definition: id,
                depth,
            });
        }

        let mut data = UpdateObjectData::new(depth);
        if let Some(matrix) = &record.matrix {
            data.set_transform(Affine2::from_cols_array(&matrix.to_cols_array_pixels()));
        }
        if let Some(color) = &record.color_transform {
            let (color_transform, alpha) = color_transform_from_record(color);
            data.set_color_transform(color_transform, alpha);
        }
        if let Some(name) = &record.name {
            data.set_name(name.as_str());
        }
        if let Some(clip_depth) = record.clip_depth {
            data.set_clip_depth(clip_depth);
        }
        if let Some(raw) = record.blend_mode {
            let blend_mode = BlendMode::try_from(raw).map_err(|value| {
                LoadError::InvalidBlendMode {
                    definition: id,
                    depth,
                    value,
                }
            })?;
            data.set_blend_mode(blend_mode);
        }

        let definition = match (&record.character, &record.class_name) {
            (Some(character), _) => Some(self.dictionary.get(character).cloned().ok_or(
                LoadError::UnknownCharacter {
                    definition: id,
                    depth,
                    character: *character,
                },
            )?),
            (None, Some(class_name)) => Some(
                self.exports
                    .get(class_name)
                    .and_then(|export| self.dictionary.get(export))
                    .cloned()
                    .ok_or_else(|| LoadError::UnknownClassName {
                        definition: id,
                        depth,
                        class_name: class_name.clone(),
                    })?,
            ),
            (None, None) => None,
        };

        Ok(PlaceObject {
            data,
            definition,
            is_move: record.is_move,
        })
    }
}

/// Splits a color record into the RGB transform and the alpha multiplier.
/// Add terms are clamped into the 0..=255 range the runtime stores.
fn color_transform_from_record(record: &ColorTransformRecord) -> (ColorTransform, f32) {
    let add = |value: i16| value.clamp(0, 255) as u8;
    (
        ColorTransform::new(
            [record.mul[0], record.mul[1], record.mul[2]],
            [add(record.add[0]), add(record.add[1]), add(record.add[2])],
        ),
        record.mul[3],
    )
}
