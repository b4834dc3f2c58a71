//! JSON movie documents.
//!
//! A movie document carries the logical content of a compiled SWF library:
//! shape and sprite definitions, the main timeline, symbol exports and the
//! simple frame actions attached to exported symbols. Timelines are stored
//! as the raw placement stream an authoring tool emits; identity resolution
//! and reverse-tag derivation happen later, when the engine compiles them.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Number of twips in one pixel.
pub const TWIPS_PER_PIXEL: f32 = 20.0;

const DEFAULT_FRAME_RATE: f32 = 30.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: f32,
    pub timeline: TimelineDocument,
    #[serde(default)]
    pub definitions: Vec<DefinitionDocument>,
    #[serde(default)]
    pub symbols: Vec<SymbolExport>,
    #[serde(default)]
    pub actions: BTreeMap<String, SimpleActionsDocument>,
}

fn default_frame_rate() -> f32 {
    DEFAULT_FRAME_RATE
}

impl MovieDocument {
    pub fn parse_bytes(input: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(input).context("movie document is not UTF-8")?;
        Self::parse_str(text)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let document: MovieDocument =
            serde_json::from_str(text).context("parsing movie document JSON")?;
        document.validate()?;
        Ok(document)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("reading movie document {}", path.display()))?;
        Self::parse_bytes(&bytes)
            .with_context(|| format!("loading movie document {}", path.display()))
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn sprite(&self, id: u16) -> Option<&SpriteDocument> {
        self.definitions.iter().find_map(|definition| match definition {
            DefinitionDocument::Sprite(sprite) if sprite.id == id => Some(sprite),
            _ => None,
        })
    }

    pub fn export_id(&self, name: &str) -> Option<u16> {
        self.symbols
            .iter()
            .find(|symbol| symbol.name == name)
            .map(|symbol| symbol.id)
    }

    fn validate(&self) -> Result<()> {
        ensure!(
            self.frame_rate.is_finite() && self.frame_rate > 0.0,
            "frame rate must be positive (got {})",
            self.frame_rate
        );
        for definition in &self.definitions {
            ensure!(
                definition.id() != 0,
                "definition id 0 is reserved for the main timeline"
            );
        }
        Ok(())
    }
}

/// A timeline as authored: a declared frame count and the raw tag stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineDocument {
    #[serde(default = "default_frame_count")]
    pub frame_count: u16,
    #[serde(default)]
    pub tags: Vec<RawTag>,
}

fn default_frame_count() -> u16 {
    1
}

impl TimelineDocument {
    pub fn show_frame_count(&self) -> usize {
        self.tags
            .iter()
            .filter(|tag| matches!(tag, RawTag::ShowFrame))
            .count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DefinitionDocument {
    Shape(ShapeDocument),
    Sprite(SpriteDocument),
}

impl DefinitionDocument {
    pub fn id(&self) -> u16 {
        match self {
            Self::Shape(shape) => shape.id,
            Self::Sprite(sprite) => sprite.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeDocument {
    pub id: u16,
    /// Local bounds in pixels as `[left, top, right, bottom]`.
    #[serde(default)]
    pub bounds: Option<[f32; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteDocument {
    pub id: u16,
    #[serde(default = "default_frame_count")]
    pub frame_count: u16,
    #[serde(default)]
    pub tags: Vec<RawTag>,
}

impl SpriteDocument {
    pub fn timeline(&self) -> TimelineDocument {
        TimelineDocument {
            frame_count: self.frame_count,
            tags: self.tags.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolExport {
    pub id: u16,
    pub name: String,
}

/// One entry of a raw timeline tag stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RawTag {
    Place(PlaceObjectRecord),
    Remove {
        depth: u16,
    },
    ShowFrame,
    FrameLabel {
        label: String,
    },
    /// A tag kind the runtime does not play back (legacy PlaceObject,
    /// RemoveObject v1, sounds, ...). `code` is the SWF tag code.
    Unsupported {
        code: u16,
    },
}

impl RawTag {
    pub fn depth(&self) -> Option<u16> {
        match self {
            Self::Place(place) => Some(place.depth),
            Self::Remove { depth } => Some(*depth),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlaceObjectRecord {
    pub depth: u16,
    /// Dictionary id of the placed definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character: Option<u16>,
    /// Exported symbol name of the placed definition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<MatrixRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_transform: Option<ColorTransformRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clip_depth: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blend_mode: Option<u8>,
    #[serde(default, rename = "move")]
    pub is_move: bool,
    #[serde(default)]
    pub clip_actions: bool,
    #[serde(default)]
    pub filters: bool,
}

impl PlaceObjectRecord {
    pub fn places_definition(&self) -> bool {
        self.character.is_some() || self.class_name.is_some()
    }
}

/// A SWF MATRIX record. Translation is in twips, scale and skew are plain
/// factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatrixRecord {
    #[serde(default = "one")]
    pub scale_x: f32,
    #[serde(default)]
    pub rotate_skew0: f32,
    #[serde(default)]
    pub rotate_skew1: f32,
    #[serde(default = "one")]
    pub scale_y: f32,
    #[serde(default)]
    pub translate_x: f32,
    #[serde(default)]
    pub translate_y: f32,
}

impl Default for MatrixRecord {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            rotate_skew0: 0.0,
            rotate_skew1: 0.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

impl MatrixRecord {
    /// Column-major 2x3 affine matrix with the translation converted to
    /// pixels.
    pub fn to_cols_array_pixels(&self) -> [f32; 6] {
        [
            self.scale_x,
            self.rotate_skew0,
            self.rotate_skew1,
            self.scale_y,
            self.translate_x / TWIPS_PER_PIXEL,
            self.translate_y / TWIPS_PER_PIXEL,
        ]
    }
}

/// A SWF CXFORMWITHALPHA record as `[r, g, b, a]` multiply and add terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorTransformRecord {
    #[serde(default = "identity_mul")]
    pub mul: [f32; 4],
    #[serde(default)]
    pub add: [i16; 4],
}

impl Default for ColorTransformRecord {
    fn default() -> Self {
        Self {
            mul: identity_mul(),
            add: [0; 4],
        }
    }
}

fn one() -> f32 {
    1.0
}

fn identity_mul() -> [f32; 4] {
    [1.0; 4]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleActionsDocument {
    #[serde(default)]
    pub frames: BTreeMap<u16, FrameActionsDocument>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameActionsDocument {
    #[serde(default)]
    pub stop: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    #[serde(default)]
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub name: String,
    #[serde(default)]
    pub bubble: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
    {
        "frame_rate": 24,
        "timeline": {
            "frame_count": 2,
            "tags": [
                { "op": "place", "depth": 1, "character": 2, "name": "button",
                  "matrix": { "translate_x": 200, "translate_y": -40 } },
                { "op": "frame_label", "label": "intro" },
                { "op": "show_frame" },
                { "op": "remove", "depth": 1 },
                { "op": "show_frame" }
            ]
        },
        "definitions": [
            { "kind": "shape", "id": 1, "bounds": [0, 0, 10, 10] },
            { "kind": "sprite", "id": 2, "frame_count": 1, "tags": [
                { "op": "place", "depth": 1, "character": 1 },
                { "op": "show_frame" }
            ] }
        ],
        "symbols": [ { "id": 2, "name": "ui$Button" } ],
        "actions": {
            "ui$Button": { "frames": { "0": { "stop": true, "events": [ { "name": "ready" } ] } } }
        }
    }
    "#;

    #[test]
    fn parses_movie_document() {
        let document = MovieDocument::parse_str(SOURCE).expect("parsed document");
        assert_eq!(document.frame_rate, 24.0);
        assert_eq!(document.timeline.frame_count, 2);
        assert_eq!(document.timeline.tags.len(), 5);
        assert_eq!(document.timeline.show_frame_count(), 2);
        assert_eq!(document.definitions.len(), 2);
        assert_eq!(document.export_id("ui$Button"), Some(2));

        let sprite = document.sprite(2).expect("sprite 2");
        assert_eq!(sprite.tags.len(), 2);

        match &document.timeline.tags[0] {
            RawTag::Place(place) => {
                assert_eq!(place.character, Some(2));
                assert_eq!(place.name.as_deref(), Some("button"));
                assert!(!place.is_move);
                let matrix = place.matrix.expect("matrix present");
                assert_eq!(matrix.scale_x, 1.0);
                assert_eq!(matrix.to_cols_array_pixels(), [1.0, 0.0, 0.0, 1.0, 10.0, -2.0]);
            }
            other => panic!("expected placement, got {other:?}"),
        }

        let actions = &document.actions["ui$Button"];
        let frame0 = &actions.frames[&0];
        assert!(frame0.stop);
        assert_eq!(frame0.visible, None);
        assert_eq!(frame0.events[0].name, "ready");
        assert!(!frame0.events[0].bubble);
    }

    #[test]
    fn rejects_reserved_definition_id() {
        let source = r#"{ "timeline": {}, "definitions": [ { "kind": "shape", "id": 0 } ] }"#;
        let err = MovieDocument::parse_str(source).unwrap_err();
        assert!(err.to_string().contains("reserved"), "{err:#}");
    }

    #[test]
    fn rejects_unknown_tag_op() {
        let source = r#"{ "timeline": { "tags": [ { "op": "do_action" } ] } }"#;
        assert!(MovieDocument::parse_str(source).is_err());
    }

    #[test]
    fn defaults_fill_in_missing_fields() {
        let document = MovieDocument::parse_str(r#"{ "timeline": {} }"#).expect("parsed");
        assert_eq!(document.frame_rate, 30.0);
        assert_eq!(document.timeline.frame_count, 1);
        assert!(document.timeline.tags.is_empty());
        assert!(document.definitions.is_empty());
        assert!(document.actions.is_empty());
    }

    #[test]
    fn round_trips_through_json() {
        let document = MovieDocument::parse_str(SOURCE).expect("parsed document");
        let json = document.to_json_string().expect("serialized");
        let reparsed = MovieDocument::parse_str(&json).expect("reparsed");
        assert_eq!(document, reparsed);
    }
}
