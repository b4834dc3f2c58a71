pub mod document;

pub use document::{
    ColorTransformRecord, DefinitionDocument, EventRecord, FrameActionsDocument, MatrixRecord,
    MovieDocument, PlaceObjectRecord, RawTag, ShapeDocument, SimpleActionsDocument,
    SpriteDocument, SymbolExport, TimelineDocument,
};
