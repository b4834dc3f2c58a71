use thiserror::Error;

use crate::types::{DefinitionId, Depth};

/// Errors raised while turning a movie document into runtime definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("definition {definition}: remove at depth {depth} (tag {index}) has no preceding add")]
    OrphanRemove {
        definition: DefinitionId,
        depth: Depth,
        index: usize,
    },
    #[error("definition {definition}: update at depth {depth} (tag {index}) has no preceding add")]
    OrphanUpdate {
        definition: DefinitionId,
        depth: Depth,
        index: usize,
    },
    #[error("definition {definition}: frame label '{label}' on frame {frame} is already in use")]
    DuplicateFrameLabel {
        definition: DefinitionId,
        label: String,
        frame: u16,
    },
    #[error("definition {definition}: unsupported timeline tag (code {code})")]
    UnsupportedTag { definition: DefinitionId, code: u16 },
    #[error(
        "definition {definition}: placement at depth {depth} carries clip actions, which are not supported"
    )]
    ClipActions {
        definition: DefinitionId,
        depth: Depth,
    },
    #[error(
        "definition {definition}: placement at depth {depth} carries a filter list, which is not supported"
    )]
    FilterList {
        definition: DefinitionId,
        depth: Depth,
    },
    #[error("definition {definition}: invalid blend mode {value} at depth {depth}")]
    InvalidBlendMode {
        definition: DefinitionId,
        depth: Depth,
        value: u8,
    },
    #[error("definition {definition}: placement at depth {depth} refers to unknown character {character}")]
    UnknownCharacter {
        definition: DefinitionId,
        depth: Depth,
        character: DefinitionId,
    },
    #[error("definition {definition}: placement at depth {depth} refers to unknown class '{class_name}'")]
    UnknownClassName {
        definition: DefinitionId,
        depth: Depth,
        class_name: String,
    },
    #[error("definition id {0} is declared more than once")]
    DuplicateDefinition(DefinitionId),
    #[error("symbol '{0}' is exported more than once")]
    DuplicateExport(String),
    #[error("symbol '{name}' is exported from unknown definition {id}")]
    UnknownExport { name: String, id: DefinitionId },
    #[error("frame actions given for '{0}', which is not an exported symbol")]
    ActionsWithoutSymbol(String),
    #[error("frame actions given for '{name}', but definition {id} is not a movie clip")]
    ActionsOnNonMovieClip { name: String, id: DefinitionId },
}
