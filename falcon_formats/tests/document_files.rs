use std::fs;

use anyhow::{Context, Result};
use falcon_formats::{MovieDocument, RawTag};
use tempfile::tempdir;

#[test]
fn loads_document_from_disk() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for movie document")?;
    let path = temp_dir.path().join("movie.json");
    fs::write(
        &path,
        r#"{
            "timeline": {
                "frame_count": 1,
                "tags": [
                    { "op": "place", "depth": 3, "character": 7, "move": true },
                    { "op": "show_frame" }
                ]
            },
            "definitions": [ { "kind": "shape", "id": 7 } ]
        }"#,
    )
    .context("writing movie document")?;

    let document = MovieDocument::from_path(&path)?;
    assert_eq!(document.definitions.len(), 1);
    match &document.timeline.tags[0] {
        RawTag::Place(place) => {
            assert_eq!(place.depth, 3);
            assert!(place.is_move);
            assert!(place.places_definition());
        }
        other => panic!("expected placement, got {other:?}"),
    }
    Ok(())
}

#[test]
fn missing_file_reports_path() {
    let temp_dir = tempdir().expect("temporary directory");
    let path = temp_dir.path().join("absent.json");
    let err = MovieDocument::from_path(&path).unwrap_err();
    let message = format!("{err:#}");
    assert!(message.contains("absent.json"), "{message}");
}

#[test]
fn invalid_utf8_is_rejected() {
    let err = MovieDocument::parse_bytes(&[0xff, 0xfe, 0x00]).unwrap_err();
    assert!(format!("{err:#}").contains("UTF-8"));
}
