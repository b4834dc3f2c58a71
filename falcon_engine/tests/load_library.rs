use std::fs;

use anyhow::{Context, Result};
use falcon_engine::{load_library, LoadError, NullObserver};
use tempfile::tempdir;

#[test]
fn loads_and_plays_library_from_disk() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for movie document")?;
    let path = temp_dir.path().join("movie.json");
    fs::write(
        &path,
        r#"{
            "frame_rate": 60,
            "timeline": {
                "frame_count": 2,
                "tags": [
                    { "op": "place", "depth": 1, "character": 1, "name": "dot" },
                    { "op": "show_frame" },
                    { "op": "remove", "depth": 1 },
                    { "op": "show_frame" }
                ]
            },
            "definitions": [ { "kind": "shape", "id": 1, "bounds": [0, 0, 1, 1] } ]
        }"#,
    )
    .context("writing movie document")?;

    let library = load_library(&path)?;
    assert_eq!(library.frame_rate(), 60.0);

    let mut clip = library.create_main_instance();
    clip.advance(&mut NullObserver);
    assert!(clip.child_by_name("dot").is_some());
    clip.advance(&mut NullObserver);
    assert_eq!(clip.child_count(), 0);
    Ok(())
}

#[test]
fn compile_errors_keep_their_type_and_path() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory for movie document")?;
    let path = temp_dir.path().join("labels.json");
    fs::write(
        &path,
        r#"{ "timeline": { "tags": [
            { "op": "frame_label", "label": "loop" },
            { "op": "frame_label", "label": "loop" }
        ] } }"#,
    )
    .context("writing movie document")?;

    let err = load_library(&path).unwrap_err();
    assert!(format!("{err:#}").contains("labels.json"));
    assert!(matches!(
        err.downcast_ref::<LoadError>(),
        Some(LoadError::DuplicateFrameLabel { frame: 0, .. })
    ));
    Ok(())
}
