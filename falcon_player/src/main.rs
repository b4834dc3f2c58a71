use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use falcon_engine::{
    load_library, Definition, DisplayListTag, MovieClipDefinition, MovieClipInstance,
    MovieLibrary, ObservedEvent, RecordingObserver,
};
use log::{info, LevelFilter};
use serde::Serialize;

mod cli;
use cli::{Args, PlaybackCommand};

#[derive(Serialize)]
struct TraceManifest<'a> {
    movie: String,
    commands: Vec<String>,
    events: &'a [ObservedEvent],
}

fn main() -> Result<()> {
    let args = cli::parse()?;
    init_logging(args.verbose);

    let library = load_library(&args.movie)?;
    let definition = select_timeline(&library, args.symbol.as_deref())?;

    if args.dump_tags {
        dump_tags(&definition);
    }

    let mut observer = RecordingObserver::new();
    let mut clip = definition.create_instance();
    for command in &args.commands {
        run_command(&mut clip, &mut observer, command);
    }

    describe(&args, &library, &clip);

    if let Some(path) = args.state_json.as_ref() {
        write_json(path, &clip.snapshot(), "instance state")?;
    }
    if let Some(path) = args.trace_json.as_ref() {
        let manifest = TraceManifest {
            movie: args.movie.display().to_string(),
            commands: args.commands.iter().map(ToString::to_string).collect(),
            events: observer.events(),
        };
        write_json(path, &manifest, "observer trace")?;
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn select_timeline(
    library: &MovieLibrary,
    symbol: Option<&str>,
) -> Result<Arc<MovieClipDefinition>> {
    let Some(symbol) = symbol else {
        return Ok(Arc::clone(library.main_timeline()));
    };
    match library.exported_definition(symbol) {
        Some(Definition::MovieClip(clip)) => Ok(Arc::clone(clip)),
        Some(Definition::Shape(shape)) => Err(anyhow!(
            "symbol '{symbol}' is shape {}, not a movie clip",
            shape.id()
        )),
        None => Err(anyhow!(
            "symbol '{symbol}' is not exported (available: {})",
            library.export_names().join(", ")
        )),
    }
}

fn run_command(
    clip: &mut MovieClipInstance,
    observer: &mut RecordingObserver,
    command: &PlaybackCommand,
) {
    info!("running {command}");
    match command {
        PlaybackCommand::Advance(count) => {
            for _ in 0..*count {
                clip.advance(observer);
            }
        }
        PlaybackCommand::Goto(frame) => clip.goto_frame(observer, *frame),
        PlaybackCommand::Label(label) => {
            if !clip.goto_label(observer, label) {
                println!(
                    "!! label '{label}' not found; playhead left at {}",
                    clip.current_frame()
                );
            }
        }
        PlaybackCommand::Play => clip.play(),
        PlaybackCommand::Stop => clip.stop(),
    }
}

fn dump_tags(definition: &MovieClipDefinition) {
    println!(
        "Definition {} ({} frames, {} tags):",
        definition.id(),
        definition.frame_count(),
        definition.tags().len()
    );
    let mut frame = 0;
    println!("  frame {frame}");
    for (index, (forward, reverse)) in definition
        .tags()
        .iter()
        .zip(definition.reverse_tags())
        .enumerate()
    {
        let forward_text = forward.to_string();
        println!("    {index:>4}  {forward_text:<48} <- {reverse}");
        if matches!(forward, DisplayListTag::ShowFrame) {
            frame += 1;
            if frame < definition.frame_count() {
                println!("  frame {frame}");
            }
        }
    }
}

fn describe(args: &Args, library: &MovieLibrary, clip: &MovieClipInstance) {
    println!("Movie: {}", args.movie.display());
    println!(
        "Library: {} definitions | {} fps | exports: {}",
        library.definition_count(),
        library.frame_rate(),
        library.export_names().len()
    );
    println!(
        "Timeline: {} ({})",
        clip.definition().id(),
        args.symbol.as_deref().unwrap_or("main timeline")
    );
    println!(
        "Frame: {} / {} | playing: {} | label: {}",
        clip.current_frame(),
        clip.total_frames(),
        clip.is_playing(),
        clip.current_label().unwrap_or("-")
    );
    println!("Children: {}", clip.child_count());
    for (depth, child) in clip.display_list().iter() {
        let child = child.borrow();
        let name = match child.name() {
            "" => "<unnamed>",
            name => name,
        };
        let kind = match child.as_movie_clip() {
            Some(nested) => format!("movie clip @ frame {}", nested.current_frame()),
            None => "shape".to_string(),
        };
        println!(
            "  {depth:>4}: {name} -> definition {} ({kind})",
            child.definition_id()
        );
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T, what: &str) -> Result<()> {
    let json =
        serde_json::to_string_pretty(value).with_context(|| format!("serializing {what} to JSON"))?;
    fs::write(path, json).with_context(|| format!("writing {what} to {}", path.display()))?;
    println!("Saved {what} to {}", path.display());
    Ok(())
}
