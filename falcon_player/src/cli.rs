use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Result};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    about = "Headless player that compiles a movie document and steps its timeline",
    version
)]
pub struct Args {
    /// Movie document (JSON) to load
    #[arg(long)]
    pub movie: PathBuf,

    /// Exported symbol to play instead of the main timeline
    #[arg(long)]
    pub symbol: Option<String>,

    /// Playback step, repeatable: advance[=N], goto=FRAME, label=NAME, play, stop
    #[arg(long = "command", value_name = "STEP")]
    pub commands: Vec<PlaybackCommand>,

    /// Print the compiled forward and reverse tag streams
    #[arg(long)]
    pub dump_tags: bool,

    /// Path to write the final instance tree as JSON
    #[arg(long)]
    pub state_json: Option<PathBuf>,

    /// Path to write the observer notifications as JSON
    #[arg(long)]
    pub trace_json: Option<PathBuf>,

    /// Log compile decisions and seeks (RUST_LOG still takes precedence)
    #[arg(long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCommand {
    Advance(u32),
    Goto(i32),
    Label(String),
    Play,
    Stop,
}

impl FromStr for PlaybackCommand {
    type Err = String;

    fn from_str(step: &str) -> Result<Self, Self::Err> {
        let (verb, value) = match step.split_once('=') {
            Some((verb, value)) => (verb, Some(value)),
            None => (step, None),
        };
        match (verb, value) {
            ("advance", None) => Ok(Self::Advance(1)),
            ("advance", Some(count)) => count
                .parse()
                .map(Self::Advance)
                .map_err(|err| format!("invalid advance count '{count}': {err}")),
            ("goto", Some(frame)) => frame
                .parse()
                .map(Self::Goto)
                .map_err(|err| format!("invalid goto frame '{frame}': {err}")),
            ("label", Some(label)) if !label.is_empty() => Ok(Self::Label(label.to_string())),
            ("play", None) => Ok(Self::Play),
            ("stop", None) => Ok(Self::Stop),
            _ => Err(format!(
                "unknown step '{step}' (expected advance[=N], goto=FRAME, label=NAME, play or stop)"
            )),
        }
    }
}

impl fmt::Display for PlaybackCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advance(count) => write!(f, "advance={count}"),
            Self::Goto(frame) => write!(f, "goto={frame}"),
            Self::Label(label) => write!(f, "label={label}"),
            Self::Play => f.write_str("play"),
            Self::Stop => f.write_str("stop"),
        }
    }
}

pub fn parse() -> Result<Args> {
    let args = Args::parse();
    args.validate()?;
    Ok(args)
}

impl Args {
    fn validate(&self) -> Result<()> {
        if self.symbol.as_deref() == Some("") {
            bail!("--symbol must name an exported symbol");
        }
        if let (Some(state), Some(trace)) = (&self.state_json, &self.trace_json) {
            if state == trace {
                bail!(
                    "--state-json and --trace-json both point at {}",
                    state.display()
                );
            }
        }
        Ok(())
    }
}
