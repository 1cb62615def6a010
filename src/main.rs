use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use cadenza::{CompositionRequest, Engine, EngineConfig};
use clap::Parser;
use log::{error, warn};

/// Durations offered to end users. The engine itself accepts any positive
/// duration; `--any-duration` lifts this restriction.
const ALLOWED_DURATIONS: [i64; 4] = [60, 300, 600, 3600];

#[derive(Debug, Parser)]
#[command(name = "cadenza", version, about = "Procedural multi-track MIDI composer")]
struct Cli {
    /// Genre to compose in (see --list-genres)
    genre: Option<String>,

    /// Length of the piece in seconds
    #[arg(short, long, default_value_t = 60)]
    duration: i64,

    /// Voice style tag, recorded with the artifact
    #[arg(long)]
    style: Option<String>,

    /// Directory for generated files (overrides config and CADENZA_OUTPUT_DIR)
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,

    /// Refuse genres that are not in the catalog instead of improvising
    #[arg(long)]
    strict: bool,

    /// Accept any positive duration, not only 60, 300, 600 or 3600
    #[arg(long)]
    any_duration: bool,

    /// Print the known genres and exit
    #[arg(long)]
    list_genres: bool,
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{}", err);
            eprintln!("error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::default(),
    }
    .with_env_overrides();
    if let Some(dir) = cli.out_dir {
        config.output_dir = dir;
    }

    let mut engine = match cli.seed {
        Some(seed) => Engine::with_seed(config, seed)?,
        None => Engine::new(config)?,
    };

    if cli.list_genres {
        for genre in engine.list_known_genres() {
            let aliases = engine.catalog().aliases_of(genre);
            if aliases.is_empty() {
                println!("{}", genre);
            } else {
                println!("{} ({})", genre, aliases.join(", "));
            }
        }
        return Ok(());
    }

    let genre = cli.genre.unwrap_or_else(|| "ambient".to_string());

    if !cli.any_duration && !ALLOWED_DURATIONS.contains(&cli.duration) {
        return Err(format!(
            "duration {}s is not offered, pick one of {:?} or pass --any-duration",
            cli.duration, ALLOWED_DURATIONS
        )
        .into());
    }

    if cli.strict {
        engine.require_known_genre(&genre)?;
    } else if !engine.is_known_genre(&genre) {
        warn!(
            "'{}' is not a supported genre, the piece will be improvised. Known genres: {}",
            genre,
            engine.list_known_genres().join(", ")
        );
    }

    let mut request = CompositionRequest::new(genre, cli.duration);
    if let Some(style) = cli.style {
        request = request.with_voice_style(style);
    }

    let artifact = engine.compose(&request)?;
    println!("{}", serde_json::to_string_pretty(&artifact)?);
    Ok(())
}
