use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use skytrail_app::errors::Result;
use skytrail_app::replay::{run_replay, ReplayOptions};
use skytrail_app::track::load_track;
use skytrail_phase::profiles::FlightModelTable;
use skytrail_sim::engine::{EngineConfig, TrafficEngine};
use skytrail_terrain::{FlatTerrain, TerrainProbe, TileSet};

#[derive(Parser, Debug)]
#[command(
    name = "skytrail-replay",
    version,
    about = "Replay a recorded waypoint track through the trajectory synthesizer"
)]
struct Cli {
    /// Recorded track (JSON array of reports)
    #[arg(long)]
    track: PathBuf,

    /// Flight model file (TOML); built-in defaults when omitted
    #[arg(long)]
    models: Option<PathBuf>,

    /// Engine configuration (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory of .hgt terrain tiles; flat sea-level ground when omitted
    #[arg(long)]
    terrain: Option<PathBuf>,

    /// Ticks per simulated second
    #[arg(long, default_value_t = 30.0)]
    rate: f64,

    /// Pace to wall-clock time at this factor; 0 runs as fast as possible
    #[arg(long, default_value_t = 0.0)]
    speedup: f64,

    /// Seed overriding the configured one
    #[arg(long)]
    seed: Option<u64>,

    /// Snapshot output (JSON lines); stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "replay failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let models = match &cli.models {
        Some(path) => FlightModelTable::load(path)?,
        None => FlightModelTable::default(),
    };

    let terrain: Box<dyn TerrainProbe> = match &cli.terrain {
        Some(dir) => Box::new(TileSet::load_dir(dir)?),
        None => Box::new(FlatTerrain::new(0.0)),
    };

    let records = load_track(&cli.track)?;
    info!(track = %cli.track.display(), reports = records.len(), "track loaded");

    let mut out: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut engine = TrafficEngine::new(config, models, terrain);
    let options = ReplayOptions {
        rate_hz: cli.rate,
        speedup: cli.speedup,
    };
    run_replay(&mut engine, records, &options, &mut out)?;
    Ok(())
}
