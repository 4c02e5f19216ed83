//! # Entler
//!
//! Runs a grid simulation from a TOML configuration.
//!
//! ```bash
//! # Defaults
//! entler
//!
//! # Configured run with debug logging
//! RUST_LOG=entler_sim=debug entler sim.toml
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use entler_sim::{SimResult, Simulation, SimulationConfig};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "entler", about = "Grid simulation on an entity component store")]
struct Args {
    /// Path to the TOML configuration (defaults are used when omitted)
    config: Option<PathBuf>,

    /// Override the number of steps to run
    #[arg(short, long)]
    steps: Option<u64>,

    /// Override the placement seed
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("entler: {err}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .init();

    match run(&config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "simulation failed");
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<SimulationConfig, entler_sim::ConfigError> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)?,
        None => SimulationConfig::default(),
    };
    if let Some(steps) = args.steps {
        config.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    Ok(config)
}

fn run(config: &SimulationConfig) -> SimResult<()> {
    let mut sim = Simulation::from_config(config)?;
    sim.populate(config)?;

    let report = sim.run(config.steps, config.vacuum_every)?;

    let store = sim.store();
    let scene = sim.scene();
    info!(
        ticks = sim.tick(),
        entities = store.len(),
        records = store.record_count(),
        objects = scene.object_count(),
        properties = scene.property_count(),
        moved = report.moved,
        blocked = report.blocked,
        recharged = report.recharged,
        "final summary"
    );
    Ok(())
}
