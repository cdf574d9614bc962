use anyhow::{bail, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use traffic_grid::simulation::{city_preset, SimConfig, SimWorld, CITY_PRESETS};

#[derive(Parser)]
#[command(name = "traffic_grid")]
#[command(about = "Headless driver for the grid traffic kernel")]
struct Cli {
    /// JSON config file; missing fields take their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u64,

    /// Seed for the random source
    #[arg(long)]
    seed: Option<u64>,

    /// Intersections along each side of the grid
    #[arg(long)]
    grid_size: Option<u32>,

    /// Name junctions after a city preset
    #[arg(long)]
    city: Option<String>,

    /// Initial green phase length in ticks
    #[arg(long)]
    green_duration: Option<u32>,

    /// Ticks between congestion reports
    #[arg(long)]
    report_every: Option<u64>,

    /// Write the final snapshot to this JSON file
    #[arg(long)]
    snapshot_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let labels = match &cli.city {
        Some(name) => match city_preset(name) {
            Some(preset) => preset.owned_labels(),
            None => {
                let known: Vec<&str> = CITY_PRESETS.iter().map(|preset| preset.name).collect();
                bail!("Unknown city '{}', expected one of: {}", name, known.join(", "));
            }
        },
        None => Vec::new(),
    };

    run_headless(config, &labels, cli.ticks, cli.snapshot_out.as_deref())
}

/// Layer CLI overrides on top of the config file (or the defaults).
fn build_config(cli: &Cli) -> Result<SimConfig> {
    let mut config = match &cli.config {
        Some(path) => SimConfig::from_json_file(path)?,
        None => SimConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = Some(seed);
    }
    if let Some(grid_size) = cli.grid_size {
        config.grid_size = grid_size;
    }
    if let Some(green_duration) = cli.green_duration {
        config.green_duration = green_duration;
    }
    if let Some(report_every) = cli.report_every {
        config.report_interval = report_every;
    }
    config.validate()?;
    Ok(config)
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(
    config: SimConfig,
    labels: &[String],
    ticks: u64,
    snapshot_out: Option<&std::path::Path>,
) -> Result<()> {
    let mut world = SimWorld::with_labels(config, labels)?;
    info!("Running {} ticks", ticks);

    for _ in 0..ticks {
        world.tick();
        if let Some(report) = world.take_congestion_report() {
            info!(
                "Report @{}: active={} queued={} column_density={:?} row_density={:?}",
                report.tick,
                report.active_vehicles,
                report.total_queued,
                report.column_density,
                report.row_density
            );
        }
    }

    println!("=== Final State ===");
    world.print_summary();

    if let Some(path) = snapshot_out {
        world.snapshot().write_to_file(path)?;
        info!("Wrote snapshot to {}", path.display());
    }
    Ok(())
}
