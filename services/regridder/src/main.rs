//! Survey regridder.
//!
//! Reads a GXF survey grid in a projected CRS, reprojects it to WGS84 and
//! writes a regular longitude/latitude Zarr dataset.

mod config_loader;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use config_loader::load_pipeline_config;

#[derive(Parser, Debug)]
#[command(name = "regridder")]
#[command(about = "Reproject a GXF survey grid to a regular WGS84 Zarr dataset")]
struct Args {
    /// Pipeline configuration file
    #[arg(short, long, default_value = "config/arizona.yaml", env = "REGRIDDER_CONFIG")]
    config: PathBuf,

    /// Override the input GXF file
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Override the output Zarr directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Do not store the projected and reprojected intermediate groups
    #[arg(long)]
    no_stages: bool,

    /// Number of rayon worker threads (default: one per core)
    #[arg(long, env = "REGRIDDER_THREADS")]
    threads: Option<usize>,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args.log_level, args.json_logs);

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
    }

    let mut config = load_pipeline_config(&args.config)?;
    config.apply_env();
    if let Some(input) = args.input {
        config.input = input;
    }
    if let Some(output) = args.output {
        config.output = output;
    }
    if args.no_stages {
        config.projected_output = None;
        config.reprojected_output = None;
    }
    config.validate()?;

    info!(
        config = %args.config.display(),
        input = %config.input.display(),
        output = %config.output.display(),
        projection = %config.projection.family,
        "Starting survey regridder"
    );

    let summary = grid_processor::run(&config)
        .with_context(|| format!("Failed to regrid {}", config.input.display()))?;

    info!(
        lat = summary.shape.0,
        lon = summary.shape.1,
        valid = summary.valid_nodes,
        dropped = summary.dropped_samples,
        compression = %summary.write.compression,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Wrote {}",
        config.output.display()
    );
    for (stage, path) in [
        ("projected", &config.projected_output),
        ("reprojected", &config.reprojected_output),
    ] {
        if let Some(path) = path {
            info!(stage = stage, "Wrote {}", path.display());
        }
    }

    Ok(())
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
