//! Batch job: reads building footprints, derives geometric and
//! neighbourhood features, writes the enriched table.
mod config;
mod store;

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use footprint_core::FeaturePipeline;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::JobConfig;
use store::{GeoJsonSink, GeoJsonSource};

#[derive(Parser, Debug)]
#[command(name = "all_features", about = "Derive footprint shape and neighbourhood features")]
struct Args {
    /// JSON job configuration.
    #[arg(short, long, default_value = "all_features.json")]
    config: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok()))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("run failed: {e:?}");
        std::process::exit(1);
    }
}

/// `RUST_LOG` when set and parseable, `info` otherwise.
fn log_filter(rust_log: Option<String>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn run(args: &Args) -> Result<()> {
    let started = Instant::now();
    let job = JobConfig::load(&args.config)?;
    info!(
        source = %job.source.display(),
        destination = %job.destination().display(),
        radius = job.pipeline.radius,
        workers = job.pipeline.workers,
        partitions = job.pipeline.partitions,
        "starting"
    );

    let pipeline = FeaturePipeline::new(job.pipeline.clone()).context("building pipeline")?;
    let mut source = GeoJsonSource::new(&job.source);
    let mut sink = GeoJsonSink::new(job.destination());
    let summary = pipeline.run(&mut source, &mut sink)?;

    info!(
        rows = summary.rows,
        failed = summary.failed,
        elapsed_s = started.elapsed().as_secs_f64(),
        "Finished"
    );
    Ok(())
}
