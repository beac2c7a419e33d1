//! VSO sampling command-line driver.
//!
//! Samples a time range from the configured archive, splitting the query when
//! the archive caps out, and optionally screens the JPEG previews for
//! corrupted images.
//!
//! # Usage
//!
//! ```bash
//! VSO_BASE_URL=http://127.0.0.1:8080 \
//!   vso-sample --start "2012-01-01 00:00:01" --end "2012-02-01 23:59:59" \
//!              --cadence 100 --instrument "mauna loa" --verbose --detect
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Log level (default: info)
//! - `ARCHIVE_TYPE`, `VSO_BASE_URL`, `VSO_TIMEOUT_SECS`, `SAMPLER_CAP_SIZE`:
//!   configuration overrides

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vso_sampler::archive::{ArchiveFactory, HttpImageSource};
use vso_sampler::config::SamplerConfig;
use vso_sampler::models::{validate_time_interval, TimeInterval};
use vso_sampler::services::{CappedSampler, CorruptImageFinder};

#[derive(Parser, Debug)]
#[command(name = "vso-sample", version, about = "Sample VSO observations by cadence")]
struct Cli {
    /// Start of the range (e.g. "2012-01-01 00:00:01")
    #[arg(long)]
    start: String,

    /// End of the range
    #[arg(long)]
    end: String,

    /// Sampling period in minutes
    #[arg(long)]
    cadence: u32,

    /// Instrument name or site code (e.g. "gong", "mauna loa", "ML")
    #[arg(long, default_value = "gong")]
    instrument: String,

    /// Configuration file (defaults to sampler.toml lookup)
    #[arg(long, value_name = "PATH", env = "SAMPLER_CONFIG")]
    config: Option<PathBuf>,

    /// Narrate progress at info level
    #[arg(long)]
    verbose: bool,

    /// Run the brightness-anomaly heuristic over the JPEG previews
    #[arg(long)]
    detect: bool,

    /// Grid side length for --detect (defaults to detector.grid_size)
    #[arg(long, requires = "detect")]
    grid_size: Option<u32>,

    /// Print a JSON report instead of plain text
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Report {
    interval: TimeInterval,
    instrument: String,
    cadence_minutes: u32,
    archive: String,
    sub_intervals: usize,
    observations: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    flagged: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detection_minutes: Option<f64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let config = SamplerConfig::load(cli.config.as_deref())?;
    let archive = ArchiveFactory::create(&config)?;
    info!(
        "archive={} cap={} retries={}",
        archive.name(),
        config.sampler.cap_size,
        config.sampler.max_retries
    );

    let interval = validate_time_interval(cli.start.as_str(), cli.end.as_str())?;
    let batch = CappedSampler::new(archive.as_ref())
        .with_cap(config.sampler.cap_size)
        .verbose(cli.verbose)
        .sample(interval, cli.cadence, &cli.instrument)
        .await?;

    let mut report = Report {
        interval,
        instrument: cli.instrument.clone(),
        cadence_minutes: cli.cadence,
        archive: archive.name().to_string(),
        sub_intervals: batch.len(),
        observations: batch.n_queried_files(),
        flagged: None,
        detection_minutes: None,
    };

    if cli.detect {
        let urls: Vec<String> = batch.iter().flat_map(|result| result.jpg_urls()).collect();
        let grid_size = cli.grid_size.unwrap_or(config.detector.grid_size);
        let source = HttpImageSource::new(&config.archive)?;

        let started = Instant::now();
        let flagged = CorruptImageFinder::new(&source)
            .with_grid_size(grid_size)
            .with_fence(config.detector.fence_params())
            .run(&urls)
            .await?;

        report.detection_minutes = Some(started.elapsed().as_secs_f64() / 60.0);
        report.flagged = Some(flagged);
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &Report) {
    println!("Interval:     {}", report.interval);
    println!(
        "Instrument:   {} every {} min ({})",
        report.instrument, report.cadence_minutes, report.archive
    );
    println!("Queries:      {}", report.sub_intervals);
    println!("Observations: {}", report.observations);

    if let Some(flagged) = &report.flagged {
        println!("Flagged:      {}", flagged.len());
        for url in flagged {
            println!("  {}", url);
        }
    }
    if let Some(minutes) = report.detection_minutes {
        println!("Detection:    {:.2} min", minutes);
    }
}
