//! CLI entry point for the turnstile rater.
//!
//! Provides subcommands for computing per-station weekday averages from a raw
//! turnstile file, refreshing the delta snapshot, and listing top stations.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::ffi::OsStr;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};
use turnstile_rater::{
    cache::SnapshotCache,
    output::{print_pretty, write_station_averages, write_station_json},
    pipeline::{build_raw_series, run_from_series, types::RawSeriesMap},
    report::{all_charts, write_charts},
};

const DEFAULT_CACHE_PATH: &str = "data.json";

#[derive(Parser)]
#[command(name = "turnstile_rater")]
#[command(about = "Rank transit stations by weekday turnstile activity", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute weekday morning/evening averages per station and write chart data
    Analyze {
        /// Raw turnstile file (header line first)
        #[arg(value_name = "FILE")]
        input: String,

        /// Snapshot file for parsed deltas (defaults to $TURNSTILE_CACHE_PATH or data.json)
        #[arg(long)]
        cache: Option<String>,

        /// Ignore any snapshot and do not write one
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Gzip compress the snapshot
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Directory to write CSV results into
        #[arg(short, long, default_value = "output")]
        output_dir: String,

        /// Also dump per-station series and daily sums as JSON
        #[arg(long, default_value_t = false)]
        dump_stages: bool,
    },
    /// Parse the raw file and (re)write the delta snapshot
    Snapshot {
        /// Raw turnstile file (header line first)
        #[arg(value_name = "FILE")]
        input: String,

        /// Snapshot file to write (defaults to $TURNSTILE_CACHE_PATH or data.json)
        #[arg(long)]
        cache: Option<String>,

        /// Gzip compress the snapshot
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
    /// Log the top stations of each chart
    Rank {
        /// Raw turnstile file (header line first)
        #[arg(value_name = "FILE")]
        input: String,

        /// Snapshot file for parsed deltas (defaults to $TURNSTILE_CACHE_PATH or data.json)
        #[arg(long)]
        cache: Option<String>,

        /// Gzip compress the snapshot if one is written
        #[arg(long, default_value_t = false)]
        gzip: bool,

        /// Number of stations to show per chart
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/turnstile_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("turnstile_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            cache,
            no_cache,
            gzip,
            output_dir,
            dump_stages,
        } => {
            let cache = (!no_cache).then(|| snapshot_cache(cache, gzip));
            let series = load_series(&input, cache.as_ref())?;
            let output = run_from_series(&series);
            print_pretty(&output.averages);

            let output_dir = PathBuf::from(output_dir);
            std::fs::create_dir_all(&output_dir)
                .with_context(|| format!("creating {}", output_dir.display()))?;

            write_station_averages(&output_dir.join("station_averages.csv"), &output.averages)?;
            write_charts(&output_dir, &all_charts(&output.averages))?;

            if dump_stages {
                write_station_json(&output_dir.join("per_station.json"), &output.per_station)?;
                write_station_json(&output_dir.join("per_station_sums.json"), &output.sums)?;
            }

            info!(output_dir = %output_dir.display(), "Analysis written");
        }
        Commands::Snapshot { input, cache, gzip } => {
            let cache = snapshot_cache(cache, gzip);
            let series = parse_input(&input)?;
            cache.save(&series)?;
        }
        Commands::Rank {
            input,
            cache,
            gzip,
            top,
        } => {
            let cache = snapshot_cache(cache, gzip);
            let series = load_series(&input, Some(&cache))?;
            let output = run_from_series(&series);

            for chart in all_charts(&output.averages) {
                info!(chart = chart.title, stations = chart.bars.len(), "Ranking");
                for bar in chart.bars.iter().take(top) {
                    info!(rank = bar.rank + 1, station = %bar.label, value = bar.value, "Station");
                }
            }
        }
    }

    Ok(())
}

/// Resolves the snapshot location from the flag, then `$TURNSTILE_CACHE_PATH`.
fn snapshot_cache(path: Option<String>, gzip: bool) -> SnapshotCache {
    let path = path
        .or_else(|| std::env::var("TURNSTILE_CACHE_PATH").ok())
        .unwrap_or_else(|| DEFAULT_CACHE_PATH.to_string());
    SnapshotCache::new(path, gzip)
}

/// Parses the raw file into per-turnstile deltas.
#[tracing::instrument]
fn parse_input(input: &str) -> Result<RawSeriesMap> {
    let file = File::open(input).with_context(|| format!("opening {input}"))?;
    let series =
        build_raw_series(BufReader::new(file)).with_context(|| format!("reading {input}"))?;
    Ok(series)
}

/// Uses the snapshot when one is available, otherwise parses the raw file and saves a snapshot.
fn load_series(input: &str, cache: Option<&SnapshotCache>) -> Result<RawSeriesMap> {
    if let Some(series) = cache.and_then(SnapshotCache::load) {
        return Ok(series);
    }

    let series = parse_input(input)?;

    if let Some(cache) = cache {
        if let Err(e) = cache.save(&series) {
            warn!(error = %e, path = %cache.path().display(), "Failed to save snapshot");
        }
    }

    Ok(series)
}
