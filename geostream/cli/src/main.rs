//! geostream - Batch Geocoder
//!
//! Reads one address per line and prints one geocoded location per line,
//! as soon as each result is available.
//!
//! # Usage
//!
//! ```bash
//! # Geocode a file, results in input order
//! geostream addresses.txt
//!
//! # From stdin, results as they finish, tab-separated
//! cat addresses.txt | geostream --mode completion --format tsv
//!
//! # Higher per-provider concurrency, with a config file
//! geostream --concurrency 8 --config ./geostream.toml addresses.txt
//!
//! # Verbose logging
//! RUST_LOG=debug geostream addresses.txt
//! ```
//!
//! Credentials come from the config file or from `GOOGLE_API_KEY`,
//! `ESRI_CLIENT_ID` and `ESRI_CLIENT_SECRET`.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};

use geostream_core::{
    default_config_path, BatchGeocoder, BridgeStrategy, DeliveryMode, GeocodedLocation,
    GeocoderConfig,
};

/// Geocode a batch of addresses through a provider fallback chain
#[derive(Parser, Debug)]
#[command(name = "geostream")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File with one address per line (reads stdin when omitted)
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Result order: ordered (input order) or completion (finish order)
    #[arg(short = 'm', long, env = "GEOSTREAM_MODE", default_value = "ordered")]
    mode: DeliveryMode,

    /// Maximum in-flight requests per provider
    #[arg(short = 'n', long, value_name = "N")]
    concurrency: Option<usize>,

    /// How results are handed from the async engine: thread or pump
    #[arg(short = 'b', long)]
    bridge: Option<BridgeStrategy>,

    /// Configuration file path
    #[arg(short = 'c', long, env = "GEOSTREAM_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Jsonl)]
    format: OutputFormat,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "GEOSTREAM_LOG_LEVEL", default_value = "info")]
    log_level: String,
}

/// How each location is printed
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// One JSON object per line
    Jsonl,
    /// address, lat, lon, label separated by tabs
    Tsv,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(limit) = args.concurrency {
        config.concurrency_limit = limit;
    }
    if let Some(bridge) = args.bridge {
        config.bridge = bridge;
    }

    let addresses = read_addresses(args.input.as_deref())?;
    if addresses.is_empty() {
        warn!("No addresses to geocode");
        return Ok(());
    }

    let geocoder = BatchGeocoder::from_config(&config).context("Failed to set up geocoder")?;

    let start = Instant::now();
    let total = addresses.len();
    let mut out = BufWriter::new(io::stdout().lock());
    let mut count = 0usize;
    let mut unresolved = 0usize;

    for location in geocoder
        .geocode_batch(addresses, args.mode)
        .context("Failed to start batch")?
    {
        writeln!(out, "{}", format_location(&location, args.format)?)?;
        out.flush()?;

        count += 1;
        if location.is_null_island() {
            unresolved += 1;
        }
    }

    info!(
        count,
        total,
        unresolved,
        elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        mode = %args.mode,
        bridge = %config.bridge,
        "Batch finished"
    );
    for (provider, stats) in geocoder.provider_stats() {
        info!(
            provider = %provider,
            requests = stats.requests,
            successes = stats.successes,
            failures = stats.failures,
            auth_retries = stats.auth_retries,
            peak_in_flight = stats.peak_in_flight,
            "Provider stats"
        );
    }

    Ok(())
}

/// Initialize logging with the specified level; logs go to stderr
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("geostream={level},geostream_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();
}

/// An explicit config file must exist; the default one is optional
fn load_config(path: Option<&Path>) -> Result<GeocoderConfig> {
    match path {
        Some(path) => Ok(GeocoderConfig::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?
            .apply_env_overrides()),
        None => GeocoderConfig::load(default_config_path().as_deref())
            .context("Failed to load default config"),
    }
}

fn read_addresses(input: Option<&Path>) -> Result<Vec<String>> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read addresses from {}", path.display()))?,
        None => io::read_to_string(io::stdin()).context("Failed to read addresses from stdin")?,
    };
    Ok(parse_addresses(&text))
}

/// One address per line; blank lines are skipped
fn parse_addresses(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn format_location(location: &GeocodedLocation, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Jsonl => {
            serde_json::to_string(location).context("Failed to serialize location")
        }
        OutputFormat::Tsv => Ok(format!(
            "{}\t{}\t{}\t{}",
            location.address(),
            location.lat(),
            location.lon(),
            location.label()
        )),
    }
}
