use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use loungemap::airports::{self, AirportIndex};
use loungemap::cache::PageCache;
use loungemap::config::LoungeMapConfig;
use loungemap::emitter;
use loungemap::listings::PriorityPassClient;
use loungemap::pipeline::{self, PipelineOptions};

/// Scrape Priority Pass lounge listings, reconcile them against the
/// worldwide airport dataset, and build an interactive lounge map.
#[derive(Parser, Debug)]
#[command(name = "loungemap", version)]
struct Cli {
    /// Output directory for map and data artifacts
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,

    /// Concurrent fetch worker count
    #[arg(long)]
    workers: Option<usize>,

    /// Limit the number of airport pages processed (for quick test runs)
    #[arg(long)]
    max_airports: Option<usize>,

    /// Restrict the run to one or more country slugs (repeatable)
    #[arg(long = "region", value_name = "SLUG")]
    regions: Vec<String>,

    /// Local airport reference CSV to use instead of downloading one
    #[arg(long, value_name = "PATH")]
    airports_csv: Option<PathBuf>,

    /// Configuration file path
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Disable the persistent page cache
    #[arg(long)]
    no_cache: bool,

    /// Verbose (debug) logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = LoungeMapConfig::load_from_path(cli.config.clone())
        .with_context(|| "Failed to load configuration")?;
    if let Some(workers) = cli.workers {
        config.pipeline.workers = workers;
    }
    if cli.max_airports.is_some() {
        config.pipeline.max_airports = cli.max_airports;
    }
    config.validate()?;

    init_tracing(&config, cli.verbose);
    info!("LoungeMap {} starting", loungemap::VERSION);

    std::fs::create_dir_all(&cli.output_dir).with_context(|| {
        format!("Failed to create output directory {}", cli.output_dir.display())
    })?;

    let mut client = PriorityPassClient::new(&config.source)?;
    if config.cache.enabled && !cli.no_cache {
        match PageCache::open(config.cache.resolved_location()) {
            Ok(cache) => {
                let ttl = Duration::from_secs(u64::from(config.cache.ttl_hours) * 3600);
                client = client.with_cache(Arc::new(cache), ttl);
            }
            Err(e) => warn!("Running without page cache: {e}"),
        }
    }

    info!("[1/4] Loading airport reference table...");
    let airport_rows = match &cli.airports_csv {
        Some(path) => airports::load_reference_file(path)?,
        None => {
            let body = client.fetch_text(&config.source.reference_url).await?;
            airports::parse_reference(body.as_bytes())?
        }
    };
    let index = AirportIndex::build(airport_rows);

    let cancel = CancellationToken::new();
    let cancel_hook = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; letting in-flight fetches finish");
            cancel_hook.cancel();
        }
    });

    info!("[2/4] Fetching and reconciling lounge listings...");
    let options = PipelineOptions {
        workers: config.pipeline.workers,
        max_airports: config.pipeline.max_airports,
        regions: cli.regions.clone(),
        name_match_threshold: config.matching.name_match_threshold,
    };
    let outcome = pipeline::run(&client, &index, &options, cancel).await?;

    info!("[3/4] Writing map and data artifacts...");
    let listing_source = format!(
        "{}{}",
        config.source.base_url.trim_end_matches('/'),
        config.source.index_path
    );
    let artifacts = emitter::write_artifacts(
        &cli.output_dir,
        &outcome,
        &listing_source,
        &config.source.reference_url,
    )?;

    info!("[4/4] Done");
    println!("Map: {}", artifacts.map_html.display());
    println!("Data: {}", artifacts.airports_csv.display());
    println!(
        "Airports with lounges: {} ({} unresolved records)",
        outcome.airports.len(),
        outcome.unresolved.len()
    );
    Ok(())
}

fn init_tracing(config: &LoungeMapConfig, verbose: bool) {
    let level = if verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if config.logging.format == "json" {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
