//! Main entry point for the match collector
//!
//! One invocation reads the site's cursor, ingests every newer match, and
//! exits. Scheduling repeated runs is the operator's job; re-running after
//! any failure is safe because the collector resumes from the cursor.

use anyhow::Result;
use clap::Parser;
use pickup_ratings::collector::MatchCollector;
use pickup_ratings::config::{validate_config, AppConfig};
use pickup_ratings::ledger::PostgresLedger;
use pickup_ratings::rating::{RatingEngineConfig, WengLinRatingCalculator};
use pickup_ratings::source::HttpMatchSource;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

/// Pickup Ratings Collector - per-class skill ratings from pickup matches
#[derive(Parser)]
#[command(
    name = "match-collector",
    version,
    about = "Ingests finished pickup matches and updates per-class skill ratings",
    long_about = "The match collector fetches finished matches from a tf2pickup-style site, \
                 classifies their state, and folds every ended match into persistent \
                 Weng-Lin (OpenSkill) skill beliefs per player and class. Runs are \
                 incremental and safe to repeat."
)]
struct Args {
    /// Configuration file path
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Pickup site override
    #[arg(short, long, value_name = "SITE", help = "Pickup site to collect for")]
    site: Option<String>,

    /// Database URL override
    #[arg(
        long,
        value_name = "URL",
        help = "Postgres connection string for the rating ledger"
    )]
    database_url: Option<String>,

    /// Page size override
    #[arg(long, value_name = "N", help = "Page size for the remote games listing")]
    page_size: Option<usize>,

    /// Batch limit override
    #[arg(
        long,
        value_name = "N",
        help = "Minimum number of matches to accumulate per run"
    )]
    batch_limit: Option<usize>,

    /// Log level override
    #[arg(
        short,
        long,
        value_name = "LEVEL",
        help = "Override log level (trace, debug, info, warn, error)"
    )]
    log_level: Option<String>,

    /// Dry run mode (validate config and exit)
    #[arg(long, help = "Validate configuration and exit without collecting")]
    dry_run: bool,
}

/// Initialize structured logging with the configured level
fn init_logging(log_level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}

/// Wait for shutdown signals (SIGINT, SIGTERM)
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C) signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

/// Display startup banner with collector information
fn display_startup_banner(config: &AppConfig) {
    info!("Pickup Ratings Collector");
    info!("   Site: {}", config.site);
    info!("   Log level: {}", config.log_level);
    info!("   Page size: {}", config.source.page_size);
    info!("   Batch limit: {}", config.source.batch_limit);
    info!("   Rating prior: {}", config.rating.prior_rating);
    info!("   Classes: {}", config.rating.classes.join(", "));
}

/// Load and merge configuration from file, environment, and CLI arguments
fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path)?
    } else {
        AppConfig::from_env()?
    };

    // Apply CLI overrides
    if let Some(site) = &args.site {
        config.site = site.clone();
    }

    if let Some(database_url) = &args.database_url {
        config.database_url = database_url.clone();
    }

    if let Some(page_size) = args.page_size {
        config.source.page_size = page_size;
    }

    if let Some(batch_limit) = args.batch_limit {
        config.source.batch_limit = batch_limit;
    }

    if let Some(log_level) = &args.log_level {
        config.log_level = log_level.clone();
    }

    validate_config(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(&args).unwrap_or_else(|e| {
        eprintln!("Configuration error: {}", e);
        std::process::exit(1);
    });

    if let Err(e) = init_logging(&config.log_level) {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    if args.dry_run {
        info!("Configuration validation successful");
        display_startup_banner(&config);
        info!("Dry run completed - exiting without collecting");
        return Ok(());
    }

    display_startup_banner(&config);

    let ledger = Arc::new(PostgresLedger::connect(&config.database_url).await?);
    let source = Arc::new(HttpMatchSource::new(
        &config.site,
        config.source.page_size,
    )?);
    let calculator = Arc::new(WengLinRatingCalculator::new(RatingEngineConfig::from(
        &config.rating,
    ))?);

    let collector = MatchCollector::new(
        config.site.clone(),
        ledger,
        source,
        calculator,
        config.rating.clone(),
        config.source.batch_limit,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    info!("collecting matches");

    match collector.collect_matches(&shutdown_rx).await {
        Ok(stats) => {
            info!(
                fetched = stats.matches_fetched,
                recorded = stats.matches_recorded,
                rated = stats.matches_rated,
                players_created = stats.players_created,
                ratings_updated = stats.ratings_updated,
                "collection run complete"
            );
            Ok(())
        }
        Err(e) => {
            error!("collection run failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
