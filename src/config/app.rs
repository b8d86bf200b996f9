//! Main application configuration
//!
//! This module defines the primary configuration structures for the
//! collector and the leaderboard server, including environment variable
//! loading, TOML file loading, and validation.

use crate::config::rating::RatingConfig;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Pickup site this process collects for (e.g. "tf2pickup.fi")
    pub site: String,
    /// Postgres connection string for the rating ledger
    pub database_url: String,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub source: SourceSettings,
    #[serde(default)]
    pub rating: RatingConfig,
}

/// Remote match listing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSettings {
    /// Page size for the remote games listing
    pub page_size: usize,
    /// Minimum number of matches to accumulate per run before stopping
    /// early; the fetch always stops at the listing's final page
    pub batch_limit: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            page_size: 200,
            batch_limit: 1000,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            log_level: default_log_level(),
            ..Self::default()
        };

        if let Ok(site) = env::var("PICKUP_SITE") {
            config.site = site;
        }
        if let Ok(url) = env::var("DATABASE_URL") {
            config.database_url = url;
        }
        if let Ok(log_level) = env::var("LOG_LEVEL") {
            config.log_level = log_level;
        }
        if let Ok(page_size) = env::var("SOURCE_PAGE_SIZE") {
            config.source.page_size = page_size
                .parse()
                .map_err(|_| anyhow!("Invalid SOURCE_PAGE_SIZE value: {}", page_size))?;
        }
        if let Ok(batch_limit) = env::var("SOURCE_BATCH_LIMIT") {
            config.source.batch_limit = batch_limit
                .parse()
                .map_err(|_| anyhow!("Invalid SOURCE_BATCH_LIMIT value: {}", batch_limit))?;
        }
        if let Ok(prior) = env::var("RATING_PRIOR") {
            config.rating.prior_rating = prior
                .parse()
                .map_err(|_| anyhow!("Invalid RATING_PRIOR value: {}", prior))?;
        }

        Ok(config)
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}

/// Validate configuration values
pub fn validate_config(config: &AppConfig) -> Result<()> {
    match config.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        _ => return Err(anyhow!("Invalid log level: {}", config.log_level)),
    }

    if config.site.is_empty() {
        return Err(anyhow!("Pickup site cannot be empty"));
    }
    if config.database_url.is_empty() {
        return Err(anyhow!("Database URL cannot be empty"));
    }

    if config.source.page_size == 0 {
        return Err(anyhow!("Source page size must be greater than 0"));
    }
    if config.source.batch_limit == 0 {
        return Err(anyhow!("Source batch limit must be greater than 0"));
    }

    if config.rating.prior_rating <= 0.0 {
        return Err(anyhow!("Rating prior must be positive"));
    }
    if config.rating.classes.is_empty() {
        return Err(anyhow!("Supported class list cannot be empty"));
    }

    Ok(())
}
