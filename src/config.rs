//! Configuration management for the `LoungeMap` application
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::LoungeMapError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure for the `LoungeMap` application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoungeMapConfig {
    /// Lounge listing source configuration
    #[serde(default)]
    pub source: SourceConfig,
    /// Name-resolution configuration
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Worker pool configuration
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Page cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Listing source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the listing site
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Path of the airport index page under the base URL
    #[serde(default = "default_index_path")]
    pub index_path: String,
    /// URL of the airport reference dataset download
    #[serde(default = "default_reference_url")]
    pub reference_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
    /// Maximum number of retries for failed requests
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// User agent presented to the listing site
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Name-resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Acceptance threshold for name-based resolution, in (0, 1]
    #[serde(default = "default_name_match_threshold")]
    pub name_match_threshold: f64,
}

/// Worker pool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of concurrent fetch workers
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Optional cap on airport pages processed (quick test runs)
    #[serde(default)]
    pub max_airports: Option<usize>,
}

/// Page cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether fetched pages are cached on disk
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Cache TTL in hours
    #[serde(default = "default_cache_ttl")]
    pub ttl_hours: u32,
    /// Cache directory; empty means the platform cache directory
    #[serde(default)]
    pub location: String,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

// Default value functions
fn default_base_url() -> String {
    "https://www.prioritypass.com".to_string()
}

fn default_index_path() -> String {
    "/airport-lounges".to_string()
}

fn default_reference_url() -> String {
    crate::airports::OURAIRPORTS_CSV_URL.to_string()
}

fn default_timeout() -> u32 {
    45
}

fn default_max_retries() -> u32 {
    3
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
        .to_string()
}

fn default_name_match_threshold() -> f64 {
    0.82
}

fn default_workers() -> usize {
    10
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl() -> u32 {
    24
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            index_path: default_index_path(),
            reference_url: default_reference_url(),
            timeout_seconds: default_timeout(),
            max_retries: default_max_retries(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            name_match_threshold: default_name_match_threshold(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_airports: None,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_hours: default_cache_ttl(),
            location: String::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for LoungeMapConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            matching: MatchingConfig::default(),
            pipeline: PipelineConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Resolve the cache directory, falling back to the platform cache dir
    #[must_use]
    pub fn resolved_location(&self) -> PathBuf {
        if self.location.is_empty() {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("loungemap")
        } else {
            PathBuf::from(&self.location)
        }
    }
}

impl LoungeMapConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        // Load from file if path is provided or use default location
        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // Add environment variable overrides with LOUNGEMAP_ prefix
        builder = builder.add_source(
            Environment::with_prefix("LOUNGEMAP")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: LoungeMapConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("loungemap").join("config.toml"))
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.source.timeout_seconds == 0 || self.source.timeout_seconds > 300 {
            return Err(LoungeMapError::config(
                "Fetch timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        if self.source.max_retries > 10 {
            return Err(LoungeMapError::config("Max retries cannot exceed 10").into());
        }

        if self.pipeline.workers == 0 || self.pipeline.workers > 64 {
            return Err(LoungeMapError::config(
                "Worker pool size must be between 1 and 64",
            )
            .into());
        }

        if self.matching.name_match_threshold <= 0.0 || self.matching.name_match_threshold > 1.0 {
            return Err(LoungeMapError::config(
                "Name match threshold must be in (0, 1]",
            )
            .into());
        }

        if self.cache.ttl_hours > 720 {
            return Err(
                LoungeMapError::config("Cache TTL cannot exceed 720 hours (30 days)").into(),
            );
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(LoungeMapError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(LoungeMapError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.source.base_url.starts_with("http://")
            && !self.source.base_url.starts_with("https://")
        {
            return Err(LoungeMapError::config(
                "Listing source base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if !self.source.index_path.starts_with('/') {
            return Err(
                LoungeMapError::config("Index path must start with a slash").into(),
            );
        }

        Ok(())
    }
}
