use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError};

use crate::ml::Tier;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
const DEFAULT_HORIZON_DAYS: u32 = 1;
const DEFAULT_FEED_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_MAX_CONCURRENT_PREDICTIONS: usize = 8;

/// Forecasting configuration
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ForecastingConfig {
    /// Days of history pulled for the linear-regression tier
    #[serde(default = "default_simple_lookback_days")]
    #[validate(range(min = 7, max = 3650))]
    pub simple_lookback_days: u32,

    /// Days of history pulled for the random-forest tier
    #[serde(default = "default_advanced_lookback_days")]
    #[validate(range(min = 14, max = 3650))]
    pub advanced_lookback_days: u32,

    /// How many days after today the forecast targets
    #[serde(default = "default_horizon_days")]
    #[validate(range(min = 0, max = 365))]
    pub default_horizon_days: u32,

    /// Upper bound on a single sales-feed read, in milliseconds
    #[serde(default = "default_feed_timeout_ms")]
    #[validate(range(min = 1, max = 300000))]
    pub feed_timeout_ms: u64,

    /// Items forecast in parallel by a batch prediction
    #[serde(default = "default_max_concurrent_predictions")]
    #[validate(range(min = 1, max = 256))]
    pub max_concurrent_predictions: usize,

    /// Per-item baseline quantities layered over the built-in table
    #[serde(default)]
    pub baseline_overrides: HashMap<String, u32>,
}

impl Default for ForecastingConfig {
    fn default() -> Self {
        Self {
            simple_lookback_days: default_simple_lookback_days(),
            advanced_lookback_days: default_advanced_lookback_days(),
            default_horizon_days: default_horizon_days(),
            feed_timeout_ms: default_feed_timeout_ms(),
            max_concurrent_predictions: default_max_concurrent_predictions(),
            baseline_overrides: HashMap::new(),
        }
    }
}

impl ForecastingConfig {
    pub fn feed_timeout(&self) -> Duration {
        Duration::from_millis(self.feed_timeout_ms)
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment (development, production, etc.)
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// JSON file of menu items and transactions loaded into the in-memory feed
    #[serde(default)]
    pub seed_file: Option<PathBuf>,

    #[serde(default)]
    #[validate]
    pub forecasting: ForecastingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            environment: DEFAULT_ENV.to_string(),
            log_level: default_log_level(),
            log_json: false,
            seed_file: None,
            forecasting: ForecastingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Cross-field checks the derive cannot express
    pub fn validate_additional_constraints(&self) -> Result<(), validator::ValidationErrors> {
        let mut errors = validator::ValidationErrors::new();
        if self.forecasting.advanced_lookback_days < self.forecasting.simple_lookback_days {
            let mut err = ValidationError::new("advanced_lookback_days");
            err.message = Some(
                "advanced_lookback_days must be at least simple_lookback_days".into(),
            );
            errors.add("forecasting", err);
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_simple_lookback_days() -> u32 {
    Tier::Simple.default_lookback_days()
}

fn default_advanced_lookback_days() -> u32 {
    Tier::Advanced.default_lookback_days()
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

fn default_feed_timeout_ms() -> u64 {
    DEFAULT_FEED_TIMEOUT_MS
}

fn default_max_concurrent_predictions() -> usize {
    DEFAULT_MAX_CONCURRENT_PREDICTIONS
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("smartpos_forecast={},tower_http=debug", level);
    let filter = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .map(EnvFilter::new)
        .unwrap_or_else(|| EnvFilter::new(default_directive));

    if json {
        let _ = fmt().with_env_filter(filter).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter).try_init();
    }
}

/// Loads application configuration from `./config`
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    load_config_from(CONFIG_DIR)
}

/// Same as [`load_config`] with an explicit config directory.
pub fn load_config_from(config_dir: impl AsRef<Path>) -> Result<AppConfig, AppConfigError> {
    let config_dir = config_dir.as_ref();
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !config_dir.exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            config_dir.display()
        );
    }

    let config = Config::builder()
        .set_default("host", DEFAULT_HOST)?
        .set_default("port", i64::from(DEFAULT_PORT))?
        .set_default("environment", run_env.as_str())?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", config_dir.display())).required(false))
        .add_source(
            File::with_name(&format!("{}/{}", config_dir.display(), run_env)).required(false),
        )
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
