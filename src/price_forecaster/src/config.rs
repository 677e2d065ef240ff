//! Application configuration.
//!
//! Settings are layered, later layers winning:
//! 1. built-in defaults ([`AppConfig::default`])
//! 2. an optional TOML file ([`load_config_path`])
//! 3. `PRICE_FORECASTER_*` environment variables ([`AppConfig::apply_env`])
//! 4. command-line flags ([`ConfigOverrides`])
//!
//! [`resolve_config`] applies all of them in that order.
//!
//! ```toml
//! model_path = "models/best_arima_model.bin"
//! symbol = "MSFT"
//! lookback_days = 120
//! provider = "alpaca"
//! request_timeout_secs = 15
//!
//! [retry]
//! max_retries = 5
//! base_delay_ms = 500
//! ```

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use market_data_ingestor::providers::{ProviderKind, ProviderSettings};
use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_var, parse_env_var};
use tracing::debug;

use crate::{
    errors::ConfigError,
    workflow::{DEFAULT_LOOKBACK_DAYS, DEFAULT_SYMBOL, PredictionRequest, RetryPolicy},
};

/// Model artifact looked up in the working directory by default.
pub const DEFAULT_MODEL_PATH: &str = "best_arima_model.bin";

/// Overrides [`AppConfig::model_path`].
pub const ENV_MODEL_PATH: &str = "PRICE_FORECASTER_MODEL";
/// Overrides [`AppConfig::symbol`].
pub const ENV_SYMBOL: &str = "PRICE_FORECASTER_SYMBOL";
/// Overrides [`AppConfig::lookback_days`].
pub const ENV_LOOKBACK_DAYS: &str = "PRICE_FORECASTER_LOOKBACK_DAYS";
/// Overrides [`AppConfig::provider`].
pub const ENV_PROVIDER: &str = "PRICE_FORECASTER_PROVIDER";

/// Everything the binary needs to run one prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Location of the model artifact.
    pub model_path: PathBuf,
    /// Instrument to predict.
    pub symbol: String,
    /// Trailing history window in calendar days.
    pub lookback_days: u32,
    /// Market data source.
    pub provider: ProviderKind,
    /// Per-request HTTP timeout.
    pub request_timeout_secs: u64,
    /// Backoff around the history request.
    pub retry: RetryPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            symbol: DEFAULT_SYMBOL.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            provider: ProviderKind::default(),
            request_timeout_secs: 10,
            retry: RetryPolicy::default(),
        }
    }
}

/// Explicit values for the top layer, typically from command-line flags.
///
/// `None` keeps whatever the lower layers settled on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub model_path: Option<PathBuf>,
    pub symbol: Option<String>,
    pub lookback_days: Option<u32>,
    pub provider: Option<ProviderKind>,
    pub max_retries: Option<u32>,
    pub base_delay_ms: Option<u64>,
}

impl AppConfig {
    /// Applies `PRICE_FORECASTER_*` overrides from the process environment.
    ///
    /// Unset and empty variables leave the current value alone.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(path) = get_env_var(ENV_MODEL_PATH) {
            self.model_path = PathBuf::from(path);
        }
        if let Ok(symbol) = get_env_var(ENV_SYMBOL) {
            self.symbol = symbol.trim().to_string();
        }
        if let Some(days) = parse_env_var::<u32>(ENV_LOOKBACK_DAYS)? {
            self.lookback_days = days;
        }
        if let Some(provider) = parse_env_var::<ProviderKind>(ENV_PROVIDER)? {
            self.provider = provider;
        }
        Ok(())
    }

    /// Applies the values set in `overrides`.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(model_path) = overrides.model_path {
            self.model_path = model_path;
        }
        if let Some(symbol) = overrides.symbol {
            self.symbol = symbol.trim().to_string();
        }
        if let Some(days) = overrides.lookback_days {
            self.lookback_days = days;
        }
        if let Some(provider) = overrides.provider {
            self.provider = provider;
        }
        if let Some(max_retries) = overrides.max_retries {
            self.retry.max_retries = max_retries;
        }
        if let Some(base_delay_ms) = overrides.base_delay_ms {
            self.retry.base_delay_ms = base_delay_ms;
        }
    }

    /// Rejects settings no prediction could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.symbol.trim().is_empty() {
            return Err(ConfigError::Invalid("symbol must not be empty".into()));
        }
        if self.lookback_days == 0 {
            return Err(ConfigError::Invalid("lookback_days must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }

    /// The prediction request described by this configuration.
    pub fn prediction_request(&self) -> PredictionRequest {
        PredictionRequest::new(self.symbol.trim())
            .with_lookback_days(self.lookback_days)
            .with_retry(self.retry)
    }

    /// HTTP settings for the market data provider.
    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }
}

/// Parses a configuration from a TOML string. Missing keys keep their defaults.
pub fn load_config_str(toml_str: &str) -> Result<AppConfig, toml::de::Error> {
    toml::from_str(toml_str)
}

/// Reads and parses a TOML configuration file.
pub fn load_config_path(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config = load_config_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

/// Builds the effective configuration: defaults, then the file at `path`
/// (if any), then the environment, then `overrides`; the result is validated.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config_path(path)?,
        None => AppConfig::default(),
    };
    config.apply_env()?;
    config.apply_overrides(overrides);
    config.validate()?;
    Ok(config)
}
