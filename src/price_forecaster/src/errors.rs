use std::path::PathBuf;

use market_data_ingestor::providers::ProviderError;
use thiserror::Error;

/// Errors raised while reading or writing a model artifact.
#[derive(Debug, Error)]
pub enum ArtifactError {
    /// No file exists at the given path.
    #[error("Model artifact not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The file exists but could not be read or written.
    #[error("I/O error on model artifact {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file does not start with the artifact magic bytes.
    #[error("{} is not a model artifact (missing format header)", path.display())]
    BadMagic { path: PathBuf },

    /// The artifact was written by an incompatible format version.
    #[error("Unsupported model artifact format version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// The payload could not be decoded into a model.
    #[error("Failed to deserialize model artifact: {0}")]
    Deserialize(String),

    /// The model could not be encoded.
    #[error("Failed to serialize model artifact: {0}")]
    Serialize(String),

    /// The payload decoded but describes an unusable model.
    #[error("Model artifact holds an invalid model")]
    InvalidModel(#[source] ForecastError),
}

impl ArtifactError {
    pub(crate) fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound { path }
        } else {
            ArtifactError::Io { path, source }
        }
    }
}

/// Errors raised by a [`Forecaster`](crate::model::Forecaster).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// A model parameter is out of range or inconsistent.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// The stored history is too short for the model order.
    #[error("Insufficient history: need {required} observations, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// The model returned a different number of values than requested.
    #[error("Expected {expected} forecast value(s), model returned {actual}")]
    UnexpectedLength { expected: usize, actual: usize },

    /// The model produced NaN or an infinity.
    #[error("Forecast produced a non-finite value: {0}")]
    NonFinite(f64),

    /// Any other failure inside a forecasting backend.
    #[error("Forecast backend error: {0}")]
    Backend(String),
}

/// Errors raised by [`predict_next_day`](crate::workflow::predict_next_day).
#[derive(Debug, Error)]
pub enum PredictionError {
    /// The request was rejected before any data was fetched.
    #[error("Invalid prediction request: {0}")]
    InvalidRequest(String),

    /// Historical prices could not be obtained or were unusable.
    #[error("Historical data unavailable for {symbol}: {reason}")]
    DataUnavailable {
        symbol: String,
        reason: String,
        #[source]
        source: Option<ProviderError>,
    },

    /// The model failed to produce a usable one-step forecast.
    #[error("Forecast failed")]
    Forecast(#[from] ForecastError),

    /// The current price cannot serve as a percentage baseline.
    #[error("Percentage change is undefined for a current price of {current_price}")]
    DivisionUndefined { current_price: f64 },
}

impl PredictionError {
    pub(crate) fn data_unavailable(symbol: &str, reason: impl Into<String>) -> Self {
        PredictionError::DataUnavailable {
            symbol: symbol.to_string(),
            reason: reason.into(),
            source: None,
        }
    }
}

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`AppConfig`](crate::config::AppConfig).
    #[error("Failed to parse config file {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// An environment override holds an unparsable value.
    #[error(transparent)]
    InvalidEnv(#[from] shared_utils::env::InvalidEnvVarError),

    /// A setting is present but unusable.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
