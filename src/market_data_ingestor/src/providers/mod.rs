//! Provider abstraction for market data sources.
//!
//! This module defines the [`DataProvider`] trait, which serves as a unified interface
//! for fetching time-series bar data from any market data vendor (e.g., Alpaca, Yahoo).
//!
//! Each concrete provider implements [`DataProvider`] to handle vendor-specific API
//! logic and validation. The trait supports dynamic dispatch (`dyn DataProvider`), and
//! [`build_provider`] maps a [`ProviderKind`] to a boxed instance at runtime.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use market_data_ingestor::models::{bar::BarSeries, request_params::BarsRequestParams};
//! use market_data_ingestor::providers::{DataProvider, ProviderError};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl DataProvider for MyProvider {
//!     async fn fetch_bars(
//!         &self,
//!         _params: BarsRequestParams,
//!     ) -> Result<Vec<BarSeries>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod alpaca_rest;
pub mod yahoo_chart;

use std::{fmt, str::FromStr, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_utils::env::MissingEnvVarError;
use snafu::{Backtrace, Snafu};

use crate::models::{bar::BarSeries, request_params::BarsRequestParams};

/// Trait for fetching time-series bar data from a market data provider.
#[async_trait]
pub trait DataProvider: Send + Sync {
    /// Fetches time-series bar data for the given request parameters.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<BarSeries>)` - One bar series per symbol that returned data,
    ///   each ordered oldest to newest.
    /// * `Err(ProviderError)` - If the request fails or the response is unusable.
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError>;
}

/// Errors that can occur during the creation of a provider instance
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderInitError {
    /// missed environment variable.
    #[snafu(display("Missing environment variable: {source}"))]
    MissingEnvVar {
        source: MissingEnvVarError,
        backtrace: Backtrace,
    },

    /// failed to init reqwest client
    #[snafu(display("Failed to build HTTP client: {source}"))]
    ClientBuild {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The configured endpoint is not a usable base URL.
    #[snafu(display("Invalid base URL {url:?}: {reason}"))]
    InvalidBaseUrl {
        url: String,
        reason: String,
        backtrace: Backtrace,
    },

    /// API key contains invalid characters.
    #[snafu(display("Invalid API key format: {source}"))]
    InvalidApiKey {
        source: reqwest::header::InvalidHeaderValue,
        backtrace: Backtrace,
    },
}

/// Errors that can occur within a `DataProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API answered with an error status or error payload.
    #[snafu(display("API error (HTTP {status}): {message}"))]
    Api {
        status: u16,
        message: String,
        backtrace: Backtrace,
    },

    /// The request parameters were invalid for this specific provider.
    #[snafu(display("Invalid parameters for provider: {message}"))]
    Validation {
        message: String,
        backtrace: Backtrace,
    },

    /// The response body could not be decoded into the provider's schema.
    #[snafu(display("Malformed provider response: {source}"))]
    Decode {
        source: serde_json::Error,
        backtrace: Backtrace,
    },

    /// An internal error occurred while processing data within the provider.
    #[snafu(display("Internal provider error: {message}"))]
    Internal {
        message: String,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    /// Whether retrying the same request may succeed.
    ///
    /// Transport failures, timeouts, rate limiting and 5xx answers are
    /// transient; everything else will fail the same way again.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Reqwest { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ProviderError::Api { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

/// Knobs shared by every HTTP-backed provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSettings {
    /// Upper bound for a single HTTP request, connect included.
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

/// The concrete providers this crate ships.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Yahoo Finance chart API, no credentials required.
    #[default]
    Yahoo,
    /// Alpaca market data v2, keys read from the environment.
    Alpaca,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Yahoo => f.write_str("yahoo"),
            ProviderKind::Alpaca => f.write_str("alpaca"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "yahoo" => Ok(ProviderKind::Yahoo),
            "alpaca" => Ok(ProviderKind::Alpaca),
            other => Err(format!(
                "unknown provider `{other}` (expected `yahoo` or `alpaca`)"
            )),
        }
    }
}

/// Build and return a boxed data provider corresponding to the supplied kind.
pub fn build_provider(
    kind: ProviderKind,
    settings: &ProviderSettings,
) -> Result<Box<dyn DataProvider>, ProviderInitError> {
    match kind {
        ProviderKind::Yahoo => Ok(Box::new(yahoo_chart::YahooChartProvider::new(settings)?)),
        ProviderKind::Alpaca => Ok(Box::new(alpaca_rest::AlpacaProvider::new(settings)?)),
    }
}
