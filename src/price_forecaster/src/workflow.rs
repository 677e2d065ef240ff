//! The next-day prediction pipeline.
//!
//! 1. fetch a trailing window of daily bars for the symbol
//! 2. ask the model for exactly one step ahead
//! 3. derive change and percentage change against the latest close
//!
//! Only step 1 touches the network and only step 1 is retried.

use std::time::Duration;

use chrono::Utc;
use market_data_ingestor::{
    models::{bar::BarSeries, request_params::BarsRequestParams},
    providers::DataProvider,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    errors::{ForecastError, PredictionError},
    model::Forecaster,
    result::PredictionResult,
};

/// Symbol used when nothing else is configured.
pub const DEFAULT_SYMBOL: &str = "AAPL";

/// Calendar days of history requested when nothing else is configured.
pub const DEFAULT_LOOKBACK_DAYS: u32 = 100;

/// Longest single wait between two attempts.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bounded exponential backoff around the market data request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Retries after the first attempt; `0` disables retrying.
    pub max_retries: u32,
    /// Delay before the first retry, doubled for each further one.
    pub base_delay_ms: u64,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
        }
    }

    /// Delay before retry number `attempt` (zero based), capped at
    /// [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor)).min(MAX_RETRY_DELAY)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

/// Parameters of one prediction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionRequest {
    /// Instrument to predict, without surrounding whitespace.
    pub symbol: String,
    /// Size of the trailing history window in calendar days.
    ///
    /// Only bounds the data request; the model is not refit on it.
    pub lookback_days: u32,
    /// Retry behaviour for the history request.
    pub retry: RetryPolicy,
}

impl PredictionRequest {
    /// A request for `symbol` with the default window and retry policy.
    ///
    /// Surrounding whitespace is stripped from the symbol.
    pub fn new(symbol: impl Into<String>) -> Self {
        let symbol: String = symbol.into();
        Self {
            symbol: symbol.trim().to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the lookback window.
    pub fn with_lookback_days(mut self, lookback_days: u32) -> Self {
        self.lookback_days = lookback_days;
        self
    }

    /// Overrides the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn validate(&self) -> Result<(), PredictionError> {
        if self.symbol.trim().is_empty() {
            return Err(PredictionError::InvalidRequest(
                "symbol must not be empty".to_string(),
            ));
        }
        if self.symbol.trim() != self.symbol {
            return Err(PredictionError::InvalidRequest(format!(
                "symbol {:?} has surrounding whitespace",
                self.symbol
            )));
        }
        if self.lookback_days == 0 {
            return Err(PredictionError::InvalidRequest(
                "lookback_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Predicts the next close for `request.symbol`.
///
/// # Errors
///
/// * [`PredictionError::InvalidRequest`] - empty or padded symbol, or zero lookback; nothing fetched
/// * [`PredictionError::DataUnavailable`] - the provider failed (after retries) or
///   returned no usable bars for the symbol
/// * [`PredictionError::Forecast`] - the model failed or did not return exactly one value
/// * [`PredictionError::DivisionUndefined`] - the latest close is zero
#[instrument(
    skip(model, provider, request),
    fields(symbol = %request.symbol, lookback_days = request.lookback_days)
)]
pub async fn predict_next_day(
    model: &dyn Forecaster,
    provider: &dyn DataProvider,
    request: &PredictionRequest,
) -> Result<PredictionResult, PredictionError> {
    request.validate()?;

    let series = fetch_history(provider, request).await?;
    let current_price = latest_close(&request.symbol, &series)?;
    debug!(bars = series.bars.len(), current_price, "history retrieved");

    let predicted_price = forecast_one_step(model)?;
    let result = PredictionResult::from_prices(&request.symbol, current_price, predicted_price)?;

    info!(
        current_price = result.current_price,
        predicted_price = result.predicted_price,
        change_percent = result.change_percent,
        "prediction complete"
    );
    Ok(result)
}

async fn fetch_history(
    provider: &dyn DataProvider,
    request: &PredictionRequest,
) -> Result<BarSeries, PredictionError> {
    let symbol = request.symbol.as_str();
    let mut attempt = 0;

    loop {
        let params = BarsRequestParams::trailing_days(symbol, request.lookback_days, Utc::now());

        match provider.fetch_bars(params).await {
            Ok(series) => return select_series(symbol, series),
            Err(err) if err.is_transient() && attempt < request.retry.max_retries => {
                let delay = request.retry.delay_for(attempt);
                attempt += 1;
                warn!(
                    attempt,
                    max_retries = request.retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "market data request failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                return Err(PredictionError::DataUnavailable {
                    symbol: symbol.to_string(),
                    reason: format!("market data request failed after {} attempt(s)", attempt + 1),
                    source: Some(err),
                });
            }
        }
    }
}

fn select_series(symbol: &str, series: Vec<BarSeries>) -> Result<BarSeries, PredictionError> {
    let selected = series
        .into_iter()
        .find(|s| s.symbol.eq_ignore_ascii_case(symbol))
        .ok_or_else(|| PredictionError::data_unavailable(symbol, "provider returned no series"))?;

    if selected.is_empty() {
        return Err(PredictionError::data_unavailable(
            symbol,
            "provider returned an empty series",
        ));
    }
    Ok(selected)
}

fn latest_close(symbol: &str, series: &BarSeries) -> Result<f64, PredictionError> {
    match series.last_close() {
        Some(close) if close.is_finite() => Ok(close),
        Some(close) => Err(PredictionError::data_unavailable(
            symbol,
            format!("latest close is not a number ({close})"),
        )),
        None => Err(PredictionError::data_unavailable(
            symbol,
            "provider returned an empty series",
        )),
    }
}

fn forecast_one_step(model: &dyn Forecaster) -> Result<f64, PredictionError> {
    let values = model.forecast(1)?;
    match values.as_slice() {
        [value] if value.is_finite() => Ok(*value),
        [value] => Err(ForecastError::NonFinite(*value).into()),
        other => Err(ForecastError::UnexpectedLength {
            expected: 1,
            actual: other.len(),
        }
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec<f64>);

    impl Forecaster for Fixed {
        fn forecast(&self, _steps: usize) -> Result<Vec<f64>, ForecastError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 250,
        };
        assert_eq!(policy.delay_for(0), Duration::from_millis(250));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(7), Duration::from_millis(32_000));
        assert_eq!(policy.delay_for(8), MAX_RETRY_DELAY);
        assert_eq!(policy.delay_for(80), MAX_RETRY_DELAY);
        assert_eq!(RetryPolicy::none().delay_for(5), Duration::ZERO);

        let huge = RetryPolicy {
            max_retries: u32::MAX,
            base_delay_ms: u64::MAX,
        };
        assert_eq!(huge.delay_for(0), MAX_RETRY_DELAY);
    }

    #[test]
    fn request_validation() {
        assert!(PredictionRequest::new("AAPL").validate().is_ok());

        let padded = PredictionRequest::new(" AAPL\t");
        assert_eq!(padded.symbol, "AAPL");
        assert!(padded.validate().is_ok());

        let literal = PredictionRequest {
            symbol: " AAPL".to_string(),
            ..PredictionRequest::new("AAPL")
        };
        assert!(matches!(
            literal.validate(),
            Err(PredictionError::InvalidRequest(_))
        ));

        assert!(matches!(
            PredictionRequest::new("  ").validate(),
            Err(PredictionError::InvalidRequest(_))
        ));
        assert!(matches!(
            PredictionRequest::new("AAPL").with_lookback_days(0).validate(),
            Err(PredictionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn one_step_forecast_must_have_exactly_one_value() {
        assert_eq!(forecast_one_step(&Fixed(vec![150.0])).unwrap(), 150.0);

        for values in [vec![], vec![150.0, 151.0]] {
            let actual = values.len();
            let err = forecast_one_step(&Fixed(values)).unwrap_err();
            assert!(matches!(
                err,
                PredictionError::Forecast(ForecastError::UnexpectedLength { expected: 1, actual: a })
                    if a == actual
            ));
        }

        assert!(matches!(
            forecast_one_step(&Fixed(vec![f64::NAN])),
            Err(PredictionError::Forecast(ForecastError::NonFinite(_)))
        ));
    }
}
