#![allow(dead_code)]

use std::sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use market_data_ingestor::{
    models::{
        bar::{Bar, BarSeries},
        request_params::BarsRequestParams,
        timeframe::TimeFrame,
    },
    providers::{ApiSnafu, DataProvider, ProviderError, ValidationSnafu},
};
use price_forecaster::{errors::ForecastError, model::Forecaster};

/// Daily bars with the given closes, oldest first.
pub fn daily_series(symbol: &str, closes: &[f64]) -> BarSeries {
    let start = Utc.with_ymd_and_hms(2025, 1, 2, 21, 0, 0).unwrap();
    let bars = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| Bar {
            timestamp: start + Duration::days(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1_000.0,
            trade_count: None,
            vwap: None,
        })
        .collect();
    BarSeries::new(symbol, TimeFrame::day(), bars)
}

/// Answers every request with the same series and records what was asked.
pub struct StaticProvider {
    series: Vec<BarSeries>,
    calls: AtomicUsize,
    last_params: Mutex<Option<BarsRequestParams>>,
}

impl StaticProvider {
    pub fn new(series: Vec<BarSeries>) -> Self {
        Self {
            series,
            calls: AtomicUsize::new(0),
            last_params: Mutex::new(None),
        }
    }

    pub fn closes(symbol: &str, closes: &[f64]) -> Self {
        Self::new(vec![daily_series(symbol, closes)])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_params(&self) -> Option<BarsRequestParams> {
        self.last_params.lock().unwrap().clone()
    }
}

#[async_trait]
impl DataProvider for StaticProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_params.lock().unwrap() = Some(params);
        Ok(self.series.clone())
    }
}

/// Fails a fixed number of times before answering.
pub struct FlakyProvider {
    failures: usize,
    transient: bool,
    inner: StaticProvider,
}

impl FlakyProvider {
    /// Fails `failures` times with a 503, then serves `series`.
    pub fn transient(failures: usize, series: BarSeries) -> Self {
        Self {
            failures,
            transient: true,
            inner: StaticProvider::new(vec![series]),
        }
    }

    /// Fails `failures` times with a validation error, then serves `series`.
    pub fn permanent(failures: usize, series: BarSeries) -> Self {
        Self {
            failures,
            transient: false,
            inner: StaticProvider::new(vec![series]),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.calls()
    }
}

#[async_trait]
impl DataProvider for FlakyProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        let call = self.inner.calls();
        if call < self.failures {
            self.inner.calls.fetch_add(1, Ordering::SeqCst);
            return if self.transient {
                ApiSnafu {
                    status: 503u16,
                    message: "service unavailable",
                }
                .fail()
            } else {
                ValidationSnafu {
                    message: "unsupported symbol",
                }
                .fail()
            };
        }
        self.inner.fetch_bars(params).await
    }
}

/// Returns the same values for any horizon.
pub struct FixedForecaster(pub Vec<f64>);

impl Forecaster for FixedForecaster {
    fn forecast(&self, _steps: usize) -> Result<Vec<f64>, ForecastError> {
        Ok(self.0.clone())
    }
}

/// Always fails.
pub struct FailingForecaster;

impl Forecaster for FailingForecaster {
    fn forecast(&self, _steps: usize) -> Result<Vec<f64>, ForecastError> {
        Err(ForecastError::Backend("solver did not converge".to_string()))
    }
}
