use chrono::DateTime;
use serde::Deserialize;
use snafu::OptionExt;

use crate::{
    models::{
        bar::{Bar, BarSeries},
        timeframe::TimeFrame,
    },
    providers::{ApiSnafu, InternalSnafu, ProviderError},
};

#[derive(Debug, Deserialize)]
pub struct ChartResponse {
    pub chart: Chart,
}

#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartData>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    pub code: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct ChartData {
    // Absent when the requested window holds no sessions.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: Indicators,
}

#[derive(Debug, Deserialize)]
pub struct Indicators {
    #[serde(default)]
    pub quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuoteColumns {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}

impl ChartResponse {
    /// Converts a decoded chart payload into a [`BarSeries`] for `symbol`.
    ///
    /// `status` is the HTTP status the payload arrived with; it is reported
    /// back when Yahoo embeds an error object instead of data.
    pub fn into_series(
        self,
        symbol: &str,
        timeframe: &TimeFrame,
        status: u16,
    ) -> Result<BarSeries, ProviderError> {
        if let Some(error) = self.chart.error {
            return ApiSnafu {
                status,
                message: format!("{}: {}", error.code, error.description),
            }
            .fail();
        }

        let data = self
            .chart
            .result
            .and_then(|mut results| (!results.is_empty()).then(|| results.swap_remove(0)))
            .context(InternalSnafu {
                message: format!("chart response for {symbol} carries no result"),
            })?;

        let columns = data.indicators.quote.into_iter().next().unwrap_or_default();

        let mut bars = Vec::with_capacity(data.timestamp.len());
        for (i, ts) in data.timestamp.iter().enumerate() {
            let (Some(open), Some(high), Some(low), Some(close)) = (
                value_at(&columns.open, i),
                value_at(&columns.high, i),
                value_at(&columns.low, i),
                value_at(&columns.close, i),
            ) else {
                continue;
            };
            let timestamp = DateTime::from_timestamp(*ts, 0).context(InternalSnafu {
                message: format!("timestamp {ts} out of range"),
            })?;

            bars.push(Bar {
                timestamp,
                open,
                high,
                low,
                close,
                volume: value_at(&columns.volume, i).unwrap_or(0.0),
                trade_count: None,
                vwap: None,
            });
        }

        Ok(BarSeries::new(symbol, timeframe.clone(), bars))
    }
}

fn value_at(column: &[Option<f64>], i: usize) -> Option<f64> {
    column.get(i).copied().flatten()
}
