use async_trait::async_trait;
use reqwest::{Client, Url};
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{
        bar::BarSeries,
        request_params::BarsRequestParams,
        timeframe::{TimeFrame, TimeFrameUnit},
    },
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, DecodeSnafu, InternalSnafu, InvalidBaseUrlSnafu,
        ProviderError, ProviderInitError, ProviderSettings, ReqwestSnafu, ValidationSnafu,
        yahoo_chart::response::ChartResponse,
    },
};

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// The chart endpoint rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

pub struct YahooChartProvider {
    client: Client,
    base_url: Url,
}

impl YahooChartProvider {
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderInitError> {
        Self::with_base_url(settings, BASE_URL)
    }

    /// Points the provider at another chart endpoint (a proxy or a local stub).
    pub fn with_base_url(
        settings: &ProviderSettings,
        base_url: impl Into<String>,
    ) -> Result<Self, ProviderInitError> {
        let raw = base_url.into();
        let base_url = Url::parse(&raw).map_err(|e| {
            InvalidBaseUrlSnafu {
                url: raw.clone(),
                reason: e.to_string(),
            }
            .build()
        })?;
        if base_url.cannot_be_a_base() {
            return InvalidBaseUrlSnafu {
                url: raw,
                reason: "URL cannot carry a path",
            }
            .fail();
        }

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self { client, base_url })
    }

    /// Chart URL for `symbol`, which is percent-encoded as one path segment
    /// so `/`, `?` or `#` cannot redirect the request to another instrument.
    pub fn chart_url(&self, symbol: &str) -> Result<Url, ProviderError> {
        let mut url = self.base_url.clone();
        match url.path_segments_mut() {
            Ok(mut segments) => {
                segments.pop_if_empty().push(symbol);
            }
            Err(()) => {
                return InternalSnafu {
                    message: format!("base URL {} cannot carry a path", self.base_url),
                }
                .fail();
            }
        }
        Ok(url)
    }

    async fn fetch_symbol(
        &self,
        symbol: &str,
        params: &BarsRequestParams,
        interval: &str,
    ) -> Result<BarSeries, ProviderError> {
        let url = self.chart_url(symbol)?;
        let query = [
            ("period1", params.start.timestamp().to_string()),
            ("period2", params.end.timestamp().to_string()),
            ("interval", interval.to_string()),
        ];

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .context(ReqwestSnafu)?;

        let status = response.status();
        let body = response.text().await.context(ReqwestSnafu)?;

        // Unknown symbols come back as 404 with a chart error object, so try
        // the payload before falling back to the raw body.
        match serde_json::from_str::<ChartResponse>(&body) {
            Ok(chart) => chart.into_series(symbol, &params.timeframe, status.as_u16()),
            Err(_) if !status.is_success() => ApiSnafu {
                status: status.as_u16(),
                message: body,
            }
            .fail(),
            Err(source) => Err(source).context(DecodeSnafu),
        }
    }
}

/// Maps a [`TimeFrame`] onto one of the chart API's `interval` values.
pub fn chart_interval(timeframe: &TimeFrame) -> Result<&'static str, ProviderError> {
    let interval = match (timeframe.unit, timeframe.amount) {
        (TimeFrameUnit::Minute, 1) => "1m",
        (TimeFrameUnit::Minute, 2) => "2m",
        (TimeFrameUnit::Minute, 5) => "5m",
        (TimeFrameUnit::Minute, 15) => "15m",
        (TimeFrameUnit::Minute, 30) => "30m",
        (TimeFrameUnit::Minute, 90) => "90m",
        (TimeFrameUnit::Hour, 1) => "1h",
        (TimeFrameUnit::Day, 1) => "1d",
        (TimeFrameUnit::Day, 5) => "5d",
        (TimeFrameUnit::Week, 1) => "1wk",
        (TimeFrameUnit::Month, 1) => "1mo",
        (TimeFrameUnit::Month, 3) => "3mo",
        _ => {
            return ValidationSnafu {
                message: format!("timeframe {timeframe} has no chart interval"),
            }
            .fail();
        }
    };
    Ok(interval)
}

#[async_trait]
impl DataProvider for YahooChartProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        let interval = chart_interval(&params.timeframe)?;

        let mut result = Vec::with_capacity(params.symbols.len());
        for symbol in &params.symbols {
            let series = self.fetch_symbol(symbol, &params, interval).await?;
            debug!(%symbol, bars = series.bars.len(), "received yahoo chart");
            result.push(series);
        }

        Ok(result)
    }
}
