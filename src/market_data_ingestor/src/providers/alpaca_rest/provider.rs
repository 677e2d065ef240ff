use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use shared_utils::env::get_env_var;
use snafu::ResultExt;
use tracing::debug;

use crate::{
    models::{bar::BarSeries, request_params::BarsRequestParams},
    providers::{
        ApiSnafu, ClientBuildSnafu, DataProvider, DecodeSnafu, InvalidApiKeySnafu,
        MissingEnvVarSnafu, ProviderError, ProviderInitError, ProviderSettings, ReqwestSnafu,
        alpaca_rest::{
            params::{construct_params, validate_timeframe},
            response::{AlpacaBar, AlpacaResponse},
        },
    },
};

const BASE_URL: &str = "https://data.alpaca.markets/v2/stocks/bars";

pub struct AlpacaProvider {
    client: Client,
    _api_key: SecretString,
    _secret_key: SecretString,
}

impl AlpacaProvider {
    /// Creates a new Alpaca provider.
    ///
    /// Reads API keys from the `APCA_API_KEY_ID` and `APCA_API_SECRET_KEY`
    /// environment variables.
    pub fn new(settings: &ProviderSettings) -> Result<Self, ProviderInitError> {
        let api_key = SecretString::new(
            get_env_var("APCA_API_KEY_ID")
                .context(MissingEnvVarSnafu)?
                .into(),
        );
        let secret_key = SecretString::new(
            get_env_var("APCA_API_SECRET_KEY")
                .context(MissingEnvVarSnafu)?
                .into(),
        );

        let mut headers = header::HeaderMap::new();
        let mut key_header = header::HeaderValue::from_str(api_key.expose_secret())
            .context(InvalidApiKeySnafu)?;
        key_header.set_sensitive(true);
        let mut secret_header = header::HeaderValue::from_str(secret_key.expose_secret())
            .context(InvalidApiKeySnafu)?;
        secret_header.set_sensitive(true);
        headers.insert("APCA-API-KEY-ID", key_header);
        headers.insert("APCA-API-SECRET-KEY", secret_header);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self {
            client,
            _api_key: api_key,
            _secret_key: secret_key,
        })
    }
}

#[async_trait]
impl DataProvider for AlpacaProvider {
    async fn fetch_bars(&self, params: BarsRequestParams) -> Result<Vec<BarSeries>, ProviderError> {
        validate_timeframe(&params.timeframe)?;

        let mut all_bars: IndexMap<String, Vec<AlpacaBar>> = IndexMap::new();
        let mut next_page_token: Option<String> = None;

        loop {
            let mut query_params = construct_params(&params);
            if let Some(token) = &next_page_token {
                query_params.push(("page_token".to_string(), token.clone()));
            }

            let response = self
                .client
                .get(BASE_URL)
                .query(&query_params)
                .send()
                .await
                .context(ReqwestSnafu)?;

            let status = response.status();
            let body = response.text().await.context(ReqwestSnafu)?;
            if !status.is_success() {
                return ApiSnafu {
                    status: status.as_u16(),
                    message: body,
                }
                .fail();
            }

            let page: AlpacaResponse = serde_json::from_str(&body).context(DecodeSnafu)?;
            debug!(
                symbols = page.bars.len(),
                has_next = page.next_page_token.is_some(),
                "received alpaca bars page"
            );

            // Merge the bars from the current page into our collection.
            for (symbol, bars) in page.bars {
                all_bars.entry(symbol).or_default().extend(bars);
            }

            match page.next_page_token {
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }

        let result = all_bars
            .into_iter()
            .map(|(symbol, alpaca_bars)| {
                let bars = alpaca_bars.into_iter().map(Into::into).collect();
                BarSeries::new(symbol, params.timeframe.clone(), bars)
            })
            .collect();

        Ok(result)
    }
}
