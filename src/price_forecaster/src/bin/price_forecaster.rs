use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use market_data_ingestor::providers::{ProviderKind, build_provider};
use price_forecaster::{
    config::{ConfigOverrides, resolve_config},
    model::load_model,
    workflow::predict_next_day,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Predict the next daily close from a pre-fit model")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model artifact to load (default: best_arima_model.bin)
    #[arg(short, long, value_name = "FILE")]
    model: Option<PathBuf>,

    /// Ticker symbol to predict (default: AAPL)
    #[arg(short, long)]
    symbol: Option<String>,

    /// Calendar days of history to request (default: 100)
    #[arg(long)]
    lookback_days: Option<u32>,

    /// Market data provider: yahoo or alpaca
    #[arg(long)]
    provider: Option<ProviderKind>,

    /// Maximum number of retries for failed data requests
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay before the first retry, doubled for each further one
    #[arg(long)]
    base_delay_ms: Option<u64>,

    /// Print the result as JSON instead of the text report
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            model_path: self.model.clone(),
            symbol: self.symbol.clone(),
            lookback_days: self.lookback_days,
            provider: self.provider,
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
        }
    }
}

// Status lines go to stderr when stdout carries JSON.
macro_rules! status {
    ($json:expr, $($arg:tt)*) => {
        if $json {
            eprintln!($($arg)*);
        } else {
            println!($($arg)*);
        }
    };
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let config = resolve_config(cli.config.as_deref(), cli.overrides())?;
    debug!(?config, "effective configuration");

    status!(json, "Loading ARIMA model...");
    let model = load_model(&config.model_path)
        .with_context(|| format!("failed to load model from {}", config.model_path.display()))?;

    let provider = build_provider(config.provider, &config.provider_settings())
        .with_context(|| format!("failed to initialise {} provider", config.provider))?;

    let request = config.prediction_request();
    status!(json, "Making prediction for {}...", request.symbol);
    let result = predict_next_day(model.as_ref(), provider.as_ref(), &request).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("\n{result}");
    }
    Ok(())
}
