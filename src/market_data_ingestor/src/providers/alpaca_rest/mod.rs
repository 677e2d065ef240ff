//! Alpaca market data v2 (`/v2/stocks/bars`) provider.

pub mod params;
pub mod provider;
pub mod response;

pub use provider::AlpacaProvider;
