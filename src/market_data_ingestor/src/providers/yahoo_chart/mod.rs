//! Yahoo Finance v8 chart API provider.
//!
//! Keyless, one HTTP request per symbol. Yahoo pads its arrays with `null`
//! for sessions it has no print for; those rows are dropped during
//! conversion.

pub mod provider;
pub mod response;

pub use provider::YahooChartProvider;
