//! Next-day closing price forecasts.
//!
//! A pre-fit model is loaded once with [`model::load_model`], then
//! [`workflow::predict_next_day`] pulls a trailing window of daily bars from a
//! [`DataProvider`](market_data_ingestor::providers::DataProvider), asks the
//! model for one step ahead and returns a [`result::PredictionResult`].

pub mod config;
pub mod errors;
pub mod model;
pub mod result;
pub mod workflow;
