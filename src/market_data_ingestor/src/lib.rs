//! Vendor-agnostic access to historical market bars.
//!
//! [`providers::DataProvider`] is the seam: callers build a
//! [`models::request_params::BarsRequestParams`] and get back one
//! [`models::bar::BarSeries`] per symbol, whichever vendor served it.

pub mod models;
pub mod providers;
