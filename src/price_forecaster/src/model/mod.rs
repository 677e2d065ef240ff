//! Forecasting backends and the artifact format they are persisted in.
//!
//! The prediction workflow only ever sees a [`Forecaster`]; which backend sits
//! behind it is decided by the artifact loaded with [`load_model`].

pub mod arima;
pub mod artifact;
pub mod random_walk;

use serde::{Deserialize, Serialize};

pub use arima::{ArimaModel, ArimaOrder};
pub use artifact::{ModelArtifact, load_model, read_artifact, save_model};
pub use random_walk::RandomWalkModel;

use crate::errors::ForecastError;

/// A pre-fit model able to project its series forward.
///
/// Implementations take `&self`: forecasting never mutates the fitted state,
/// so one instance can serve any number of calls.
pub trait Forecaster: Send + Sync {
    /// Returns the next `steps` values of the series, nearest first.
    fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError>;
}

/// Every backend an artifact can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelSpec {
    /// ARIMA(p, d, q) with its fitted state.
    Arima(ArimaModel),
    /// Random walk, optionally with drift.
    RandomWalk(RandomWalkModel),
}

impl ModelSpec {
    /// Short backend name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelSpec::Arima(_) => "arima",
            ModelSpec::RandomWalk(_) => "random_walk",
        }
    }

    /// Checks the stored state is internally consistent.
    pub fn validate(&self) -> Result<(), ForecastError> {
        match self {
            ModelSpec::Arima(model) => model.validate(),
            ModelSpec::RandomWalk(model) => model.validate(),
        }
    }

    /// Boxes the backend behind the [`Forecaster`] interface.
    pub fn into_forecaster(self) -> Box<dyn Forecaster> {
        match self {
            ModelSpec::Arima(model) => Box::new(model),
            ModelSpec::RandomWalk(model) => Box::new(model),
        }
    }
}

impl From<ArimaModel> for ModelSpec {
    fn from(model: ArimaModel) -> Self {
        ModelSpec::Arima(model)
    }
}

impl From<RandomWalkModel> for ModelSpec {
    fn from(model: RandomWalkModel) -> Self {
        ModelSpec::RandomWalk(model)
    }
}

pub(crate) fn ensure_finite(name: &'static str, values: &[f64]) -> Result<(), ForecastError> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(v) => Err(ForecastError::InvalidParameter {
            name,
            reason: format!("contains non-finite value {v}"),
        }),
        None => Ok(()),
    }
}
