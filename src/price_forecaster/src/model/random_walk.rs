use serde::{Deserialize, Serialize};

use crate::{
    errors::ForecastError,
    model::{Forecaster, ensure_finite},
};

/// Random walk with drift: every step adds `drift` to the last observation.
///
/// With zero drift this is the naive "tomorrow equals today" baseline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomWalkModel {
    last_observation: f64,
    #[serde(default)]
    drift: f64,
}

impl RandomWalkModel {
    /// Builds a random walk anchored on `last_observation`.
    pub fn new(last_observation: f64, drift: f64) -> Result<Self, ForecastError> {
        let model = Self {
            last_observation,
            drift,
        };
        model.validate()?;
        Ok(model)
    }

    /// Rejects non-finite anchors or drift.
    pub fn validate(&self) -> Result<(), ForecastError> {
        ensure_finite("last_observation", &[self.last_observation])?;
        ensure_finite("drift", &[self.drift])
    }
}

impl Forecaster for RandomWalkModel {
    fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        Ok((1..=steps)
            .map(|step| self.last_observation + self.drift * step as f64)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drift_accumulates_per_step() {
        let model = RandomWalkModel::new(100.0, 0.25).unwrap();
        assert_eq!(model.forecast(3).unwrap(), vec![100.25, 100.5, 100.75]);
    }

    #[test]
    fn rejects_non_finite_anchor() {
        assert!(RandomWalkModel::new(f64::INFINITY, 0.0).is_err());
        assert!(RandomWalkModel::new(1.0, f64::NAN).is_err());
    }
}
