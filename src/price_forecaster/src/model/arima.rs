//! ARIMA (AutoRegressive Integrated Moving Average) forecasting from a fitted state.
//!
//! The model is fit elsewhere; what is stored here is everything needed to
//! project the series forward:
//!
//! - `p` AR coefficients applied to the centred, `d`-times differenced series
//! - `q` MA coefficients applied to the trailing in-sample residuals
//! - the process mean of the differenced series
//! - the tail of the observed series on its original scale
//!
//! Future residuals are taken as zero, so beyond `q` steps the MA part drops
//! out and the forecast relaxes towards the mean.
//!
//! ## Example
//!
//! ```rust
//! use price_forecaster::model::{ArimaModel, ArimaOrder, Forecaster};
//!
//! // ARIMA(0,1,0) with drift 0.5: each step adds the drift to the last close.
//! let model = ArimaModel::new(
//!     ArimaOrder::new(0, 1, 0),
//!     vec![],
//!     vec![],
//!     0.5,
//!     vec![100.0, 101.0],
//!     vec![],
//! )
//! .unwrap();
//! assert_eq!(model.forecast(2).unwrap(), vec![101.5, 102.0]);
//! ```

use serde::{Deserialize, Serialize};

use crate::{
    errors::ForecastError,
    model::{Forecaster, ensure_finite},
};

const MAX_AR_ORDER: usize = 10;
const MAX_DIFFERENCING: usize = 2;
const MAX_MA_ORDER: usize = 10;

/// The (p, d, q) order of an ARIMA model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArimaOrder {
    /// AR order.
    pub p: usize,
    /// Differencing order.
    pub d: usize,
    /// MA order.
    pub q: usize,
}

impl ArimaOrder {
    /// Bundles an order without checking it; [`ArimaModel::new`] validates.
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }
}

/// A fitted ARIMA model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaModel {
    order: ArimaOrder,
    ar_coeffs: Vec<f64>,
    ma_coeffs: Vec<f64>,
    /// Process mean of the differenced series.
    mean: f64,
    /// Trailing observations on the original scale, oldest first.
    history: Vec<f64>,
    /// Trailing in-sample residuals on the differenced scale, oldest first.
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Assembles a fitted model and validates it.
    ///
    /// # Arguments
    ///
    /// * `order` - (p, d, q); p and q at most 10, d at most 2
    /// * `ar_coeffs` - exactly `p` coefficients, lag 1 first
    /// * `ma_coeffs` - exactly `q` coefficients, lag 1 first
    /// * `mean` - process mean of the `d`-times differenced series
    /// * `history` - at least `p + d` (and at least one) trailing observations
    /// * `residuals` - at least `q` trailing residuals
    pub fn new(
        order: ArimaOrder,
        ar_coeffs: Vec<f64>,
        ma_coeffs: Vec<f64>,
        mean: f64,
        history: Vec<f64>,
        residuals: Vec<f64>,
    ) -> Result<Self, ForecastError> {
        let model = Self {
            order,
            ar_coeffs,
            ma_coeffs,
            mean,
            history,
            residuals,
        };
        model.validate()?;
        Ok(model)
    }

    /// The (p, d, q) order.
    pub fn order(&self) -> ArimaOrder {
        self.order
    }

    /// AR coefficients, lag 1 first.
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.ar_coeffs
    }

    /// MA coefficients, lag 1 first.
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.ma_coeffs
    }

    /// Checks order bounds, coefficient counts, history length and finiteness.
    ///
    /// Deserialized models bypass [`ArimaModel::new`], so the loader calls
    /// this before handing the model out.
    pub fn validate(&self) -> Result<(), ForecastError> {
        let ArimaOrder { p, d, q } = self.order;
        if p > MAX_AR_ORDER {
            return Err(ForecastError::InvalidParameter {
                name: "p",
                reason: format!("AR order must be <= {MAX_AR_ORDER}"),
            });
        }
        if d > MAX_DIFFERENCING {
            return Err(ForecastError::InvalidParameter {
                name: "d",
                reason: format!("Differencing order must be <= {MAX_DIFFERENCING}"),
            });
        }
        if q > MAX_MA_ORDER {
            return Err(ForecastError::InvalidParameter {
                name: "q",
                reason: format!("MA order must be <= {MAX_MA_ORDER}"),
            });
        }
        if self.ar_coeffs.len() != p {
            return Err(ForecastError::InvalidParameter {
                name: "ar_coeffs",
                reason: format!("expected {p} coefficients, got {}", self.ar_coeffs.len()),
            });
        }
        if self.ma_coeffs.len() != q {
            return Err(ForecastError::InvalidParameter {
                name: "ma_coeffs",
                reason: format!("expected {q} coefficients, got {}", self.ma_coeffs.len()),
            });
        }

        let required = (p + d).max(1);
        if self.history.len() < required {
            return Err(ForecastError::InsufficientHistory {
                required,
                actual: self.history.len(),
            });
        }
        if self.residuals.len() < q {
            return Err(ForecastError::InvalidParameter {
                name: "residuals",
                reason: format!("need at least {q} residuals, got {}", self.residuals.len()),
            });
        }

        ensure_finite("ar_coeffs", &self.ar_coeffs)?;
        ensure_finite("ma_coeffs", &self.ma_coeffs)?;
        ensure_finite("mean", &[self.mean])?;
        ensure_finite("history", &self.history)?;
        ensure_finite("residuals", &self.residuals)?;
        Ok(())
    }

    /// `levels[k]` is the history differenced `k` times.
    fn difference_levels(&self) -> Vec<Vec<f64>> {
        let mut levels = Vec::with_capacity(self.order.d + 1);
        levels.push(self.history.clone());
        for _ in 0..self.order.d {
            let previous = levels.last().map(Vec::as_slice).unwrap_or_default();
            let differenced: Vec<f64> = previous.windows(2).map(|w| w[1] - w[0]).collect();
            levels.push(differenced);
        }
        levels
    }
}

impl Forecaster for ArimaModel {
    fn forecast(&self, steps: usize) -> Result<Vec<f64>, ForecastError> {
        if steps == 0 {
            return Ok(Vec::new());
        }

        let d = self.order.d;
        let levels = self.difference_levels();

        let mut extended = levels[d].clone();
        let mut extended_residuals = self.residuals.clone();
        let n = extended.len();

        // Generate forecasts on the differenced scale.
        for _ in 0..steps {
            let mut next = self.mean;

            for (j, phi) in self.ar_coeffs.iter().enumerate() {
                next += phi * (extended[extended.len() - j - 1] - self.mean);
            }
            for (j, theta) in self.ma_coeffs.iter().enumerate() {
                next += theta * extended_residuals[extended_residuals.len() - j - 1];
            }

            extended.push(next);
            extended_residuals.push(0.0);
        }

        // Integrate back up one level at a time, anchored on each level's last value.
        let mut forecasts = extended[n..].to_vec();
        for level in levels[..d].iter().rev() {
            let mut running = level[level.len() - 1];
            for value in forecasts.iter_mut() {
                running += *value;
                *value = running;
            }
        }

        match forecasts.iter().find(|v| !v.is_finite()) {
            Some(v) => Err(ForecastError::NonFinite(*v)),
            None => Ok(forecasts),
        }
    }
}
