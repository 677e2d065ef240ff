use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{ForecastError, PredictionError};

/// Outcome of one next-day prediction.
///
/// Every field is an owned plain value, so a result can outlive the model and
/// the bars it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Instrument the prediction is for.
    pub symbol: String,
    /// Close of the most recent observed bar.
    pub current_price: f64,
    /// One-step-ahead forecast.
    pub predicted_price: f64,
    /// `predicted_price - current_price`.
    pub change: f64,
    /// `change / current_price * 100`.
    pub change_percent: f64,
}

impl PredictionResult {
    /// Derives change and percentage change from the two prices.
    ///
    /// # Errors
    ///
    /// * [`PredictionError::DivisionUndefined`] - `current_price` is zero or not finite,
    ///   or the change or percentage overflows (e.g. a subnormal baseline)
    /// * [`PredictionError::Forecast`] - `predicted_price` is not finite
    pub fn from_prices(
        symbol: impl Into<String>,
        current_price: f64,
        predicted_price: f64,
    ) -> Result<Self, PredictionError> {
        if current_price == 0.0 || !current_price.is_finite() {
            return Err(PredictionError::DivisionUndefined { current_price });
        }
        if !predicted_price.is_finite() {
            return Err(ForecastError::NonFinite(predicted_price).into());
        }

        let change = predicted_price - current_price;
        let change_percent = change / current_price * 100.0;
        if !change.is_finite() || !change_percent.is_finite() {
            return Err(PredictionError::DivisionUndefined { current_price });
        }

        Ok(Self {
            symbol: symbol.into(),
            current_price,
            predicted_price,
            change,
            change_percent,
        })
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Prediction Results:")?;
        writeln!(f, "Current Price: ${:.2}", self.current_price)?;
        writeln!(f, "Predicted Price: ${:.2}", self.predicted_price)?;
        write!(
            f,
            "Expected Change: ${:.2} ({:+.2}%)",
            self.change, self.change_percent
        )
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn derives_change_from_prices() {
        let result = PredictionResult::from_prices("AAPL", 145.0, 150.0).unwrap();

        assert_eq!(result.symbol, "AAPL");
        assert_eq!(result.current_price, 145.0);
        assert_eq!(result.predicted_price, 150.0);
        assert_eq!(result.change, 5.0);
        assert!((result.change_percent - 3.448_275_862_068_966).abs() < 1e-9);
    }

    #[test]
    fn zero_baseline_is_undefined() {
        let err = PredictionResult::from_prices("AAPL", 0.0, 150.0).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::DivisionUndefined { current_price } if current_price == 0.0
        ));

        let err = PredictionResult::from_prices("AAPL", f64::NAN, 150.0).unwrap_err();
        assert!(matches!(err, PredictionError::DivisionUndefined { .. }));

        // Subnormal baseline: the percentage overflows to infinity.
        let err = PredictionResult::from_prices("X", 1e-310, 1.0).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::DivisionUndefined { current_price } if current_price == 1e-310
        ));

        // Finite prices whose difference overflows.
        let err = PredictionResult::from_prices("X", 1e308, -1e308).unwrap_err();
        assert!(matches!(err, PredictionError::DivisionUndefined { .. }));
    }

    #[test]
    fn non_finite_forecast_is_rejected() {
        let err = PredictionResult::from_prices("AAPL", 145.0, f64::INFINITY).unwrap_err();
        assert!(matches!(
            err,
            PredictionError::Forecast(ForecastError::NonFinite(_))
        ));
    }

    #[test]
    fn report_formats_two_decimals_with_signed_percent() {
        let up = PredictionResult::from_prices("AAPL", 145.0, 150.0).unwrap();
        assert_eq!(
            up.to_string(),
            "Prediction Results:\n\
             Current Price: $145.00\n\
             Predicted Price: $150.00\n\
             Expected Change: $5.00 (+3.45%)"
        );

        let down = PredictionResult::from_prices("AAPL", 200.0, 190.5).unwrap();
        assert!(down.to_string().ends_with("Expected Change: $-9.50 (-4.75%)"));
    }

    #[test]
    fn serializes_plain_fields() {
        let result = PredictionResult::from_prices("MSFT", 400.0, 404.0).unwrap();
        let json = serde_json::to_value(&result).unwrap();

        assert_eq!(json["symbol"], "MSFT");
        assert_eq!(json["change"], 4.0);
        assert!((json["change_percent"].as_f64().unwrap() - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn change_fields_follow_prices(
            current in prop_oneof![-1.0e6..-1.0e-3f64, 1.0e-3..1.0e6f64],
            predicted in -1.0e6..1.0e6f64,
        ) {
            let result = PredictionResult::from_prices("PROP", current, predicted).unwrap();

            prop_assert_eq!(result.change, predicted - current);
            let expected = (predicted - current) / current * 100.0;
            prop_assert!((result.change_percent - expected).abs() <= 1e-9 * expected.abs().max(1.0));
        }
    }
}
