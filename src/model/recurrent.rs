//! Recursive multi-step forecasting with the LSTM regressor

use ndarray::{s, Array2};
use tracing::{debug, info};

use super::config::LstmConfig;
use super::lstm::LstmNetwork;
use super::{Forecast, ForecastModel, ForecastRequest, Forecaster};
use crate::preprocessing::FeatureWindower;
use crate::{Error, Result};

/// LSTM member of the forecaster ensemble
///
/// Trains a fresh network on every call. Forecasts roll forward on the
/// network's own predictions: each step drops the oldest row of the window
/// and appends the predicted price, with any extra feature columns held at
/// zero since their future values are unknown.
#[derive(Debug, Clone, Default)]
pub struct RecurrentSequenceForecaster {
    config: LstmConfig,
}

impl RecurrentSequenceForecaster {
    pub fn new(config: LstmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LstmConfig {
        &self.config
    }
}

impl Forecaster for RecurrentSequenceForecaster {
    fn model(&self) -> ForecastModel {
        ForecastModel::RecurrentSequence
    }

    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<Forecast> {
        let train_rows = request.train_rows()?;
        request
            .frame
            .ensure_capacity(self.config.lookback, request.horizon)?;
        let frame = if self.config.use_features {
            request.frame.clone()
        } else {
            request.frame.price_only()
        };
        if !frame.is_finite() {
            return Err(Error::ModelFit(
                "LSTM input contains non-finite values".to_string(),
            ));
        }

        let dataset = FeatureWindower::new(self.config.lookback).fit_transform(&frame, train_rows)?;
        if dataset.train_len() == 0 {
            return Err(Error::insufficient("LSTM training windows", 1, 0));
        }

        let mut rng = self.config.rng();
        let mut network = LstmNetwork::new(dataset.n_features(), self.config.hidden_size, &mut rng);
        let (inputs, targets) = dataset.training_set();
        let summary = network.train(inputs, targets, &self.config, &mut rng, &request.cancel)?;
        info!(
            windows = dataset.train_len(),
            features = dataset.n_features(),
            epochs = summary.epochs,
            final_loss = summary.final_loss().unwrap_or(f64::NAN),
            "LSTM trained"
        );

        let lookback = dataset.lookback();
        let mut window: Array2<f64> = dataset.last_training_window().to_owned();
        let mut values = Vec::with_capacity(request.horizon);

        for step in 0..request.horizon {
            request.cancel.check("LSTM forecast")?;

            let scaled = network.predict(window.view());
            if !scaled.is_finite() {
                return Err(Error::ModelFit(format!(
                    "LSTM produced a non-finite prediction at step {}",
                    step + 1
                )));
            }
            values.push(dataset.inverse_price(scaled));

            let mut next = Array2::zeros(window.raw_dim());
            next.slice_mut(s![..lookback - 1, ..])
                .assign(&window.slice(s![1.., ..]));
            next[[lookback - 1, 0]] = scaled;
            window = next;
        }
        debug!(horizon = request.horizon, "LSTM forecast complete");

        let dates = request.forecast_dates(train_rows)?;
        Ok(Forecast::new(self.name(), &dates, &values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FeatureFrame, PriceSeries};
    use crate::model::ForecastMode;
    use crate::runtime::CancelToken;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn frame(closes: &[f64]) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        FeatureFrame::from_prices(&PriceSeries::from_closes(start, closes))
    }

    fn small_config() -> LstmConfig {
        LstmConfig::small().with_seed(42)
    }

    #[test]
    fn test_constant_series_round_trips() {
        let frame = frame(&[100.0; 40]);
        let forecast = RecurrentSequenceForecaster::new(small_config())
            .forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Backtest))
            .unwrap();

        assert_eq!(forecast.len(), 5);
        for value in forecast.values() {
            assert_abs_diff_eq!(value, 100.0, epsilon = 1e-6);
        }
        assert_eq!(forecast.dates(), frame.dates()[35..].to_vec());
    }

    #[test]
    fn test_seeded_forecasts_repeat() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.2).sin() * 4.0).collect();
        let frame = frame(&closes);
        let forecaster = RecurrentSequenceForecaster::new(small_config());
        let request = ForecastRequest::new(&frame, 3, ForecastMode::Future);

        let first = forecaster.forecast(&request).unwrap();
        let second = forecaster.forecast(&request).unwrap();

        assert_eq!(first.values(), second.values());
        assert!(first.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_uses_feature_columns_when_enabled() {
        let closes: Vec<f64> = (0..80).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
        let series = PriceSeries::from_closes(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), &closes);
        let frame = FeatureFrame::with_indicators(&series, None).unwrap();
        let config = small_config().with_features(true);

        let forecast = RecurrentSequenceForecaster::new(config)
            .forecast(&ForecastRequest::new(&frame, 4, ForecastMode::Future))
            .unwrap();

        assert_eq!(forecast.len(), 4);
        assert!(forecast.dates()[0] > *frame.dates().last().unwrap());
    }

    #[test]
    fn test_too_short_history() {
        let frame = frame(&[100.0; 12]);
        let result = RecurrentSequenceForecaster::new(small_config())
            .forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Backtest));

        assert!(matches!(result, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn test_future_mode_needs_lookback_plus_horizon_rows() {
        // lookback 10 + horizon 5 needs 15 rows
        let frame = frame(&[100.0; 12]);
        let result = RecurrentSequenceForecaster::new(small_config())
            .forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Future));

        assert!(matches!(
            result,
            Err(Error::InsufficientData { needed: 15, available: 12, .. })
        ));
    }

    #[test]
    fn test_cancelled_request() {
        let frame = frame(&[100.0; 40]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let request = ForecastRequest::new(&frame, 5, ForecastMode::Future).with_cancel(cancel);

        let result = RecurrentSequenceForecaster::new(small_config()).forecast(&request);
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }
}
