//! # Forecasting models
//!
//! Every price forecaster implements [`Forecaster`] and is selected by
//! [`ForecastModel`]:
//!
//! - `AutoRegressive` - ARIMA(p, d, q), (5, 1, 0) by convention
//! - `RecurrentSequence` - single-layer LSTM rolled forward on its own predictions
//! - `AdditiveDecomposition` - linear trend plus periodic seasonal component
//!
//! Fitted parameters live only inside one `forecast` call.
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use quant_signal_engine::data::{FeatureFrame, PriceSeries};
//! use quant_signal_engine::model::{ForecastMode, ForecastModel, ForecastRequest};
//! use quant_signal_engine::utils::EngineConfig;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let closes: Vec<f64> = (0..60).map(|i| 100.0 + i as f64 * 0.5).collect();
//! let frame = FeatureFrame::from_prices(&PriceSeries::from_closes(start, &closes));
//!
//! let forecaster = ForecastModel::AdditiveDecomposition.build(&EngineConfig::default());
//! let forecast = forecaster
//!     .forecast(&ForecastRequest::new(&frame, 5, ForecastMode::Backtest))
//!     .unwrap();
//! assert_eq!(forecast.len(), 5);
//! ```

mod additive;
mod arima;
mod config;
mod layers;
mod lstm;
mod optimizer;
mod recurrent;

pub use additive::{AdditiveForecaster, Decomposition};
pub use arima::{difference, ArimaForecaster, ArimaModel, ArimaParams, ForecastInterval};
pub use config::LstmConfig;
pub use layers::Dense;
pub use lstm::{LstmCell, LstmNetwork, TrainingSummary};
pub use optimizer::{Adam, AdamState};
pub use recurrent::RecurrentSequenceForecaster;

use std::fmt;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{business_days_after, FeatureFrame};
use crate::runtime::CancelToken;
use crate::utils::EngineConfig;
use crate::{Error, Result};

/// How forecasts relate to the supplied history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecastMode {
    /// Fit on all but the last `horizon` rows and forecast over the held-out span
    Backtest,
    /// Fit on the full history and forecast the next `horizon` business days
    Future,
}

/// Forecaster variants selectable by configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForecastModel {
    #[serde(rename = "arima")]
    AutoRegressive,
    #[serde(rename = "lstm")]
    RecurrentSequence,
    #[serde(rename = "additive")]
    AdditiveDecomposition,
}

impl ForecastModel {
    /// Display name used as the forecast / metrics key
    pub fn label(&self) -> &'static str {
        match self {
            ForecastModel::AutoRegressive => "ARIMA",
            ForecastModel::RecurrentSequence => "LSTM",
            ForecastModel::AdditiveDecomposition => "Additive",
        }
    }

    /// All variants in reporting order
    pub fn all() -> [ForecastModel; 3] {
        [
            ForecastModel::AutoRegressive,
            ForecastModel::RecurrentSequence,
            ForecastModel::AdditiveDecomposition,
        ]
    }

    /// Instantiate the forecaster with its configured parameters
    pub fn build(&self, config: &EngineConfig) -> Arc<dyn Forecaster> {
        match self {
            ForecastModel::AutoRegressive => Arc::new(ArimaForecaster::new(config.arima)),
            ForecastModel::RecurrentSequence => {
                Arc::new(RecurrentSequenceForecaster::new(config.lstm.clone()))
            }
            ForecastModel::AdditiveDecomposition => {
                Arc::new(AdditiveForecaster::new(config.additive.seasonal_period))
            }
        }
    }
}

impl fmt::Display for ForecastModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One forecast step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Named sequence of predictions on future business days
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub model: String,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn new(model: impl Into<String>, dates: &[NaiveDate], values: &[f64]) -> Self {
        Self {
            model: model.into(),
            points: dates
                .iter()
                .zip(values.iter())
                .map(|(&date, &value)| ForecastPoint { date, value })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }
}

/// Inputs of a single forecast call
#[derive(Debug, Clone)]
pub struct ForecastRequest<'a> {
    pub frame: &'a FeatureFrame,
    pub horizon: usize,
    pub mode: ForecastMode,
    pub cancel: CancelToken,
}

impl<'a> ForecastRequest<'a> {
    pub fn new(frame: &'a FeatureFrame, horizon: usize, mode: ForecastMode) -> Self {
        Self {
            frame,
            horizon,
            mode,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Rows available for fitting
    pub fn train_rows(&self) -> Result<usize> {
        if self.horizon == 0 {
            return Err(Error::InvalidParameter("horizon must be positive".to_string()));
        }
        let n = self.frame.nrows();
        match self.mode {
            ForecastMode::Future => Ok(n),
            ForecastMode::Backtest if n > self.horizon => Ok(n - self.horizon),
            ForecastMode::Backtest => Err(Error::insufficient("backtest", self.horizon + 1, n)),
        }
    }

    /// Dates stamped on the forecast
    ///
    /// Backtests reuse the held-out rows' own dates so every step lines up
    /// with its actual, market holidays included. Future forecasts take the
    /// next `horizon` business days after the last training row.
    pub fn forecast_dates(&self, train_rows: usize) -> Result<Vec<NaiveDate>> {
        if self.mode == ForecastMode::Backtest {
            let dates = self.frame.dates();
            let end = train_rows + self.horizon;
            return dates
                .get(train_rows..end)
                .map(|held_out| held_out.to_vec())
                .ok_or_else(|| Error::insufficient("backtest dates", end, dates.len()));
        }

        let last = train_rows
            .checked_sub(1)
            .and_then(|idx| self.frame.dates().get(idx).copied())
            .ok_or_else(|| Error::insufficient("forecast dates", 1, 0))?;
        Ok(business_days_after(last, self.horizon))
    }
}

/// Common interface of all price forecasters
pub trait Forecaster: Send + Sync {
    fn model(&self) -> ForecastModel;

    fn name(&self) -> &'static str {
        self.model().label()
    }

    /// Fit on the request's training rows and forecast `horizon` steps
    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<Forecast>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{PricePoint, PriceSeries};

    fn frame(n: usize) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        FeatureFrame::from_prices(&PriceSeries::from_closes(start, &vec![1.0; n]))
    }

    #[test]
    fn test_train_rows_by_mode() {
        let frame = frame(30);
        assert_eq!(ForecastRequest::new(&frame, 5, ForecastMode::Future).train_rows().unwrap(), 30);
        assert_eq!(ForecastRequest::new(&frame, 5, ForecastMode::Backtest).train_rows().unwrap(), 25);
        assert!(ForecastRequest::new(&frame, 30, ForecastMode::Backtest).train_rows().is_err());
        assert!(ForecastRequest::new(&frame, 0, ForecastMode::Future).train_rows().is_err());
    }

    #[test]
    fn test_backtest_dates_follow_truncation_point() {
        let frame = frame(30);
        let request = ForecastRequest::new(&frame, 5, ForecastMode::Backtest);
        let dates = request.forecast_dates(25).unwrap();

        assert_eq!(dates, frame.dates()[25..].to_vec());
    }

    #[test]
    fn test_backtest_dates_keep_market_holidays() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 19).unwrap();
        // Fri 2024-02-23 missing from the history
        let points: Vec<PricePoint> = PriceSeries::from_closes(start, &[1.0; 11])
            .points()
            .filter(|p| p.date != NaiveDate::from_ymd_opt(2024, 2, 23).unwrap())
            .collect();
        let frame = FeatureFrame::from_prices(&PriceSeries::new(points).unwrap());
        let request = ForecastRequest::new(&frame, 5, ForecastMode::Backtest);

        let dates = request.forecast_dates(5).unwrap();
        assert_eq!(dates, frame.dates()[5..].to_vec());
        assert!(!dates.contains(&NaiveDate::from_ymd_opt(2024, 2, 23).unwrap()));
        assert!(request.forecast_dates(6).is_err());
    }

    #[test]
    fn test_model_labels() {
        let labels: Vec<&str> = ForecastModel::all().iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["ARIMA", "LSTM", "Additive"]);
    }

    #[test]
    fn test_build_from_config() {
        let config = EngineConfig::default();
        for model in ForecastModel::all() {
            assert_eq!(model.build(&config).model(), model);
        }
    }
}
