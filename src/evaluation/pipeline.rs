//! Multi-model forecasting run with per-model isolation

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ensemble::{EnsembleEvaluator, MetricsTable, ModelFailure};
use crate::data::{FeatureFrame, PriceSeries};
use crate::model::{Forecast, ForecastMode, ForecastModel, ForecastRequest, Forecaster};
use crate::runtime::{CancelToken, ForecastRunner, ModelOutcome};
use crate::utils::EngineConfig;
use crate::{Error, Result};

/// Everything one forecasting run produces for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastReport {
    pub mode: ForecastMode,
    pub horizon: usize,
    /// Successful forecasts in model order
    pub forecasts: Vec<Forecast>,
    /// Held-out prices in backtest mode
    pub actuals: Option<PriceSeries>,
    pub metrics: MetricsTable,
    /// Models whose forecaster failed, with the reason
    pub failures: Vec<ModelFailure>,
}

impl ForecastReport {
    pub fn forecast(&self, model: &str) -> Option<&Forecast> {
        self.forecasts.iter().find(|f| f.model == model)
    }
}

/// Runs the configured forecasters over one feature frame
///
/// In backtest mode every model is fit on the frame minus its last
/// `horizon` rows and scored against them. In future mode models use the
/// whole frame and the metrics table stays empty.
pub struct ForecastPipeline {
    forecasters: Vec<Arc<dyn Forecaster>>,
    horizon: usize,
    mode: ForecastMode,
    evaluator: EnsembleEvaluator,
}

impl ForecastPipeline {
    pub fn new(forecasters: Vec<Arc<dyn Forecaster>>, horizon: usize, mode: ForecastMode) -> Self {
        Self {
            forecasters,
            horizon,
            mode,
            evaluator: EnsembleEvaluator::new(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let forecasters = config
            .forecast
            .models
            .iter()
            .map(|model| model.build(config))
            .collect();
        Self::new(forecasters, config.forecast.horizon, config.forecast.mode())
    }

    pub fn models(&self) -> Vec<ForecastModel> {
        self.forecasters.iter().map(|f| f.model()).collect()
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn mode(&self) -> ForecastMode {
        self.mode
    }

    fn validate(&self) -> Result<()> {
        if self.horizon == 0 {
            return Err(Error::InvalidParameter("horizon must be positive".to_string()));
        }
        if self.forecasters.is_empty() {
            return Err(Error::InvalidParameter("no forecasting models configured".to_string()));
        }
        Ok(())
    }

    /// Run every model in turn on the calling thread
    pub fn run(&self, frame: &FeatureFrame) -> Result<ForecastReport> {
        self.run_with_cancel(frame, &CancelToken::new())
    }

    pub fn run_with_cancel(&self, frame: &FeatureFrame, cancel: &CancelToken) -> Result<ForecastReport> {
        self.validate()?;

        let outcomes = self
            .forecasters
            .iter()
            .map(|forecaster| {
                let request =
                    ForecastRequest::new(frame, self.horizon, self.mode).with_cancel(cancel.clone());
                ModelOutcome {
                    model: forecaster.name().to_string(),
                    result: forecaster.forecast(&request),
                }
            })
            .collect();

        Ok(self.assemble(frame, outcomes))
    }

    /// Run every model concurrently on the runner's worker pool
    pub async fn run_concurrent(&self, runner: &ForecastRunner, frame: &FeatureFrame) -> Result<ForecastReport> {
        self.validate()?;

        let outcomes = runner
            .run_all(self.forecasters.clone(), frame, self.horizon, self.mode)
            .await;

        Ok(self.assemble(frame, outcomes))
    }

    fn assemble(&self, frame: &FeatureFrame, outcomes: Vec<ModelOutcome>) -> ForecastReport {
        let mut forecasts = Vec::new();
        let mut failures = Vec::new();

        for outcome in outcomes {
            match outcome.result {
                Ok(forecast) => forecasts.push(forecast),
                Err(e) => {
                    warn!(model = %outcome.model, error = %e, "forecaster failed");
                    failures.push(ModelFailure::new(outcome.model, &e));
                }
            }
        }

        let actuals = match self.mode {
            ForecastMode::Backtest => Some(frame.to_series().last_n(self.horizon)),
            ForecastMode::Future => None,
        };

        let metrics = match &actuals {
            Some(actuals) if !forecasts.is_empty() => {
                match self.evaluator.evaluate(&forecasts, actuals) {
                    Ok(table) => table,
                    Err(e) => {
                        warn!(error = %e, "backtest metrics unavailable");
                        MetricsTable {
                            rows: Vec::new(),
                            failures: forecasts
                                .iter()
                                .map(|f| ModelFailure::new(f.model.clone(), &e))
                                .collect(),
                        }
                    }
                }
            }
            _ => MetricsTable::default(),
        };

        info!(
            mode = ?self.mode,
            horizon = self.horizon,
            succeeded = forecasts.len(),
            failed = failures.len(),
            "forecast run complete"
        );

        ForecastReport {
            mode: self.mode,
            horizon: self.horizon,
            forecasts,
            actuals,
            metrics,
            failures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PricePoint;
    use crate::model::{AdditiveForecaster, ArimaForecaster};
    use chrono::NaiveDate;

    fn frame(n: usize) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + (i as f64 * 0.25).sin() * 3.0 + i as f64 * 0.1).collect();
        FeatureFrame::from_prices(&PriceSeries::from_closes(start, &closes))
    }

    fn pipeline(mode: ForecastMode) -> ForecastPipeline {
        ForecastPipeline::new(
            vec![
                Arc::new(ArimaForecaster::default()),
                Arc::new(AdditiveForecaster::default()),
            ],
            5,
            mode,
        )
    }

    #[test]
    fn test_backtest_scores_every_model() {
        let report = pipeline(ForecastMode::Backtest).run(&frame(60)).unwrap();

        assert_eq!(report.forecasts.len(), 2);
        assert_eq!(report.metrics.len(), 2);
        assert_eq!(report.actuals.as_ref().unwrap().len(), 5);
        assert!(report.metrics.get("ARIMA").unwrap().rmse.is_finite());
        assert_eq!(report.metrics.get("Additive").unwrap().points, 5);
    }

    #[test]
    fn test_future_mode_has_no_metrics() {
        let frame = frame(60);
        let report = pipeline(ForecastMode::Future).run(&frame).unwrap();

        assert!(report.metrics.is_empty());
        assert!(report.actuals.is_none());
        let forecast = report.forecast("ARIMA").unwrap();
        assert!(forecast.dates()[0] > *frame.dates().last().unwrap());
    }

    #[test]
    fn test_one_model_failing_keeps_the_others() {
        // 17 rows minus 5 held out leaves 12, too few for ARIMA(5,1,0)
        let report = pipeline(ForecastMode::Backtest).run(&frame(17)).unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].model, "ARIMA");
        assert!(report.forecast("Additive").is_some());
        assert!(report.metrics.get("Additive").is_some());
    }

    #[test]
    fn test_backtest_pairs_steps_across_a_market_holiday() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let holiday = NaiveDate::from_ymd_opt(2024, 2, 23).unwrap();
        let dates: Vec<NaiveDate> = PriceSeries::from_closes(start, &[0.0; 41])
            .dates()
            .iter()
            .copied()
            .filter(|d| *d != holiday)
            .collect();
        let points = dates
            .iter()
            .enumerate()
            .map(|(i, &d)| PricePoint::new(d, 100.0 + i as f64 * 0.5))
            .collect();
        let frame = FeatureFrame::from_prices(&PriceSeries::new(points).unwrap());
        assert!(frame.dates()[35..].iter().any(|d| *d > holiday));
        assert!(frame.dates()[35] < holiday);

        let pipeline = ForecastPipeline::new(vec![Arc::new(ArimaForecaster::default())], 5, ForecastMode::Backtest);
        let report = pipeline.run(&frame).unwrap();

        let row = report.metrics.get("ARIMA").unwrap();
        assert_eq!(row.points, 5);
        assert!(row.rmse < 1e-6);
        assert_eq!(report.forecast("ARIMA").unwrap().dates(), frame.dates()[35..].to_vec());
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let pipeline = ForecastPipeline::new(vec![Arc::new(ArimaForecaster::default())], 0, ForecastMode::Future);
        assert!(pipeline.run(&frame(30)).is_err());
    }

    #[tokio::test]
    async fn test_concurrent_run_matches_sequential() {
        let frame = frame(60);
        let pipeline = pipeline(ForecastMode::Backtest);
        let runner = ForecastRunner::with_limits(std::time::Duration::from_secs(30), 2);

        let sequential = pipeline.run(&frame).unwrap();
        let concurrent = pipeline.run_concurrent(&runner, &frame).await.unwrap();

        assert_eq!(sequential.forecasts, concurrent.forecasts);
        assert_eq!(sequential.metrics, concurrent.metrics);
    }
}
