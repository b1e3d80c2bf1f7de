//! Forecast-versus-actual comparison across models

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::metrics::{mae, mape, rmse};
use crate::data::PriceSeries;
use crate::model::Forecast;
use crate::{Error, Result};

/// Accuracy of one model over its aligned points
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRow {
    pub model: String,
    pub rmse: f64,
    /// Percent
    pub mape: f64,
    pub mae: f64,
    /// Number of aligned timestamps
    pub points: usize,
}

/// Why a model has no metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelFailure {
    pub model: String,
    pub reason: String,
}

impl ModelFailure {
    pub fn new(model: impl Into<String>, error: &Error) -> Self {
        Self {
            model: model.into(),
            reason: error.to_string(),
        }
    }
}

/// Comparison table keyed by model name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsTable {
    pub rows: Vec<MetricsRow>,
    pub failures: Vec<ModelFailure>,
}

impl MetricsTable {
    pub fn get(&self, model: &str) -> Option<&MetricsRow> {
        self.rows.iter().find(|row| row.model == model)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Row with the lowest RMSE
    pub fn best_by_rmse(&self) -> Option<&MetricsRow> {
        self.rows
            .iter()
            .filter(|row| row.rmse.is_finite())
            .min_by(|a, b| a.rmse.total_cmp(&b.rmse))
    }
}

impl fmt::Display for MetricsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<12} {:>12} {:>10} {:>12} {:>7}", "Model", "RMSE", "MAPE %", "MAE", "Points")?;
        for row in &self.rows {
            writeln!(
                f,
                "{:<12} {:>12.4} {:>10.2} {:>12.4} {:>7}",
                row.model, row.rmse, row.mape, row.mae, row.points
            )?;
        }
        for failure in &self.failures {
            writeln!(f, "{:<12} unavailable: {}", failure.model, failure.reason)?;
        }
        Ok(())
    }
}

/// Scores forecasts against realised prices
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsembleEvaluator;

impl EnsembleEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Metrics for one forecast over the timestamps it shares with `actuals`
    pub fn evaluate_one(&self, forecast: &Forecast, actuals: &PriceSeries) -> Result<MetricsRow> {
        let lookup: HashMap<NaiveDate, f64> = actuals.points().map(|p| (p.date, p.close)).collect();
        self.score(forecast, &lookup)
    }

    fn score(&self, forecast: &Forecast, lookup: &HashMap<NaiveDate, f64>) -> Result<MetricsRow> {
        let (actual, predicted): (Vec<f64>, Vec<f64>) = forecast
            .points
            .iter()
            .filter_map(|p| lookup.get(&p.date).map(|&a| (a, p.value)))
            .unzip();

        if actual.is_empty() {
            return Err(Error::Alignment(format!(
                "{} forecast shares no timestamps with the actual series",
                forecast.model
            )));
        }

        Ok(MetricsRow {
            model: forecast.model.clone(),
            rmse: rmse(&actual, &predicted),
            mape: mape(&actual, &predicted),
            mae: mae(&actual, &predicted),
            points: actual.len(),
        })
    }

    /// Metrics for every forecast
    ///
    /// A model without aligned points is listed under `failures`; the call
    /// fails with [`Error::Alignment`] only when no model aligns at all.
    pub fn evaluate(&self, forecasts: &[Forecast], actuals: &PriceSeries) -> Result<MetricsTable> {
        let lookup: HashMap<NaiveDate, f64> = actuals.points().map(|p| (p.date, p.close)).collect();
        let mut table = MetricsTable::default();

        for forecast in forecasts {
            match self.score(forecast, &lookup) {
                Ok(row) => {
                    debug!(model = %row.model, rmse = row.rmse, mape = row.mape, "model evaluated");
                    table.rows.push(row);
                }
                Err(e) => {
                    warn!(model = %forecast.model, error = %e, "model could not be evaluated");
                    table.failures.push(ModelFailure::new(forecast.model.clone(), &e));
                }
            }
        }

        if table.rows.is_empty() && !forecasts.is_empty() {
            return Err(Error::Alignment(
                "no forecast shares a timestamp with the actual series".to_string(),
            ));
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::business_days_after;

    fn actuals() -> PriceSeries {
        let start = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        PriceSeries::from_closes(start, &[100.0, 102.0, 101.0, 103.0, 104.0])
    }

    #[test]
    fn test_exact_forecasts_score_zero() {
        let actuals = actuals();
        let a = Forecast::new("ARIMA", actuals.dates(), actuals.closes());
        let b = Forecast::new("LSTM", actuals.dates(), actuals.closes());

        let table = EnsembleEvaluator::new().evaluate(&[a, b], &actuals).unwrap();

        assert_eq!(table.len(), 2);
        for row in &table.rows {
            assert_eq!(row.rmse, 0.0);
            assert_eq!(row.mape, 0.0);
            assert_eq!(row.points, 5);
        }
    }

    #[test]
    fn test_partial_overlap_is_truncated() {
        let actuals = actuals();
        let dates = &actuals.dates()[3..];
        let extra = business_days_after(*dates.last().unwrap(), 2);
        let all_dates: Vec<NaiveDate> = dates.iter().copied().chain(extra).collect();
        let forecast = Forecast::new("ARIMA", &all_dates, &[103.0, 106.0, 1.0, 1.0]);

        let row = EnsembleEvaluator::new().evaluate_one(&forecast, &actuals).unwrap();

        assert_eq!(row.points, 2);
        assert!((row.rmse - 2.0_f64.sqrt()).abs() < 1e-10);
    }

    #[test]
    fn test_failure_isolated_per_model() {
        let actuals = actuals();
        let good = Forecast::new("ARIMA", actuals.dates(), actuals.closes());
        let later = business_days_after(actuals.last_date().unwrap(), 3);
        let bad = Forecast::new("LSTM", &later, &[1.0, 2.0, 3.0]);

        let table = EnsembleEvaluator::new().evaluate(&[good, bad], &actuals).unwrap();

        assert!(table.get("ARIMA").is_some());
        assert!(table.get("LSTM").is_none());
        assert_eq!(table.failures[0].model, "LSTM");
        assert_eq!(table.best_by_rmse().unwrap().model, "ARIMA");
    }

    #[test]
    fn test_no_overlap_fails() {
        let actuals = actuals();
        let later = business_days_after(actuals.last_date().unwrap(), 2);
        let forecast = Forecast::new("ARIMA", &later, &[1.0, 2.0]);

        let result = EnsembleEvaluator::new().evaluate(&[forecast], &actuals);
        assert!(matches!(result, Err(Error::Alignment(_))));
    }
}
