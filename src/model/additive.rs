//! Additive trend + seasonality forecaster

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Forecast, ForecastModel, ForecastRequest, Forecaster};
use crate::{Error, Result};

/// Additive decomposition `y = trend + seasonal + residual`
///
/// The trend is a least-squares line over the time index; the seasonal
/// component is the mean detrended value per position in the period,
/// normalised to sum to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decomposition {
    pub intercept: f64,
    pub slope: f64,
    /// One value per position `t % period`
    pub seasonal_indices: Vec<f64>,
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub period: usize,
}

impl Decomposition {
    /// Decompose `data` with the given seasonal period
    pub fn fit(data: &[f64], period: usize) -> Result<Self> {
        if period == 0 {
            return Err(Error::InvalidParameter(
                "seasonal period must be positive".to_string(),
            ));
        }
        let n = data.len();
        if n < period * 2 || n < 2 {
            return Err(Error::insufficient(
                "additive decomposition",
                (period * 2).max(2),
                n,
            ));
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::ModelFit(
                "additive model input contains non-finite values".to_string(),
            ));
        }

        // 1. Linear trend over t = 0..n
        let t_mean = (n - 1) as f64 / 2.0;
        let y_mean = data.iter().sum::<f64>() / n as f64;
        let (mut sxy, mut sxx) = (0.0, 0.0);
        for (t, &y) in data.iter().enumerate() {
            let dt = t as f64 - t_mean;
            sxy += dt * (y - y_mean);
            sxx += dt * dt;
        }
        let slope = sxy / sxx;
        let intercept = y_mean - slope * t_mean;
        let trend: Vec<f64> = (0..n).map(|t| intercept + slope * t as f64).collect();

        // 2. Seasonal indices on the detrended series
        let mut seasonal_indices = vec![0.0; period];
        let mut counts = vec![0usize; period];
        for (t, (&y, &tr)) in data.iter().zip(trend.iter()).enumerate() {
            seasonal_indices[t % period] += y - tr;
            counts[t % period] += 1;
        }
        for (s, &count) in seasonal_indices.iter_mut().zip(counts.iter()) {
            *s /= count as f64;
        }
        let avg = seasonal_indices.iter().sum::<f64>() / period as f64;
        for s in &mut seasonal_indices {
            *s -= avg;
        }

        // 3. Spread over the series and take the remainder
        let seasonal: Vec<f64> = (0..n).map(|t| seasonal_indices[t % period]).collect();
        let residual: Vec<f64> = data
            .iter()
            .zip(trend.iter())
            .zip(seasonal.iter())
            .map(|((&y, &tr), &s)| y - tr - s)
            .collect();

        Ok(Self {
            intercept,
            slope,
            seasonal_indices,
            trend,
            seasonal,
            residual,
            period,
        })
    }

    /// Extrapolate `h` steps past the fitted data
    pub fn extrapolate(&self, h: usize) -> Vec<f64> {
        let n = self.trend.len();
        (n..n + h)
            .map(|t| self.intercept + self.slope * t as f64 + self.seasonal_indices[t % self.period])
            .collect()
    }

    /// Share of detrended variance explained by seasonality, in [0, 1]
    pub fn seasonality_strength(&self) -> f64 {
        let detrended: Vec<f64> = self
            .residual
            .iter()
            .zip(self.seasonal.iter())
            .map(|(r, s)| r + s)
            .collect();

        let var_detrended = variance(&detrended);
        if var_detrended == 0.0 {
            return 0.0;
        }
        (1.0 - variance(&self.residual) / var_detrended).max(0.0)
    }
}

fn variance(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mean = data.iter().sum::<f64>() / data.len() as f64;
    data.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / data.len() as f64
}

/// Additive-decomposition member of the forecaster ensemble
#[derive(Debug, Clone)]
pub struct AdditiveForecaster {
    period: usize,
}

impl AdditiveForecaster {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

impl Default for AdditiveForecaster {
    /// Five business days per seasonal cycle
    fn default() -> Self {
        Self::new(5)
    }
}

impl Forecaster for AdditiveForecaster {
    fn model(&self) -> ForecastModel {
        ForecastModel::AdditiveDecomposition
    }

    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<Forecast> {
        let train_rows = request.train_rows()?;
        request.cancel.check(self.name())?;

        let closes = request.frame.closes();
        let decomposition = Decomposition::fit(&closes[..train_rows], self.period)?;
        info!(
            slope = decomposition.slope,
            period = self.period,
            seasonality = decomposition.seasonality_strength(),
            "additive model fitted"
        );

        let values = decomposition.extrapolate(request.horizon);
        let dates = request.forecast_dates(train_rows)?;
        Ok(Forecast::new(self.name(), &dates, &values))
    }
}
