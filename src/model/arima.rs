//! ARIMA model for price forecasting

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use tracing::{debug, info};

use super::{Forecast, ForecastModel, ForecastRequest, Forecaster};
use crate::{Error, Result};

/// ARIMA order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArimaParams {
    pub p: usize, // AR order
    pub d: usize, // differencing order
    pub q: usize, // MA order
}

impl ArimaParams {
    pub fn new(p: usize, d: usize, q: usize) -> Self {
        Self { p, d, q }
    }

    /// Shortest series the estimator accepts for this order
    pub fn min_observations(&self) -> usize {
        let (p, d, q) = (self.p, self.d, self.q);
        let estimation = if q == 0 { 2 * p + 2 } else { 2 * p + 3 * q + 3 };
        (2 * (p + d + q)).max(d + estimation)
    }
}

impl Default for ArimaParams {
    fn default() -> Self {
        Self::new(5, 1, 0)
    }
}

/// Fitted ARIMA model
#[derive(Debug, Clone)]
pub struct ArimaModel {
    pub params: ArimaParams,
    pub ar_coeffs: Vec<f64>, // φ
    pub ma_coeffs: Vec<f64>, // θ
    pub constant: f64,
    pub residuals: Vec<f64>,
    pub sigma2: f64,
    pub aic: f64,
    pub bic: f64,
    history: Vec<f64>,
}

struct ArmaEstimate {
    ar: Vec<f64>,
    ma: Vec<f64>,
    constant: f64,
    residuals: Vec<f64>,
}

impl ArimaModel {
    /// Fit the model by conditional least squares
    ///
    /// Pure AR orders are solved directly; MA terms use the two-stage
    /// Hannan-Rissanen regression on long-AR residuals.
    pub fn fit(data: &[f64], params: ArimaParams) -> Result<Self> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(Error::ModelFit(
                "ARIMA input contains non-finite values".to_string(),
            ));
        }

        let needed = params.min_observations();
        if data.len() < needed {
            return Err(Error::ModelFit(format!(
                "ARIMA({},{},{}) needs at least {} observations, got {}",
                params.p,
                params.d,
                params.q,
                needed,
                data.len()
            )));
        }

        let diff_data = difference(data, params.d);
        let estimate = if params.q == 0 {
            estimate_ar(&diff_data, params.p)?
        } else {
            estimate_arma(&diff_data, params.p, params.q)?
        };

        let n = estimate.residuals.len() as f64;
        let k = (params.p + params.q + 1) as f64;
        let sigma2 = estimate.residuals.iter().map(|r| r * r).sum::<f64>() / n;
        // Perfect fits would send the likelihood to infinity
        let log_likelihood =
            -0.5 * n * (1.0 + (2.0 * std::f64::consts::PI * sigma2.max(1e-12)).ln());

        let aic = -2.0 * log_likelihood + 2.0 * k;
        let bic = -2.0 * log_likelihood + k * n.ln();

        Ok(Self {
            params,
            ar_coeffs: estimate.ar,
            ma_coeffs: estimate.ma,
            constant: estimate.constant,
            residuals: estimate.residuals,
            sigma2,
            aic,
            bic,
            history: data.to_vec(),
        })
    }

    /// Point forecast `h` steps past the fitted history
    pub fn forecast(&self, h: usize) -> Vec<f64> {
        let p = self.params.p;
        let q = self.params.q;

        let mut extended = difference(&self.history, self.params.d);
        let mut extended_residuals = self.residuals.clone();
        let mut forecasts = Vec::with_capacity(h);

        for _ in 0..h {
            let mut next = self.constant;
            for i in 0..p {
                next += self.ar_coeffs[i] * extended[extended.len() - 1 - i];
            }
            for i in 0..q.min(extended_residuals.len()) {
                next += self.ma_coeffs[i] * extended_residuals[extended_residuals.len() - 1 - i];
            }

            extended.push(next);
            // Future shocks have zero expectation
            extended_residuals.push(0.0);
            forecasts.push(next);
        }

        // Undo differencing one level at a time, innermost first
        let mut result = forecasts;
        for level in (0..self.params.d).rev() {
            let anchor = difference(&self.history, level).last().copied().unwrap_or(0.0);
            result = integrate(&result, anchor);
        }
        result
    }

    /// Point forecast with a symmetric normal interval
    ///
    /// Standard errors follow the psi-weights of the integrated process, so
    /// intervals widen with the horizon.
    pub fn forecast_interval(&self, h: usize, confidence: f64) -> Result<ForecastInterval> {
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "confidence must lie in (0, 1), got {}",
                confidence
            )));
        }
        let normal = Normal::new(0.0, 1.0).map_err(|e| Error::ModelFit(e.to_string()))?;
        let z = normal.inverse_cdf(0.5 + confidence / 2.0);

        let point = self.forecast(h);
        let psi = self.psi_weights(h);
        let sigma = self.sigma2.sqrt();

        let mut cumulative = 0.0;
        let mut lower = Vec::with_capacity(h);
        let mut upper = Vec::with_capacity(h);
        for (f, weight) in point.iter().zip(psi.iter()) {
            cumulative += weight * weight;
            let se = sigma * cumulative.sqrt();
            lower.push(f - z * se);
            upper.push(f + z * se);
        }

        Ok(ForecastInterval {
            point,
            lower,
            upper,
            confidence,
        })
    }

    /// MA(∞) weights of phi(B)(1-B)^d x_t = theta(B) e_t
    fn psi_weights(&self, h: usize) -> Vec<f64> {
        let mut poly = vec![1.0];
        poly.extend(self.ar_coeffs.iter().map(|c| -c));
        for _ in 0..self.params.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, &c) in poly.iter().enumerate() {
                next[i] += c;
                next[i + 1] -= c;
            }
            poly = next;
        }

        let mut psi = vec![0.0; h];
        for j in 0..h {
            if j == 0 {
                psi[0] = 1.0;
                continue;
            }
            let mut value = self.ma_coeffs.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..poly.len().min(j + 1) {
                value -= poly[i] * psi[j - i];
            }
            psi[j] = value;
        }
        psi
    }

    /// Human-readable coefficient table
    pub fn summary(&self) -> String {
        let mut s = format!(
            "ARIMA({},{},{}) Model Summary\n",
            self.params.p, self.params.d, self.params.q
        );
        s.push_str(&"=".repeat(40));
        s.push('\n');

        if !self.ar_coeffs.is_empty() {
            s.push_str("AR Coefficients:\n");
            for (i, &c) in self.ar_coeffs.iter().enumerate() {
                s.push_str(&format!("  φ{} = {:.6}\n", i + 1, c));
            }
        }

        if !self.ma_coeffs.is_empty() {
            s.push_str("MA Coefficients:\n");
            for (i, &c) in self.ma_coeffs.iter().enumerate() {
                s.push_str(&format!("  θ{} = {:.6}\n", i + 1, c));
            }
        }

        s.push_str(&format!("Constant: {:.6}\n", self.constant));
        s.push_str(&format!("Sigma²: {:.6}\n", self.sigma2));
        s.push_str(&format!("AIC: {:.2}\n", self.aic));
        s.push_str(&format!("BIC: {:.2}\n", self.bic));

        s
    }
}

/// Forecast with confidence bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastInterval {
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence: f64,
}

/// Difference a series `d` times
pub fn difference(data: &[f64], d: usize) -> Vec<f64> {
    let mut result = data.to_vec();
    for _ in 0..d {
        if result.len() < 2 {
            return vec![];
        }
        result = result.windows(2).map(|w| w[1] - w[0]).collect();
    }
    result
}

fn integrate(diff: &[f64], start: f64) -> Vec<f64> {
    let mut result = Vec::with_capacity(diff.len());
    let mut cumsum = start;
    for &d in diff {
        cumsum += d;
        result.push(cumsum);
    }
    result
}

/// Relative cutoff below which a singular value counts as zero
const SINGULAR_CUTOFF: f64 = 1e-8;

/// Minimum-norm least squares via SVD
///
/// Rank-deficient designs (a flat series has all-zero lags, a polynomial
/// trend differenced to a constant has collinear lags) resolve to the
/// smallest coefficient vector instead of failing.
fn least_squares(x: DMatrix<f64>, y: &DVector<f64>) -> Result<DVector<f64>> {
    let scale = (x.nrows().max(x.ncols()) as f64 * f64::EPSILON).max(SINGULAR_CUTOFF);
    let svd = x.svd(true, true);
    let tolerance = svd.singular_values.max() * scale;
    let beta = svd
        .solve(y, tolerance)
        .map_err(|e| Error::ModelFit(format!("least squares solve failed: {}", e)))?;

    if beta.iter().any(|b| !b.is_finite()) {
        return Err(Error::ModelFit(
            "least squares produced non-finite coefficients".to_string(),
        ));
    }
    Ok(beta)
}

/// Regress `y_t` on `[1, y_{t-1}, ..., y_{t-p}]`
fn estimate_ar(data: &[f64], p: usize) -> Result<ArmaEstimate> {
    let n = data.len();
    if n < 2 * p + 2 {
        return Err(Error::ModelFit(format!(
            "AR({}) estimation needs {} points, got {}",
            p,
            2 * p + 2,
            n
        )));
    }

    let effective_n = n - p;
    let mut x_data = Vec::with_capacity(effective_n * (p + 1));
    for t in p..n {
        x_data.push(1.0);
        for i in 1..=p {
            x_data.push(data[t - i]);
        }
    }

    let x = DMatrix::from_row_slice(effective_n, p + 1, &x_data);
    let y = DVector::from_column_slice(&data[p..]);
    let beta = least_squares(x.clone(), &y)?;

    let residuals: Vec<f64> = (&y - &x * &beta).iter().copied().collect();

    Ok(ArmaEstimate {
        ar: beta.iter().skip(1).copied().collect(),
        ma: vec![],
        constant: beta[0],
        residuals,
    })
}

/// Hannan-Rissanen two-stage ARMA(p, q) estimate
fn estimate_arma(data: &[f64], p: usize, q: usize) -> Result<ArmaEstimate> {
    let n = data.len();
    let mean = data.iter().sum::<f64>() / n as f64;
    let centered: Vec<f64> = data.iter().map(|x| x - mean).collect();

    // Stage 1: long AR for proxy innovations
    let long_order = p + q + 1;
    let stage_one = estimate_ar(&centered, long_order)?;
    let mut innovations = vec![0.0; long_order];
    innovations.extend(stage_one.residuals.iter().copied());

    // Stage 2: regress on lagged values and lagged innovations
    let start = long_order + q.max(p);
    let num_params = p + q + 1;
    if n < start + num_params + 1 {
        return Err(Error::ModelFit(format!(
            "ARMA({},{}) estimation needs {} points, got {}",
            p,
            q,
            start + num_params + 1,
            n
        )));
    }
    let effective_n = n - start;

    let mut x_data = Vec::with_capacity(effective_n * num_params);
    for t in start..n {
        x_data.push(1.0);
        for i in 1..=p {
            x_data.push(centered[t - i]);
        }
        for i in 1..=q {
            x_data.push(innovations[t - i]);
        }
    }

    let x = DMatrix::from_row_slice(effective_n, num_params, &x_data);
    let y = DVector::from_column_slice(&centered[start..]);
    let beta = least_squares(x.clone(), &y)?;

    let ar: Vec<f64> = beta.iter().skip(1).take(p).copied().collect();
    let ma: Vec<f64> = beta.iter().skip(1 + p).take(q).copied().collect();
    // Map the centered intercept back to the raw scale
    let constant = beta[0] + mean * (1.0 - ar.iter().sum::<f64>());
    let residuals: Vec<f64> = (&y - &x * &beta).iter().copied().collect();

    Ok(ArmaEstimate {
        ar,
        ma,
        constant,
        residuals,
    })
}

/// ARIMA member of the forecaster ensemble
#[derive(Debug, Clone, Default)]
pub struct ArimaForecaster {
    params: ArimaParams,
}

impl ArimaForecaster {
    pub fn new(params: ArimaParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> ArimaParams {
        self.params
    }
}

impl Forecaster for ArimaForecaster {
    fn model(&self) -> ForecastModel {
        ForecastModel::AutoRegressive
    }

    fn forecast(&self, request: &ForecastRequest<'_>) -> Result<Forecast> {
        let train_rows = request.train_rows()?;
        request.cancel.check(self.name())?;

        let closes = request.frame.closes();
        let model = ArimaModel::fit(&closes[..train_rows], self.params)?;
        info!(
            p = self.params.p,
            d = self.params.d,
            q = self.params.q,
            sigma2 = model.sigma2,
            aic = model.aic,
            "ARIMA fitted"
        );

        let values = model.forecast(request.horizon);
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::ModelFit(
                "ARIMA forecast diverged to non-finite values".to_string(),
            ));
        }
        debug!(horizon = request.horizon, "ARIMA forecast complete");

        let dates = request.forecast_dates(train_rows)?;
        Ok(Forecast::new(self.name(), &dates, &values))
    }
}
