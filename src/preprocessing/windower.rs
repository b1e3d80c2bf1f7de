//! Sliding lookback windows for the sequence model

use chrono::NaiveDate;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2, ArrayView3};
use tracing::debug;

use super::normalizer::MinMaxNormalizer;
use crate::data::FeatureFrame;
use crate::{Error, Result};

/// Builds stride-1 windows of fixed length over a feature frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureWindower {
    /// Number of trailing rows per window (L)
    pub lookback: usize,
}

impl FeatureWindower {
    pub fn new(lookback: usize) -> Self {
        Self { lookback }
    }

    /// Scale the frame and cut it into windows
    ///
    /// The scaler is fitted on the first `train_rows` rows only. Window `i`
    /// covers rows `[i, i + L)` and its target is the scaled price at row
    /// `i + L`, giving `nrows - L` windows in total.
    pub fn fit_transform(&self, frame: &FeatureFrame, train_rows: usize) -> Result<WindowedDataset> {
        let n_rows = frame.nrows();
        let lookback = self.lookback;

        if lookback == 0 {
            return Err(Error::InvalidParameter("lookback must be positive".to_string()));
        }
        if n_rows < lookback + 1 {
            return Err(Error::insufficient("feature windows", lookback + 1, n_rows));
        }
        if train_rows < lookback + 1 || train_rows > n_rows {
            return Err(Error::insufficient("training slice", lookback + 1, train_rows.min(n_rows)));
        }

        let scaler = MinMaxNormalizer::fit(frame.values().slice(s![..train_rows, ..]))?;
        let scaled = scaler.transform(frame.values().view());

        let n_windows = n_rows - lookback;
        let n_features = frame.ncols();
        let mut inputs = Array3::zeros((n_windows, lookback, n_features));
        let mut targets = Array1::zeros(n_windows);

        for i in 0..n_windows {
            inputs
                .slice_mut(s![i, .., ..])
                .assign(&scaled.slice(s![i..i + lookback, ..]));
            targets[i] = scaled[[i + lookback, 0]];
        }

        debug!(
            windows = n_windows,
            lookback,
            features = n_features,
            train_rows,
            "built windowed dataset"
        );

        Ok(WindowedDataset {
            inputs,
            targets,
            scaled,
            scaler,
            dates: frame.dates().to_vec(),
            lookback,
            train_rows,
        })
    }
}

/// Scaled windows plus the scaler needed to map predictions back to prices
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    inputs: Array3<f64>,
    targets: Array1<f64>,
    scaled: Array2<f64>,
    scaler: MinMaxNormalizer,
    dates: Vec<NaiveDate>,
    lookback: usize,
    train_rows: usize,
}

impl WindowedDataset {
    /// Number of windows
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn lookback(&self) -> usize {
        self.lookback
    }

    pub fn n_features(&self) -> usize {
        self.inputs.shape()[2]
    }

    pub fn train_rows(&self) -> usize {
        self.train_rows
    }

    pub fn scaler(&self) -> &MinMaxNormalizer {
        &self.scaler
    }

    pub fn inputs(&self) -> ArrayView3<'_, f64> {
        self.inputs.view()
    }

    pub fn targets(&self) -> ArrayView1<'_, f64> {
        self.targets.view()
    }

    /// Number of windows whose target lies inside the training slice
    pub fn train_len(&self) -> usize {
        self.train_rows - self.lookback
    }

    /// Windows and targets usable for fitting
    pub fn training_set(&self) -> (ArrayView3<'_, f64>, ArrayView1<'_, f64>) {
        let n = self.train_len();
        (
            self.inputs.slice(s![..n, .., ..]),
            self.targets.slice(s![..n]),
        )
    }

    /// The last `L` scaled rows of the training slice, seed of a recursive forecast
    pub fn last_training_window(&self) -> ArrayView2<'_, f64> {
        self.scaled
            .slice(s![self.train_rows - self.lookback..self.train_rows, ..])
    }

    /// Date of the last training row
    pub fn last_training_date(&self) -> Option<NaiveDate> {
        self.dates.get(self.train_rows.checked_sub(1)?).copied()
    }

    /// Map a scaled price prediction back to price units
    pub fn inverse_price(&self, scaled: f64) -> f64 {
        self.scaler.inverse_value(0, scaled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PriceSeries;

    fn frame(closes: &[f64]) -> FeatureFrame {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        FeatureFrame::from_prices(&PriceSeries::from_closes(start, closes))
    }

    #[test]
    fn test_window_count_and_shape() {
        let closes: Vec<f64> = (0..50).map(|i| i as f64).collect();
        let dataset = FeatureWindower::new(10).fit_transform(&frame(&closes), 45).unwrap();

        assert_eq!(dataset.len(), 40);
        assert_eq!(dataset.inputs().shape(), &[40, 10, 1]);
        assert_eq!(dataset.train_len(), 35);
    }

    #[test]
    fn test_target_is_next_row() {
        let closes: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let dataset = FeatureWindower::new(5).fit_transform(&frame(&closes), 20).unwrap();

        // Scaled on [0, 19]: row k maps to k / 19
        for i in 0..dataset.len() {
            let expected = (i + 5) as f64 / 19.0;
            assert!((dataset.targets()[i] - expected).abs() < 1e-12);
            assert!((dataset.inputs()[[i, 4, 0]] - (i + 4) as f64 / 19.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_scaler_fit_on_training_slice_only() {
        let mut closes: Vec<f64> = vec![10.0; 30];
        closes.extend(vec![1_000.0; 5]);
        let dataset = FeatureWindower::new(10).fit_transform(&frame(&closes), 30).unwrap();

        assert_eq!(dataset.scaler().max_vals()[0], 10.0);
        assert_eq!(dataset.scaler().min_vals()[0], 10.0);
    }

    #[test]
    fn test_insufficient_rows() {
        let result = FeatureWindower::new(10).fit_transform(&frame(&[1.0; 10]), 10);
        assert!(matches!(result, Err(Error::InsufficientData { needed: 11, .. })));
    }

    #[test]
    fn test_last_training_window() {
        let closes: Vec<f64> = (0..30).map(|i| i as f64).collect();
        let dataset = FeatureWindower::new(4).fit_transform(&frame(&closes), 25).unwrap();
        let window = dataset.last_training_window();

        assert_eq!(window.nrows(), 4);
        // Rows 21..25 scaled on [0, 24]
        assert!((window[[3, 0]] - 1.0).abs() < 1e-12);
        assert!((dataset.inverse_price(window[[0, 0]]) - 21.0).abs() < 1e-9);
    }
}
