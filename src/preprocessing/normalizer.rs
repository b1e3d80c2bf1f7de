//! Min-max scaling into [0, 1]

use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Per-column min-max scaler
///
/// Fitted once, reused for every transform and inverse transform of the
/// same dataset. A constant column maps to 0 and inverts back to its value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxNormalizer {
    min: Array1<f64>,
    max: Array1<f64>,
}

impl MinMaxNormalizer {
    /// Fit column ranges on `data` (rows are observations)
    pub fn fit(data: ArrayView2<'_, f64>) -> Result<Self> {
        if data.nrows() == 0 {
            return Err(Error::insufficient("min-max scaler", 1, 0));
        }

        let min = data.fold_axis(Axis(0), f64::INFINITY, |&a, &b| a.min(b));
        let max = data.fold_axis(Axis(0), f64::NEG_INFINITY, |&a, &b| a.max(b));

        if min.iter().chain(max.iter()).any(|v| !v.is_finite()) {
            return Err(Error::InvalidParameter(
                "cannot scale non-finite values".to_string(),
            ));
        }

        Ok(Self { min, max })
    }

    pub fn n_features(&self) -> usize {
        self.min.len()
    }

    pub fn min_vals(&self) -> &Array1<f64> {
        &self.min
    }

    pub fn max_vals(&self) -> &Array1<f64> {
        &self.max
    }

    fn range(&self, column: usize) -> f64 {
        let range = self.max[column] - self.min[column];
        if range > 1e-10 {
            range
        } else {
            1.0
        }
    }

    /// Scale every column with the fitted ranges
    pub fn transform(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut result = data.to_owned();
        for (i, mut col) in result.columns_mut().into_iter().enumerate() {
            let (min, range) = (self.min[i], self.range(i));
            col.mapv_inplace(|x| (x - min) / range);
        }
        result
    }

    /// Undo [`transform`](Self::transform)
    pub fn inverse_transform(&self, data: ArrayView2<'_, f64>) -> Array2<f64> {
        let mut result = data.to_owned();
        for (i, mut col) in result.columns_mut().into_iter().enumerate() {
            let (min, range) = (self.min[i], self.range(i));
            col.mapv_inplace(|x| x * range + min);
        }
        result
    }

    /// Invert a single scaled value of one column
    pub fn inverse_value(&self, column: usize, scaled: f64) -> f64 {
        scaled * self.range(column) + self.min[column]
    }
}
