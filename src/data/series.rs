//! Price series and aligned feature frames

use chrono::NaiveDate;
use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};

use super::calendar::{is_business_day, next_business_day};
use crate::preprocessing::indicators::{macd, rsi};
use crate::{Error, Result};

/// RSI lookback used for the momentum oscillator column
pub const RSI_PERIOD: usize = 14;
/// MACD fast/slow EMA spans used for the trend oscillator column
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;

/// Single closing price observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }
}

/// Ordered closing prices with strictly increasing dates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    dates: Vec<NaiveDate>,
    closes: Vec<f64>,
}

impl PriceSeries {
    /// Build a series, rejecting duplicate or out-of-order dates
    pub fn new(points: Vec<PricePoint>) -> Result<Self> {
        if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(Error::InvalidParameter(format!(
                "price dates must be strictly increasing: {} follows {}",
                pair[1].date, pair[0].date
            )));
        }

        let (dates, closes) = points.into_iter().map(|p| (p.date, p.close)).unzip();
        Ok(Self { dates, closes })
    }

    /// Lay closes out on consecutive business days starting at `start`
    /// (rolled forward to a business day if needed)
    pub fn from_closes(start: NaiveDate, closes: &[f64]) -> Self {
        let mut dates = Vec::with_capacity(closes.len());
        let mut current = if is_business_day(start) {
            start
        } else {
            next_business_day(start)
        };
        for _ in closes {
            dates.push(current);
            current = next_business_day(current);
        }

        Self {
            dates,
            closes: closes.to_vec(),
        }
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn closes(&self) -> &[f64] {
        &self.closes
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }

    pub fn points(&self) -> impl Iterator<Item = PricePoint> + '_ {
        self.dates
            .iter()
            .zip(self.closes.iter())
            .map(|(&date, &close)| PricePoint { date, close })
    }

    /// Everything except the last `n` observations
    pub fn without_last(&self, n: usize) -> Self {
        let end = self.len().saturating_sub(n);
        Self {
            dates: self.dates[..end].to_vec(),
            closes: self.closes[..end].to_vec(),
        }
    }

    /// The last `n` observations
    pub fn last_n(&self, n: usize) -> Self {
        let start = self.len().saturating_sub(n);
        Self {
            dates: self.dates[start..].to_vec(),
            closes: self.closes[start..].to_vec(),
        }
    }

    /// Period-over-period percentage returns, dated at the later observation
    pub fn pct_returns(&self) -> Vec<PricePoint> {
        self.closes
            .windows(2)
            .zip(self.dates.iter().skip(1))
            .map(|(w, &date)| {
                let close = if w[0] != 0.0 {
                    (w[1] - w[0]) / w[0]
                } else {
                    f64::NAN
                };
                PricePoint { date, close }
            })
            .collect()
    }
}

/// Price column plus optional derived columns on the same date index
///
/// Column 0 is always the closing price. Rows with any missing value are
/// dropped on construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureFrame {
    dates: Vec<NaiveDate>,
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureFrame {
    /// Single-column frame holding only closing prices
    pub fn from_prices(series: &PriceSeries) -> Self {
        let values = Array2::from_shape_vec((series.len(), 1), series.closes().to_vec())
            .unwrap_or_else(|_| Array2::zeros((0, 1)));

        Self {
            dates: series.dates().to_vec(),
            columns: vec!["close".to_string()],
            values,
        }
    }

    /// Close, RSI, MACD and (when supplied) volume columns
    pub fn with_indicators(series: &PriceSeries, volume: Option<&[f64]>) -> Result<Self> {
        let closes = series.closes();
        let mut columns = vec![
            "close".to_string(),
            "rsi".to_string(),
            "macd".to_string(),
        ];
        let rsi_values = rsi(closes, RSI_PERIOD);
        let macd_values = macd(closes, MACD_FAST, MACD_SLOW);

        let mut data: Vec<Vec<f64>> = vec![closes.to_vec(), rsi_values, macd_values];

        if let Some(volume) = volume {
            if volume.len() != closes.len() {
                return Err(Error::InvalidParameter(format!(
                    "volume has {} rows but the price series has {}",
                    volume.len(),
                    closes.len()
                )));
            }
            columns.push("volume".to_string());
            data.push(volume.to_vec());
        }

        Self::from_columns(series.dates().to_vec(), columns, &data)
    }

    /// Assemble a frame from column vectors, dropping rows with NaN
    pub fn from_columns(dates: Vec<NaiveDate>, columns: Vec<String>, data: &[Vec<f64>]) -> Result<Self> {
        if columns.is_empty() || columns.len() != data.len() {
            return Err(Error::InvalidParameter(format!(
                "{} column names for {} columns",
                columns.len(),
                data.len()
            )));
        }
        if let Some(bad) = data.iter().find(|col| col.len() != dates.len()) {
            return Err(Error::InvalidParameter(format!(
                "column has {} rows but the index has {}",
                bad.len(),
                dates.len()
            )));
        }

        let keep: Vec<usize> = (0..dates.len())
            .filter(|&row| data.iter().all(|col| col[row].is_finite()))
            .collect();

        let mut values = Array2::zeros((keep.len(), columns.len()));
        for (out_row, &row) in keep.iter().enumerate() {
            for (col_idx, col) in data.iter().enumerate() {
                values[[out_row, col_idx]] = col[row];
            }
        }

        Ok(Self {
            dates: keep.iter().map(|&row| dates[row]).collect(),
            columns,
            values,
        })
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// The price column
    pub fn closes(&self) -> Vec<f64> {
        self.values.column(0).to_vec()
    }

    /// Frame restricted to the price column
    pub fn price_only(&self) -> Self {
        Self {
            dates: self.dates.clone(),
            columns: vec![self.columns[0].clone()],
            values: self.values.slice(s![.., 0..1]).to_owned(),
        }
    }

    /// First `rows` rows
    pub fn head(&self, rows: usize) -> Self {
        let rows = rows.min(self.nrows());
        Self {
            dates: self.dates[..rows].to_vec(),
            columns: self.columns.clone(),
            values: self.values.slice(s![..rows, ..]).to_owned(),
        }
    }

    /// Price column as a series
    pub fn to_series(&self) -> PriceSeries {
        PriceSeries {
            dates: self.dates.clone(),
            closes: self.closes(),
        }
    }

    /// Enforce the `rows >= lookback + horizon` invariant
    pub fn ensure_capacity(&self, lookback: usize, horizon: usize) -> Result<()> {
        let needed = lookback + horizon;
        if self.nrows() < needed {
            return Err(Error::insufficient("feature frame", needed, self.nrows()));
        }
        Ok(())
    }

    /// Whether every value is finite
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }
}
