//! # Preprocessing
//!
//! Preparing price data for the sequence model:
//! - Min-max scaling fitted on the training slice only
//! - Sliding lookback windows with stride 1
//! - Technical indicators for the optional feature columns
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use quant_signal_engine::data::{FeatureFrame, PriceSeries};
//! use quant_signal_engine::preprocessing::FeatureWindower;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
//! let frame = FeatureFrame::from_prices(&PriceSeries::from_closes(start, &closes));
//!
//! // 10 steps back, scaler fitted on the first 35 rows
//! let dataset = FeatureWindower::new(10).fit_transform(&frame, 35).unwrap();
//! assert_eq!(dataset.len(), 30);
//! ```

pub mod indicators;
mod normalizer;
mod windower;

pub use normalizer::MinMaxNormalizer;
pub use windower::{FeatureWindower, WindowedDataset};
