//! # Evaluation
//!
//! Error metrics, forecast-versus-actual alignment and the multi-model
//! forecasting pipeline.
//!
//! Metrics are computed only on timestamps present in both the forecast and
//! the realised series. A model that fails, or shares no timestamps with
//! the actuals, is reported with its reason and never hides the results of
//! the other models.

mod ensemble;
pub mod metrics;
mod pipeline;

pub use ensemble::{EnsembleEvaluator, MetricsRow, MetricsTable, ModelFailure};
pub use pipeline::{ForecastPipeline, ForecastReport};
