//! # Quant Signal Engine
//!
//! Numeric core of an options trading dashboard: multi-model price
//! forecasting with accuracy metrics, statistical momentum-burst detection
//! and options-derived sentiment indicators combined into trade signals.
//!
//! The engine consumes already-fetched price history and option-chain
//! snapshots. It never fetches, authenticates or renders.
//!
//! ## Modules
//!
//! - `data` - Price series, feature frames, option chains, business-day calendar
//! - `preprocessing` - Min-max scaling, sliding windows, technical indicators
//! - `model` - ARIMA, LSTM and additive forecasters behind one `Forecaster` trait
//! - `evaluation` - RMSE/MAPE metrics, ensemble comparison, forecast pipeline
//! - `momentum` - Rolling z-scores and momentum burst detection
//! - `options` - Implied volatility, put/call ratios and skew
//! - `signals` - Threshold rules turning indicators into trade signals
//! - `runtime` - Worker-pool execution with timeouts and cancellation
//! - `utils` - Configuration and logging
//!
//! ## Example
//!
//! ```rust
//! use chrono::NaiveDate;
//! use quant_signal_engine::data::{FeatureFrame, PriceSeries};
//! use quant_signal_engine::model::{ArimaForecaster, ForecastMode, ForecastRequest, Forecaster};
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = PriceSeries::from_closes(start, &[100.0; 30]);
//! let frame = FeatureFrame::from_prices(&series);
//!
//! let arima = ArimaForecaster::default();
//! let request = ForecastRequest::new(&frame, 5, ForecastMode::Future);
//! let forecast = arima.forecast(&request).unwrap();
//!
//! assert_eq!(forecast.len(), 5);
//! ```

pub mod data;
pub mod evaluation;
pub mod model;
pub mod momentum;
pub mod options;
pub mod preprocessing;
pub mod runtime;
pub mod signals;
pub mod utils;

use std::time::Duration;

pub use data::{FeatureFrame, OptionChainSnapshot, OptionContract, OptionType, PriceSeries};
pub use evaluation::{EnsembleEvaluator, ForecastPipeline, ForecastReport, MetricsTable};
pub use model::{Forecast, ForecastMode, ForecastModel, Forecaster};
pub use momentum::{BurstEvent, BurstReport, Direction, MomentumBurstDetector};
pub use options::{IndicatorSet, OptionsIndicatorEngine};
pub use runtime::{CancelToken, ForecastRunner};
pub use signals::{CombinedSignal, Signal, SignalSynthesizer};
pub use utils::{setup_logging, EngineConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result type used throughout the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
///
/// Unavailable indicators are not errors: they are reported as NaN inside
/// [`IndicatorSet`].
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("insufficient data for {context}: need at least {needed} rows, have {available}")]
    InsufficientData {
        context: String,
        needed: usize,
        available: usize,
    },

    #[error("model fit failed: {0}")]
    ModelFit(String),

    #[error("alignment error: {0}")]
    Alignment(String),

    #[error("{model} timed out after {after:?}")]
    Timeout { model: String, after: Duration },

    #[error("cancelled: {0}")]
    Cancelled(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn insufficient(context: impl Into<String>, needed: usize, available: usize) -> Self {
        Error::InsufficientData {
            context: context.into(),
            needed,
            available,
        }
    }
}

/// Commonly used types
pub mod prelude {
    pub use crate::data::{
        business_days_after, FeatureFrame, OptionChainSnapshot, OptionContract, OptionType,
        PriceSeries,
    };
    pub use crate::evaluation::{EnsembleEvaluator, ForecastPipeline, ForecastReport, MetricsTable};
    pub use crate::model::{
        AdditiveForecaster, ArimaForecaster, Forecast, ForecastMode, ForecastModel,
        ForecastRequest, Forecaster, RecurrentSequenceForecaster,
    };
    pub use crate::momentum::{BurstEvent, BurstReport, Direction, MomentumBurstDetector};
    pub use crate::options::{IndicatorSet, OptionsIndicatorEngine};
    pub use crate::runtime::{CancelToken, ForecastRunner};
    pub use crate::signals::{CombinedSignal, Signal, SignalSynthesizer, SignalThresholds};
    pub use crate::utils::{setup_logging, EngineConfig};
    pub use crate::{Error, Result};
}
