//! # Runtime
//!
//! Forecaster calls are CPU-bound and may take seconds. [`ForecastRunner`]
//! moves them onto tokio's blocking pool with a per-call timeout, and
//! [`CancelToken`] lets training and forecast loops stop at the next
//! epoch or step boundary.

mod cancel;
mod runner;

pub use cancel::CancelToken;
pub use runner::{ForecastRunner, ModelOutcome};
