//! # Options
//!
//! Sentiment indicators computed from one option-chain snapshot: average
//! implied volatility, put/call ratios and volatility skew over the strikes
//! near spot, plus a summary of the at-the-money call and put.

mod atm;
mod indicators;

pub use atm::AtmSummary;
pub use indicators::{Indicator, IndicatorSet, OptionsIndicatorEngine};
