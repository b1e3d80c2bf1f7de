//! # Momentum
//!
//! Rolling z-scores of period-over-period returns and the burst detector
//! built on them.
//!
//! With a window of `W` returns the largest attainable |z| is
//! `(W - 1) / sqrt(W)`, about 1.79 for the default `W = 5`. Thresholds above
//! that bound never fire; widen the window to make them reachable.

mod detector;
mod zscore;

pub use detector::{BurstEvent, BurstReport, Direction, MomentumBurstDetector, ZScorePoint};
pub use zscore::{latest_zscore, rolling_zscore};
