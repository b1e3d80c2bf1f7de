//! Momentum burst detection

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use super::zscore::rolling_zscore;
use crate::data::PriceSeries;
use crate::utils::MomentumConfig;
use crate::{Error, Result};

/// Direction of a burst
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Bullish => write!(f, "Bullish"),
            Direction::Bearish => write!(f, "Bearish"),
        }
    }
}

/// Return whose rolling z-score crossed the threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstEvent {
    pub date: NaiveDate,
    pub zscore: f64,
    pub direction: Direction,
}

/// Rolling z-score of one return
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScorePoint {
    pub date: NaiveDate,
    /// NaN where the window is incomplete or flat
    pub zscore: f64,
}

/// Full z-score series for charting plus the flagged events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BurstReport {
    pub zscores: Vec<ZScorePoint>,
    pub events: Vec<BurstEvent>,
}

impl BurstReport {
    pub fn has_bursts(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn count(&self, direction: Direction) -> usize {
        self.events.iter().filter(|e| e.direction == direction).count()
    }

    /// Strategy note shown next to the burst table, `None` without bursts
    pub fn commentary(&self) -> Option<String> {
        if !self.has_bursts() {
            return None;
        }
        Some(format!(
            "{} bullish and {} bearish momentum bursts. Bursts indicate short-term \
             overreactions: after a bullish burst consider short-dated long calls, after a \
             bearish burst long puts. Use tight stops or spreads to manage risk.",
            self.count(Direction::Bullish),
            self.count(Direction::Bearish)
        ))
    }
}

/// Flags returns whose rolling z-score exceeds a threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MomentumBurstDetector {
    window: usize,
    threshold: f64,
}

impl Default for MomentumBurstDetector {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 2.5,
        }
    }
}

impl MomentumBurstDetector {
    /// Window of at least two returns and a positive finite threshold
    pub fn new(window: usize, threshold: f64) -> Result<Self> {
        if window < 2 {
            return Err(Error::InvalidParameter(format!(
                "z-score window must be at least 2, got {}",
                window
            )));
        }
        if !threshold.is_finite() || threshold <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "burst threshold must be positive, got {}",
                threshold
            )));
        }
        Ok(Self { window, threshold })
    }

    pub fn from_config(config: &MomentumConfig) -> Result<Self> {
        Self::new(config.window, config.threshold)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score every return and collect the bursts
    ///
    /// Series with fewer than two prices give an empty report.
    pub fn detect(&self, prices: &PriceSeries) -> BurstReport {
        let returns = prices.pct_returns();
        let values: Vec<f64> = returns.iter().map(|r| r.close).collect();
        let scores = rolling_zscore(&values, self.window);

        let zscores: Vec<ZScorePoint> = returns
            .iter()
            .zip(scores)
            .map(|(r, zscore)| ZScorePoint { date: r.date, zscore })
            .collect();

        // NaN compares false, so undefined scores never flag
        let events: Vec<BurstEvent> = zscores
            .iter()
            .filter(|p| p.zscore.abs() > self.threshold)
            .map(|p| BurstEvent {
                date: p.date,
                zscore: p.zscore,
                direction: if p.zscore > 0.0 {
                    Direction::Bullish
                } else {
                    Direction::Bearish
                },
            })
            .collect();

        debug!(
            returns = zscores.len(),
            bursts = events.len(),
            window = self.window,
            "momentum scan complete"
        );

        BurstReport { zscores, events }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn spiked(jump: f64) -> PriceSeries {
        let mut closes = vec![100.0; 26];
        closes.extend(std::iter::repeat(100.0 * (1.0 + jump)).take(10));
        PriceSeries::from_closes(start(), &closes)
    }

    #[test]
    fn test_bullish_spike_flagged_once() {
        let prices = spiked(0.10);
        let report = MomentumBurstDetector::new(20, 2.5).unwrap().detect(&prices);

        assert_eq!(report.zscores.len(), prices.len() - 1);
        assert_eq!(report.events.len(), 1);
        let event = report.events[0];
        assert_eq!(event.direction, Direction::Bullish);
        assert_eq!(event.date, prices.dates()[26]);
        assert!((event.zscore - 19f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_bearish_spike_flagged_once() {
        let prices = spiked(-0.10);
        let report = MomentumBurstDetector::new(20, 2.5).unwrap().detect(&prices);

        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].direction, Direction::Bearish);
        assert!(report.commentary().unwrap().contains("0 bullish and 1 bearish"));
    }

    #[test]
    fn test_constant_returns_have_no_bursts() {
        let closes: Vec<f64> = (0..40).map(|_| 50.0).collect();
        let report = MomentumBurstDetector::default().detect(&PriceSeries::from_closes(start(), &closes));

        assert!(!report.has_bursts());
        assert!(report.commentary().is_none());
        assert!(report.zscores.iter().all(|p| p.zscore.is_nan()));
    }

    #[test]
    fn test_prefix_scores_undefined() {
        let closes: Vec<f64> = (0..12).map(|i| 100.0 + (i as f64).sin()).collect();
        let report = MomentumBurstDetector::default().detect(&PriceSeries::from_closes(start(), &closes));

        assert!(report.zscores[..4].iter().all(|p| p.zscore.is_nan()));
        assert!(report.zscores[4..].iter().all(|p| p.zscore.is_finite()));
    }

    #[test]
    fn test_empty_input() {
        let report = MomentumBurstDetector::default().detect(&PriceSeries::from_closes(start(), &[]));
        assert!(report.zscores.is_empty());
        assert!(report.events.is_empty());

        let report = MomentumBurstDetector::default().detect(&PriceSeries::from_closes(start(), &[100.0]));
        assert!(report.zscores.is_empty());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(MomentumBurstDetector::new(1, 2.5).is_err());
        assert!(MomentumBurstDetector::new(5, 0.0).is_err());
        assert!(MomentumBurstDetector::new(5, f64::NAN).is_err());
    }
}
