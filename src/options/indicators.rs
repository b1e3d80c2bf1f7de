//! Options-derived sentiment indicators

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, warn};

use crate::data::{OptionChainSnapshot, OptionContract};
use crate::utils::OptionsConfig;
use crate::{Error, Result};

/// Named scalar of an [`IndicatorSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    AvgIv,
    PutCallVolumeRatio,
    PutCallOiRatio,
    VolSkew,
    MaxOpenInterest,
    MaxVolume,
}

impl Indicator {
    pub fn all() -> [Indicator; 6] {
        [
            Indicator::AvgIv,
            Indicator::PutCallVolumeRatio,
            Indicator::PutCallOiRatio,
            Indicator::VolSkew,
            Indicator::MaxOpenInterest,
            Indicator::MaxVolume,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Indicator::AvgIv => "Avg IV",
            Indicator::PutCallVolumeRatio => "Put/Call Volume Ratio",
            Indicator::PutCallOiRatio => "Put/Call OI Ratio",
            Indicator::VolSkew => "Volatility Skew",
            Indicator::MaxOpenInterest => "Max Open Interest",
            Indicator::MaxVolume => "Max Volume",
        }
    }
}

/// Indicators of one chain snapshot
///
/// Each field is NaN when its inputs are missing; a NaN means unavailable,
/// never zero. [`IndicatorSet::get`] maps NaN to `None`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub avg_iv: f64,
    pub put_call_volume_ratio: f64,
    pub put_call_oi_ratio: f64,
    /// Mean OTM put IV minus mean OTM call IV
    pub vol_skew: f64,
    pub max_open_interest: f64,
    pub max_volume: f64,
    /// Contracts inside the band with a usable IV
    pub contracts_in_band: usize,
}

impl IndicatorSet {
    /// Every indicator unavailable
    pub fn unavailable() -> Self {
        Self {
            avg_iv: f64::NAN,
            put_call_volume_ratio: f64::NAN,
            put_call_oi_ratio: f64::NAN,
            vol_skew: f64::NAN,
            max_open_interest: f64::NAN,
            max_volume: f64::NAN,
            contracts_in_band: 0,
        }
    }

    pub fn value(&self, indicator: Indicator) -> f64 {
        match indicator {
            Indicator::AvgIv => self.avg_iv,
            Indicator::PutCallVolumeRatio => self.put_call_volume_ratio,
            Indicator::PutCallOiRatio => self.put_call_oi_ratio,
            Indicator::VolSkew => self.vol_skew,
            Indicator::MaxOpenInterest => self.max_open_interest,
            Indicator::MaxVolume => self.max_volume,
        }
    }

    pub fn get(&self, indicator: Indicator) -> Option<f64> {
        Some(self.value(indicator)).filter(|v| !v.is_nan())
    }

    pub fn available_count(&self) -> usize {
        Indicator::all().iter().filter(|i| self.get(**i).is_some()).count()
    }
}

impl fmt::Display for IndicatorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for indicator in Indicator::all() {
            match self.get(indicator) {
                Some(v) => writeln!(f, "{:<24}{:.4}", indicator.label(), v)?,
                None => writeln!(f, "{:<24}unavailable", indicator.label())?,
            }
        }
        Ok(())
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Total of the finite values, `None` when there are none
fn total(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values
        .flatten()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| Some(acc.unwrap_or(0.0) + v))
}

/// Put total over call total for one field
///
/// NaN when either side has no contracts or no values, or the call total
/// is not positive.
fn put_call_ratio(band: &[&OptionContract], field: impl Fn(&OptionContract) -> Option<f64>) -> f64 {
    let has_puts = band.iter().any(|c| c.is_put());
    let has_calls = band.iter().any(|c| c.is_call());
    if !has_puts || !has_calls {
        return f64::NAN;
    }

    let puts = total(band.iter().filter(|c| c.is_put()).map(|c| field(*c)));
    let calls = total(band.iter().filter(|c| c.is_call()).map(|c| field(*c)));
    match (puts, calls) {
        (Some(p), Some(c)) if c > 0.0 => p / c,
        _ => f64::NAN,
    }
}

fn max_of(band: &[&OptionContract], field: impl Fn(&OptionContract) -> Option<f64>) -> f64 {
    band.iter()
        .filter_map(|c| field(*c))
        .filter(|v| v.is_finite())
        .fold(f64::NAN, f64::max)
}

/// Computes an [`IndicatorSet`] from the near-the-money part of a chain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionsIndicatorEngine {
    band: f64,
}

impl Default for OptionsIndicatorEngine {
    fn default() -> Self {
        Self { band: 0.10 }
    }
}

impl OptionsIndicatorEngine {
    /// `band` is the strike range around spot as a fraction, in (0, 1)
    pub fn new(band: f64) -> Result<Self> {
        if !(band > 0.0 && band < 1.0) {
            return Err(Error::InvalidParameter(format!(
                "moneyness band must lie in (0, 1), got {}",
                band
            )));
        }
        Ok(Self { band })
    }

    pub fn from_config(config: &OptionsConfig) -> Result<Self> {
        Self::new(config.moneyness_band)
    }

    pub fn band(&self) -> f64 {
        self.band
    }

    /// Contracts within the band with a finite implied volatility
    pub fn in_band<'a>(&self, chain: &'a OptionChainSnapshot, spot: f64) -> Vec<&'a OptionContract> {
        chain
            .contracts
            .iter()
            .filter(|c| c.iv().is_some() && c.within_band(spot, self.band))
            .collect()
    }

    pub fn compute(&self, chain: &OptionChainSnapshot, spot: f64) -> IndicatorSet {
        if !spot.is_finite() || spot <= 0.0 {
            warn!(spot, "spot price unusable, all indicators unavailable");
            return IndicatorSet::unavailable();
        }

        let band = self.in_band(chain, spot);

        let avg_iv = mean(band.iter().filter_map(|c| c.iv()));
        let otm_puts = mean(
            band.iter()
                .filter(|c| c.is_put() && c.strike < spot)
                .filter_map(|c| c.iv()),
        );
        let otm_calls = mean(
            band.iter()
                .filter(|c| c.is_call() && c.strike > spot)
                .filter_map(|c| c.iv()),
        );

        let set = IndicatorSet {
            avg_iv,
            put_call_volume_ratio: put_call_ratio(&band, |c| c.volume),
            put_call_oi_ratio: put_call_ratio(&band, |c| c.open_interest),
            // NaN propagates when either side is empty
            vol_skew: otm_puts - otm_calls,
            max_open_interest: max_of(&band, |c| c.open_interest),
            max_volume: max_of(&band, |c| c.volume),
            contracts_in_band: band.len(),
        };

        debug!(
            contracts = chain.len(),
            in_band = set.contracts_in_band,
            available = set.available_count(),
            "options indicators computed"
        );

        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn contract(strike: f64, option_type: OptionType, iv: f64) -> OptionContract {
        OptionContract::new(strike, option_type, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap())
            .with_iv(iv)
    }

    fn scenario_chain() -> OptionChainSnapshot {
        OptionChainSnapshot::new(vec![
            contract(103.0, OptionType::Call, 0.20).with_volume(100.0).with_open_interest(400.0),
            contract(105.0, OptionType::Call, 0.25).with_volume(100.0).with_open_interest(600.0),
            contract(95.0, OptionType::Put, 0.50).with_volume(150.0).with_open_interest(500.0),
            contract(97.0, OptionType::Put, 0.55).with_volume(150.0).with_open_interest(700.0),
        ])
    }

    #[test]
    fn test_scenario_chain() {
        let set = OptionsIndicatorEngine::default().compute(&scenario_chain(), 100.0);

        assert_eq!(set.contracts_in_band, 4);
        assert_abs_diff_eq!(set.avg_iv, 0.375, epsilon = 1e-12);
        assert_abs_diff_eq!(set.vol_skew, 0.525 - 0.225, epsilon = 1e-12);
        assert_abs_diff_eq!(set.put_call_volume_ratio, 1.5, epsilon = 1e-12);
        assert_abs_diff_eq!(set.put_call_oi_ratio, 1.2, epsilon = 1e-12);
        assert_eq!(set.max_open_interest, 700.0);
        assert_eq!(set.max_volume, 150.0);
    }

    #[test]
    fn test_only_calls_gives_nan() {
        let chain = OptionChainSnapshot::new(vec![
            contract(102.0, OptionType::Call, 0.3).with_volume(10.0).with_open_interest(20.0),
            contract(105.0, OptionType::Call, 0.35).with_volume(5.0).with_open_interest(30.0),
        ]);
        let set = OptionsIndicatorEngine::default().compute(&chain, 100.0);

        assert!(set.put_call_volume_ratio.is_nan());
        assert!(set.put_call_oi_ratio.is_nan());
        assert!(set.vol_skew.is_nan());
        assert!(set.get(Indicator::VolSkew).is_none());
        assert_abs_diff_eq!(set.avg_iv, 0.325, epsilon = 1e-12);
    }

    #[test]
    fn test_outside_band_and_missing_iv_excluded() {
        let mut chain = scenario_chain();
        chain.contracts.push(contract(150.0, OptionType::Call, 0.9));
        chain
            .contracts
            .push(OptionContract::new(100.0, OptionType::Put, NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()));
        chain.contracts.push(contract(99.0, OptionType::Put, f64::NAN));

        let set = OptionsIndicatorEngine::default().compute(&chain, 100.0);
        assert_eq!(set.contracts_in_band, 4);
        assert_abs_diff_eq!(set.avg_iv, 0.375, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_call_volume_gives_nan_ratio() {
        let chain = OptionChainSnapshot::new(vec![
            contract(102.0, OptionType::Call, 0.3).with_volume(0.0),
            contract(98.0, OptionType::Put, 0.4).with_volume(25.0),
        ]);
        let set = OptionsIndicatorEngine::default().compute(&chain, 100.0);

        assert!(set.put_call_volume_ratio.is_nan());
        // no open interest reported at all
        assert!(set.put_call_oi_ratio.is_nan());
        assert!(set.max_open_interest.is_nan());
        assert_abs_diff_eq!(set.vol_skew, 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_empty_chain() {
        let set = OptionsIndicatorEngine::default().compute(&OptionChainSnapshot::default(), 100.0);
        assert_eq!(set.available_count(), 0);
        assert_eq!(set.contracts_in_band, 0);
    }

    #[test]
    fn test_bad_spot_and_band() {
        let set = OptionsIndicatorEngine::default().compute(&scenario_chain(), f64::NAN);
        assert_eq!(set.available_count(), 0);

        assert!(OptionsIndicatorEngine::new(0.0).is_err());
        assert!(OptionsIndicatorEngine::new(1.0).is_err());
        assert!(OptionsIndicatorEngine::new(0.05).is_ok());
    }

    #[test]
    fn test_display_marks_unavailable() {
        let text = IndicatorSet::unavailable().to_string();
        assert!(text.contains("Avg IV"));
        assert_eq!(text.matches("unavailable").count(), 6);
    }
}
