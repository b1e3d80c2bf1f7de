//! Option-chain snapshot types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Option side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

/// One contract row of a chain
///
/// Missing provider fields are `None`; a NaN implied volatility is treated
/// the same as a missing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionContract {
    pub strike: f64,
    pub option_type: OptionType,
    pub implied_volatility: Option<f64>,
    pub volume: Option<f64>,
    pub open_interest: Option<f64>,
    pub last_price: Option<f64>,
    pub expiration: NaiveDate,
}

impl OptionContract {
    pub fn new(strike: f64, option_type: OptionType, expiration: NaiveDate) -> Self {
        Self {
            strike,
            option_type,
            implied_volatility: None,
            volume: None,
            open_interest: None,
            last_price: None,
            expiration,
        }
    }

    pub fn with_iv(mut self, iv: f64) -> Self {
        self.implied_volatility = Some(iv);
        self
    }

    pub fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_open_interest(mut self, open_interest: f64) -> Self {
        self.open_interest = Some(open_interest);
        self
    }

    pub fn with_last_price(mut self, price: f64) -> Self {
        self.last_price = Some(price);
        self
    }

    /// Finite implied volatility, if any
    pub fn iv(&self) -> Option<f64> {
        self.implied_volatility.filter(|v| v.is_finite())
    }

    pub fn is_call(&self) -> bool {
        self.option_type == OptionType::Call
    }

    pub fn is_put(&self) -> bool {
        self.option_type == OptionType::Put
    }

    /// Strike within `band` (fraction of spot) of the underlying price
    pub fn within_band(&self, spot: f64, band: f64) -> bool {
        self.strike >= spot * (1.0 - band) && self.strike <= spot * (1.0 + band)
    }
}

/// Contracts of one chain snapshot, usually the nearest expiration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionChainSnapshot {
    pub contracts: Vec<OptionContract>,
}

impl OptionChainSnapshot {
    pub fn new(contracts: Vec<OptionContract>) -> Self {
        Self { contracts }
    }

    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    pub fn calls(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.is_call())
    }

    pub fn puts(&self) -> impl Iterator<Item = &OptionContract> {
        self.contracts.iter().filter(|c| c.is_put())
    }

    /// Earliest expiration present in the snapshot
    pub fn nearest_expiration(&self) -> Option<NaiveDate> {
        self.contracts.iter().map(|c| c.expiration).min()
    }

    /// Snapshot restricted to the earliest expiration
    pub fn nearest_expiry_only(&self) -> Self {
        match self.nearest_expiration() {
            Some(expiry) => Self {
                contracts: self
                    .contracts
                    .iter()
                    .filter(|c| c.expiration == expiry)
                    .cloned()
                    .collect(),
            },
            None => Self::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expiry(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn test_nan_iv_is_missing() {
        let contract = OptionContract::new(100.0, OptionType::Call, expiry(15)).with_iv(f64::NAN);
        assert!(contract.iv().is_none());
    }

    #[test]
    fn test_band_is_inclusive() {
        let contract = OptionContract::new(110.0, OptionType::Call, expiry(15));
        assert!(contract.within_band(100.0, 0.10));
        assert!(!contract.within_band(100.0, 0.05));
    }

    #[test]
    fn test_nearest_expiry_only() {
        let chain = OptionChainSnapshot::new(vec![
            OptionContract::new(100.0, OptionType::Call, expiry(22)),
            OptionContract::new(100.0, OptionType::Put, expiry(15)),
            OptionContract::new(105.0, OptionType::Call, expiry(15)),
        ]);

        let nearest = chain.nearest_expiry_only();
        assert_eq!(nearest.len(), 2);
        assert_eq!(nearest.calls().count(), 1);
        assert_eq!(nearest.puts().count(), 1);
    }

    #[test]
    fn test_type_serializes_lowercase() {
        let json = serde_json::to_string(&OptionType::Put).unwrap();
        assert_eq!(json, "\"put\"");
    }
}
