//! At-the-money contract summary

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{OptionChainSnapshot, OptionContract};

/// Nearest-to-spot call and put of a chain
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtmSummary {
    /// Spot rounded to a whole strike
    pub atm_strike: f64,
    pub call_strike: f64,
    pub put_strike: f64,
    pub call_iv: Option<f64>,
    pub put_iv: Option<f64>,
    pub call_last_price: Option<f64>,
    pub put_last_price: Option<f64>,
    pub expiration: NaiveDate,
    /// Put IV minus call IV to three decimals, NaN if either is missing
    pub atm_skew: f64,
}

fn nearest<'a>(contracts: impl Iterator<Item = &'a OptionContract>, strike: f64) -> Option<&'a OptionContract> {
    contracts.min_by(|a, b| (a.strike - strike).abs().total_cmp(&(b.strike - strike).abs()))
}

impl AtmSummary {
    /// `None` when the chain lacks calls or puts, or spot is unusable
    pub fn from_chain(chain: &OptionChainSnapshot, spot: f64) -> Option<Self> {
        if !spot.is_finite() {
            return None;
        }
        let atm_strike = spot.round();
        let call = nearest(chain.calls(), atm_strike)?;
        let put = nearest(chain.puts(), atm_strike)?;

        let atm_skew = match (put.iv(), call.iv()) {
            (Some(p), Some(c)) => ((p - c) * 1000.0).round() / 1000.0,
            _ => f64::NAN,
        };

        Some(Self {
            atm_strike,
            call_strike: call.strike,
            put_strike: put.strike,
            call_iv: call.iv(),
            put_iv: put.iv(),
            call_last_price: call.last_price,
            put_last_price: put.last_price,
            expiration: call.expiration.min(put.expiration),
            atm_skew,
        })
    }
}
