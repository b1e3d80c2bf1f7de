//! Price momentum and options sentiment combined into one trade signal

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

use super::synthesizer::{Signal, SignalSynthesizer};
use crate::data::{OptionChainSnapshot, PriceSeries};
use crate::momentum::latest_zscore;
use crate::options::{AtmSummary, IndicatorSet, OptionsIndicatorEngine};
use crate::{Error, Result};

/// Action suggested by the latest return z-score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceAction {
    BuyCall,
    BuyPut,
    Hold,
}

impl PriceAction {
    /// NaN holds
    pub fn from_zscore(zscore: f64, threshold: f64) -> Self {
        if zscore > threshold {
            PriceAction::BuyCall
        } else if zscore < -threshold {
            PriceAction::BuyPut
        } else {
            PriceAction::Hold
        }
    }
}

impl fmt::Display for PriceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceAction::BuyCall => write!(f, "Buy Call"),
            PriceAction::BuyPut => write!(f, "Buy Put"),
            PriceAction::Hold => write!(f, "Hold"),
        }
    }
}

/// Everything the trade-signal panel shows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedSignal {
    pub spot: f64,
    /// z-score of the latest return, NaN with too little history
    pub zscore: f64,
    pub action: PriceAction,
    pub indicators: IndicatorSet,
    pub atm: Option<AtmSummary>,
    pub signal: Signal,
    pub explanations: Vec<String>,
}

impl CombinedSignal {
    /// Build the signal from prices and the nearest-expiry part of `chain`
    ///
    /// Spot is the last close. Fails only when `prices` is empty; missing
    /// option data shows up as unavailable indicators.
    pub fn generate(
        prices: &PriceSeries,
        chain: &OptionChainSnapshot,
        engine: &OptionsIndicatorEngine,
        synthesizer: &SignalSynthesizer,
        zscore_window: usize,
    ) -> Result<Self> {
        let spot = prices
            .last_close()
            .ok_or_else(|| Error::insufficient("combined signal", 1, 0))?;

        let returns: Vec<f64> = prices.pct_returns().iter().map(|r| r.close).collect();
        let zscore = latest_zscore(&returns, zscore_window);
        let action = PriceAction::from_zscore(zscore, synthesizer.thresholds().zscore);

        let chain = chain.nearest_expiry_only();
        let indicators = engine.compute(&chain, spot);
        let atm = AtmSummary::from_chain(&chain, spot);
        let signal = synthesizer.combined(&indicators, Some(zscore));
        let explanations = synthesizer.explain(&indicators);

        info!(
            spot,
            zscore,
            action = %action,
            confidence = ?signal.confidence,
            "combined signal generated"
        );

        Ok(Self {
            spot,
            zscore,
            action,
            indicators,
            atm,
            signal,
            explanations,
        })
    }
}
