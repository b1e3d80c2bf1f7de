//! Threshold rules turning indicators into labelled signals

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::options::IndicatorSet;

/// IV above which options read as expensive in explanations
const EXPENSIVE_IV: f64 = 0.4;
/// IV below which options read as cheap in explanations
const CHEAP_IV: f64 = 0.2;

/// Rule thresholds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalThresholds {
    /// Average IV below this favours buying premium
    pub iv: f64,
    /// Put/call ratios above this read as put-heavy
    pub put_call: f64,
    /// Skew magnitude at or below this is neutral
    pub skew: f64,
    /// Momentum z-score beyond +/- this sets a price direction
    pub zscore: f64,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            iv: 0.3,
            put_call: 1.0,
            skew: 0.08,
            zscore: 1.0,
        }
    }
}

/// Directional reading of one rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stance {
    Bullish,
    Bearish,
    Neutral,
    /// Input was NaN
    Unavailable,
}

/// Rule that produced a signal entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rule {
    ImpliedVolatility,
    PutCallVolume,
    OpenInterest,
    Skew,
    Momentum,
}

impl Rule {
    /// Rules whose stance says something about price direction
    pub fn is_directional(&self) -> bool {
        !matches!(self, Rule::ImpliedVolatility | Rule::Momentum)
    }
}

/// One line of a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEntry {
    pub rule: Rule,
    pub stance: Stance,
    pub text: String,
}

impl SignalEntry {
    fn new(rule: Rule, stance: Stance, text: impl Into<String>) -> Self {
        Self {
            rule,
            stance,
            text: text.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        self.stance != Stance::Unavailable
    }
}

/// Ordered signal lines with an optional confidence in [0, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub entries: Vec<SignalEntry>,
    pub confidence: Option<f64>,
}

impl Signal {
    pub fn lines(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.text.as_str()).collect()
    }

    pub fn entry(&self, rule: Rule) -> Option<&SignalEntry> {
        self.entries.iter().find(|e| e.rule == rule)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "- {}", entry.text)?;
        }
        if let Some(confidence) = self.confidence {
            writeln!(f, "confidence: {:.0}%", confidence * 100.0)?;
        }
        Ok(())
    }
}

/// Applies fixed threshold rules to indicators and momentum
///
/// Every rule checks its own input: a NaN yields an "unavailable" line and
/// never a directional reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalSynthesizer {
    thresholds: SignalThresholds,
}

impl SignalSynthesizer {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &SignalThresholds {
        &self.thresholds
    }

    pub fn iv_entry(&self, avg_iv: f64) -> SignalEntry {
        let rule = Rule::ImpliedVolatility;
        if avg_iv.is_nan() {
            SignalEntry::new(rule, Stance::Unavailable, "IV signal unavailable")
        } else if avg_iv < self.thresholds.iv {
            SignalEntry::new(rule, Stance::Neutral, "Buy premium (IV is low)")
        } else {
            SignalEntry::new(rule, Stance::Neutral, "Sell premium (IV is high)")
        }
    }

    pub fn put_call_entry(&self, ratio: f64) -> SignalEntry {
        let rule = Rule::PutCallVolume;
        if ratio.is_nan() {
            SignalEntry::new(rule, Stance::Unavailable, "Put/call volume signal unavailable")
        } else if ratio > self.thresholds.put_call {
            SignalEntry::new(rule, Stance::Bullish, "Contrarian buy (high put volume)")
        } else {
            SignalEntry::new(rule, Stance::Bullish, "Bullish flow (call volume dominates)")
        }
    }

    pub fn open_interest_entry(&self, ratio: f64) -> SignalEntry {
        let rule = Rule::OpenInterest;
        if ratio.is_nan() {
            SignalEntry::new(rule, Stance::Unavailable, "Open interest signal unavailable")
        } else if ratio > self.thresholds.put_call {
            SignalEntry::new(rule, Stance::Bearish, "Bearish positioning (more puts open)")
        } else {
            SignalEntry::new(rule, Stance::Bullish, "Bullish positioning (more calls open)")
        }
    }

    pub fn skew_entry(&self, skew: f64) -> SignalEntry {
        let rule = Rule::Skew;
        if skew.is_nan() {
            SignalEntry::new(rule, Stance::Unavailable, "Skew signal unavailable")
        } else if skew.abs() <= self.thresholds.skew {
            SignalEntry::new(rule, Stance::Neutral, "Neutral skew")
        } else if skew > 0.0 {
            SignalEntry::new(rule, Stance::Bearish, "Bearish skew (puts richer)")
        } else {
            SignalEntry::new(rule, Stance::Bullish, "Bullish skew (calls richer)")
        }
    }

    pub fn momentum_entry(&self, zscore: f64) -> SignalEntry {
        let rule = Rule::Momentum;
        if zscore.is_nan() {
            SignalEntry::new(rule, Stance::Unavailable, "Momentum signal unavailable")
        } else if zscore > self.thresholds.zscore {
            SignalEntry::new(rule, Stance::Bullish, format!("Buy call bias (z = {:.2})", zscore))
        } else if zscore < -self.thresholds.zscore {
            SignalEntry::new(rule, Stance::Bearish, format!("Buy put bias (z = {:.2})", zscore))
        } else {
            SignalEntry::new(rule, Stance::Neutral, format!("Hold (z = {:.2})", zscore))
        }
    }

    /// Options-only signal, no confidence
    pub fn options_signal(&self, indicators: &IndicatorSet) -> Signal {
        Signal {
            entries: vec![
                self.iv_entry(indicators.avg_iv),
                self.put_call_entry(indicators.put_call_volume_ratio),
                self.open_interest_entry(indicators.put_call_oi_ratio),
                self.skew_entry(indicators.vol_skew),
            ],
            confidence: None,
        }
    }

    /// Options rules followed by the momentum rule when a z-score is given
    ///
    /// Confidence is the share of available directional rules agreeing
    /// with the momentum direction. It is `None` when momentum sets no
    /// direction or no directional rule is available.
    pub fn combined(&self, indicators: &IndicatorSet, zscore: Option<f64>) -> Signal {
        let mut signal = self.options_signal(indicators);
        let Some(z) = zscore else {
            return signal;
        };

        let momentum = self.momentum_entry(z);
        let direction = momentum.stance;
        signal.entries.push(momentum);

        if matches!(direction, Stance::Bullish | Stance::Bearish) {
            let available: Vec<&SignalEntry> = signal
                .entries
                .iter()
                .filter(|e| e.rule.is_directional() && e.is_available())
                .collect();
            if !available.is_empty() {
                let agreeing = available.iter().filter(|e| e.stance == direction).count();
                signal.confidence = Some(agreeing as f64 / available.len() as f64);
            }
        }

        signal
    }

    /// Plain-language reading of each indicator
    pub fn explain(&self, indicators: &IndicatorSet) -> Vec<String> {
        let iv = indicators.avg_iv;
        let iv_line = if iv.is_nan() {
            "IV unavailable.".to_string()
        } else if iv > EXPENSIVE_IV {
            format!("IV is high ({:.2}): options are expensive.", iv)
        } else if iv < CHEAP_IV {
            format!("IV is low ({:.2}): options are cheap, consider buying.", iv)
        } else {
            format!("IV is moderate ({:.2}): balanced pricing.", iv)
        };

        let pcr = indicators.put_call_volume_ratio;
        let pcr_line = if pcr.is_nan() {
            "Put/call volume ratio unavailable.".to_string()
        } else if pcr > self.thresholds.put_call {
            format!("Put/call volume ratio {:.2}: bearish sentiment intraday.", pcr)
        } else {
            format!("Put/call volume ratio {:.2}: more call activity.", pcr)
        };

        let oi = indicators.put_call_oi_ratio;
        let oi_line = if oi.is_nan() {
            "Put/call open interest ratio unavailable.".to_string()
        } else if oi > self.thresholds.put_call {
            format!("Put/call open interest ratio {:.2}: market positioning is bearish.", oi)
        } else {
            format!("Put/call open interest ratio {:.2}: market is positioned bullishly.", oi)
        };

        let skew = indicators.vol_skew;
        let skew_line = if skew.is_nan() {
            "Volatility skew unavailable.".to_string()
        } else if skew > 0.0 {
            format!("Skew {:.3}: put IV higher, bearish bias.", skew)
        } else if skew < 0.0 {
            format!("Skew {:.3}: call IV higher, bullish bias.", skew)
        } else {
            "Skew 0.000: put and call IV balanced.".to_string()
        };

        vec![iv_line, pcr_line, oi_line, skew_line]
    }
}
