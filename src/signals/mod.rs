//! # Signals
//!
//! Fixed threshold rules mapping an [`IndicatorSet`](crate::options::IndicatorSet)
//! and a momentum z-score to short signal lines, plus the combined trade
//! signal shown next to the option chain.
//!
//! | Rule | Reading |
//! |------|---------|
//! | Avg IV < 0.3 | buy premium, else sell premium |
//! | Put/call volume > 1 | contrarian buy, else bullish flow |
//! | Put/call OI > 1 | bearish positioning, else bullish |
//! | \|skew\| <= 0.08 | neutral; above bearish, below bullish |
//! | z > 1 / z < -1 | buy call / buy put bias, else hold |

mod combined;
mod synthesizer;

pub use combined::{CombinedSignal, PriceAction};
pub use synthesizer::{Rule, Signal, SignalEntry, SignalSynthesizer, SignalThresholds, Stance};
