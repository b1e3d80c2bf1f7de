//! # Input data
//!
//! Price history, derived feature frames and option-chain snapshots as
//! supplied by the data-acquisition layer, plus the business-day calendar
//! used to stamp forecasts.

mod calendar;
mod options;
mod series;

pub use calendar::{business_days_after, is_business_day, next_business_day};
pub use options::{OptionChainSnapshot, OptionContract, OptionType};
pub use series::{FeatureFrame, PricePoint, PriceSeries};
