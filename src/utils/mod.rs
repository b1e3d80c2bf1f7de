//! Utility module
//!
//! This module provides:
//! - Configuration management
//! - Logging setup

mod config;
mod logging;

pub use config::{
    AdditiveConfig, EngineConfig, ForecastConfig, LoggingConfig, MomentumConfig, OptionsConfig,
    RuntimeConfig,
};
pub use logging::setup_logging;
