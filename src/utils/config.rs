//! Configuration management
//!
//! Every component takes its parameters from one [`EngineConfig`], loaded
//! from TOML. Missing sections and fields fall back to their defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::model::{ArimaParams, ForecastMode, ForecastModel, LstmConfig};
use crate::signals::SignalThresholds;
use crate::{Error, Result};

/// Forecast run configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Steps to forecast (H)
    pub horizon: usize,
    /// Hold out the last `horizon` points and score against them
    pub backtest: bool,
    pub models: Vec<ForecastModel>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 20,
            backtest: true,
            models: ForecastModel::all().to_vec(),
        }
    }
}

impl ForecastConfig {
    pub fn mode(&self) -> ForecastMode {
        if self.backtest {
            ForecastMode::Backtest
        } else {
            ForecastMode::Future
        }
    }
}

/// Additive forecaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdditiveConfig {
    /// Observations per seasonal cycle
    pub seasonal_period: usize,
}

impl Default for AdditiveConfig {
    fn default() -> Self {
        Self { seasonal_period: 5 }
    }
}

/// Momentum configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    /// Rolling z-score window (W)
    pub window: usize,
    /// Burst threshold on |z| (T)
    pub threshold: f64,
    /// Trailing returns behind the combined-signal z-score
    pub signal_window: usize,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            window: 5,
            threshold: 2.5,
            signal_window: 20,
        }
    }
}

/// Options indicator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Strike band around spot, as a fraction of spot
    pub moneyness_band: f64,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            moneyness_band: 0.10,
        }
    }
}

/// Worker runtime configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Per-forecast timeout
    pub timeout_secs: u64,
    /// Forecasts allowed to run at once
    pub worker_threads: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 120,
            worker_threads: 2,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub forecast: ForecastConfig,
    pub arima: ArimaParams,
    pub lstm: LstmConfig,
    pub additive: AdditiveConfig,
    pub momentum: MomentumConfig,
    pub options: OptionsConfig,
    pub signals: SignalThresholds,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Load and validate configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from file or use default
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_default()
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &str); 10] = [
            (self.forecast.horizon > 0, "forecast.horizon must be positive"),
            (!self.forecast.models.is_empty(), "forecast.models must not be empty"),
            (self.lstm.lookback > 0, "lstm.lookback must be positive"),
            (self.lstm.hidden_size > 0, "lstm.hidden_size must be positive"),
            (self.lstm.learning_rate > 0.0, "lstm.learning_rate must be positive"),
            (self.additive.seasonal_period > 0, "additive.seasonal_period must be positive"),
            (self.momentum.window >= 2, "momentum.window must be at least 2"),
            (
                self.options.moneyness_band > 0.0 && self.options.moneyness_band < 1.0,
                "options.moneyness_band must lie in (0, 1)",
            ),
            (self.runtime.timeout_secs > 0, "runtime.timeout_secs must be positive"),
            (self.runtime.worker_threads > 0, "runtime.worker_threads must be positive"),
        ];

        match checks.iter().find(|(ok, _)| !ok) {
            Some((_, message)) => Err(Error::Config(message.to_string())),
            None => Ok(()),
        }
    }
}
