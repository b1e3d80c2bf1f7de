//! Recurrent forecaster configuration

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

/// Hyperparameters of the recursive LSTM forecaster
///
/// Training shuffles mini-batches and initialises weights at random. With
/// `seed: None` the generator is seeded from OS entropy and two runs on the
/// same data give different forecasts; set a seed for reproducible output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LstmConfig {
    /// Rows per input window (L)
    pub lookback: usize,
    /// Hidden state size
    pub hidden_size: usize,
    /// Passes over the training windows
    pub epochs: usize,
    pub learning_rate: f64,
    pub batch_size: usize,
    /// Global gradient norm cap
    pub gradient_clip: Option<f64>,
    /// Random seed for weights and shuffling
    pub seed: Option<u64>,
    /// Feed every frame column instead of the price alone
    pub use_features: bool,
}

impl Default for LstmConfig {
    fn default() -> Self {
        Self {
            lookback: 10,
            hidden_size: 50,
            epochs: 20,
            learning_rate: 0.01,
            batch_size: 32,
            gradient_clip: Some(1.0),
            seed: None,
            use_features: false,
        }
    }
}

impl LstmConfig {
    pub fn with_lookback(mut self, lookback: usize) -> Self {
        self.lookback = lookback;
        self
    }

    pub fn with_hidden_size(mut self, hidden_size: usize) -> Self {
        self.hidden_size = hidden_size;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, lr: f64) -> Self {
        self.learning_rate = lr;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_gradient_clip(mut self, clip: Option<f64>) -> Self {
        self.gradient_clip = clip;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_features(mut self, use_features: bool) -> Self {
        self.use_features = use_features;
        self
    }

    /// Small, fast preset for tests and quick previews
    pub fn small() -> Self {
        Self::default().with_hidden_size(8).with_epochs(5)
    }

    /// Generator for one training run
    pub fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }
}
