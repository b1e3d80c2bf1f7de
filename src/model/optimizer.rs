//! Adam (Adaptive Moment Estimation)
//!
//! The optimizer holds the hyperparameters and the shared step counter;
//! every trainable tensor carries its own [`AdamState`] with first and
//! second moment estimates.

use ndarray::{Array, Dimension, Zip};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    #[serde(skip)]
    t: i32,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
        }
    }

    pub fn with_betas(mut self, beta1: f64, beta2: f64) -> Self {
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    /// Advance the step counter; call once per batch before the updates
    pub fn step(&mut self) {
        self.t += 1;
    }

    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one bias-corrected update to `param`
    pub fn update<D: Dimension>(
        &self,
        param: &mut Array<f64, D>,
        grad: &Array<f64, D>,
        state: &mut AdamState<D>,
    ) {
        let t = self.t.max(1);
        let correction1 = 1.0 - self.beta1.powi(t);
        let correction2 = 1.0 - self.beta2.powi(t);
        let (beta1, beta2, lr, eps) = (self.beta1, self.beta2, self.learning_rate, self.epsilon);

        Zip::from(param)
            .and(grad)
            .and(&mut state.m)
            .and(&mut state.v)
            .for_each(|w, &g, m, v| {
                *m = beta1 * *m + (1.0 - beta1) * g;
                *v = beta2 * *v + (1.0 - beta2) * g * g;
                let m_hat = *m / correction1;
                let v_hat = *v / correction2;
                *w -= lr * m_hat / (v_hat.sqrt() + eps);
            });
    }
}

/// Moment estimates for one parameter tensor
#[derive(Debug, Clone)]
pub struct AdamState<D: Dimension> {
    m: Array<f64, D>,
    v: Array<f64, D>,
}

impl<D: Dimension> AdamState<D> {
    pub fn for_param(param: &Array<f64, D>) -> Self {
        Self {
            m: Array::zeros(param.raw_dim()),
            v: Array::zeros(param.raw_dim()),
        }
    }
}
