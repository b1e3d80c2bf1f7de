//! LSTM (Long Short-Term Memory) regressor
//!
//! One recurrent layer followed by a linear output, trained with full
//! backpropagation through time and Adam.

use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayView3, Ix1, Ix2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::LstmConfig;
use super::layers::Dense;
use super::optimizer::{Adam, AdamState};
use crate::runtime::CancelToken;
use crate::{Error, Result};

/// Input, recurrent and bias weights of one gate
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Gate {
    w_x: Array2<f64>, // input -> gate
    w_h: Array2<f64>, // hidden -> gate
    b: Array1<f64>,
}

impl Gate {
    fn random<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        bias: f64,
        rng: &mut R,
    ) -> Self {
        let limit = (1.0 / hidden_size as f64).sqrt();
        Self {
            w_x: Array2::random_using((hidden_size, input_size), Uniform::new(-limit, limit), rng),
            w_h: Array2::random_using((hidden_size, hidden_size), Uniform::new(-limit, limit), rng),
            b: Array1::from_elem(hidden_size, bias),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            w_x: Array2::zeros(self.w_x.raw_dim()),
            w_h: Array2::zeros(self.w_h.raw_dim()),
            b: Array1::zeros(self.b.len()),
        }
    }

    fn preactivation(&self, x: &Array1<f64>, h: &Array1<f64>) -> Array1<f64> {
        self.w_x.dot(x) + self.w_h.dot(h) + &self.b
    }

    /// Add the gradient of one step given the pre-activation delta
    fn accumulate(&mut self, delta: &Array1<f64>, x: &Array1<f64>, h_prev: &Array1<f64>) {
        self.w_x += &outer(delta, x);
        self.w_h += &outer(delta, h_prev);
        self.b += delta;
    }

    fn squared_norm(&self) -> f64 {
        self.w_x.iter().chain(self.w_h.iter()).chain(self.b.iter()).map(|g| g * g).sum()
    }

    fn scale(&mut self, factor: f64) {
        self.w_x *= factor;
        self.w_h *= factor;
        self.b *= factor;
    }
}

fn outer(a: &Array1<f64>, b: &Array1<f64>) -> Array2<f64> {
    Array2::from_shape_fn((a.len(), b.len()), |(i, j)| a[i] * b[j])
}

fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

fn tanh(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| v.tanh())
}

/// Activations of one time step kept for the backward pass
struct StepCache {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
}

/// LSTM cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmCell {
    pub input_size: usize,
    pub hidden_size: usize,
    input_gate: Gate,
    forget_gate: Gate,
    candidate: Gate,
    output_gate: Gate,
}

impl LstmCell {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        Self {
            input_size,
            hidden_size,
            input_gate: Gate::random(input_size, hidden_size, 0.0, rng),
            // Forget bias starts at 1 so early training keeps the cell state
            forget_gate: Gate::random(input_size, hidden_size, 1.0, rng),
            candidate: Gate::random(input_size, hidden_size, 0.0, rng),
            output_gate: Gate::random(input_size, hidden_size, 0.0, rng),
        }
    }

    /// One time step
    ///
    /// Returns `(h_next, c_next)`.
    pub fn forward(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let cache = self.step(x, h_prev, c_prev);
        let c_next = &cache.f * c_prev + &cache.i * &cache.g;
        let h_next = &cache.o * &cache.tanh_c;
        (h_next, c_next)
    }

    fn step(&self, x: &Array1<f64>, h_prev: &Array1<f64>, c_prev: &Array1<f64>) -> StepCache {
        let i = sigmoid(&self.input_gate.preactivation(x, h_prev));
        let f = sigmoid(&self.forget_gate.preactivation(x, h_prev));
        let g = tanh(&self.candidate.preactivation(x, h_prev));
        let o = sigmoid(&self.output_gate.preactivation(x, h_prev));
        let c = &f * c_prev + &i * &g;
        let tanh_c = tanh(&c);

        StepCache {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            tanh_c,
        }
    }

    pub fn init_hidden(&self) -> (Array1<f64>, Array1<f64>) {
        (
            Array1::zeros(self.hidden_size),
            Array1::zeros(self.hidden_size),
        )
    }

    fn zero_gradients(&self) -> CellGradients {
        CellGradients {
            input_gate: self.input_gate.zeros_like(),
            forget_gate: self.forget_gate.zeros_like(),
            candidate: self.candidate.zeros_like(),
            output_gate: self.output_gate.zeros_like(),
        }
    }
}

struct CellGradients {
    input_gate: Gate,
    forget_gate: Gate,
    candidate: Gate,
    output_gate: Gate,
}

impl CellGradients {
    fn gates_mut(&mut self) -> [&mut Gate; 4] {
        [
            &mut self.input_gate,
            &mut self.forget_gate,
            &mut self.candidate,
            &mut self.output_gate,
        ]
    }
}

struct NetworkGradients {
    cell: CellGradients,
    dense_w: Array2<f64>,
    dense_b: Array1<f64>,
}

impl NetworkGradients {
    fn global_norm(&mut self) -> f64 {
        let gates: f64 = self.cell.gates_mut().iter().map(|g| g.squared_norm()).sum();
        let dense: f64 = self
            .dense_w
            .iter()
            .chain(self.dense_b.iter())
            .map(|g| g * g)
            .sum();
        (gates + dense).sqrt()
    }

    fn scale(&mut self, factor: f64) {
        for gate in self.cell.gates_mut() {
            gate.scale(factor);
        }
        self.dense_w *= factor;
        self.dense_b *= factor;
    }
}

struct GateState {
    w_x: AdamState<Ix2>,
    w_h: AdamState<Ix2>,
    b: AdamState<Ix1>,
}

impl GateState {
    fn for_gate(gate: &Gate) -> Self {
        Self {
            w_x: AdamState::for_param(&gate.w_x),
            w_h: AdamState::for_param(&gate.w_h),
            b: AdamState::for_param(&gate.b),
        }
    }

    fn apply(&mut self, adam: &Adam, gate: &mut Gate, grad: &Gate) {
        adam.update(&mut gate.w_x, &grad.w_x, &mut self.w_x);
        adam.update(&mut gate.w_h, &grad.w_h, &mut self.w_h);
        adam.update(&mut gate.b, &grad.b, &mut self.b);
    }
}

/// Optimizer moments for every trainable tensor of the network
struct OptimizerState {
    gates: [GateState; 4],
    dense_w: AdamState<Ix2>,
    dense_b: AdamState<Ix1>,
}

/// Outcome of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub epochs: usize,
    pub loss_history: Vec<f64>,
}

impl TrainingSummary {
    pub fn final_loss(&self) -> Option<f64> {
        self.loss_history.last().copied()
    }
}

/// Recurrent layer plus linear head mapping the last hidden state to a scalar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LstmNetwork {
    cell: LstmCell,
    output_layer: Dense,
}

impl LstmNetwork {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        Self {
            cell: LstmCell::new(input_size, hidden_size, rng),
            output_layer: Dense::new(hidden_size, 1, rng),
        }
    }

    pub fn input_size(&self) -> usize {
        self.cell.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.cell.hidden_size
    }

    /// Predict the next scaled price from a `(lookback, features)` window
    pub fn predict(&self, window: ArrayView2<'_, f64>) -> f64 {
        let (mut h, mut c) = self.cell.init_hidden();
        for row in window.rows() {
            let (h_next, c_next) = self.cell.forward(&row.to_owned(), &h, &c);
            h = h_next;
            c = c_next;
        }
        self.output_layer.forward(&h)[0]
    }

    /// Mean squared error over a set of windows
    pub fn evaluate(&self, inputs: ArrayView3<'_, f64>, targets: ArrayView1<'_, f64>) -> f64 {
        let n = targets.len();
        if n == 0 {
            return 0.0;
        }
        let total: f64 = (0..n)
            .map(|k| {
                let error = self.predict(inputs.slice(s![k, .., ..])) - targets[k];
                error * error
            })
            .sum();
        total / n as f64
    }

    /// Forward and backward pass for one window
    ///
    /// Accumulates `scale * dL/dθ` into `grads` and returns the squared error.
    fn backpropagate(
        &self,
        window: ArrayView2<'_, f64>,
        target: f64,
        scale: f64,
        grads: &mut NetworkGradients,
    ) -> f64 {
        let (mut h, mut c) = self.cell.init_hidden();
        let mut caches = Vec::with_capacity(window.nrows());
        for row in window.rows() {
            let cache = self.cell.step(&row.to_owned(), &h, &c);
            c = &cache.f * &cache.c_prev + &cache.i * &cache.g;
            h = &cache.o * &cache.tanh_c;
            caches.push(cache);
        }

        let prediction = self.output_layer.forward(&h)[0];
        let error = prediction - target;

        let dy = Array1::from_elem(1, 2.0 * error * scale);
        let (mut dh, dw, db) = self.output_layer.backward(&h, &dy);
        grads.dense_w += &dw;
        grads.dense_b += &db;

        let mut dc: Array1<f64> = Array1::zeros(self.cell.hidden_size);
        for cache in caches.iter().rev() {
            let d_o = &dh * &cache.tanh_c;
            dc = dc + &dh * &cache.o * &cache.tanh_c.mapv(|t| 1.0 - t * t);

            let d_i = &dc * &cache.g;
            let d_g = &dc * &cache.i;
            let d_f = &dc * &cache.c_prev;

            let da_i = &d_i * &cache.i.mapv(|v| v * (1.0 - v));
            let da_f = &d_f * &cache.f.mapv(|v| v * (1.0 - v));
            let da_g = &d_g * &cache.g.mapv(|v| 1.0 - v * v);
            let da_o = &d_o * &cache.o.mapv(|v| v * (1.0 - v));

            grads.cell.input_gate.accumulate(&da_i, &cache.x, &cache.h_prev);
            grads.cell.forget_gate.accumulate(&da_f, &cache.x, &cache.h_prev);
            grads.cell.candidate.accumulate(&da_g, &cache.x, &cache.h_prev);
            grads.cell.output_gate.accumulate(&da_o, &cache.x, &cache.h_prev);

            dh = self.cell.input_gate.w_h.t().dot(&da_i)
                + self.cell.forget_gate.w_h.t().dot(&da_f)
                + self.cell.candidate.w_h.t().dot(&da_g)
                + self.cell.output_gate.w_h.t().dot(&da_o);
            dc = &dc * &cache.f;
        }

        error * error
    }

    fn zero_gradients(&self) -> NetworkGradients {
        NetworkGradients {
            cell: self.cell.zero_gradients(),
            dense_w: Array2::zeros(self.output_layer.weights.raw_dim()),
            dense_b: Array1::zeros(self.output_layer.biases.len()),
        }
    }

    fn optimizer_state(&self) -> OptimizerState {
        OptimizerState {
            gates: [
                GateState::for_gate(&self.cell.input_gate),
                GateState::for_gate(&self.cell.forget_gate),
                GateState::for_gate(&self.cell.candidate),
                GateState::for_gate(&self.cell.output_gate),
            ],
            dense_w: AdamState::for_param(&self.output_layer.weights),
            dense_b: AdamState::for_param(&self.output_layer.biases),
        }
    }

    fn apply_gradients(&mut self, adam: &Adam, state: &mut OptimizerState, grads: &NetworkGradients) {
        let [s_i, s_f, s_g, s_o] = &mut state.gates;
        s_i.apply(adam, &mut self.cell.input_gate, &grads.cell.input_gate);
        s_f.apply(adam, &mut self.cell.forget_gate, &grads.cell.forget_gate);
        s_g.apply(adam, &mut self.cell.candidate, &grads.cell.candidate);
        s_o.apply(adam, &mut self.cell.output_gate, &grads.cell.output_gate);
        adam.update(&mut self.output_layer.weights, &grads.dense_w, &mut state.dense_w);
        adam.update(&mut self.output_layer.biases, &grads.dense_b, &mut state.dense_b);
    }

    /// Mini-batch training with MSE loss
    ///
    /// Windows are reshuffled every epoch with `rng`. `cancel` is checked
    /// before each epoch; a cancelled run returns [`Error::Cancelled`].
    pub fn train<R: Rng + ?Sized>(
        &mut self,
        inputs: ArrayView3<'_, f64>,
        targets: ArrayView1<'_, f64>,
        config: &LstmConfig,
        rng: &mut R,
        cancel: &CancelToken,
    ) -> Result<TrainingSummary> {
        let n_samples = targets.len();
        if n_samples == 0 {
            return Err(Error::insufficient("LSTM training windows", 1, 0));
        }
        if inputs.shape()[0] != n_samples || inputs.shape()[2] != self.input_size() {
            return Err(Error::InvalidParameter(format!(
                "input shape {:?} does not match {} targets with {} features",
                inputs.shape(),
                n_samples,
                self.input_size()
            )));
        }

        let batch_size = config.batch_size.clamp(1, n_samples);
        let mut adam = Adam::new(config.learning_rate);
        let mut state = self.optimizer_state();
        let mut order: Vec<usize> = (0..n_samples).collect();
        let mut loss_history = Vec::with_capacity(config.epochs);

        for epoch in 0..config.epochs {
            cancel.check("LSTM training")?;
            order.shuffle(rng);

            let mut epoch_loss = 0.0;
            for batch in order.chunks(batch_size) {
                let mut grads = self.zero_gradients();
                let scale = 1.0 / batch.len() as f64;
                for &k in batch {
                    epoch_loss += self.backpropagate(
                        inputs.slice(s![k, .., ..]),
                        targets[k],
                        scale,
                        &mut grads,
                    );
                }

                if let Some(clip) = config.gradient_clip {
                    let norm = grads.global_norm();
                    if norm > clip {
                        grads.scale(clip / norm);
                    }
                }

                adam.step();
                self.apply_gradients(&adam, &mut state, &grads);
            }

            let avg_loss = epoch_loss / n_samples as f64;
            if !avg_loss.is_finite() {
                return Err(Error::ModelFit(format!(
                    "LSTM loss became non-finite at epoch {}",
                    epoch + 1
                )));
            }
            debug!(epoch = epoch + 1, loss = avg_loss, "LSTM epoch complete");
            loss_history.push(avg_loss);
        }

        Ok(TrainingSummary {
            epochs: loss_history.len(),
            loss_history,
        })
    }
}
