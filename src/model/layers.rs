//! Fully connected output layer

use ndarray::{Array1, Array2};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Linear layer `y = W x + b`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    /// Weights (output_size x input_size)
    pub weights: Array2<f64>,
    /// Biases (output_size)
    pub biases: Array1<f64>,
}

impl Dense {
    /// Xavier/Glorot uniform initialisation, zero biases
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let limit = (6.0 / (input_size + output_size) as f64).sqrt();
        Self {
            weights: Array2::random_using(
                (output_size, input_size),
                Uniform::new(-limit, limit),
                rng,
            ),
            biases: Array1::zeros(output_size),
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.ncols()
    }

    pub fn output_size(&self) -> usize {
        self.weights.nrows()
    }

    pub fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        self.weights.dot(input) + &self.biases
    }

    /// Gradients for a single input
    ///
    /// Returns `(input_gradient, weight_gradient, bias_gradient)`.
    pub fn backward(
        &self,
        input: &Array1<f64>,
        output_gradient: &Array1<f64>,
    ) -> (Array1<f64>, Array2<f64>, Array1<f64>) {
        let weight_gradient = Array2::from_shape_fn(self.weights.raw_dim(), |(i, j)| {
            output_gradient[i] * input[j]
        });
        let input_gradient = self.weights.t().dot(output_gradient);
        (input_gradient, weight_gradient, output_gradient.clone())
    }
}
