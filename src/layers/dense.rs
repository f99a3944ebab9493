use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// Fully connected layer with a fused activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dense {
    pub size: usize,
    pub input_size: usize,
    /// Shape `(input_size, size)`.
    pub weights: Matrix,
    pub biases: Vec<f64>,
    pub activator: ActivationFunction,
    #[serde(skip)]
    input: Vec<f64>,
    #[serde(skip)]
    pre_neurons: Vec<f64>, // z = xW + b, needed for the activation derivative
    #[serde(skip)]
    weight_grads: Matrix,
    #[serde(skip)]
    bias_grads: Vec<f64>,
}

impl Dense {
    pub fn new<R: rand::Rng>(size: usize, input_size: usize, activation: ActivationFunction, rng: &mut R) -> Dense {
        Dense {
            size,
            input_size,
            weights: Matrix::glorot_uniform(input_size, size, input_size, size, rng),
            biases: vec![0.0; size],
            activator: activation,
            input: Vec::new(),
            pre_neurons: Vec::new(),
            weight_grads: Matrix::zeros(input_size, size),
            bias_grads: vec![0.0; size],
        }
    }

    pub fn feed_from(&mut self, input: Vec<f64>) -> Vec<f64> {
        let mut z = self.weights.vec_mul(&input);
        for (zi, b) in z.iter_mut().zip(&self.biases) {
            *zi += b;
        }
        let mut a = z.clone();
        self.activator.apply(&mut a);
        self.pre_neurons = z;
        self.input = input;
        a
    }

    /// Accumulates parameter gradients for one sample and returns ∂L/∂input.
    /// `grad` is ∂L/∂a for this layer (error in activation space).
    pub fn backward(&mut self, grad: Vec<f64>) -> Vec<f64> {
        // δ = error ⊙ σ'(z)
        let delta: Vec<f64> = grad.iter().zip(&self.pre_neurons)
            .map(|(g, &z)| g * self.activator.derivative(z))
            .collect();

        self.ensure_grads();
        self.weight_grads.add_outer(&self.input, &delta);
        for (bg, d) in self.bias_grads.iter_mut().zip(&delta) {
            *bg += d;
        }
        self.weights.mul_vec(&delta)
    }

    pub fn zero_grads(&mut self) {
        self.ensure_grads();
        self.weight_grads.fill(0.0);
        self.bias_grads.iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn parameters(&mut self) -> Vec<(&mut [f64], &[f64])> {
        vec![
            (&mut self.weights.data[..], &self.weight_grads.data[..]),
            (&mut self.biases[..], &self.bias_grads[..]),
        ]
    }

    // Gradient buffers are not serialized; rebuild them after loading.
    fn ensure_grads(&mut self) {
        if self.weight_grads.rows != self.input_size || self.weight_grads.cols != self.size {
            self.weight_grads = Matrix::zeros(self.input_size, self.size);
            self.bias_grads = vec![0.0; self.size];
        }
    }
}
