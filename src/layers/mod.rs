pub mod conv;
pub mod dense;
pub mod dropout;
pub mod pool;

use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

pub use conv::Conv2d;
pub use dense::Dense;
pub use dropout::Dropout;
pub use pool::MaxPool2d;

/// A runtime layer. Every layer consumes and produces a flat, channels-last
/// `Vec<f64>`; `Flatten` therefore only exists to mark the shape change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "layer", rename_all = "snake_case")]
pub enum Layer {
    Conv2d(Conv2d),
    MaxPool2d(MaxPool2d),
    Dropout(Dropout),
    Flatten,
    Dense(Dense),
}

impl Layer {
    /// Forward pass. `rng` is `Some` in training mode (enables dropout).
    pub fn forward(&mut self, input: Vec<f64>, rng: Option<&mut StdRng>) -> Vec<f64> {
        match self {
            Layer::Conv2d(l) => l.forward(input),
            Layer::MaxPool2d(l) => l.forward(input),
            Layer::Dropout(l) => l.forward(input, rng),
            Layer::Flatten => input,
            Layer::Dense(l) => l.feed_from(input),
        }
    }

    /// Backward pass for the most recent forward call; accumulates
    /// parameter gradients and returns the gradient w.r.t. the input.
    pub fn backward(&mut self, grad: Vec<f64>) -> Vec<f64> {
        match self {
            Layer::Conv2d(l) => l.backward(grad),
            Layer::MaxPool2d(l) => l.backward(grad),
            Layer::Dropout(l) => l.backward(grad),
            Layer::Flatten => grad,
            Layer::Dense(l) => l.backward(grad),
        }
    }

    pub fn zero_grads(&mut self) {
        match self {
            Layer::Conv2d(l) => l.zero_grads(),
            Layer::Dense(l) => l.zero_grads(),
            _ => {}
        }
    }

    /// `(parameters, accumulated gradients)` pairs, in a stable order.
    pub fn parameters(&mut self) -> Vec<(&mut [f64], &[f64])> {
        match self {
            Layer::Conv2d(l) => l.parameters(),
            Layer::Dense(l) => l.parameters(),
            _ => Vec::new(),
        }
    }
}
