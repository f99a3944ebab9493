pub mod adam;
pub mod sgd;

use serde::{Serialize, Deserialize};

pub use adam::Adam;
pub use sgd::Sgd;

/// Applies gradient updates to parameter slices.
///
/// `slot` identifies a parameter tensor across steps (stateful optimizers
/// keep per-slot moments); `scale` is multiplied into every gradient and is
/// typically `1 / batch_size`.
pub trait Optimizer {
    /// Marks the start of one update step (one mini-batch).
    fn begin_step(&mut self) {}

    fn update(&mut self, slot: usize, params: &mut [f64], grads: &[f64], scale: f64);
}

/// Serializable optimizer choice for a training protocol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerKind {
    Adam { learning_rate: f64 },
    Sgd { learning_rate: f64 },
}

impl OptimizerKind {
    pub fn learning_rate(&self) -> f64 {
        match *self {
            OptimizerKind::Adam { learning_rate } | OptimizerKind::Sgd { learning_rate } => learning_rate,
        }
    }

    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerKind::Adam { learning_rate } => Box::new(Adam::new(learning_rate)),
            OptimizerKind::Sgd { learning_rate } => Box::new(Sgd::new(learning_rate)),
        }
    }
}

impl Default for OptimizerKind {
    fn default() -> Self {
        OptimizerKind::Adam { learning_rate: 0.001 }
    }
}
