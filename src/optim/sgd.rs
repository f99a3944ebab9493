use crate::optim::Optimizer;

/// Plain stochastic gradient descent.
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Sgd {
        Sgd { learning_rate }
    }
}

impl Optimizer for Sgd {
    fn update(&mut self, _slot: usize, params: &mut [f64], grads: &[f64], scale: f64) {
        let step = self.learning_rate * scale;
        for (p, g) in params.iter_mut().zip(grads) {
            *p -= step * g;
        }
    }
}
