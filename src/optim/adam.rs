use crate::optim::Optimizer;

/// Adam optimizer with bias-corrected moment estimates.
///
/// θ_t = θ_{t-1} - lr * m̂_t / (√v̂_t + ε)
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
    m: Vec<Vec<f64>>, // first moment, one buffer per parameter slot
    v: Vec<Vec<f64>>, // second moment
}

impl Adam {
    pub fn new(learning_rate: f64) -> Adam {
        Adam { learning_rate, beta1: 0.9, beta2: 0.999, epsilon: 1e-7, t: 0, m: Vec::new(), v: Vec::new() }
    }

    pub fn step_count(&self) -> i32 {
        self.t
    }
}

impl Optimizer for Adam {
    fn begin_step(&mut self) {
        self.t += 1;
    }

    fn update(&mut self, slot: usize, params: &mut [f64], grads: &[f64], scale: f64) {
        if slot >= self.m.len() {
            self.m.resize(slot + 1, Vec::new());
            self.v.resize(slot + 1, Vec::new());
        }
        if self.m[slot].len() != params.len() {
            self.m[slot] = vec![0.0; params.len()];
            self.v[slot] = vec![0.0; params.len()];
        }

        let t = self.t.max(1);
        let correction1 = 1.0 - self.beta1.powi(t);
        let correction2 = 1.0 - self.beta2.powi(t);
        let (m, v) = (&mut self.m[slot], &mut self.v[slot]);

        for i in 0..params.len() {
            let g = grads[i] * scale;
            m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
            v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;
            let m_hat = m[i] / correction1;
            let v_hat = v[i] / correction2;
            params[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }
}
