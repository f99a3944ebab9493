use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    ReLU,
    Identity,
    /// Softmax is vector-valued; use [`ActivationFunction::apply`] on a whole
    /// layer output rather than the element-wise `function()`.
    Softmax,
}

impl ActivationFunction {
    /// Element-wise activation. Softmax falls back to identity here; the
    /// vector form lives in `apply`.
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::Identity | ActivationFunction::Softmax => x,
        }
    }

    /// Element-wise derivative with respect to the pre-activation value.
    ///
    /// Softmax is always paired with cross-entropy, whose combined gradient
    /// `predicted - expected` is already computed by the loss, so `1.0` passes
    /// that delta through without applying the Jacobian twice.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::Identity | ActivationFunction::Softmax => 1.0,
        }
    }

    /// Applies the activation to a full layer output in place.
    pub fn apply(&self, values: &mut [f64]) {
        match self {
            ActivationFunction::Softmax => softmax(values),
            _ => values.iter_mut().for_each(|v| *v = self.function(*v)),
        }
    }
}

/// Numerically stable softmax (shifted by the maximum).
fn softmax(values: &mut [f64]) {
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in values.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    if sum > 0.0 {
        values.iter_mut().for_each(|v| *v /= sum);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_relu() {
        let mut v = [-1.0, 0.0, 2.5];
        ActivationFunction::ReLU.apply(&mut v);
        assert_eq!(v, [0.0, 0.0, 2.5]);
        assert_eq!(ActivationFunction::ReLU.derivative(-3.0), 0.0);
        assert_eq!(ActivationFunction::ReLU.derivative(3.0), 1.0);
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut v = [1000.0, 1001.0, 1002.0];
        ActivationFunction::Softmax.apply(&mut v);
        assert_relative_eq!(v.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        assert!(v[2] > v[1] && v[1] > v[0]);
    }
}
