/// Categorical cross-entropy loss for use with a Softmax output layer.
pub struct CrossEntropyLoss;

/// Probabilities are clipped to `[EPS, 1 - EPS]` before the log.
const EPS: f64 = 1e-7;

impl CrossEntropyLoss {
    /// Scalar loss for one sample:
    ///   L = -sum(expected[i] * log(clip(predicted[i])))
    ///
    /// `predicted`: softmax probabilities, shape [n_classes]
    /// `expected` : one-hot target, shape [n_classes]
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        predicted.iter().zip(expected.iter())
            .filter(|(_, e)| **e != 0.0)
            .map(|(p, e)| -e * p.clamp(EPS, 1.0 - EPS).ln())
            .sum()
    }

    /// Gradient of Softmax + cross-entropy w.r.t. the pre-softmax logits:
    ///   ∂L/∂z_i = predicted[i] - expected[i]
    pub fn derivative(predicted: &[f64], expected: &[f64]) -> Vec<f64> {
        predicted.iter().zip(expected.iter())
            .map(|(p, e)| p - e)
            .collect()
    }
}

/// Index of the maximum element in a slice.
pub fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_loss_of_confident_correct_prediction_is_small() {
        let loss = CrossEntropyLoss::loss(&[0.98, 0.01, 0.01], &[1.0, 0.0, 0.0]);
        assert_relative_eq!(loss, -(0.98f64).ln(), epsilon = 1e-12);
    }

    #[test]
    fn test_loss_is_finite_for_zero_probability() {
        let loss = CrossEntropyLoss::loss(&[0.0, 1.0], &[1.0, 0.0]);
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }

    #[test]
    fn test_derivative() {
        assert_eq!(CrossEntropyLoss::derivative(&[0.25, 0.75], &[0.0, 1.0]), vec![0.25, -0.25]);
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
    }
}
