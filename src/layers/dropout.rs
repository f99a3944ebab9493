use rand::Rng;
use serde::{Serialize, Deserialize};

/// Inverted dropout: in training mode each element is zeroed with
/// probability `rate` and survivors are scaled by `1 / (1 - rate)`.
/// At inference the layer is the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dropout {
    pub rate: f64,
    #[serde(skip)]
    mask: Vec<f64>,
}

impl Dropout {
    pub fn new(rate: f64) -> Dropout {
        Dropout { rate, mask: Vec::new() }
    }

    pub fn forward<R: Rng>(&mut self, mut input: Vec<f64>, rng: Option<&mut R>) -> Vec<f64> {
        let rng = match rng {
            Some(rng) if self.rate > 0.0 => rng,
            _ => {
                self.mask = vec![1.0; input.len()];
                return input;
            }
        };
        let scale = 1.0 / (1.0 - self.rate);
        self.mask = (0..input.len())
            .map(|_| if rng.gen::<f64>() < self.rate { 0.0 } else { scale })
            .collect();
        for (x, m) in input.iter_mut().zip(&self.mask) {
            *x *= m;
        }
        input
    }

    pub fn backward(&mut self, mut grad: Vec<f64>) -> Vec<f64> {
        for (g, m) in grad.iter_mut().zip(&self.mask) {
            *g *= m;
        }
        grad
    }
}
