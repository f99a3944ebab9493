use serde::{Serialize, Deserialize};

use crate::{math::matrix::Matrix, activation::activation::ActivationFunction};

/// 2-D convolution, valid padding, stride 1, channels-last layout.
///
/// The kernel is stored as a `(kernel * kernel * in_channels, filters)`
/// matrix so that each flattened receptive field maps to all filter
/// responses with one row-vector product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conv2d {
    pub in_height: usize,
    pub in_width: usize,
    pub in_channels: usize,
    pub filters: usize,
    pub kernel_size: usize,
    pub kernel: Matrix,
    pub biases: Vec<f64>,
    pub activator: ActivationFunction,
    #[serde(skip)]
    input: Vec<f64>,
    #[serde(skip)]
    pre_activation: Vec<f64>,
    #[serde(skip)]
    kernel_grads: Matrix,
    #[serde(skip)]
    bias_grads: Vec<f64>,
}

impl Conv2d {
    pub fn new<R: rand::Rng>(
        (in_height, in_width, in_channels): (usize, usize, usize),
        filters: usize,
        kernel_size: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Conv2d {
        let field = kernel_size * kernel_size;
        let rows = field * in_channels;
        Conv2d {
            in_height,
            in_width,
            in_channels,
            filters,
            kernel_size,
            kernel: Matrix::glorot_uniform(rows, filters, rows, field * filters, rng),
            biases: vec![0.0; filters],
            activator: activation,
            input: Vec::new(),
            pre_activation: Vec::new(),
            kernel_grads: Matrix::zeros(rows, filters),
            bias_grads: vec![0.0; filters],
        }
    }

    pub fn out_height(&self) -> usize {
        self.in_height - self.kernel_size + 1
    }

    pub fn out_width(&self) -> usize {
        self.in_width - self.kernel_size + 1
    }

    /// Copies the receptive field whose top-left corner is `(y, x)` into `patch`.
    fn gather(&self, input: &[f64], y: usize, x: usize, patch: &mut [f64]) {
        let (k, c) = (self.kernel_size, self.in_channels);
        for ky in 0..k {
            let row_start = ((y + ky) * self.in_width + x) * c;
            patch[ky * k * c..(ky + 1) * k * c].copy_from_slice(&input[row_start..row_start + k * c]);
        }
    }

    pub fn forward(&mut self, input: Vec<f64>) -> Vec<f64> {
        let (oh, ow, f) = (self.out_height(), self.out_width(), self.filters);
        let mut patch = vec![0.0; self.kernel.rows];
        let mut z = Vec::with_capacity(oh * ow * f);

        for y in 0..oh {
            for x in 0..ow {
                self.gather(&input, y, x, &mut patch);
                let response = self.kernel.vec_mul(&patch);
                z.extend(response.iter().zip(&self.biases).map(|(r, b)| r + b));
            }
        }

        let mut a = z.clone();
        self.activator.apply(&mut a);
        self.pre_activation = z;
        self.input = input;
        a
    }

    pub fn backward(&mut self, grad: Vec<f64>) -> Vec<f64> {
        let (ow, f) = (self.out_width(), self.filters);
        let (k, c) = (self.kernel_size, self.in_channels);
        let delta: Vec<f64> = grad.iter().zip(&self.pre_activation)
            .map(|(g, &z)| g * self.activator.derivative(z))
            .collect();

        self.ensure_grads();
        let mut grad_input = vec![0.0; self.input.len()];
        let mut patch = vec![0.0; self.kernel.rows];

        for (pos, d) in delta.chunks_exact(f).enumerate() {
            if d.iter().all(|&v| v == 0.0) {
                continue;
            }
            let (y, x) = (pos / ow, pos % ow);
            self.gather(&self.input, y, x, &mut patch);
            self.kernel_grads.add_outer(&patch, d);
            for (bg, dv) in self.bias_grads.iter_mut().zip(d) {
                *bg += dv;
            }

            let d_patch = self.kernel.mul_vec(d);
            for ky in 0..k {
                let row_start = ((y + ky) * self.in_width + x) * c;
                let src = &d_patch[ky * k * c..(ky + 1) * k * c];
                for (gi, s) in grad_input[row_start..row_start + k * c].iter_mut().zip(src) {
                    *gi += s;
                }
            }
        }
        grad_input
    }

    pub fn zero_grads(&mut self) {
        self.ensure_grads();
        self.kernel_grads.fill(0.0);
        self.bias_grads.iter_mut().for_each(|g| *g = 0.0);
    }

    pub fn parameters(&mut self) -> Vec<(&mut [f64], &[f64])> {
        vec![
            (&mut self.kernel.data[..], &self.kernel_grads.data[..]),
            (&mut self.biases[..], &self.bias_grads[..]),
        ]
    }

    fn ensure_grads(&mut self) {
        if self.kernel_grads.rows != self.kernel.rows || self.kernel_grads.cols != self.kernel.cols {
            self.kernel_grads = Matrix::zeros(self.kernel.rows, self.kernel.cols);
            self.bias_grads = vec![0.0; self.filters];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_output_shape() {
        let mut conv = Conv2d::new((5, 4, 2), 3, 3, ActivationFunction::ReLU, &mut StdRng::seed_from_u64(0));
        let out = conv.forward(vec![0.5; 5 * 4 * 2]);
        assert_eq!((conv.out_height(), conv.out_width()), (3, 2));
        assert_eq!(out.len(), 3 * 2 * 3);
    }

    #[test]
    fn test_known_kernel() {
        let mut conv = Conv2d::new((3, 3, 1), 1, 2, ActivationFunction::Identity, &mut StdRng::seed_from_u64(0));
        conv.kernel.data = vec![1.0, 0.0, 0.0, 1.0]; // main diagonal
        conv.biases = vec![0.0];
        let input: Vec<f64> = (1..=9).map(|v| v as f64).collect();
        // [1 2 3; 4 5 6; 7 8 9] -> 1+5, 2+6, 4+8, 5+9
        assert_eq!(conv.forward(input), vec![6.0, 8.0, 12.0, 14.0]);
    }

    #[test]
    fn test_input_gradient_matches_finite_difference() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut conv = Conv2d::new((4, 4, 2), 2, 3, ActivationFunction::Identity, &mut rng);
        let input: Vec<f64> = (0..32).map(|i| (i as f64 * 0.37).sin()).collect();

        conv.zero_grads();
        conv.forward(input.clone());
        let grad_input = conv.backward(vec![1.0; 2 * 2 * 2]);

        let h = 1e-6;
        let base: f64 = conv.forward(input.clone()).iter().sum();
        let mut bumped_input = input;
        bumped_input[13] += h;
        let bumped: f64 = conv.forward(bumped_input).iter().sum();
        assert_relative_eq!((bumped - base) / h, grad_input[13], epsilon = 1e-4);
    }
}
