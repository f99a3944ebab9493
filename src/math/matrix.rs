use rand::Rng;
use serde::{Serialize, Deserialize};

/// Row-major dense matrix.
///
/// Dense layers store their kernel as `(input_size, units)`; convolution
/// layers store theirs as `(kernel * kernel * in_channels, filters)` so that
/// one receptive-field patch times the matrix gives every filter's response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub rows: usize,
    pub cols: usize,
    pub data: Vec<f64>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix { rows, cols, data: vec![0.0; rows * cols] }
    }

    /// Glorot (Xavier) uniform initialization: U(-limit, limit) with
    /// `limit = sqrt(6 / (fan_in + fan_out))`.
    ///
    /// `fan_in` / `fan_out` are passed explicitly because for convolution
    /// kernels they include the receptive field size.
    pub fn glorot_uniform<R: Rng>(rows: usize, cols: usize, fan_in: usize, fan_out: usize, rng: &mut R) -> Matrix {
        let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
        let data = (0..rows * cols)
            .map(|_| rng.gen_range(-limit..=limit))
            .collect();
        Matrix { rows, cols, data }
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// Row vector times matrix: `x · M`, with `x.len() == rows`.
    pub fn vec_mul(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.rows);
        let mut out = vec![0.0; self.cols];
        for (r, &xv) in x.iter().enumerate() {
            if xv == 0.0 {
                continue;
            }
            let row = &self.data[r * self.cols..(r + 1) * self.cols];
            for (o, &w) in out.iter_mut().zip(row) {
                *o += xv * w;
            }
        }
        out
    }

    /// Matrix times column vector: `M · d`, with `d.len() == cols`.
    pub fn mul_vec(&self, d: &[f64]) -> Vec<f64> {
        debug_assert_eq!(d.len(), self.cols);
        self.data
            .chunks_exact(self.cols)
            .map(|row| row.iter().zip(d).map(|(w, dv)| w * dv).sum())
            .collect()
    }

    /// Accumulates the outer product `a ⊗ b` into this matrix.
    pub fn add_outer(&mut self, a: &[f64], b: &[f64]) {
        debug_assert_eq!(a.len(), self.rows);
        debug_assert_eq!(b.len(), self.cols);
        for (r, &av) in a.iter().enumerate() {
            if av == 0.0 {
                continue;
            }
            let row = &mut self.data[r * self.cols..(r + 1) * self.cols];
            for (g, &bv) in row.iter_mut().zip(b) {
                *g += av * bv;
            }
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.iter_mut().for_each(|x| *x = value);
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}
