use serde::{Serialize, Deserialize};

/// Non-overlapping max pooling over `pool_size × pool_size` windows.
/// Trailing rows/columns that do not fill a window are dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaxPool2d {
    pub in_height: usize,
    pub in_width: usize,
    pub channels: usize,
    pub pool_size: usize,
    /// Input index of the maximum for every output cell.
    #[serde(skip)]
    switches: Vec<usize>,
    #[serde(skip)]
    input_len: usize,
}

impl MaxPool2d {
    pub fn new((in_height, in_width, channels): (usize, usize, usize), pool_size: usize) -> MaxPool2d {
        MaxPool2d { in_height, in_width, channels, pool_size, switches: Vec::new(), input_len: 0 }
    }

    pub fn out_height(&self) -> usize {
        self.in_height / self.pool_size
    }

    pub fn out_width(&self) -> usize {
        self.in_width / self.pool_size
    }

    pub fn forward(&mut self, input: Vec<f64>) -> Vec<f64> {
        let (oh, ow, c, p) = (self.out_height(), self.out_width(), self.channels, self.pool_size);
        let mut out = Vec::with_capacity(oh * ow * c);
        self.switches.clear();

        for y in 0..oh {
            for x in 0..ow {
                for ch in 0..c {
                    let mut best = (f64::NEG_INFINITY, 0);
                    for py in 0..p {
                        for px in 0..p {
                            let idx = ((y * p + py) * self.in_width + x * p + px) * c + ch;
                            if input[idx] > best.0 {
                                best = (input[idx], idx);
                            }
                        }
                    }
                    out.push(best.0);
                    self.switches.push(best.1);
                }
            }
        }
        self.input_len = input.len();
        out
    }

    /// Routes each output gradient to the input cell that won the max.
    pub fn backward(&mut self, grad: Vec<f64>) -> Vec<f64> {
        let mut grad_input = vec![0.0; self.input_len];
        for (g, &idx) in grad.iter().zip(&self.switches) {
            grad_input[idx] += g;
        }
        grad_input
    }
}
