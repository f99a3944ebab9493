use rand::Rng;
use rand::rngs::StdRng;
use serde::{Serialize, Deserialize};

use crate::activation::ActivationFunction;
use crate::error::BackendError;
use crate::layers::{Conv2d, Dense, Dropout, Layer, MaxPool2d};
use crate::network::spec::{InputShape, ModelDescription, Shape, StageSpec};

/// A trainable network instantiated from a [`ModelDescription`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub name: String,
    pub input_shape: InputShape,
    pub layers: Vec<Layer>,
}

impl Network {
    /// Builds the runtime layers for `description`, initializing weights
    /// from `rng`.
    pub fn from_description<R: Rng>(description: &ModelDescription, rng: &mut R) -> Result<Network, BackendError> {
        let shapes = description.output_shapes().map_err(BackendError::MalformedDescription)?;
        let input_shape = description
            .input_shape()
            .ok_or_else(|| BackendError::MalformedDescription("missing Input stage".into()))?;

        let mut layers = Vec::with_capacity(description.stages.len());
        for (i, stage) in description.stages.iter().enumerate().skip(1) {
            let input = shapes[i - 1];
            let spatial = match input {
                Shape::Spatial { height, width, channels } => Some((height, width, channels)),
                Shape::Flat(_) => None,
            };
            let layer = match (stage, spatial) {
                (StageSpec::Conv2d { filters, kernel_size, activation }, Some(dims)) => {
                    Layer::Conv2d(Conv2d::new(dims, *filters, *kernel_size, *activation, rng))
                }
                (StageSpec::MaxPool2d { pool_size }, Some(dims)) => Layer::MaxPool2d(MaxPool2d::new(dims, *pool_size)),
                (StageSpec::Dropout { rate }, _) => Layer::Dropout(Dropout::new(*rate)),
                (StageSpec::Flatten, _) => Layer::Flatten,
                (StageSpec::Dense { units, activation }, None) => {
                    Layer::Dense(Dense::new(*units, input.len(), *activation, rng))
                }
                (StageSpec::Classifier { classes }, None) => {
                    Layer::Dense(Dense::new(*classes, input.len(), ActivationFunction::Softmax, rng))
                }
                (stage, _) => {
                    return Err(BackendError::MalformedDescription(format!(
                        "stage {i} ({stage:?}) cannot follow shape {input}"
                    )));
                }
            };
            layers.push(layer);
        }

        Ok(Network { name: description.name.clone(), input_shape, layers })
    }

    /// Forward pass; `rng` is `Some` in training mode. Stores activations in
    /// each layer for backprop.
    pub fn forward(&mut self, input: Vec<f64>, mut rng: Option<&mut StdRng>) -> Vec<f64> {
        let mut current = input;
        for layer in &mut self.layers {
            current = layer.forward(current, rng.as_deref_mut());
        }
        current
    }

    /// Width of the classifier output, if the last layer is dense.
    pub fn n_outputs(&self) -> Option<usize> {
        match self.layers.last() {
            Some(Layer::Dense(d)) => Some(d.size),
            _ => None,
        }
    }

    /// Inference-mode forward pass.
    pub fn predict(&mut self, input: Vec<f64>) -> Vec<f64> {
        self.forward(input, None)
    }

    /// Inference-mode output of the first `layer_count` layers, used as an
    /// embedding of the input.
    pub fn forward_until(&mut self, input: Vec<f64>, layer_count: usize) -> Vec<f64> {
        let mut current = input;
        for layer in self.layers.iter_mut().take(layer_count) {
            current = layer.forward(current, None);
        }
        current
    }

    /// Backpropagates the output gradient through every layer.
    pub fn backward(&mut self, grad: Vec<f64>) {
        let mut delta = grad;
        for layer in self.layers.iter_mut().rev() {
            delta = layer.backward(delta);
        }
    }

    pub fn zero_grads(&mut self) {
        self.layers.iter_mut().for_each(Layer::zero_grads);
    }

    /// All `(parameters, gradients)` pairs, in layer order.
    pub fn parameters(&mut self) -> Vec<(&mut [f64], &[f64])> {
        self.layers.iter_mut().flat_map(Layer::parameters).collect()
    }

    /// Serializes the network weights to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a network from a JSON file previously written by `save_json`.
    pub fn load_json(path: &str) -> std::io::Result<Network> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}
