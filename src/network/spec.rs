use std::fmt;

use serde::{Serialize, Deserialize};
use crate::activation::ActivationFunction;

/// Shape of one input sample, channels-last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl InputShape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        InputShape { height, width, channels }
    }

    /// Number of scalar features in one flattened sample.
    pub fn len(&self) -> usize {
        self.height * self.width * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InputShape {
    fn default() -> Self {
        InputShape::new(28, 28, 1)
    }
}

/// Output shape of a stage: a feature map or a flat vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Spatial { height: usize, width: usize, channels: usize },
    Flat(usize),
}

impl Shape {
    pub fn len(&self) -> usize {
        match *self {
            Shape::Spatial { height, width, channels } => height * width * channels,
            Shape::Flat(n) => n,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Spatial { height, width, channels } => write!(f, "({height}, {width}, {channels})"),
            Shape::Flat(n) => write!(f, "({n})"),
        }
    }
}

/// One stage of a layered network description, input → output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum StageSpec {
    Input { shape: InputShape },
    /// Valid-padding, stride-1 convolution with `filters` square kernels.
    Conv2d { filters: usize, kernel_size: usize, activation: ActivationFunction },
    /// Non-overlapping `pool_size × pool_size` max pooling.
    MaxPool2d { pool_size: usize },
    Dropout { rate: f64 },
    Flatten,
    Dense { units: usize, activation: ActivationFunction },
    /// Softmax classification output with `classes` units.
    Classifier { classes: usize },
}

impl StageSpec {
    fn kind(&self) -> &'static str {
        match self {
            StageSpec::Input { .. } => "Input",
            StageSpec::Conv2d { .. } => "Conv2D",
            StageSpec::MaxPool2d { .. } => "MaxPooling2D",
            StageSpec::Dropout { .. } => "Dropout",
            StageSpec::Flatten => "Flatten",
            StageSpec::Dense { .. } => "Dense",
            StageSpec::Classifier { .. } => "Dense (softmax)",
        }
    }
}

/// A fully serializable description of a network architecture.
///
/// Produced by the assembler from a `Configuration`; consumed read-only by a
/// training backend. Can be saved to / loaded from JSON independently of
/// trained weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Human-readable name (the configuration label, or "baseline").
    pub name: String,
    /// Ordered stages, starting with `Input` and ending with `Classifier`.
    pub stages: Vec<StageSpec>,
}

impl ModelDescription {
    pub fn input_shape(&self) -> Option<InputShape> {
        match self.stages.first() {
            Some(StageSpec::Input { shape }) => Some(*shape),
            _ => None,
        }
    }

    pub fn n_classes(&self) -> Option<usize> {
        match self.stages.last() {
            Some(StageSpec::Classifier { classes }) => Some(*classes),
            _ => None,
        }
    }

    /// Infers the output shape of every stage, checking that the stage
    /// sequence is well formed along the way.
    pub fn output_shapes(&self) -> Result<Vec<Shape>, String> {
        let mut shapes = Vec::with_capacity(self.stages.len());
        let mut current: Option<Shape> = None;

        for (i, stage) in self.stages.iter().enumerate() {
            let next = match (stage, current) {
                (StageSpec::Input { shape }, None) => {
                    if shape.is_empty() {
                        return Err(format!("input shape {:?} has a zero dimension", shape));
                    }
                    Shape::Spatial { height: shape.height, width: shape.width, channels: shape.channels }
                }
                (StageSpec::Input { .. }, Some(_)) => {
                    return Err(format!("stage {i}: Input may only appear first"));
                }
                (_, None) => return Err("the first stage must be Input".to_owned()),

                (StageSpec::Conv2d { filters, kernel_size, .. }, Some(Shape::Spatial { height, width, .. })) => {
                    if *filters == 0 || *kernel_size == 0 {
                        return Err(format!("stage {i}: convolution needs at least one filter of size >= 1"));
                    }
                    if *kernel_size > height || *kernel_size > width {
                        return Err(format!(
                            "stage {i}: kernel {kernel_size}x{kernel_size} does not fit a {height}x{width} feature map"
                        ));
                    }
                    Shape::Spatial {
                        height: height - kernel_size + 1,
                        width: width - kernel_size + 1,
                        channels: *filters,
                    }
                }
                (StageSpec::MaxPool2d { pool_size }, Some(Shape::Spatial { height, width, channels })) => {
                    if *pool_size == 0 || height / pool_size == 0 || width / pool_size == 0 {
                        return Err(format!(
                            "stage {i}: pool {pool_size}x{pool_size} does not fit a {height}x{width} feature map"
                        ));
                    }
                    Shape::Spatial { height: height / pool_size, width: width / pool_size, channels }
                }
                (StageSpec::Conv2d { .. } | StageSpec::MaxPool2d { .. }, Some(Shape::Flat(_))) => {
                    return Err(format!("stage {i}: {} needs a feature map, found a flat vector", stage.kind()));
                }
                (StageSpec::Dropout { rate }, Some(shape)) => {
                    if !(0.0..1.0).contains(rate) {
                        return Err(format!("stage {i}: dropout rate {rate} is outside [0, 1)"));
                    }
                    shape
                }
                (StageSpec::Flatten, Some(shape)) => Shape::Flat(shape.len()),
                (StageSpec::Dense { units, .. }, Some(Shape::Flat(_))) => {
                    if *units == 0 {
                        return Err(format!("stage {i}: dense stage needs at least one unit"));
                    }
                    Shape::Flat(*units)
                }
                (StageSpec::Classifier { classes }, Some(Shape::Flat(_))) => {
                    if *classes == 0 {
                        return Err(format!("stage {i}: classifier needs at least one class"));
                    }
                    if i + 1 != self.stages.len() {
                        return Err(format!("stage {i}: Classifier must be the last stage"));
                    }
                    Shape::Flat(*classes)
                }
                (StageSpec::Dense { .. } | StageSpec::Classifier { .. }, Some(Shape::Spatial { .. })) => {
                    return Err(format!("stage {i}: {} needs a flat vector; add a Flatten stage", stage.kind()));
                }
            };
            shapes.push(next);
            current = Some(next);
        }

        if !matches!(self.stages.last(), Some(StageSpec::Classifier { .. })) {
            return Err("the last stage must be Classifier".to_owned());
        }
        Ok(shapes)
    }

    /// Trainable parameter count per stage.
    fn stage_parameters(&self, shapes: &[Shape]) -> Vec<usize> {
        self.stages.iter().enumerate().map(|(i, stage)| {
            let input = if i == 0 { 0 } else { shapes[i - 1].len() };
            match (stage, i.checked_sub(1).map(|p| shapes[p])) {
                (StageSpec::Conv2d { filters, kernel_size, .. }, Some(Shape::Spatial { channels, .. })) => {
                    kernel_size * kernel_size * channels * filters + filters
                }
                (StageSpec::Dense { units, .. }, _) => input * units + units,
                (StageSpec::Classifier { classes }, _) => input * classes + classes,
                _ => 0,
            }
        }).collect()
    }

    /// Total trainable parameters, or `None` for a malformed description.
    pub fn parameter_count(&self) -> Option<usize> {
        let shapes = self.output_shapes().ok()?;
        Some(self.stage_parameters(&shapes).iter().sum())
    }

    /// Renders a per-stage table of output shapes and parameter counts.
    pub fn summary(&self) -> String {
        let shapes = match self.output_shapes() {
            Ok(s) => s,
            Err(e) => return format!("Model \"{}\" (malformed: {e})", self.name),
        };
        let params = self.stage_parameters(&shapes);

        let mut out = format!("Model \"{}\"\n", self.name);
        out.push_str(&format!("{:<18} {:<16} {:>10}\n", "Stage", "Output shape", "Params"));
        for ((stage, shape), p) in self.stages.iter().zip(&shapes).zip(&params) {
            out.push_str(&format!("{:<18} {:<16} {:>10}\n", stage.kind(), shape.to_string(), p));
        }
        out.push_str(&format!("Total params: {}", params.iter().sum::<usize>()));
        out
    }

    /// Serializes the description to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> std::io::Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }

    /// Deserializes a `ModelDescription` from a JSON file.
    pub fn load_json(path: &str) -> std::io::Result<ModelDescription> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> ModelDescription {
        ModelDescription {
            name: "small".into(),
            stages: vec![
                StageSpec::Input { shape: InputShape::new(6, 6, 1) },
                StageSpec::Conv2d { filters: 2, kernel_size: 3, activation: ActivationFunction::ReLU },
                StageSpec::MaxPool2d { pool_size: 2 },
                StageSpec::Dropout { rate: 0.5 },
                StageSpec::Flatten,
                StageSpec::Dense { units: 4, activation: ActivationFunction::ReLU },
                StageSpec::Classifier { classes: 3 },
            ],
        }
    }

    #[test]
    fn test_output_shapes() {
        let shapes = small().output_shapes().unwrap();
        assert_eq!(shapes[1], Shape::Spatial { height: 4, width: 4, channels: 2 });
        assert_eq!(shapes[2], Shape::Spatial { height: 2, width: 2, channels: 2 });
        assert_eq!(shapes[4], Shape::Flat(8));
        assert_eq!(shapes[6], Shape::Flat(3));
    }

    #[test]
    fn test_parameter_count() {
        // conv: 3*3*1*2 + 2 = 20, dense: 8*4 + 4 = 36, classifier: 4*3 + 3 = 15
        assert_eq!(small().parameter_count(), Some(71));
    }

    #[test]
    fn test_rejects_dense_before_flatten() {
        let mut d = small();
        d.stages.remove(4);
        assert!(d.output_shapes().unwrap_err().contains("Flatten"));
    }

    #[test]
    fn test_rejects_missing_classifier() {
        let mut d = small();
        d.stages.pop();
        assert!(d.output_shapes().is_err());
        assert_eq!(d.parameter_count(), None);
    }

    #[test]
    fn test_summary_lists_every_stage() {
        let s = small().summary();
        assert!(s.contains("Conv2D"));
        assert!(s.contains("(4, 4, 2)"));
        assert!(s.contains("Total params: 71"));
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let path = path.to_str().unwrap();
        small().save_json(path).unwrap();
        assert_eq!(ModelDescription::load_json(path).unwrap(), small());
    }
}
