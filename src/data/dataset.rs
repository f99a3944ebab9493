use crate::error::DataError;
use crate::network::spec::InputShape;

/// Normalized samples with one-hot labels.
///
/// Inputs are flat, channels-last, with values already scaled to `[0, 1]`;
/// nothing downstream re-normalizes them.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub inputs: Vec<Vec<f64>>,
    pub labels: Vec<Vec<f64>>,
    pub input_shape: InputShape,
    pub n_classes: usize,
}

impl Dataset {
    /// Validates that every sample matches `input_shape` and every label has
    /// `n_classes` columns.
    pub fn new(
        inputs: Vec<Vec<f64>>,
        labels: Vec<Vec<f64>>,
        input_shape: InputShape,
        n_classes: usize,
    ) -> Result<Dataset, DataError> {
        if inputs.len() != labels.len() {
            return Err(DataError::Inconsistent(format!(
                "{} inputs but {} labels",
                inputs.len(),
                labels.len()
            )));
        }
        if let Some(i) = inputs.iter().position(|x| x.len() != input_shape.len()) {
            return Err(DataError::Inconsistent(format!(
                "sample {i} has {} features, expected {}",
                inputs[i].len(),
                input_shape.len()
            )));
        }
        if let Some(i) = labels.iter().position(|y| y.len() != n_classes) {
            return Err(DataError::Inconsistent(format!(
                "label {i} has {} columns, expected {n_classes}",
                labels[i].len()
            )));
        }
        Ok(Dataset { inputs, labels, input_shape, n_classes })
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Splits off the last `fraction` of samples as a validation set, without
    /// shuffling. The training part keeps `floor(n * (1 - fraction))`
    /// samples, as Keras does. Returns `(train, validation)`.
    pub fn split_validation(&self, fraction: f64) -> (Dataset, Dataset) {
        let keep = (self.len() as f64 * (1.0 - fraction.clamp(0.0, 1.0))) as usize;
        let cut = keep.min(self.len());
        let part = |range: std::ops::Range<usize>| Dataset {
            inputs: self.inputs[range.clone()].to_vec(),
            labels: self.labels[range].to_vec(),
            input_shape: self.input_shape,
            n_classes: self.n_classes,
        };
        (part(0..cut), part(cut..self.len()))
    }

    /// Keeps at most the first `n` samples.
    pub fn truncate(&mut self, n: usize) {
        self.inputs.truncate(n);
        self.labels.truncate(n);
    }
}

/// One-hot encodes a class index.
pub fn one_hot(class: usize, n_classes: usize) -> Vec<f64> {
    let mut v = vec![0.0; n_classes];
    v[class] = 1.0;
    v
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset(n: usize) -> Dataset {
        let inputs = (0..n).map(|i| vec![i as f64 / n as f64; 4]).collect();
        let labels = (0..n).map(|i| one_hot(i % 2, 2)).collect();
        Dataset::new(inputs, labels, InputShape::new(2, 2, 1), 2).unwrap()
    }

    #[test]
    fn test_split_takes_tail() {
        let d = dataset(10);
        let (train, val) = d.split_validation(0.3);
        assert_eq!(train.len(), 7);
        assert_eq!(val.len(), 3);
        assert_eq!(val.inputs[0], d.inputs[7]);
    }

    #[test]
    fn test_split_rounds_training_part_down() {
        let (train, val) = dataset(3).split_validation(0.5);
        assert_eq!(train.len(), 1);
        assert_eq!(val.len(), 2);

        let (train, val) = dataset(7).split_validation(0.3);
        assert_eq!((train.len(), val.len()), (4, 3));
    }

    #[test]
    fn test_split_zero_fraction() {
        let (train, val) = dataset(5).split_validation(0.0);
        assert_eq!(train.len(), 5);
        assert!(val.is_empty());
    }

    #[test]
    fn test_rejects_wrong_feature_count() {
        let err = Dataset::new(vec![vec![0.0; 3]], vec![one_hot(0, 2)], InputShape::new(2, 2, 1), 2).unwrap_err();
        assert!(err.to_string().contains("3 features"));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        assert!(Dataset::new(vec![vec![0.0; 4]], vec![], InputShape::new(2, 2, 1), 2).is_err());
    }
}
