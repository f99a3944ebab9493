use serde::{Deserialize, Serialize};

use crate::data::Dataset;
use crate::loss::cross_entropy::argmax;
use crate::network::network::Network;

/// Distance from an anchor sample to one sample of a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceRow {
    pub index: usize,
    pub label: usize,
    pub distance: f64,
}

/// Output of the first `layer_count` runtime layers for every sample.
pub fn embed(network: &mut Network, data: &Dataset, layer_count: usize) -> Vec<Vec<f64>> {
    data.inputs.iter().map(|x| network.forward_until(x.clone(), layer_count)).collect()
}

pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum::<f64>().sqrt()
}

/// Index of the first sample of each class, in class order. Classes with no
/// samples are skipped.
pub fn first_of_each_class(data: &Dataset) -> Vec<usize> {
    (0..data.n_classes)
        .filter_map(|class| data.labels.iter().position(|y| argmax(y) == class))
        .collect()
}

/// Distances from `embeddings[anchor]` to every embedding, sorted nearest
/// first. Returns an empty list for an out-of-range anchor.
pub fn distances(embeddings: &[Vec<f64>], labels: &[Vec<f64>], anchor: usize) -> Vec<DistanceRow> {
    let Some(origin) = embeddings.get(anchor) else {
        return Vec::new();
    };
    let mut rows: Vec<DistanceRow> = embeddings
        .iter()
        .zip(labels)
        .enumerate()
        .map(|(index, (e, y))| DistanceRow { index, label: argmax(y), distance: euclidean(origin, e) })
        .collect();
    rows.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::one_hot;
    use crate::network::{assemble, InputShape};
    use crate::sweep::domain::Configuration;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn dataset() -> Dataset {
        let inputs = vec![vec![0.0; 16], vec![1.0; 16], vec![0.1; 16], vec![0.9; 16]];
        let labels = vec![one_hot(1, 3), one_hot(0, 3), one_hot(1, 3), one_hot(0, 3)];
        Dataset::new(inputs, labels, InputShape::new(4, 4, 1), 3).unwrap()
    }

    #[test]
    fn test_euclidean() {
        assert_relative_eq!(euclidean(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
    }

    #[test]
    fn test_anchors_are_first_per_class() {
        assert_eq!(first_of_each_class(&dataset()), vec![1, 0]);
    }

    #[test]
    fn test_distances_sorted_with_anchor_first() {
        let embeddings = vec![vec![0.0], vec![5.0], vec![1.0]];
        let labels = vec![one_hot(0, 2), one_hot(1, 2), one_hot(0, 2)];
        let rows = distances(&embeddings, &labels, 0);
        assert_eq!(rows.iter().map(|r| r.index).collect::<Vec<_>>(), vec![0, 2, 1]);
        assert_eq!(rows[0].distance, 0.0);
        assert_eq!(rows[2].label, 1);
        assert!(distances(&embeddings, &labels, 9).is_empty());
    }

    #[test]
    fn test_embed_truncates_network() {
        let config = Configuration { conv_layers: 1, conv_filters: 3, filter_size: 3, dense_layers: 1, dense_units: 5 };
        let description = assemble(InputShape::new(4, 4, 1), 3, &config).unwrap();
        let mut net = Network::from_description(&description, &mut StdRng::seed_from_u64(0)).unwrap();
        // conv -> (2, 2, 3)
        let e = embed(&mut net, &dataset(), 1);
        assert_eq!(e.len(), 4);
        assert!(e.iter().all(|v| v.len() == 12));
    }
}
