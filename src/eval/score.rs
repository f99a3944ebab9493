use std::path::Path;

use tracing::info;

use crate::data::{import_images, load_idx_pair, Dataset};
use crate::error::{DataError, Result};
use crate::network::network::Network;
use crate::train::epoch_stats::TestScore;
use crate::train::loop_fn::evaluate;

fn n_classes(network: &Network) -> Result<usize> {
    network
        .n_outputs()
        .ok_or_else(|| DataError::Inconsistent(format!("model \"{}\" has no dense output layer", network.name)).into())
}

fn score(network: &mut Network, data: &Dataset) -> Result<TestScore> {
    if data.input_shape != network.input_shape {
        return Err(DataError::Inconsistent(format!(
            "samples are {:?} but model \"{}\" expects {:?}",
            data.input_shape, network.name, network.input_shape
        ))
        .into());
    }
    if data.is_empty() {
        return Err(DataError::Empty("held-out set".to_owned()).into());
    }
    let result = evaluate(network, data);
    info!(model = %network.name, samples = data.len(), accuracy = result.accuracy, loss = result.loss, "model scored");
    Ok(result)
}

/// Scores a trained network on a folder of `<category>_<n>.png` images.
///
/// `categories` fixes the label order (normally the training categories);
/// unseen names are appended. Returns the score and the final category list.
pub fn score_folder(network: &mut Network, dir: &Path, categories: Vec<String>) -> Result<(TestScore, Vec<String>)> {
    let n = n_classes(network)?;
    let (data, categories) = import_images(dir, network.input_shape, n, categories)?;
    Ok((score(network, &data)?, categories))
}

/// Scores a trained network on an IDX image/label pair.
pub fn score_idx(network: &mut Network, images: &Path, labels: &Path) -> Result<TestScore> {
    let data = load_idx_pair(images, labels, n_classes(network)?)?;
    score(network, &data)
}
