use std::sync::atomic::Ordering;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::data::Dataset;
use crate::error::BackendError;
use crate::loss::cross_entropy::{argmax, CrossEntropyLoss};
use crate::network::network::Network;
use crate::optim::Optimizer;
use crate::train::epoch_stats::{EpochStats, TestScore};
use crate::train::train_config::TrainConfig;

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Trains `network` for `config.epochs` epochs and returns the training
/// curve, one `EpochStats` per completed epoch.
///
/// # Arguments
/// - `network`  : modified in place
/// - `train`    : training samples (already split from validation)
/// - `val`      : optional validation samples, scored after every epoch
/// - `optimizer`: applies the averaged mini-batch gradients
/// - `config`   : protocol, optional progress channel, optional stop flag
/// - `rng`      : drives shuffling and dropout
///
/// # Early termination
/// The loop breaks early if:
/// - the `progress_tx` receiver has been dropped, **or**
/// - `config.stop_flag` is set to `true`.
///
/// # Errors
/// `InvalidProtocol` for an empty training set or zero batch size,
/// `Diverged` when the epoch loss is not finite.
pub fn train_loop(
    network: &mut Network,
    train: &Dataset,
    val: Option<&Dataset>,
    optimizer: &mut dyn Optimizer,
    config: &TrainConfig,
    rng: &mut StdRng,
) -> Result<Vec<EpochStats>, BackendError> {
    if train.is_empty() {
        return Err(BackendError::InvalidProtocol("training set is empty".into()));
    }
    if config.batch_size == 0 {
        return Err(BackendError::InvalidProtocol("batch_size must be at least 1".into()));
    }
    let val = val.filter(|v| !v.is_empty());

    let mut curve = Vec::with_capacity(config.epochs);

    for epoch in 1..=config.epochs {
        if stop_requested(config) {
            break;
        }

        let t_start = Instant::now();

        // ── One full pass over the training data ───────────────────────────
        let (train_loss, train_accuracy) = run_one_epoch(network, train, optimizer, config.batch_size, rng);
        if !train_loss.is_finite() {
            return Err(BackendError::Diverged { epoch, loss: train_loss });
        }

        // ── Validation ────────────────────────────────────────────────────
        let (val_loss, val_accuracy) = match val {
            Some(v) => {
                let score = evaluate(network, v);
                (Some(score.loss), Some(score.accuracy))
            }
            None => (None, None),
        };

        let stats = EpochStats {
            epoch,
            total_epochs: config.epochs,
            train_loss,
            train_accuracy,
            val_loss,
            val_accuracy,
            elapsed_ms: t_start.elapsed().as_millis() as u64,
        };
        tracing::debug!(
            epoch,
            train_loss,
            train_accuracy,
            val_accuracy = val_accuracy.unwrap_or(f64::NAN),
            "epoch complete"
        );
        curve.push(stats.clone());

        if let Some(ref tx) = config.progress_tx {
            // If the receiver has been dropped, stop training.
            if tx.send(stats).is_err() {
                break;
            }
        }
    }

    Ok(curve)
}

/// Inference-mode loss and accuracy over a whole dataset.
pub fn evaluate(network: &mut Network, data: &Dataset) -> TestScore {
    let n = data.len();
    if n == 0 {
        return TestScore { loss: 0.0, accuracy: 0.0 };
    }
    let mut total_loss = 0.0;
    let mut correct = 0usize;
    for (input, label) in data.inputs.iter().zip(&data.labels) {
        let output = network.predict(input.clone());
        total_loss += CrossEntropyLoss::loss(&output, label);
        if argmax(&output) == argmax(label) {
            correct += 1;
        }
    }
    TestScore { loss: total_loss / n as f64, accuracy: correct as f64 / n as f64 }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn stop_requested(config: &TrainConfig) -> bool {
    config.stop_flag.as_ref().map_or(false, |flag| flag.load(Ordering::Relaxed))
}

/// Runs one epoch of mini-batch training. Returns the running mean loss and
/// accuracy, both measured in training mode as the batches go by.
fn run_one_epoch(
    network: &mut Network,
    data: &Dataset,
    optimizer: &mut dyn Optimizer,
    batch_size: usize,
    rng: &mut StdRng,
) -> (f64, f64) {
    let n = data.len();
    let mut total_loss = 0.0;
    let mut correct = 0usize;

    // Shuffle sample order each epoch.
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);

    for batch in indices.chunks(batch_size) {
        network.zero_grads();
        optimizer.begin_step();

        for &idx in batch {
            let expected = &data.labels[idx];
            let output = network.forward(data.inputs[idx].clone(), Some(&mut *rng));

            total_loss += CrossEntropyLoss::loss(&output, expected);
            if argmax(&output) == argmax(expected) {
                correct += 1;
            }

            network.backward(CrossEntropyLoss::derivative(&output, expected));
        }

        // Average and apply.
        let scale = 1.0 / batch.len() as f64;
        for (slot, (params, grads)) in network.parameters().into_iter().enumerate() {
            optimizer.update(slot, params, grads, scale);
        }
    }

    (total_loss / n as f64, correct as f64 / n as f64)
}
