use serde::{Serialize, Deserialize};

/// Per-epoch training statistics: one point of a training curve.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the training
/// loop also sends each value at the end of its epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Mean training loss over the epoch (measured in training mode).
    pub train_loss: f64,
    /// Training accuracy as a fraction in [0, 1].
    pub train_accuracy: f64,
    /// Mean validation loss, if a validation split was held out.
    pub val_loss: Option<f64>,
    /// Validation accuracy, if a validation split was held out.
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Held-out test evaluation, recorded once after training.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TestScore {
    pub loss: f64,
    pub accuracy: f64,
}
