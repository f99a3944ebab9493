use std::sync::mpsc;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Serialize, Deserialize};

use crate::error::BackendError;
use crate::optim::OptimizerKind;
use crate::train::epoch_stats::EpochStats;

/// The training protocol for one trial. A sweep holds one `TrainConfig`
/// fixed across all trials so accuracy differences come from architecture.
///
/// # Fields
/// - `epochs`          : full passes over the training split
/// - `batch_size`      : samples per mini-batch
/// - `validation_split`: trailing fraction of the training set held out for
///                        validation, in `[0, 1)`
/// - `optimizer`       : optimizer and learning rate
/// - `seed`            : seeds weight init, shuffling and dropout
/// - `progress_tx`     : optional channel sender; one `EpochStats` is sent per
///                        completed epoch. If the receiver is dropped the loop
///                        terminates early.
/// - `stop_flag`       : optional atomic flag; when set to `true` from another
///                        thread the loop terminates after the current epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub epochs: usize,
    pub batch_size: usize,
    pub validation_split: f64,
    #[serde(default)]
    pub optimizer: OptimizerKind,
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    #[serde(skip)]
    pub stop_flag: Option<Arc<AtomicBool>>,
}

fn default_seed() -> u64 {
    42
}

impl TrainConfig {
    /// Creates a `TrainConfig` with the default optimizer and seed, no
    /// progress channel and no stop flag.
    pub fn new(epochs: usize, batch_size: usize, validation_split: f64) -> Self {
        TrainConfig {
            epochs,
            batch_size,
            validation_split,
            optimizer: OptimizerKind::default(),
            seed: default_seed(),
            progress_tx: None,
            stop_flag: None,
        }
    }

    pub fn validate(&self) -> Result<(), BackendError> {
        if self.epochs == 0 {
            return Err(BackendError::InvalidProtocol("epochs must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(BackendError::InvalidProtocol("batch_size must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(BackendError::InvalidProtocol(format!(
                "validation_split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        let lr = self.optimizer.learning_rate();
        if !lr.is_finite() || lr <= 0.0 {
            return Err(BackendError::InvalidProtocol("learning rate must be positive".into()));
        }
        Ok(())
    }
}

impl Default for TrainConfig {
    fn default() -> Self {
        TrainConfig::new(10, 128, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_protocol() {
        let c = TrainConfig::default();
        assert_eq!((c.epochs, c.batch_size, c.seed), (10, 128, 42));
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_split() {
        let c = TrainConfig::new(1, 1, 1.0);
        assert!(matches!(c.validate(), Err(BackendError::InvalidProtocol(_))));
    }

    #[test]
    fn test_json_omits_runtime_fields() {
        let json = serde_json::to_string(&TrainConfig::default()).unwrap();
        assert!(!json.contains("progress_tx"));
        let back: TrainConfig = serde_json::from_str(&json).unwrap();
        assert!(back.stop_flag.is_none());
        assert_eq!(back.batch_size, 128);
    }
}
