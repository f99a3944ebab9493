//! Error types for assembly, training, data loading and sweeps.

use thiserror::Error;

use crate::sweep::domain::Configuration;
use crate::sweep::report::FailedTrial;

/// Failures raised by a [`TrainingBackend`](crate::train::TrainingBackend).
#[derive(Debug, Error)]
pub enum BackendError {
    /// The training context is already held by another trial.
    #[error("training context is busy")]
    ResourceBusy,

    #[error("malformed model description: {0}")]
    MalformedDescription(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Loss became NaN or infinite.
    #[error("training diverged at epoch {epoch} (loss = {loss})")]
    Diverged { epoch: usize, loss: f64 },

    #[error("invalid training protocol: {0}")]
    InvalidProtocol(String),

    #[error("backend error: {0}")]
    Other(String),
}

/// A backend failure tagged with the configuration that was being trained.
/// `config` is `None` for the baseline trial.
#[derive(Debug, Error)]
#[error("trial {} failed: {source}", label(.config))]
pub struct TrialError {
    pub config: Option<Configuration>,
    #[source]
    pub source: BackendError,
}

fn label(config: &Option<Configuration>) -> String {
    match config {
        Some(c) => c.to_string(),
        None => "baseline".to_owned(),
    }
}

/// Dataset decoding and validation failures.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("invalid IDX file: {0}")]
    Idx(String),

    #[error("image {path}: {reason}")]
    Image { path: String, reason: String },

    #[error("dataset is inconsistent: {0}")]
    Inconsistent(String),

    #[error("no images found in {0}")]
    Empty(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Top-level sweep errors.
#[derive(Debug, Error)]
pub enum SweepError {
    /// A configuration cannot be turned into a model. Fatal to the sweep.
    #[error("configuration {label} is invalid: {reason}")]
    ConfigurationInvalid { label: String, reason: String },

    #[error(transparent)]
    TrialFailed(#[from] TrialError),

    /// Every trial failed, so there is no best trial.
    #[error("no successful trials ({} failed)", .failures.len())]
    NoSuccessfulTrials { failures: Vec<FailedTrial> },

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trial_error_names_configuration() {
        let config = Configuration {
            conv_layers: 2,
            conv_filters: 32,
            filter_size: 3,
            dense_layers: 1,
            dense_units: 128,
        };
        let err = TrialError { config: Some(config), source: BackendError::ResourceBusy };
        let msg = err.to_string();
        assert!(msg.contains(&config.to_string()));
        assert!(msg.contains("busy"));

        let err = TrialError { config: None, source: BackendError::Other("oom".into()) };
        assert!(err.to_string().contains("baseline"));
    }

    #[test]
    fn test_no_successful_trials_counts_failures() {
        let err = SweepError::NoSuccessfulTrials { failures: Vec::new() };
        assert!(err.to_string().contains("0 failed"));
    }
}
