pub mod activation;
pub mod config;
pub mod data;
pub mod error;
pub mod eval;
pub mod layers;
pub mod loss;
pub mod math;
pub mod network;
pub mod optim;
pub mod sweep;
pub mod train;

// Convenience re-exports
pub use config::{DatasetSource, SweepConfig};
pub use data::Dataset;
pub use error::{BackendError, DataError, Result, SweepError, TrialError};
pub use network::{assemble, InputShape, ModelDescription, Network, StageSpec};
pub use sweep::{sweep, Configuration, Dimension, HyperparameterDomain, SweepContext, SweepReport, TrialResult, TrialRunner};
pub use train::{NativeBackend, TrainConfig, TrainingBackend};
