pub mod aggregator;
pub mod domain;
pub mod report;
pub mod runner;

pub use aggregator::{sweep, SweepContext};
pub use domain::{Configuration, ConfigurationGrid, Dimension, HyperparameterDomain};
pub use report::{pearson, FailedTrial, SweepReport, TrialResult};
pub use runner::TrialRunner;
