pub mod backend;
pub mod epoch_stats;
pub mod loop_fn;
pub mod native;
pub mod train_config;

pub use backend::{TrainingBackend, TrainingContext};
pub use epoch_stats::{EpochStats, TestScore};
pub use loop_fn::{evaluate, train_loop};
pub use native::NativeBackend;
pub use train_config::TrainConfig;
