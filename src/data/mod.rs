pub mod dataset;
pub mod folder;
pub mod idx;

pub use dataset::{one_hot, Dataset};
pub use folder::import_images;
pub use idx::{load_idx_pair, parse_idx_pair};
