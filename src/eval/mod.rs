pub mod embedding;
pub mod score;

pub use embedding::{distances, embed, first_of_each_class, DistanceRow};
pub use score::{score_folder, score_idx};
