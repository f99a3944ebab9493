pub mod assemble;
pub mod network;
pub mod spec;

pub use assemble::{assemble, assemble_with, AssemblyRules};
pub use network::Network;
pub use spec::{InputShape, ModelDescription, Shape, StageSpec};
