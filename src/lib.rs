pub mod config;
pub mod error;
pub mod layers;
pub mod network;
pub mod optimizers;
pub mod output_layers;
pub mod rng;
pub mod tensor;
pub mod trainer;
pub mod traits;
mod utils;

#[cfg(test)]
mod gradcheck;

pub use config::{Activation, LayerDef, Method, NetworkConfig, TrainerConfig};
pub use error::{Error, Result};
pub use network::Network;
pub use tensor::{Shape, Tensor};
pub use trainer::{StepReport, Trainer};
pub use traits::Target;
