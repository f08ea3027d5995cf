mod adadelta;
mod adagrad;
mod adam;
mod nesterov;
mod sgd;
mod windowgrad;

pub use adadelta::Adadelta;
pub use adagrad::Adagrad;
pub use adam::Adam;
pub use nesterov::Nesterov;
pub use sgd::Sgd;
pub use windowgrad::Windowgrad;

use crate::config::{Method, TrainerConfig};
use crate::traits::Optimizer;

/// Instantiates the update rule selected by `config.method`.
pub fn build(config: &TrainerConfig) -> Box<dyn Optimizer + Send> {
    let lr = config.learning_rate;
    match config.method {
        Method::Sgd => Box::new(Sgd::new(lr, config.momentum)),
        Method::Nesterov => Box::new(Nesterov::new(lr, config.momentum)),
        Method::Adagrad => Box::new(Adagrad::new(lr, config.eps)),
        Method::Windowgrad => Box::new(Windowgrad::new(lr, config.ro, config.eps)),
        Method::Adadelta => Box::new(Adadelta::new(config.ro, config.eps)),
        Method::Adam => Box::new(Adam::new(lr, config.beta1, config.beta2, config.eps)),
    }
}
