use ndarray::{ArrayView1, ArrayViewMut1};

use crate::error::Result;
use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};

/// One learnable array together with its gradient and decay multipliers.
pub struct ParamGroup<'a> {
    pub tensor: &'a mut Tensor,
    pub l1_decay_mul: f64,
    pub l2_decay_mul: f64,
}

/// Label handed to a terminal layer after an action has been taken.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Class(usize),
    Value(f64),
    Values(Vec<f64>),
}

impl Target {
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Target::Class(_) => "class",
            Target::Value(_) => "scalar",
            Target::Values(_) => "vector",
        }
    }
}

impl From<usize> for Target {
    fn from(class: usize) -> Self {
        Target::Class(class)
    }
}

impl From<f64> for Target {
    fn from(value: f64) -> Self {
        Target::Value(value)
    }
}

impl From<Vec<f64>> for Target {
    fn from(values: Vec<f64>) -> Self {
        Target::Values(values)
    }
}

impl From<&[f64]> for Target {
    fn from(values: &[f64]) -> Self {
        Target::Values(values.to_vec())
    }
}

pub trait Layer {
    fn kind(&self) -> LayerKind;

    fn input_shape(&self) -> Shape;

    fn output_shape(&self) -> Shape;

    fn forward(&mut self, input: &Tensor, is_training: bool) -> Tensor;

    /// Overwrites the gradient of `input` from the gradient stored in `output`,
    /// which must be the tensor returned by the matching `forward` call.
    /// Parameter gradients are accumulated, never overwritten.
    fn backward(&mut self, input: &mut Tensor, output: &Tensor);

    fn params_mut(&mut self) -> Vec<ParamGroup<'_>> {
        Vec::new()
    }
}

/// A layer that ends the pipeline and seeds the gradient chain.
pub trait Terminal: Layer {
    /// Writes the first gradient of the chain into `input` and returns the loss.
    fn loss(&mut self, input: &mut Tensor, output: &Tensor, target: &Target) -> Result<f64>;
}

pub trait Optimizer {
    /// Allocates per-group accumulators, called once before the first update.
    fn init(&mut self, _group_sizes: &[usize]) {}

    /// Applies one update to parameter group `group`. `iteration` counts trainer steps from 1.
    fn update(
        &mut self,
        group: usize,
        param: ArrayViewMut1<f64>,
        grad: ArrayView1<f64>,
        iteration: usize,
    );
}
