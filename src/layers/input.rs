use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::Layer;

/// Declares the observation shape; an identity stage.
pub struct Input {
    shape: Shape,
}

impl Input {
    pub fn new(shape: Shape) -> Self {
        Self { shape }
    }
}

impl Layer for Input {
    fn kind(&self) -> LayerKind {
        LayerKind::Input
    }

    fn input_shape(&self) -> Shape {
        self.shape
    }

    fn output_shape(&self) -> Shape {
        self.shape
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        input.clone_values()
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        input.grads_mut().assign(output.grads());
    }
}
