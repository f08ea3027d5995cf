use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::Layer;

/// x -> 1/(1+e^-x), elementwise.
pub struct Sigmoid {
    shape: Shape,
}

impl Sigmoid {
    pub fn new(shape: Shape) -> Self {
        Self { shape }
    }
}

impl Layer for Sigmoid {
    fn kind(&self) -> LayerKind {
        LayerKind::Sigmoid
    }

    fn input_shape(&self) -> Shape {
        self.shape
    }

    fn output_shape(&self) -> Shape {
        self.shape
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let mut output = input.clone_values();
        output.values_mut().mapv_inplace(|v| 1. / (1. + (-v).exp()));
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let grads = input.grads_mut();
        grads.assign(output.grads());
        grads.zip_mut_with(output.values(), |g, y| *g *= y * (1. - y));
    }
}
