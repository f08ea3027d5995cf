use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::Layer;

pub struct Tanh {
    shape: Shape,
}

impl Tanh {
    pub fn new(shape: Shape) -> Self {
        Self { shape }
    }
}

impl Layer for Tanh {
    fn kind(&self) -> LayerKind {
        LayerKind::Tanh
    }

    fn input_shape(&self) -> Shape {
        self.shape
    }

    fn output_shape(&self) -> Shape {
        self.shape
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let mut output = input.clone_values();
        output.values_mut().mapv_inplace(f64::tanh);
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let grads = input.grads_mut();
        grads.assign(output.grads());
        grads.zip_mut_with(output.values(), |g, y| *g *= 1. - y * y);
    }
}
