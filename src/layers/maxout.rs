use crate::error::{Error, Result};
use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::Layer;

/// Splits the channels into consecutive groups of `group_size` and keeps the
/// maximum of each group. Trailing channels that do not fill a group are ignored.
pub struct Maxout {
    input_shape: Shape,
    output_shape: Shape,
    group_size: usize,
    switches: Vec<usize>,
}

impl Maxout {
    pub fn new(input: Shape, group_size: usize) -> Result<Self> {
        if group_size == 0 || input.depth < group_size {
            return Err(Error::InvalidGeometry {
                layer: LayerKind::Maxout,
                input,
                reason: "depth must hold at least one non-empty group",
            });
        }
        let output_shape = Shape::new(input.width, input.height, input.depth / group_size);
        Ok(Self {
            input_shape: input,
            output_shape,
            group_size,
            switches: vec![0; output_shape.len()],
        })
    }

    pub fn group_size(&self) -> usize {
        self.group_size
    }
}

impl Layer for Maxout {
    fn kind(&self) -> LayerKind {
        LayerKind::Maxout
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        self.output_shape
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let out = self.output_shape;
        let mut output = Tensor::zeros(out);
        for y in 0..out.height {
            for x in 0..out.width {
                for i in 0..out.depth {
                    let base = i * self.group_size;
                    let mut winner = base;
                    for d in base + 1..base + self.group_size {
                        if input.get(x, y, d) > input.get(x, y, winner) {
                            winner = d;
                        }
                    }
                    self.switches[out.index(x, y, i)] = winner;
                    output.set(x, y, i, input.get(x, y, winner));
                }
            }
        }
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let out = self.output_shape;
        input.zero_grad();
        for y in 0..out.height {
            for x in 0..out.width {
                for i in 0..out.depth {
                    let winner = self.switches[out.index(x, y, i)];
                    input.set_grad(x, y, winner, output.grad(x, y, i));
                }
            }
        }
    }
}
