use crate::config::PoolDef;
use crate::error::Result;
use crate::layers::{LayerKind, Window};
use crate::tensor::{Shape, Tensor};
use crate::traits::Layer;

/// Max pooling. Remembers where each maximum came from so backward can route
/// the gradient to that single input cell.
pub struct Pool {
    window: Window,
    output_shape: Shape,
    switches: Vec<Option<(usize, usize)>>,
}

impl Pool {
    pub fn new(input: Shape, def: &PoolDef) -> Result<Self> {
        let window = Window::new(LayerKind::Pool, input, def.width, def.height, def.stride, def.pad)?;
        let (width, height) = window.output_size();
        let output_shape = Shape::new(width, height, input.depth);
        Ok(Self {
            window,
            output_shape,
            switches: vec![None; output_shape.len()],
        })
    }

    /// Input (x, y) that won each output cell during the last forward pass.
    pub fn switch(&self, x: usize, y: usize, d: usize) -> Option<(usize, usize)> {
        self.switches[self.output_shape.index(x, y, d)]
    }
}

impl Layer for Pool {
    fn kind(&self) -> LayerKind {
        LayerKind::Pool
    }

    fn input_shape(&self) -> Shape {
        self.window.input
    }

    fn output_shape(&self) -> Shape {
        self.output_shape
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let out = self.output_shape;
        let mut output = Tensor::zeros(out);

        for d in 0..out.depth {
            for ay in 0..out.height {
                for ax in 0..out.width {
                    let mut best: Option<(f64, usize, usize)> = None;
                    for (_, _, ox, oy) in self.window.taps(ax, ay) {
                        let v = input.get(ox, oy, d);
                        if best.map_or(true, |(a, _, _)| v > a) {
                            best = Some((v, ox, oy));
                        }
                    }
                    // a window lying entirely in the padding yields 0 and routes nothing
                    let ix = out.index(ax, ay, d);
                    self.switches[ix] = best.map(|(_, x, y)| (x, y));
                    output.set(ax, ay, d, best.map_or(0., |(a, _, _)| a));
                }
            }
        }
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let out = self.output_shape;
        input.zero_grad();
        for d in 0..out.depth {
            for ay in 0..out.height {
                for ax in 0..out.width {
                    if let Some((x, y)) = self.switches[out.index(ax, ay, d)] {
                        input.add_grad(x, y, d, output.grad(ax, ay, d));
                    }
                }
            }
        }
    }
}
