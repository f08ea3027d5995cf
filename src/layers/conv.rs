use std::sync::{Mutex, PoisonError};

use ndarray::Array1;
use rand::Rng;
use rayon::prelude::*;

use crate::config::ConvDef;
use crate::error::{Error, Result};
use crate::layers::{LayerKind, Window};
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, ParamGroup};

/// Spatial convolution with one filter per output channel and implicit zero padding.
pub struct Conv {
    window: Window,
    output_shape: Shape,
    filters: Vec<Tensor>,
    biases: Tensor,
    l1_decay_mul: f64,
    l2_decay_mul: f64,
}

impl Conv {
    pub fn new<R: Rng + ?Sized>(input: Shape, def: &ConvDef, bias: f64, rng: &mut R) -> Result<Self> {
        if def.filters == 0 {
            return Err(Error::InvalidGeometry {
                layer: LayerKind::Conv,
                input,
                reason: "at least one filter is required",
            });
        }
        let window = Window::new(LayerKind::Conv, input, def.width, def.height, def.stride, def.pad)?;
        let (width, height) = window.output_size();
        let output_shape = Shape::new(width, height, def.filters);

        let filters = (0..def.filters)
            .map(|_| Tensor::random(Shape::new(def.width, def.height, input.depth), rng))
            .collect();

        Ok(Self {
            window,
            output_shape,
            filters,
            biases: Tensor::filled(Shape::flat(def.filters), bias),
            l1_decay_mul: def.l1_decay_mul,
            l2_decay_mul: def.l2_decay_mul,
        })
    }

    pub fn filters(&self) -> &[Tensor] {
        &self.filters
    }

    pub fn filters_mut(&mut self) -> &mut [Tensor] {
        &mut self.filters
    }

    pub fn biases(&self) -> &Tensor {
        &self.biases
    }

    pub fn biases_mut(&mut self) -> &mut Tensor {
        &mut self.biases
    }
}

impl Layer for Conv {
    fn kind(&self) -> LayerKind {
        LayerKind::Conv
    }

    fn input_shape(&self) -> Shape {
        self.window.input
    }

    fn output_shape(&self) -> Shape {
        self.output_shape
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let out = self.output_shape;
        let window = self.window;
        let biases = self.biases.values();

        let planes = self
            .filters
            .par_iter()
            .enumerate()
            .map(|(d, filter)| {
                let mut plane = Vec::with_capacity(out.width * out.height);
                for ay in 0..out.height {
                    for ax in 0..out.width {
                        let mut a = biases[d];
                        for (fx, fy, ox, oy) in window.taps(ax, ay) {
                            for fd in 0..filter.shape().depth {
                                a += filter.get(fx, fy, fd) * input.get(ox, oy, fd);
                            }
                        }
                        plane.push(a);
                    }
                }
                plane
            })
            .collect::<Vec<_>>();

        let mut output = Tensor::zeros(out);
        for (d, plane) in planes.iter().enumerate() {
            for ay in 0..out.height {
                for ax in 0..out.width {
                    output.set(ax, ay, d, plane[ay * out.width + ax]);
                }
            }
        }
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let out = self.output_shape;
        let window = self.window;
        let in_shape = input.shape();
        let (values, grads) = input.split_mut();
        grads.fill(0.);
        let values = &*values;
        let merged = Mutex::new(grads);

        let bias_grads = self
            .filters
            .par_iter_mut()
            .enumerate()
            .map(|(d, filter)| {
                let mut scratch = Array1::<f64>::zeros(in_shape.len());
                let mut bias_grad = 0.;
                for ay in 0..out.height {
                    for ax in 0..out.width {
                        let chain = output.grad(ax, ay, d);
                        for (fx, fy, ox, oy) in window.taps(ax, ay) {
                            for fd in 0..in_shape.depth {
                                let ix = in_shape.index(ox, oy, fd);
                                filter.add_grad(fx, fy, fd, values[ix] * chain);
                                scratch[ix] += filter.get(fx, fy, fd) * chain;
                            }
                        }
                        bias_grad += chain;
                    }
                }
                let mut shared = merged.lock().unwrap_or_else(PoisonError::into_inner);
                **shared += &scratch;
                bias_grad
            })
            .collect::<Vec<_>>();

        for (g, b) in self.biases.grads_mut().iter_mut().zip(bias_grads) {
            *g += b;
        }
    }

    fn params_mut(&mut self) -> Vec<ParamGroup<'_>> {
        let (l1, l2) = (self.l1_decay_mul, self.l2_decay_mul);
        let mut groups = self
            .filters
            .iter_mut()
            .map(|tensor| ParamGroup {
                tensor,
                l1_decay_mul: l1,
                l2_decay_mul: l2,
            })
            .collect::<Vec<_>>();
        groups.push(ParamGroup {
            tensor: &mut self.biases,
            l1_decay_mul: 0.,
            l2_decay_mul: 0.,
        });
        groups
    }
}
