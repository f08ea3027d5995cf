use rand::Rng;

use crate::config::FullyConnDef;
use crate::error::{Error, Result};
use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, ParamGroup};

/// Dense projection of the flattened input onto `neurons` outputs.
pub struct FullyConn {
    input_shape: Shape,
    filters: Vec<Tensor>,
    biases: Tensor,
    l1_decay_mul: f64,
    l2_decay_mul: f64,
}

impl FullyConn {
    pub fn new<R: Rng + ?Sized>(
        input: Shape,
        def: &FullyConnDef,
        bias: f64,
        rng: &mut R,
    ) -> Result<Self> {
        if def.neurons == 0 || input.is_empty() {
            return Err(Error::InvalidGeometry {
                layer: LayerKind::FullyConn,
                input,
                reason: "needs at least one input and one neuron",
            });
        }
        let filters = (0..def.neurons)
            .map(|_| Tensor::random(Shape::flat(input.len()), rng))
            .collect();
        Ok(Self {
            input_shape: input,
            filters,
            biases: Tensor::filled(Shape::flat(def.neurons), bias),
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

impl Layer for FullyConn {
    fn kind(&self) -> LayerKind {
        LayerKind::FullyConn
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::flat(self.filters.len())
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let mut output = Tensor::zeros(self.output_shape());
        for (i, (filter, bias)) in self.filters.iter().zip(self.biases.values()).enumerate() {
            output.values_mut()[i] = filter.values().dot(input.values()) + bias;
        }
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let (values, grads) = input.split_mut();
        grads.fill(0.);
        let values = &*values;
        for (i, filter) in self.filters.iter_mut().enumerate() {
            let chain = output.grads()[i];
            grads.scaled_add(chain, filter.values());
            filter.grads_mut().scaled_add(chain, values);
        }
        *self.biases.grads_mut() += output.grads();
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
