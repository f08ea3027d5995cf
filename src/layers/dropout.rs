use rand::Rng;

use crate::error::{Error, Result};
use crate::layers::LayerKind;
use crate::rng::NetRng;
use crate::tensor::{Shape, Tensor};
use crate::traits::Layer;

enum Mask {
    Dropped(Vec<bool>),
    Scaled,
}

/// At training time each element is zeroed with probability `drop_prob`;
/// at inference time every element is multiplied by `drop_prob`.
pub struct Dropout {
    shape: Shape,
    drop_prob: f64,
    rng: NetRng,
    mask: Mask,
}

impl Dropout {
    pub fn new(shape: Shape, drop_prob: f64, rng: NetRng) -> Result<Self> {
        if !(0. ..=1.).contains(&drop_prob) {
            return Err(Error::InvalidConfig(format!(
                "drop probability must lie in [0, 1], got {}",
                drop_prob
            )));
        }
        Ok(Self {
            shape,
            drop_prob,
            rng,
            mask: Mask::Scaled,
        })
    }

    pub fn drop_prob(&self) -> f64 {
        self.drop_prob
    }
}

impl Layer for Dropout {
    fn kind(&self) -> LayerKind {
        LayerKind::Dropout
    }

    fn input_shape(&self) -> Shape {
        self.shape
    }

    fn output_shape(&self) -> Shape {
        self.shape
    }

    fn forward(&mut self, input: &Tensor, is_training: bool) -> Tensor {
        let mut output = input.clone_values();
        if is_training {
            let mut dropped = vec![false; input.len()];
            for (v, d) in output.values_mut().iter_mut().zip(dropped.iter_mut()) {
                if self.rng.gen::<f64>() < self.drop_prob {
                    *v = 0.;
                    *d = true;
                }
            }
            self.mask = Mask::Dropped(dropped);
        } else {
            *output.values_mut() *= self.drop_prob;
            self.mask = Mask::Scaled;
        }
        output
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let grads = input.grads_mut();
        grads.assign(output.grads());
        match &self.mask {
            Mask::Dropped(dropped) => {
                for (g, d) in grads.iter_mut().zip(dropped) {
                    if *d {
                        *g = 0.;
                    }
                }
            }
            Mask::Scaled => *grads *= self.drop_prob,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::gradcheck::{check_input_grad, random_input};
    use crate::rng::seeded;
    use crate::tensor::Shape;
    use crate::traits::Layer;

    use super::Dropout;

    fn shape() -> Shape {
        Shape::new(4, 4, 3)
    }

    #[test]
    fn should_zero_everything_when_always_dropping() {
        let mut layer = Dropout::new(shape(), 1., seeded(0)).unwrap();
        let out = layer.forward(&random_input(shape(), 1), true);
        assert!(out.values().iter().all(|v| *v == 0.));
    }

    #[test]
    fn should_pass_input_through_when_never_dropping() {
        let mut layer = Dropout::new(shape(), 0., seeded(0)).unwrap();
        let input = random_input(shape(), 1);
        let out = layer.forward(&input, true);
        assert_eq!(out.values(), input.values());
    }

    #[test]
    fn should_scale_by_the_drop_probability_at_inference() {
        let mut layer = Dropout::new(shape(), 0.3, seeded(0)).unwrap();
        let input = random_input(shape(), 1);
        let out = layer.forward(&input, false);
        for (o, i) in out.values().iter().zip(input.values()) {
            assert_eq!(*o, i * 0.3);
        }
    }

    #[test]
    fn should_block_gradient_where_dropped() {
        let mut layer = Dropout::new(shape(), 0.5, seeded(4)).unwrap();
        let mut x = random_input(shape(), 2);
        let mut out = layer.forward(&x, true);
        out.grads_mut().fill(1.);
        layer.backward(&mut x, &out);

        let mut kept = 0;
        for (o, g) in out.values().iter().zip(x.grads()) {
            if *o == 0. {
                assert_eq!(*g, 0.);
            } else {
                assert_eq!(*g, 1.);
                kept += 1;
            }
        }
        assert!(kept > 0 && kept < shape().len());
    }

    #[test]
    fn should_reject_probabilities_outside_the_unit_interval() {
        assert!(Dropout::new(shape(), 1.5, seeded(0)).is_err());
        assert!(Dropout::new(shape(), -0.1, seeded(0)).is_err());
    }

    #[test]
    fn should_match_numeric_gradient_at_inference() {
        let mut layer = Dropout::new(shape(), 0.7, seeded(0)).unwrap();
        check_input_grad(&mut layer, &random_input(shape(), 3));
    }
}
