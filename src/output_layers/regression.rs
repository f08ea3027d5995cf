use crate::error::{Error, Result};
use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, Target, Terminal};

/// L2 regression loss, `½·Σ(x_i − y_i)²`. Forward is the identity.
pub struct Regression {
    input_shape: Shape,
}

impl Regression {
    pub fn new(input: Shape) -> Self {
        Self { input_shape: input }
    }
}

impl Layer for Regression {
    fn kind(&self) -> LayerKind {
        LayerKind::Regression
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::flat(self.input_shape.len())
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        input.flattened()
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        input.grads_mut().assign(output.grads());
    }
}

impl Terminal for Regression {
    fn loss(&mut self, input: &mut Tensor, _: &Tensor, target: &Target) -> Result<f64> {
        let (values, grads) = input.split_mut();
        grads.fill(0.);
        match target {
            // only the first output is regressed against a scalar target
            Target::Value(y) => {
                let dy = values[0] - y;
                grads[0] = dy;
                Ok(0.5 * dy * dy)
            }
            Target::Values(ys) => {
                if ys.len() != values.len() {
                    return Err(Error::TargetLength {
                        expected: values.len(),
                        actual: ys.len(),
                    });
                }
                let mut loss = 0.;
                for ((g, x), y) in grads.iter_mut().zip(values.iter()).zip(ys) {
                    let dy = x - y;
                    *g = dy;
                    loss += 0.5 * dy * dy;
                }
                Ok(loss)
            }
            Target::Class(_) => Err(Error::UnsupportedTarget {
                layer: LayerKind::Regression,
                target: target.describe(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::gradcheck::{check_loss_grad, random_input};
    use crate::tensor::{Shape, Tensor};
    use crate::traits::{Layer, Target, Terminal};

    use super::Regression;

    fn input() -> Tensor {
        Tensor::from_vec(Shape::flat(3), vec![1., 2., 3.]).unwrap()
    }

    #[test]
    fn should_be_the_identity_forward() {
        let mut layer = Regression::new(Shape::flat(3));
        assert_eq!(layer.forward(&input(), false).values(), input().values());
    }

    #[test]
    fn should_return_half_squared_error_and_its_gradient() {
        let mut layer = Regression::new(Shape::flat(3));
        let mut x = input();
        let out = layer.forward(&x, false);
        let loss = layer
            .loss(&mut x, &out, &Target::Values(vec![0., 2., 5.]))
            .unwrap();

        assert_eq!(loss, 0.5 * (1. + 0. + 4.));
        assert_eq!(x.grads().to_vec(), vec![1., 0., -2.]);
    }

    #[test]
    fn should_regress_only_the_first_output_for_a_scalar() {
        let mut layer = Regression::new(Shape::flat(3));
        let mut x = input();
        x.grads_mut().fill(9.);
        let out = layer.forward(&x, false);
        let loss = layer.loss(&mut x, &out, &Target::Value(4.)).unwrap();

        assert_eq!(loss, 4.5);
        assert_eq!(x.grads().to_vec(), vec![-3., 0., 0.]);
    }

    #[test]
    fn should_reject_mismatched_targets() {
        let mut layer = Regression::new(Shape::flat(3));
        let mut x = input();
        let out = layer.forward(&x, false);
        assert!(layer.loss(&mut x, &out, &Target::Values(vec![1.])).is_err());
        assert!(layer.loss(&mut x, &out, &Target::Class(0)).is_err());
    }

    #[test]
    fn should_match_numeric_loss_gradient() {
        let mut layer = Regression::new(Shape::flat(4));
        let input = random_input(Shape::flat(4), 31);
        check_loss_grad(&mut layer, &input, &Target::Values(vec![0.5, -0.25, 1., 0.]));
        check_loss_grad(&mut layer, &input, &Target::Value(2.));
    }
}
