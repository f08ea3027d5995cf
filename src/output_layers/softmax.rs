use crate::error::{Error, Result};
use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, Target, Terminal};
use crate::utils::softmax;

/// Multi-class classifier: normalizes scores into probabilities and scores
/// them with the negative log likelihood of the target class.
pub struct Softmax {
    input_shape: Shape,
}

impl Softmax {
    pub fn new(input: Shape) -> Self {
        Self { input_shape: input }
    }

    pub fn classes(&self) -> usize {
        self.input_shape.len()
    }
}

impl Layer for Softmax {
    fn kind(&self) -> LayerKind {
        LayerKind::Softmax
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::flat(self.classes())
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        let mut output = Tensor::zeros(self.output_shape());
        output.values_mut().assign(&softmax(input.values().view()));
        output
    }

    /// Jacobian-vector product of the normalization, for use away from the end of a pipeline.
    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        let p = output.values();
        let dot = p.dot(output.grads());
        let grads = input.grads_mut();
        grads.assign(output.grads());
        *grads -= dot;
        *grads *= p;
    }
}

impl Terminal for Softmax {
    fn loss(&mut self, input: &mut Tensor, output: &Tensor, target: &Target) -> Result<f64> {
        let class = match target {
            Target::Class(class) => *class,
            _ => {
                return Err(Error::UnsupportedTarget {
                    layer: LayerKind::Softmax,
                    target: target.describe(),
                })
            }
        };
        if class >= self.classes() {
            return Err(Error::ClassOutOfRange {
                class,
                classes: self.classes(),
            });
        }

        let p = output.values();
        let grads = input.grads_mut();
        grads.assign(p);
        grads[class] -= 1.;
        Ok(-p[class].ln())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::gradcheck::{check_input_grad, random_input};
    use crate::tensor::{Shape, Tensor};
    use crate::traits::{Layer, Target, Terminal};

    use super::Softmax;

    #[test]
    fn should_normalize_scores() {
        let mut layer = Softmax::new(Shape::flat(3));
        let input = Tensor::from_vec(Shape::flat(3), vec![1000., 1., -5.]).unwrap();
        let out = layer.forward(&input, false);
        assert!(out.values().iter().all(|p| p.is_finite()));
        assert_abs_diff_eq!(out.values().sum(), 1., epsilon = 1e-9);
    }

    #[test]
    fn should_return_negative_log_likelihood() {
        let mut layer = Softmax::new(Shape::flat(2));
        let mut x = Tensor::from_vec(Shape::flat(2), vec![0., 0.]).unwrap();
        let out = layer.forward(&x, false);
        let loss = layer.loss(&mut x, &out, &Target::Class(1)).unwrap();

        assert_abs_diff_eq!(loss, 2f64.ln(), epsilon = 1e-12);
        assert_eq!(x.grads().to_vec(), vec![0.5, -0.5]);
    }

    #[test]
    fn should_reject_unknown_classes() {
        let mut layer = Softmax::new(Shape::flat(2));
        let mut x = Tensor::zeros(Shape::flat(2));
        let out = layer.forward(&x, false);
        assert!(layer.loss(&mut x, &out, &Target::Class(2)).is_err());
        assert!(layer.loss(&mut x, &out, &Target::Value(1.)).is_err());
    }

    #[test]
    fn should_match_numeric_loss_gradient() {
        let mut layer = Softmax::new(Shape::flat(4));
        let input = random_input(Shape::flat(4), 21);
        let mut x = input.clone_values();
        let out = layer.forward(&x, false);
        layer.loss(&mut x, &out, &Target::Class(2)).unwrap();

        let h = 1e-5;
        for i in 0..4 {
            let mut plus = input.clone_values();
            plus.values_mut()[i] += h;
            let mut minus = input.clone_values();
            minus.values_mut()[i] -= h;
            let f = |layer: &mut Softmax, t: &Tensor| {
                let mut t = t.clone_values();
                let out = layer.forward(&t, false);
                layer.loss(&mut t, &out, &Target::Class(2)).unwrap()
            };
            let numeric = (f(&mut layer, &plus) - f(&mut layer, &minus)) / (2. * h);
            assert_abs_diff_eq!(x.grads()[i], numeric, epsilon = 1e-6);
        }
    }

    #[test]
    fn should_match_numeric_gradient_inside_a_pipeline() {
        let mut layer = Softmax::new(Shape::flat(5));
        check_input_grad(&mut layer, &random_input(Shape::flat(5), 22));
    }
}
