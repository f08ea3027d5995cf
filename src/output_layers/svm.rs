use crate::error::{Error, Result};
use crate::layers::LayerKind;
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, Target, Terminal};

const MARGIN: f64 = 1.;

/// Multi-class hinge loss over raw scores. The target score must beat every
/// other score by `MARGIN`.
pub struct Svm {
    input_shape: Shape,
}

impl Svm {
    pub fn new(input: Shape) -> Self {
        Self { input_shape: input }
    }

    pub fn classes(&self) -> usize {
        self.input_shape.len()
    }
}

impl Layer for Svm {
    fn kind(&self) -> LayerKind {
        LayerKind::Svm
    }

    fn input_shape(&self) -> Shape {
        self.input_shape
    }

    fn output_shape(&self) -> Shape {
        Shape::flat(self.classes())
    }

    fn forward(&mut self, input: &Tensor, _: bool) -> Tensor {
        input.flattened()
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        input.grads_mut().assign(output.grads());
    }
}

impl Terminal for Svm {
    fn loss(&mut self, input: &mut Tensor, _: &Tensor, target: &Target) -> Result<f64> {
        let class = match target {
            Target::Class(class) => *class,
            _ => {
                return Err(Error::UnsupportedTarget {
                    layer: LayerKind::Svm,
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

        let (scores, grads) = input.split_mut();
        grads.fill(0.);
        let target_score = scores[class];
        let mut loss = 0.;
        for i in (0..scores.len()).filter(|i| *i != class) {
            let violation = scores[i] - target_score + MARGIN;
            if violation > 0. {
                grads[i] += 1.;
                grads[class] -= 1.;
                loss += violation;
            }
        }
        Ok(loss)
    }
}

#[cfg(test)]
mod tests {
    use crate::gradcheck::check_loss_grad;
    use crate::tensor::{Shape, Tensor};
    use crate::traits::{Layer, Target, Terminal};

    use super::Svm;

    fn run(scores: Vec<f64>, class: usize) -> (f64, Vec<f64>) {
        let mut layer = Svm::new(Shape::flat(scores.len()));
        let mut x = Tensor::from_vec(Shape::flat(scores.len()), scores).unwrap();
        let out = layer.forward(&x, false);
        let loss = layer.loss(&mut x, &out, &Target::Class(class)).unwrap();
        (loss, x.grads().to_vec())
    }

    #[test]
    fn should_charge_every_margin_violation() {
        let (loss, grads) = run(vec![2., 2.5, -1., 1.5], 0);
        assert_eq!(loss, 1.5 + 0.5);
        assert_eq!(grads, vec![-2., 1., 0., 1.]);
    }

    #[test]
    fn should_cost_nothing_when_margins_hold() {
        let (loss, grads) = run(vec![0., 3., 1.], 1);
        assert_eq!(loss, 0.);
        assert_eq!(grads, vec![0., 0., 0.]);
    }

    #[test]
    fn should_pass_scores_through_forward() {
        let mut layer = Svm::new(Shape::flat(2));
        let x = Tensor::from_vec(Shape::flat(2), vec![4., -4.]).unwrap();
        assert_eq!(layer.forward(&x, false).values(), x.values());
    }

    #[test]
    fn should_match_numeric_loss_gradient() {
        // every margin violation is at least 0.1 away from the hinge
        let scores = vec![0.5, 1.2, -2., 0.1, 1.9];
        let mut layer = Svm::new(Shape::flat(5));
        let input = Tensor::from_vec(Shape::flat(5), scores).unwrap();
        check_loss_grad(&mut layer, &input, &Target::Class(1));
    }
}
