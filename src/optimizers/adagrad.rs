use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

use crate::traits::Optimizer;

/// Per-parameter learning rates shrinking with the running sum of squared gradients.
pub struct Adagrad {
    learning_rate: f64,
    eps: f64,
    sum_sq: Vec<Array1<f64>>,
}

impl Adagrad {
    pub fn new(learning_rate: f64, eps: f64) -> Self {
        Self {
            learning_rate,
            eps,
            sum_sq: Vec::new(),
        }
    }
}

impl Optimizer for Adagrad {
    fn init(&mut self, group_sizes: &[usize]) {
        self.sum_sq = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
    }

    fn update(&mut self, group: usize, param: ArrayViewMut1<f64>, grad: ArrayView1<f64>, _: usize) {
        let (lr, eps) = (self.learning_rate, self.eps);
        if let Some(sum_sq) = self.sum_sq.get_mut(group) {
            Zip::from(param).and(sum_sq).and(grad).for_each(|p, s, &g| {
                *s += g * g;
                *p -= lr * g / (*s + eps).sqrt();
            });
        }
    }
}
