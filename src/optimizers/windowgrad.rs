use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

use crate::traits::Optimizer;

/// Adagrad over an exponentially decaying window of squared gradients.
pub struct Windowgrad {
    learning_rate: f64,
    ro: f64,
    eps: f64,
    mean_sq: Vec<Array1<f64>>,
}

impl Windowgrad {
    pub fn new(learning_rate: f64, ro: f64, eps: f64) -> Self {
        Self {
            learning_rate,
            ro,
            eps,
            mean_sq: Vec::new(),
        }
    }
}

impl Optimizer for Windowgrad {
    fn init(&mut self, group_sizes: &[usize]) {
        self.mean_sq = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
    }

    fn update(&mut self, group: usize, param: ArrayViewMut1<f64>, grad: ArrayView1<f64>, _: usize) {
        let (lr, ro, eps) = (self.learning_rate, self.ro, self.eps);
        if let Some(mean_sq) = self.mean_sq.get_mut(group) {
            Zip::from(param).and(mean_sq).and(grad).for_each(|p, s, &g| {
                *s = ro * *s + (1. - ro) * g * g;
                *p -= lr * g / (*s + eps).sqrt();
            });
        }
    }
}
