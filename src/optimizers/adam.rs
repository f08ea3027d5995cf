use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

use crate::traits::Optimizer;

pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    first_moment: Vec<Array1<f64>>,
    second_moment: Vec<Array1<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, eps: f64) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            eps,
            first_moment: Vec::new(),
            second_moment: Vec::new(),
        }
    }
}

impl Optimizer for Adam {
    fn init(&mut self, group_sizes: &[usize]) {
        self.first_moment = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
        self.second_moment = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
    }

    /// The moment estimates are multiplied by `1 - beta^k`, where `k` is the trainer
    /// step count, which damps the first steps instead of boosting them.
    fn update(&mut self, group: usize, param: ArrayViewMut1<f64>, grad: ArrayView1<f64>, iteration: usize) {
        let (lr, b1, b2, eps) = (self.learning_rate, self.beta1, self.beta2, self.eps);
        let k = iteration as f64;
        let (c1, c2) = (1. - b1.powf(k), 1. - b2.powf(k));
        if let (Some(m), Some(v)) = (
            self.first_moment.get_mut(group),
            self.second_moment.get_mut(group),
        ) {
            Zip::from(param)
                .and(m)
                .and(v)
                .and(grad)
                .for_each(|p, m, v, &g| {
                    *m = b1 * *m + (1. - b1) * g;
                    *v = b2 * *v + (1. - b2) * g * g;
                    *p -= lr * (*m * c1) / ((*v * c2).sqrt() + eps);
                });
        }
    }
}
