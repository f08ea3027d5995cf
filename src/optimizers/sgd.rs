use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

use crate::traits::Optimizer;

/// Stochastic gradient descent, with classical momentum when `momentum > 0`.
pub struct Sgd {
    learning_rate: f64,
    momentum: f64,
    velocity: Vec<Array1<f64>>,
}

impl Sgd {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }

    pub fn velocity(&self) -> &[Array1<f64>] {
        &self.velocity
    }
}

impl Optimizer for Sgd {
    fn init(&mut self, group_sizes: &[usize]) {
        if self.momentum > 0. {
            self.velocity = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
        }
    }

    fn update(&mut self, group: usize, mut param: ArrayViewMut1<f64>, grad: ArrayView1<f64>, _: usize) {
        let (lr, momentum) = (self.learning_rate, self.momentum);
        match self.velocity.get_mut(group) {
            Some(velocity) => Zip::from(param).and(velocity).and(grad).for_each(|p, v, &g| {
                *v = momentum * *v - lr * g;
                *p += *v;
            }),
            None => param.scaled_add(-lr, &grad),
        }
    }
}
