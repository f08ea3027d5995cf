use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

use crate::traits::Optimizer;

/// Nesterov accelerated gradient, written in the "look-ahead" form that only
/// needs the current gradient.
pub struct Nesterov {
    learning_rate: f64,
    momentum: f64,
    velocity: Vec<Array1<f64>>,
}

impl Nesterov {
    pub fn new(learning_rate: f64, momentum: f64) -> Self {
        Self {
            learning_rate,
            momentum,
            velocity: Vec::new(),
        }
    }
}

impl Optimizer for Nesterov {
    fn init(&mut self, group_sizes: &[usize]) {
        self.velocity = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
    }

    fn update(&mut self, group: usize, param: ArrayViewMut1<f64>, grad: ArrayView1<f64>, _: usize) {
        let (lr, momentum) = (self.learning_rate, self.momentum);
        if let Some(velocity) = self.velocity.get_mut(group) {
            Zip::from(param).and(velocity).and(grad).for_each(|p, v, &g| {
                let previous = *v;
                *v = momentum * *v + lr * g;
                *p += momentum * previous - (1. + momentum) * *v;
            });
        }
    }
}
