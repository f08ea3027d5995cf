use ndarray::{Array1, ArrayView1, ArrayViewMut1, Zip};

use crate::traits::Optimizer;

/// Adadelta: step sizes from the ratio of the windowed update and gradient magnitudes.
/// The learning rate is not used.
pub struct Adadelta {
    ro: f64,
    eps: f64,
    mean_sq_grad: Vec<Array1<f64>>,
    mean_sq_step: Vec<Array1<f64>>,
}

impl Adadelta {
    pub fn new(ro: f64, eps: f64) -> Self {
        Self {
            ro,
            eps,
            mean_sq_grad: Vec::new(),
            mean_sq_step: Vec::new(),
        }
    }
}

impl Optimizer for Adadelta {
    fn init(&mut self, group_sizes: &[usize]) {
        self.mean_sq_grad = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
        self.mean_sq_step = group_sizes.iter().map(|n| Array1::zeros(*n)).collect();
    }

    fn update(&mut self, group: usize, param: ArrayViewMut1<f64>, grad: ArrayView1<f64>, _: usize) {
        let (ro, eps) = (self.ro, self.eps);
        if let (Some(sg), Some(sx)) = (
            self.mean_sq_grad.get_mut(group),
            self.mean_sq_step.get_mut(group),
        ) {
            Zip::from(param)
                .and(sg)
                .and(sx)
                .and(grad)
                .for_each(|p, sg, sx, &g| {
                    *sg = ro * *sg + (1. - ro) * g * g;
                    let dx = -((*sx + eps) / (*sg + eps)).sqrt() * g;
                    *sx = ro * *sx + (1. - ro) * dx * dx;
                    *p += dx;
                });
        }
    }
}
