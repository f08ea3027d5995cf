//! Finite-difference checks shared by the layer tests.

use ndarray::Array1;
use rand::Rng;

use crate::rng::seeded;
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, Target, Terminal};

const STEP: f64 = 1e-5;
pub(crate) const TOLERANCE: f64 = 1e-4;

pub(crate) fn random_input(shape: Shape, seed: u64) -> Tensor {
    let mut rng = seeded(seed);
    let values = (0..shape.len()).map(|_| rng.gen_range(-1.0..1.0)).collect();
    Tensor::from_vec(shape, values).unwrap()
}

fn output_weights(shape: Shape) -> Array1<f64> {
    let mut rng = seeded(99);
    (0..shape.len()).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// The scalar `sum(forward(input) * weights)`, whose gradient w.r.t. the output is `weights`.
fn objective<L: Layer>(layer: &mut L, input: &Tensor, weights: &Array1<f64>) -> f64 {
    layer.forward(input, false).values().dot(weights)
}

fn assert_close(analytic: f64, numeric: f64, what: &str, i: usize) {
    let scale = 1f64.max(analytic.abs() + numeric.abs());
    assert!(
        (analytic - numeric).abs() <= TOLERANCE * scale,
        "{} gradient {} mismatch: analytic {} vs numeric {}",
        what,
        i,
        analytic,
        numeric
    );
}

/// Compares the gradient `backward` writes into the input against central differences.
pub(crate) fn check_input_grad<L: Layer>(layer: &mut L, input: &Tensor) {
    let weights = output_weights(layer.output_shape());

    let mut x = input.clone_values();
    let mut out = layer.forward(&x, false);
    out.grads_mut().assign(&weights);
    layer.backward(&mut x, &out);
    let analytic = x.grads().clone();

    for i in 0..input.len() {
        let mut plus = input.clone_values();
        plus.values_mut()[i] += STEP;
        let mut minus = input.clone_values();
        minus.values_mut()[i] -= STEP;
        let numeric = (objective(layer, &plus, &weights) - objective(layer, &minus, &weights))
            / (2. * STEP);
        assert_close(analytic[i], numeric, "input", i);
    }
}

/// Compares the accumulated parameter gradients against central differences.
pub(crate) fn check_param_grads<L: Layer>(layer: &mut L, input: &Tensor) {
    let weights = output_weights(layer.output_shape());
    for group in layer.params_mut() {
        group.tensor.zero_grad();
    }

    let mut x = input.clone_values();
    let mut out = layer.forward(&x, false);
    out.grads_mut().assign(&weights);
    layer.backward(&mut x, &out);
    let analytic = layer
        .params_mut()
        .into_iter()
        .map(|group| group.tensor.grads().clone())
        .collect::<Vec<_>>();

    for (g, expected) in analytic.iter().enumerate() {
        for j in 0..expected.len() {
            layer.params_mut()[g].tensor.values_mut()[j] += STEP;
            let plus = objective(layer, input, &weights);
            layer.params_mut()[g].tensor.values_mut()[j] -= 2. * STEP;
            let minus = objective(layer, input, &weights);
            layer.params_mut()[g].tensor.values_mut()[j] += STEP;
            assert_close(expected[j], (plus - minus) / (2. * STEP), "parameter", j);
        }
    }
}

fn loss_at<L: Terminal>(layer: &mut L, input: &Tensor, target: &Target) -> f64 {
    let mut x = input.clone_values();
    let out = layer.forward(&x, false);
    layer.loss(&mut x, &out, target).unwrap()
}

/// Compares the gradient a loss layer seeds into its input against central differences of the loss.
pub(crate) fn check_loss_grad<L: Terminal>(layer: &mut L, input: &Tensor, target: &Target) {
    let mut x = input.clone_values();
    let out = layer.forward(&x, false);
    layer.loss(&mut x, &out, target).unwrap();

    for i in 0..input.len() {
        let mut plus = input.clone_values();
        plus.values_mut()[i] += STEP;
        let mut minus = input.clone_values();
        minus.values_mut()[i] -= STEP;
        let numeric = (loss_at(layer, &plus, target) - loss_at(layer, &minus, target)) / (2. * STEP);
        assert_close(x.grads()[i], numeric, "loss", i);
    }
}
