use std::fmt;

use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng::randn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    pub width: usize,
    pub height: usize,
    pub depth: usize,
}

impl Shape {
    pub const fn new(width: usize, height: usize, depth: usize) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }

    /// A 1×1×`len` shape, the layout of every flat vector in the network.
    pub const fn flat(len: usize) -> Self {
        Self::new(1, 1, len)
    }

    pub const fn len(&self) -> usize {
        self.width * self.height * self.depth
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub const fn index(&self, x: usize, y: usize, d: usize) -> usize {
        (self.width * y + x) * self.depth + d
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

/// A width × height × depth block of values with a gradient buffer of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Shape,
    values: Array1<f64>,
    grads: Array1<f64>,
}

impl Tensor {
    pub fn filled(shape: Shape, value: f64) -> Self {
        Self {
            shape,
            values: Array1::from_elem(shape.len(), value),
            grads: Array1::zeros(shape.len()),
        }
    }

    pub fn zeros(shape: Shape) -> Self {
        Self::filled(shape, 0.)
    }

    /// Draws every value from N(0, 1/n) where n is the element count, so that
    /// units with many inputs do not start with a larger output variance.
    pub fn random<R: Rng + ?Sized>(shape: Shape, rng: &mut R) -> Self {
        let scale = (1. / shape.len() as f64).sqrt();
        let values = (0..shape.len()).map(|_| randn(rng, 0., scale)).collect();
        Self {
            shape,
            values,
            grads: Array1::zeros(shape.len()),
        }
    }

    pub fn from_vec(shape: Shape, values: Vec<f64>) -> Result<Self> {
        if values.len() != shape.len() {
            return Err(Error::ObservationLength {
                expected: shape.len(),
                actual: values.len(),
            });
        }
        Ok(Self {
            shape,
            values: Array1::from_vec(values),
            grads: Array1::zeros(shape.len()),
        })
    }

    /// Wraps an observation vector into the declared input shape of a network.
    pub fn from_observation(shape: Shape, observation: &[f64]) -> Result<Self> {
        Self::from_vec(shape, observation.to_vec())
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut Array1<f64> {
        &mut self.values
    }

    pub fn grads(&self) -> &Array1<f64> {
        &self.grads
    }

    pub fn grads_mut(&mut self) -> &mut Array1<f64> {
        &mut self.grads
    }

    /// Borrows the values and the gradient buffer at the same time.
    pub fn split_mut(&mut self) -> (&mut Array1<f64>, &mut Array1<f64>) {
        (&mut self.values, &mut self.grads)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize, d: usize) -> f64 {
        self.values[self.shape.index(x, y, d)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, d: usize, v: f64) {
        let ix = self.shape.index(x, y, d);
        self.values[ix] = v;
    }

    #[inline]
    pub fn add(&mut self, x: usize, y: usize, d: usize, v: f64) {
        let ix = self.shape.index(x, y, d);
        self.values[ix] += v;
    }

    #[inline]
    pub fn grad(&self, x: usize, y: usize, d: usize) -> f64 {
        self.grads[self.shape.index(x, y, d)]
    }

    #[inline]
    pub fn set_grad(&mut self, x: usize, y: usize, d: usize, v: f64) {
        let ix = self.shape.index(x, y, d);
        self.grads[ix] = v;
    }

    #[inline]
    pub fn add_grad(&mut self, x: usize, y: usize, d: usize, v: f64) {
        let ix = self.shape.index(x, y, d);
        self.grads[ix] += v;
    }

    pub fn zero_grad(&mut self) {
        self.grads.fill(0.);
    }

    /// Copies the values into a new tensor whose gradient starts at zero.
    pub fn clone_values(&self) -> Self {
        Self {
            shape: self.shape,
            values: self.values.clone(),
            grads: Array1::zeros(self.len()),
        }
    }

    /// Copies the values into a 1×1×n tensor with a fresh gradient.
    pub fn flattened(&self) -> Self {
        Self {
            shape: Shape::flat(self.len()),
            values: self.values.clone(),
            grads: Array1::zeros(self.len()),
        }
    }

    /// A new all-zero tensor of the same shape.
    pub fn zeros_like(&self) -> Self {
        Self::zeros(self.shape)
    }

    pub fn add_from(&mut self, other: &Tensor) {
        self.values += &other.values;
    }

    pub fn add_grad_from(&mut self, other: &Tensor) {
        self.grads += &other.grads;
    }

    pub fn add_scaled_from(&mut self, other: &Tensor, a: f64) {
        self.values.scaled_add(a, &other.values);
    }

    pub fn add_const(&mut self, c: f64) {
        self.values += c;
    }
}
