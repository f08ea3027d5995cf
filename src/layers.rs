mod conv;
mod dropout;
mod fully_conn;
mod input;
mod maxout;
mod pool;
mod relu;
mod sigmoid;
mod tanh;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use conv::Conv;
pub use dropout::Dropout;
pub use fully_conn::FullyConn;
pub use input::Input;
pub use maxout::Maxout;
pub use pool::Pool;
pub use relu::Relu;
pub use sigmoid::Sigmoid;
pub use tanh::Tanh;

use crate::error::{Error, Result};
use crate::output_layers::{Regression, Softmax, Svm};
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, ParamGroup, Terminal};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Input,
    Conv,
    Pool,
    FullyConn,
    Relu,
    Sigmoid,
    Tanh,
    Maxout,
    Dropout,
    Regression,
    Softmax,
    Svm,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LayerKind::Input => "input",
            LayerKind::Conv => "conv",
            LayerKind::Pool => "pool",
            LayerKind::FullyConn => "fully_conn",
            LayerKind::Relu => "relu",
            LayerKind::Sigmoid => "sigmoid",
            LayerKind::Tanh => "tanh",
            LayerKind::Maxout => "maxout",
            LayerKind::Dropout => "dropout",
            LayerKind::Regression => "regression",
            LayerKind::Softmax => "softmax",
            LayerKind::Svm => "svm",
        };
        f.write_str(name)
    }
}

/// Output extent along one axis of a sliding window, dropping trailing
/// partial windows. `None` when not even one window fits.
pub fn window_output_size(input: usize, kernel: usize, stride: usize, pad: usize) -> Option<usize> {
    if kernel == 0 || stride == 0 || input + 2 * pad < kernel {
        return None;
    }
    Some((input + 2 * pad - kernel) / stride + 1)
}

/// Sliding-window geometry shared by convolution and pooling.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Window {
    pub input: Shape,
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub pad: usize,
}

impl Window {
    pub fn new(
        layer: LayerKind,
        input: Shape,
        width: usize,
        height: usize,
        stride: usize,
        pad: usize,
    ) -> Result<Self> {
        let window = Self {
            input,
            width,
            height,
            stride,
            pad,
        };
        let fits = window_output_size(input.width, width, stride, pad).is_some()
            && window_output_size(input.height, height, stride, pad).is_some();
        if !fits || input.depth == 0 {
            return Err(Error::InvalidGeometry {
                layer,
                input,
                reason: "kernel, stride and padding leave no output",
            });
        }
        Ok(window)
    }

    pub fn output_size(&self) -> (usize, usize) {
        let size = |input, kernel| window_output_size(input, kernel, self.stride, self.pad).unwrap_or(0);
        (size(self.input.width, self.width), size(self.input.height, self.height))
    }

    /// In-bounds taps `(fx, fy, x, y)` of the window producing output cell `(ax, ay)`.
    pub fn taps(self, ax: usize, ay: usize) -> impl Iterator<Item = (usize, usize, usize, usize)> {
        let x0 = (ax * self.stride) as isize - self.pad as isize;
        let y0 = (ay * self.stride) as isize - self.pad as isize;
        let (w, h) = (self.input.width as isize, self.input.height as isize);
        (0..self.height)
            .flat_map(move |fy| (0..self.width).map(move |fx| (fx, fy)))
            .filter_map(move |(fx, fy)| {
                let (x, y) = (x0 + fx as isize, y0 + fy as isize);
                (x >= 0 && y >= 0 && x < w && y < h).then(|| (fx, fy, x as usize, y as usize))
            })
    }
}

/// The closed set of stages a network can hold.
pub enum AnyLayer {
    Input(Input),
    Conv(Conv),
    Pool(Pool),
    FullyConn(FullyConn),
    Relu(Relu),
    Sigmoid(Sigmoid),
    Tanh(Tanh),
    Maxout(Maxout),
    Dropout(Dropout),
    Regression(Regression),
    Softmax(Softmax),
    Svm(Svm),
}

macro_rules! dispatch {
    ($self:expr, $layer:ident => $body:expr) => {
        match $self {
            AnyLayer::Input($layer) => $body,
            AnyLayer::Conv($layer) => $body,
            AnyLayer::Pool($layer) => $body,
            AnyLayer::FullyConn($layer) => $body,
            AnyLayer::Relu($layer) => $body,
            AnyLayer::Sigmoid($layer) => $body,
            AnyLayer::Tanh($layer) => $body,
            AnyLayer::Maxout($layer) => $body,
            AnyLayer::Dropout($layer) => $body,
            AnyLayer::Regression($layer) => $body,
            AnyLayer::Softmax($layer) => $body,
            AnyLayer::Svm($layer) => $body,
        }
    };
}

impl AnyLayer {
    pub fn as_terminal_mut(&mut self) -> Option<&mut dyn Terminal> {
        match self {
            AnyLayer::Regression(layer) => Some(layer as &mut dyn Terminal),
            AnyLayer::Softmax(layer) => Some(layer as &mut dyn Terminal),
            AnyLayer::Svm(layer) => Some(layer as &mut dyn Terminal),
            _ => None,
        }
    }

    pub fn is_classifier(&self) -> bool {
        matches!(self, AnyLayer::Softmax(_) | AnyLayer::Svm(_))
    }
}

impl Layer for AnyLayer {
    fn kind(&self) -> LayerKind {
        dispatch!(self, layer => layer.kind())
    }

    fn input_shape(&self) -> Shape {
        dispatch!(self, layer => layer.input_shape())
    }

    fn output_shape(&self) -> Shape {
        dispatch!(self, layer => layer.output_shape())
    }

    fn forward(&mut self, input: &Tensor, is_training: bool) -> Tensor {
        dispatch!(self, layer => layer.forward(input, is_training))
    }

    fn backward(&mut self, input: &mut Tensor, output: &Tensor) {
        dispatch!(self, layer => layer.backward(input, output))
    }

    fn params_mut(&mut self) -> Vec<ParamGroup<'_>> {
        dispatch!(self, layer => layer.params_mut())
    }
}

macro_rules! impl_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for AnyLayer {
                fn from(layer: $variant) -> Self {
                    AnyLayer::$variant(layer)
                }
            }
        )*
    };
}

impl_from!(Input, Conv, Pool, FullyConn, Relu, Sigmoid, Tanh, Maxout, Dropout, Regression, Softmax, Svm);

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{window_output_size, LayerKind, Window};
    use crate::tensor::Shape;

    #[test]
    fn should_compute_hand_checked_sizes() {
        assert_eq!(window_output_size(5, 3, 1, 0), Some(3));
        assert_eq!(window_output_size(28, 5, 2, 0), Some(12));
        assert_eq!(window_output_size(28, 3, 1, 1), Some(28));
        assert_eq!(window_output_size(4, 2, 2, 0), Some(2));
        assert_eq!(window_output_size(2, 3, 1, 0), None);
        assert_eq!(window_output_size(5, 3, 0, 0), None);
    }

    #[test]
    fn should_skip_taps_in_the_padding() {
        let window = Window::new(LayerKind::Conv, Shape::new(3, 3, 1), 3, 3, 1, 1).unwrap();
        let corner = window.taps(0, 0).collect::<Vec<_>>();
        assert_eq!(corner, vec![(1, 1, 0, 0), (2, 1, 1, 0), (1, 2, 0, 1), (2, 2, 1, 1)]);
        assert_eq!(window.taps(1, 1).count(), 9);
    }

    proptest! {
        #[test]
        fn prop_output_size_is_floor_formula(
            input in 1usize..40,
            kernel in 1usize..8,
            stride in 1usize..5,
            pad in 0usize..4,
        ) {
            let size = window_output_size(input, kernel, stride, pad);
            if input + 2 * pad >= kernel {
                let expected = ((input + 2 * pad - kernel) as f64 / stride as f64).floor() as usize + 1;
                prop_assert_eq!(size, Some(expected));
                // the last window starts inside the padded input and fits entirely
                let last = (expected - 1) * stride + kernel;
                prop_assert!(last <= input + 2 * pad);
            } else {
                prop_assert_eq!(size, None);
            }
        }
    }
}
