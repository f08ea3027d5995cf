use crate::layers::LayerKind;
use crate::tensor::Shape;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    #[error("the first layer of a network must be an input layer")]
    MissingInput,

    #[error("{layer} cannot be applied to an input of shape {input}: {reason}")]
    InvalidGeometry {
        layer: LayerKind,
        input: Shape,
        reason: &'static str,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("the network is empty")]
    EmptyNetwork,

    #[error("last layer ({0}) cannot compute a loss")]
    NotTerminal(LayerKind),

    #[error("last layer ({0}) is not a classifier")]
    NotClassifier(LayerKind),

    #[error("{0} produced no finite score")]
    NonFiniteOutput(LayerKind),

    #[error("parameter groups changed after the optimizer was initialized: expected {expected:?}, found {actual:?}")]
    ParamGroupsChanged {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("no forward pass has been run")]
    NoForward,

    #[error("{layer} does not accept a {target} target")]
    UnsupportedTarget { layer: LayerKind, target: &'static str },

    #[error("target has {actual} values, expected {expected}")]
    TargetLength { expected: usize, actual: usize },

    #[error("class {class} is out of range for {classes} classes")]
    ClassOutOfRange { class: usize, classes: usize },

    #[error("observation has {actual} values, expected {expected}")]
    ObservationLength { expected: usize, actual: usize },

    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

