use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::rng::DEFAULT_SEED;
use crate::tensor::Shape;

/// Nonlinearity appended after a convolution or fully-connected layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[default]
    None,
    Relu,
    Sigmoid,
    Tanh,
    Maxout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvDef {
    pub width: usize,
    pub height: usize,
    pub filters: usize,
    pub stride: usize,
    pub pad: usize,
    pub activation: Activation,
    pub group_size: usize,
    pub drop_prob: Option<f64>,
    pub l1_decay_mul: f64,
    pub l2_decay_mul: f64,
    pub bias_pref: Option<f64>,
}

impl Default for ConvDef {
    fn default() -> Self {
        Self {
            width: 3,
            height: 3,
            filters: 1,
            stride: 1,
            pad: 0,
            activation: Activation::None,
            group_size: 2,
            drop_prob: None,
            l1_decay_mul: 0.,
            l2_decay_mul: 1.,
            bias_pref: None,
        }
    }
}

impl ConvDef {
    pub fn new(width: usize, height: usize, filters: usize) -> Self {
        Self {
            width,
            height,
            filters,
            ..Self::default()
        }
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn drop_prob(mut self, p: f64) -> Self {
        self.drop_prob = Some(p);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FullyConnDef {
    pub neurons: usize,
    pub activation: Activation,
    pub group_size: usize,
    pub drop_prob: Option<f64>,
    pub l1_decay_mul: f64,
    pub l2_decay_mul: f64,
    pub bias_pref: Option<f64>,
}

impl Default for FullyConnDef {
    fn default() -> Self {
        Self {
            neurons: 1,
            activation: Activation::None,
            group_size: 2,
            drop_prob: None,
            l1_decay_mul: 0.,
            l2_decay_mul: 1.,
            bias_pref: None,
        }
    }
}

impl FullyConnDef {
    pub fn new(neurons: usize) -> Self {
        Self {
            neurons,
            ..Self::default()
        }
    }

    pub fn activation(mut self, activation: Activation) -> Self {
        self.activation = activation;
        self
    }

    pub fn group_size(mut self, group_size: usize) -> Self {
        self.group_size = group_size;
        self
    }

    pub fn drop_prob(mut self, p: f64) -> Self {
        self.drop_prob = Some(p);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolDef {
    pub width: usize,
    pub height: usize,
    pub stride: usize,
    pub pad: usize,
}

impl Default for PoolDef {
    fn default() -> Self {
        Self {
            width: 2,
            height: 2,
            stride: 2,
            pad: 0,
        }
    }
}

impl PoolDef {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn stride(mut self, stride: usize) -> Self {
        self.stride = stride;
        self
    }

    pub fn pad(mut self, pad: usize) -> Self {
        self.pad = pad;
        self
    }
}

/// Declarative description of one stage handed to `Network::compose`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LayerDef {
    Input { width: usize, height: usize, depth: usize },
    Conv(ConvDef),
    Pool(PoolDef),
    FullyConn(FullyConnDef),
    Relu,
    Sigmoid,
    Tanh,
    Maxout {
        #[serde(default = "default_group_size")]
        group_size: usize,
    },
    Dropout {
        #[serde(default = "default_drop_prob")]
        drop_prob: f64,
    },
    Regression { neurons: usize },
    Softmax { classes: usize },
    Svm { classes: usize },
}

fn default_group_size() -> usize {
    2
}

fn default_drop_prob() -> f64 {
    0.5
}

impl LayerDef {
    pub fn input(shape: Shape) -> Self {
        LayerDef::Input {
            width: shape.width,
            height: shape.height,
            depth: shape.depth,
        }
    }
}

/// A whole pipeline: the initialization seed and the ordered layer definitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    pub layers: Vec<LayerDef>,
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

impl NetworkConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    #[default]
    Sgd,
    Nesterov,
    Adagrad,
    Windowgrad,
    Adadelta,
    Adam,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub method: Method,
    pub learning_rate: f64,
    pub momentum: f64,
    pub batch_size: usize,
    pub l1_decay: f64,
    pub l2_decay: f64,
    /// Averaging factor of Windowgrad and Adadelta.
    pub ro: f64,
    pub eps: f64,
    pub beta1: f64,
    pub beta2: f64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            method: Method::Sgd,
            learning_rate: 0.01,
            momentum: 0.9,
            batch_size: 1,
            l1_decay: 0.,
            l2_decay: 0.,
            ro: 0.95,
            eps: 1e-6,
            beta1: 0.9,
            beta2: 0.999,
        }
    }
}

impl TrainerConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::InvalidConfig("batch size must be at least 1".into()));
        }
        let non_negative = [
            ("learning_rate", self.learning_rate),
            ("momentum", self.momentum),
            ("l1_decay", self.l1_decay),
            ("l2_decay", self.l2_decay),
            ("eps", self.eps),
        ];
        for (name, value) in non_negative {
            if !value.is_finite() || value < 0. {
                return Err(Error::InvalidConfig(format!(
                    "{} must be finite and non-negative, got {}",
                    name, value
                )));
            }
        }
        for (name, value) in [("ro", self.ro), ("beta1", self.beta1), ("beta2", self.beta2)] {
            if !(0. ..1.).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "{} must lie in [0, 1), got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
