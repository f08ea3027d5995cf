use crate::config::{Activation, FullyConnDef, LayerDef, NetworkConfig};
use crate::error::{Error, Result};
use crate::layers::{
    AnyLayer, Conv, Dropout, FullyConn, Input, LayerKind, Maxout, Pool, Relu, Sigmoid, Tanh,
};
use crate::output_layers::{Regression, Softmax, Svm};
use crate::rng::{fork, seeded, NetRng, DEFAULT_SEED};
use crate::tensor::{Shape, Tensor};
use crate::traits::{Layer, ParamGroup, Target};
use crate::utils::argmax;

/// Bias given to units feeding a ReLU so they start out active.
const RELU_BIAS_PREF: f64 = 0.1;

/// An ordered pipeline of layers.
///
/// The activations of the last forward pass are kept so that `backward` can
/// hand each layer the exact input/output pair it produced.
pub struct Network {
    layers: Vec<AnyLayer>,
    activations: Vec<Tensor>,
    rng: NetRng,
}

impl Default for Network {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl Network {
    pub fn new(seed: u64) -> Self {
        Self {
            layers: Vec::new(),
            activations: Vec::new(),
            rng: seeded(seed),
        }
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        let mut network = Self::new(config.seed);
        for def in &config.layers {
            network.compose(def.clone())?;
        }
        Ok(network)
    }

    /// Appends `def` and every layer it implies, returning the kinds appended in order.
    ///
    /// Classification and regression heads get a fully-connected projection in
    /// front of them; dot-product layers get their activation and dropout
    /// appended behind them. On error the network is left unchanged.
    pub fn compose(&mut self, def: LayerDef) -> Result<Vec<LayerKind>> {
        // the weight stream only advances when the whole definition is accepted
        let mut rng = self.rng.clone();
        let staged = self.stage(def, &mut rng)?;
        self.rng = rng;
        let kinds = staged.iter().map(Layer::kind).collect::<Vec<_>>();
        for layer in staged {
            log::debug!(
                "layer {}: {} {} -> {}",
                self.layers.len(),
                layer.kind(),
                layer.input_shape(),
                layer.output_shape()
            );
            self.layers.push(layer);
        }
        self.activations.clear();
        Ok(kinds)
    }

    fn stage(&self, def: LayerDef, rng: &mut NetRng) -> Result<Vec<AnyLayer>> {
        let previous = self.layers.last().map(Layer::output_shape);
        let input = || previous.ok_or(Error::MissingInput);
        let mut staged: Vec<AnyLayer> = Vec::new();

        match def {
            LayerDef::Input {
                width,
                height,
                depth,
            } => {
                let shape = Shape::new(width, height, depth);
                if let Some(expected) = previous.filter(|expected| *expected != shape) {
                    return Err(Error::ShapeMismatch {
                        expected,
                        actual: shape,
                    });
                }
                staged.push(Input::new(shape).into());
            }
            LayerDef::Conv(def) => {
                let bias = bias_pref(def.bias_pref, def.activation);
                let conv = Conv::new(input()?, &def, bias, rng)?;
                stage_dot_product(&mut staged, conv.into(), def.activation, def.group_size)?;
                stage_dropout(&mut staged, def.drop_prob, rng)?;
            }
            LayerDef::FullyConn(def) => {
                let bias = bias_pref(def.bias_pref, def.activation);
                let fc = FullyConn::new(input()?, &def, bias, rng)?;
                stage_dot_product(&mut staged, fc.into(), def.activation, def.group_size)?;
                stage_dropout(&mut staged, def.drop_prob, rng)?;
            }
            LayerDef::Pool(def) => staged.push(Pool::new(input()?, &def)?.into()),
            LayerDef::Relu => staged.push(Relu::new(input()?).into()),
            LayerDef::Sigmoid => staged.push(Sigmoid::new(input()?).into()),
            LayerDef::Tanh => staged.push(Tanh::new(input()?).into()),
            LayerDef::Maxout { group_size } => {
                staged.push(Maxout::new(input()?, group_size)?.into())
            }
            LayerDef::Dropout { drop_prob } => {
                staged.push(Dropout::new(input()?, drop_prob, fork(rng))?.into())
            }
            LayerDef::Regression { neurons } => {
                let fc = FullyConn::new(input()?, &FullyConnDef::new(neurons), 0., rng)?;
                staged.push(fc.into());
                staged.push(Regression::new(Shape::flat(neurons)).into());
            }
            LayerDef::Softmax { classes } => {
                let fc = FullyConn::new(input()?, &FullyConnDef::new(classes), 0., rng)?;
                staged.push(fc.into());
                staged.push(Softmax::new(Shape::flat(classes)).into());
            }
            LayerDef::Svm { classes } => {
                let fc = FullyConn::new(input()?, &FullyConnDef::new(classes), 0., rng)?;
                staged.push(fc.into());
                staged.push(Svm::new(Shape::flat(classes)).into());
            }
        }
        Ok(staged)
    }

    pub fn layers(&self) -> &[AnyLayer] {
        &self.layers
    }

    pub fn kinds(&self) -> Vec<LayerKind> {
        self.layers.iter().map(Layer::kind).collect()
    }

    pub fn input_shape(&self) -> Option<Shape> {
        self.layers.first().map(Layer::input_shape)
    }

    pub fn output_shape(&self) -> Option<Shape> {
        self.layers.last().map(Layer::output_shape)
    }

    /// Threads `input` through every layer and returns the final activation.
    pub fn forward(&mut self, input: Tensor, is_training: bool) -> Result<&Tensor> {
        let expected = self.input_shape().ok_or(Error::EmptyNetwork)?;
        if input.shape() != expected {
            return Err(Error::ShapeMismatch {
                expected,
                actual: input.shape(),
            });
        }

        self.activations.clear();
        self.activations.push(input);
        for layer in self.layers.iter_mut() {
            let output = match self.activations.last() {
                Some(activation) => layer.forward(activation, is_training),
                None => return Err(Error::NoForward),
            };
            self.activations.push(output);
        }
        self.activations.last().ok_or(Error::NoForward)
    }

    /// Runs an inference forward pass and seeds the gradient chain from `target`
    /// without propagating it further.
    pub fn compute_loss(&mut self, input: Tensor, target: &Target) -> Result<f64> {
        self.forward(input, false)?;
        self.terminal_loss(target)
    }

    /// Back-propagates from the loss layer to the first layer, returning the loss.
    pub fn backward(&mut self, target: &Target) -> Result<f64> {
        let loss = self.terminal_loss(target)?;
        for i in (0..self.layers.len() - 1).rev() {
            let (inputs, outputs) = self.activations.split_at_mut(i + 1);
            self.layers[i].backward(&mut inputs[i], &outputs[0]);
        }
        Ok(loss)
    }

    fn terminal_loss(&mut self, target: &Target) -> Result<f64> {
        let n = self.layers.len();
        let last = self.layers.last_mut().ok_or(Error::EmptyNetwork)?;
        let kind = last.kind();
        let terminal = last.as_terminal_mut().ok_or(Error::NotTerminal(kind))?;
        if self.activations.len() != n + 1 {
            return Err(Error::NoForward);
        }

        let (inputs, outputs) = self.activations.split_at_mut(n);
        let loss = terminal.loss(&mut inputs[n - 1], &outputs[0], target)?;
        if !loss.is_finite() {
            log::warn!("{} loss is not finite: {}", kind, loss);
        }
        Ok(loss)
    }

    /// Index of the highest class score of the last forward pass.
    pub fn predict(&self) -> Result<usize> {
        let last = self.layers.last().ok_or(Error::EmptyNetwork)?;
        if !last.is_classifier() {
            return Err(Error::NotClassifier(last.kind()));
        }
        let output = self.output().ok_or(Error::NoForward)?;
        if output.values().iter().any(|v| !v.is_finite()) {
            log::warn!("{} output has non-finite scores: {}", last.kind(), output.values());
        }
        argmax(output.values().iter().copied()).ok_or(Error::NonFiniteOutput(last.kind()))
    }

    /// Chooses an action for an observation with an inference forward pass.
    pub fn act(&mut self, observation: &[f64]) -> Result<usize> {
        let shape = self.input_shape().ok_or(Error::EmptyNetwork)?;
        self.forward(Tensor::from_observation(shape, observation)?, false)?;
        self.predict()
    }

    pub fn output(&self) -> Option<&Tensor> {
        match self.activations.len() {
            n if n == self.layers.len() + 1 => self.activations.last(),
            _ => None,
        }
    }

    /// The input of the last forward pass, carrying its gradient after `backward`.
    pub fn input(&self) -> Option<&Tensor> {
        self.activations.first()
    }

    /// Every filter and bias of every layer, in layer order.
    pub fn params_mut(&mut self) -> Vec<ParamGroup<'_>> {
        self.layers
            .iter_mut()
            .flat_map(|layer| layer.params_mut())
            .collect()
    }
}

fn bias_pref(explicit: Option<f64>, activation: Activation) -> f64 {
    explicit.unwrap_or(match activation {
        Activation::Relu => RELU_BIAS_PREF,
        _ => 0.,
    })
}

fn stage_dot_product(
    staged: &mut Vec<AnyLayer>,
    layer: AnyLayer,
    activation: Activation,
    group_size: usize,
) -> Result<()> {
    let shape = layer.output_shape();
    staged.push(layer);
    match activation {
        Activation::None => {}
        Activation::Relu => staged.push(Relu::new(shape).into()),
        Activation::Sigmoid => staged.push(Sigmoid::new(shape).into()),
        Activation::Tanh => staged.push(Tanh::new(shape).into()),
        Activation::Maxout => staged.push(Maxout::new(shape, group_size)?.into()),
    }
    Ok(())
}

fn stage_dropout(staged: &mut Vec<AnyLayer>, drop_prob: Option<f64>, rng: &mut NetRng) -> Result<()> {
    if let (Some(p), Some(last)) = (drop_prob, staged.last()) {
        let dropout = Dropout::new(last.output_shape(), p, fork(rng))?;
        staged.push(dropout.into());
    }
    Ok(())
}
