use std::time::{Duration, Instant};

use ndarray::Zip;

use crate::config::TrainerConfig;
use crate::error::{Error, Result};
use crate::network::Network;
use crate::optimizers;
use crate::tensor::Tensor;
use crate::traits::{Optimizer, Target};

/// Outcome of one training step.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepReport {
    pub cost_loss: f64,
    /// L1 penalty of the weights at the last update, zero when no update ran.
    pub l1_decay_loss: f64,
    pub l2_decay_loss: f64,
    pub updated: bool,
    pub forward_time: Duration,
    pub backward_time: Duration,
}

impl StepReport {
    pub fn loss(&self) -> f64 {
        self.cost_loss + self.l1_decay_loss + self.l2_decay_loss
    }
}

/// Drives a network through forward/backward passes and applies weight updates
/// every `batch_size` steps.
pub struct Trainer {
    net: Network,
    config: TrainerConfig,
    optimizer: Box<dyn Optimizer + Send>,
    /// Parameter group sizes the optimizer state was allocated for.
    group_sizes: Option<Vec<usize>>,
    k: usize,
}

impl Trainer {
    pub fn new(net: Network, config: TrainerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            net,
            optimizer: optimizers::build(&config),
            config,
            group_sizes: None,
            k: 0,
        })
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Number of steps taken so far.
    pub fn iterations(&self) -> usize {
        self.k
    }

    pub fn net(&self) -> &Network {
        &self.net
    }

    pub fn net_mut(&mut self) -> &mut Network {
        &mut self.net
    }

    pub fn into_inner(self) -> Network {
        self.net
    }

    pub fn step(&mut self, input: Tensor, target: &Target) -> Result<StepReport> {
        let start = Instant::now();
        self.net.forward(input, true)?;
        let forward_time = start.elapsed();

        let start = Instant::now();
        let cost_loss = self.net.backward(target)?;
        let backward_time = start.elapsed();

        self.k += 1;
        let mut report = StepReport {
            cost_loss,
            forward_time,
            backward_time,
            ..StepReport::default()
        };
        if self.k % self.config.batch_size == 0 {
            self.update(&mut report)?;
        }
        Ok(report)
    }

    /// Fails without touching any weight when the network's parameter groups no
    /// longer match the ones the optimizer state was allocated for.
    fn update(&mut self, report: &mut StepReport) -> Result<()> {
        let groups = self.net.params_mut();
        let sizes = groups.iter().map(|g| g.tensor.len()).collect::<Vec<_>>();
        match &self.group_sizes {
            Some(expected) if *expected != sizes => {
                return Err(Error::ParamGroupsChanged {
                    expected: expected.clone(),
                    actual: sizes,
                });
            }
            Some(_) => {}
            None => {
                log::debug!(
                    "allocating {:?} state for {} parameter groups ({} weights)",
                    self.config.method,
                    sizes.len(),
                    sizes.iter().sum::<usize>()
                );
                self.optimizer.init(&sizes);
                self.group_sizes = Some(sizes);
            }
        }

        let batch = self.config.batch_size as f64;
        let (mut l1_loss, mut l2_loss) = (0., 0.);
        for (i, group) in groups.into_iter().enumerate() {
            let l1 = self.config.l1_decay * group.l1_decay_mul;
            let l2 = self.config.l2_decay * group.l2_decay_mul;
            let (values, grads) = group.tensor.split_mut();

            Zip::from(&mut *grads).and(&*values).for_each(|g, &w| {
                l1_loss += l1 * w.abs();
                l2_loss += l2 * w * w / 2.;
                let l1_grad = if w > 0. { l1 } else { -l1 };
                *g = (l2 * w + l1_grad + *g) / batch;
            });
            self.optimizer.update(i, values.view_mut(), grads.view(), self.k);
            grads.fill(0.);
        }

        report.l1_decay_loss = l1_loss;
        report.l2_decay_loss = l2_loss;
        report.updated = true;
        log::trace!(
            "update at step {}: cost {:.6} l1 {:.6} l2 {:.6}",
            self.k,
            report.cost_loss,
            l1_loss,
            l2_loss
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use crate::config::{FullyConnDef, LayerDef, Method, TrainerConfig};
    use crate::error::Error;
    use crate::layers::AnyLayer;
    use crate::network::Network;
    use crate::tensor::{Shape, Tensor};
    use crate::traits::Target;

    use super::Trainer;

    fn regression_net() -> Network {
        let mut net = Network::new(7);
        net.compose(LayerDef::input(Shape::flat(2))).unwrap();
        net.compose(LayerDef::Regression { neurons: 1 }).unwrap();
        net
    }

    fn weights(trainer: &Trainer) -> Vec<f64> {
        match &trainer.net().layers()[1] {
            AnyLayer::FullyConn(fc) => fc.filters()[0].values().to_vec(),
            _ => panic!("expected the head projection"),
        }
    }

    fn x() -> Tensor {
        Tensor::from_vec(Shape::flat(2), vec![1., 2.]).unwrap()
    }

    #[test]
    fn should_reject_an_invalid_config() {
        let config = TrainerConfig {
            batch_size: 0,
            ..TrainerConfig::default()
        };
        assert!(Trainer::new(regression_net(), config).is_err());
    }

    #[test]
    fn should_apply_plain_sgd() {
        let config = TrainerConfig {
            learning_rate: 0.1,
            momentum: 0.,
            ..TrainerConfig::default()
        };
        let mut trainer = Trainer::new(regression_net(), config).unwrap();
        let before = weights(&trainer);
        let y = trainer.net_mut().forward(x(), false).unwrap().values()[0];

        let report = trainer.step(x(), &Target::Value(y + 1.)).unwrap();
        assert!(report.updated);
        assert_abs_diff_eq!(report.cost_loss, 0.5, epsilon = 1e-12);

        // d loss / d w = (y - target) * x = -x
        let after = weights(&trainer);
        assert_abs_diff_eq!(after[0], before[0] + 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(after[1], before[1] + 0.2, epsilon = 1e-12);
    }

    #[test]
    fn should_report_decay_losses() {
        let config = TrainerConfig {
            l1_decay: 0.5,
            l2_decay: 2.,
            ..TrainerConfig::default()
        };
        let mut trainer = Trainer::new(regression_net(), config).unwrap();
        let w = weights(&trainer);
        let report = trainer.step(x(), &Target::Value(0.)).unwrap();

        let l1 = 0.5 * w.iter().map(|v| v.abs()).sum::<f64>();
        let l2 = 2. * w.iter().map(|v| v * v / 2.).sum::<f64>();
        assert_abs_diff_eq!(report.l1_decay_loss, l1, epsilon = 1e-12);
        assert_abs_diff_eq!(report.l2_decay_loss, l2, epsilon = 1e-12);
        assert_abs_diff_eq!(report.loss(), report.cost_loss + l1 + l2, epsilon = 1e-12);
    }

    #[test]
    fn should_wait_for_a_full_batch() {
        let config = TrainerConfig {
            batch_size: 3,
            ..TrainerConfig::default()
        };
        let mut trainer = Trainer::new(regression_net(), config).unwrap();
        let before = weights(&trainer);
        for k in 1..=6 {
            let report = trainer.step(x(), &Target::Value(1.)).unwrap();
            assert_eq!(report.updated, k % 3 == 0);
            if k < 3 {
                assert_eq!(weights(&trainer), before);
            }
        }
        assert_eq!(trainer.iterations(), 6);
        assert_ne!(weights(&trainer), before);
    }

    #[test]
    fn should_refuse_to_update_after_the_network_grows() {
        let config = TrainerConfig {
            method: Method::Adam,
            ..TrainerConfig::default()
        };
        let mut trainer = Trainer::new(regression_net(), config).unwrap();
        trainer.step(x(), &Target::Value(1.)).unwrap();

        trainer
            .net_mut()
            .compose(LayerDef::Regression { neurons: 1 })
            .unwrap();
        let head = |trainer: &Trainer| match trainer.net().layers().iter().rev().nth(1) {
            Some(AnyLayer::FullyConn(fc)) => fc.filters()[0].values().to_vec(),
            _ => panic!("expected the new head projection"),
        };
        let before = head(&trainer);

        let err = trainer.step(x(), &Target::Value(3.)).unwrap_err();
        assert!(matches!(err, Error::ParamGroupsChanged { .. }));
        assert_eq!(head(&trainer), before);
    }

    #[test]
    fn should_run_every_method() {
        for method in [
            Method::Sgd,
            Method::Nesterov,
            Method::Adagrad,
            Method::Windowgrad,
            Method::Adadelta,
            Method::Adam,
        ] {
            let mut net = Network::new(3);
            net.compose(LayerDef::input(Shape::flat(2))).unwrap();
            net.compose(LayerDef::FullyConn(FullyConnDef::new(3))).unwrap();
            net.compose(LayerDef::Softmax { classes: 2 }).unwrap();
            let config = TrainerConfig {
                method,
                ..TrainerConfig::default()
            };
            let mut trainer = Trainer::new(net, config).unwrap();
            for _ in 0..3 {
                let report = trainer.step(x(), &Target::Class(1)).unwrap();
                assert!(report.loss().is_finite(), "{:?}", method);
            }
        }
    }
}
