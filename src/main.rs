use convnet::rng::{seeded, NetRng};
use convnet::{Network, NetworkConfig, Result, Shape, Target, Tensor, Trainer, TrainerConfig};
use log::{Level, LevelFilter, Log, Metadata, Record};
use rand::Rng;

const SIDE: usize = 8;
const TRAIN_STEPS: usize = 3000;
const TEST_LEN: usize = 400;
const REPORT_EVERY: usize = 500;

const NETWORK: &str = r#"{
    "seed": 2024,
    "layers": [
        { "type": "input", "width": 8, "height": 8, "depth": 1 },
        { "type": "conv", "width": 3, "height": 3, "filters": 4, "pad": 1, "activation": "relu" },
        { "type": "pool", "width": 2, "height": 2, "stride": 2 },
        { "type": "fully_conn", "neurons": 8, "activation": "tanh" },
        { "type": "softmax", "classes": 4 }
    ]
}"#;

const TRAINER: &str = r#"{ "method": "adam", "learning_rate": 0.01, "batch_size": 4, "l2_decay": 0.0001 }"#;

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= Level::Info
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// A noisy 8x8 frame with one bright quadrant; the label is the quadrant index.
fn observation(rng: &mut NetRng) -> (Vec<f64>, usize) {
    let quadrant = rng.gen_range(0..4);
    let half = SIDE / 2;
    let (qx, qy) = (quadrant % 2, quadrant / 2);
    let mut frame = vec![0.; SIDE * SIDE];
    for y in 0..SIDE {
        for x in 0..SIDE {
            let lit = x / half == qx && y / half == qy;
            let base = if lit { 1. } else { 0. };
            frame[y * SIDE + x] = base + rng.gen_range(-0.2..0.2);
        }
    }
    (frame, quadrant)
}

fn accuracy(net: &mut Network, rng: &mut NetRng) -> Result<f64> {
    let mut correct = 0;
    for _ in 0..TEST_LEN {
        let (frame, label) = observation(rng);
        if net.act(&frame)? == label {
            correct += 1;
        }
    }
    Ok(correct as f64 / TEST_LEN as f64)
}

fn main() -> Result<()> {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Info))
        .ok();

    let net = Network::from_config(&NetworkConfig::from_json(NETWORK)?)?;
    let shape = net.input_shape().unwrap_or(Shape::new(SIDE, SIDE, 1));
    let mut trainer = Trainer::new(net, TrainerConfig::from_json(TRAINER)?)?;
    let mut rng = seeded(7);

    let mut window_loss = 0.;
    for i in 1..=TRAIN_STEPS {
        let (frame, label) = observation(&mut rng);
        let report = trainer.step(Tensor::from_observation(shape, &frame)?, &Target::Class(label))?;
        window_loss += report.cost_loss;
        if i % REPORT_EVERY == 0 {
            log::info!("step {}: mean loss {:.4}", i, window_loss / REPORT_EVERY as f64);
            window_loss = 0.;
        }
    }

    let mut net = trainer.into_inner();
    let acc = accuracy(&mut net, &mut seeded(8))?;
    println!("test accuracy: {:.3}", acc);
    Ok(())
}
