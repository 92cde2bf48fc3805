//! Value generators
//!
//! A sensor samples each of its channels by calling its generator once.
//! Any `FnMut() -> f64` closure is a generator, which is how tests inject
//! deterministic values; [`Fallible`] wraps closures that can fail.

use std::f64::consts::PI;
use std::time::Instant;

use contracts::GeneratorConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GeneratorError;

/// Pluggable value source
pub trait ValueGenerator: Send {
    /// Produce the next value
    fn generate(&mut self) -> Result<f64, GeneratorError>;
}

impl<F> ValueGenerator for F
where
    F: FnMut() -> f64 + Send,
{
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        Ok(self())
    }
}

/// Adapter for closures that report failures
pub struct Fallible<F>(pub F);

impl<F> ValueGenerator for Fallible<F>
where
    F: FnMut() -> Result<f64, GeneratorError> + Send,
{
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        (self.0)()
    }
}

/// Always NaN; default for sensors without a real source
#[derive(Debug, Clone, Copy, Default)]
pub struct NanGenerator;

impl ValueGenerator for NanGenerator {
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        Ok(f64::NAN)
    }
}

/// Fixed value
#[derive(Debug, Clone, Copy)]
pub struct ConstantGenerator(pub f64);

impl ValueGenerator for ConstantGenerator {
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        Ok(self.0)
    }
}

/// Normally distributed values (Box-Muller)
#[derive(Debug, Clone)]
pub struct GaussianGenerator {
    mean: f64,
    std_dev: f64,
    rng: StdRng,
}

impl GaussianGenerator {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self {
            mean,
            std_dev,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Reproducible stream for tests
    pub fn seeded(mean: f64, std_dev: f64, seed: u64) -> Self {
        Self {
            mean,
            std_dev,
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ValueGenerator for GaussianGenerator {
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        // u1 in (0, 1] keeps ln finite
        let u1 = 1.0 - self.rng.random::<f64>();
        let u2 = self.rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos();
        Ok(self.mean + self.std_dev * z)
    }
}

/// Sine wave over elapsed wall-clock time
#[derive(Debug, Clone)]
pub struct SineGenerator {
    amplitude: f64,
    frequency_hz: f64,
    offset: f64,
    start: Instant,
}

impl SineGenerator {
    pub fn new(amplitude: f64, frequency_hz: f64, offset: f64) -> Self {
        Self {
            amplitude,
            frequency_hz,
            offset,
            start: Instant::now(),
        }
    }
}

impl ValueGenerator for SineGenerator {
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        let t = self.start.elapsed().as_secs_f64();
        Ok(self.offset + self.amplitude * (2.0 * PI * self.frequency_hz * t).sin())
    }
}

/// Cycles through a fixed list
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    values: Vec<f64>,
    next: usize,
}

impl SequenceGenerator {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, next: 0 }
    }
}

impl ValueGenerator for SequenceGenerator {
    fn generate(&mut self) -> Result<f64, GeneratorError> {
        if self.values.is_empty() {
            return Err(GeneratorError::new("empty sequence"));
        }
        let value = self.values[self.next % self.values.len()];
        self.next = (self.next + 1) % self.values.len();
        Ok(value)
    }
}

/// NaN value, the default generator output
pub fn nan_value_generator() -> f64 {
    f64::NAN
}

/// Standard normal sample from the thread-local RNG
pub fn random_value_generator() -> f64 {
    let mut rng = rand::rng();
    let u1 = 1.0 - rng.random::<f64>();
    let u2 = rng.random::<f64>();
    (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
}

/// Build a generator from its configuration
pub fn from_config(config: &GeneratorConfig) -> Box<dyn ValueGenerator> {
    match config {
        GeneratorConfig::Nan => Box::new(NanGenerator),
        GeneratorConfig::Constant { value } => Box::new(ConstantGenerator(*value)),
        GeneratorConfig::Gaussian { mean, std_dev } => {
            Box::new(GaussianGenerator::new(*mean, *std_dev))
        }
        GeneratorConfig::Sine {
            amplitude,
            frequency_hz,
            offset,
        } => Box::new(SineGenerator::new(*amplitude, *frequency_hz, *offset)),
        GeneratorConfig::Sequence { values } => Box::new(SequenceGenerator::new(values.clone())),
    }
}
