use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};

use super::{ConstParamGen, ParamGen, RandParamGen, Result};

/// The specification for the `ParamGen` trait.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitSpec {
    Const { value: f32 },
    Uniform { low: f32, high: f32 },
    UniformInclusive { low: f32, high: f32 },
    Normal { mean: f32, std_dev: f32 },
}

impl Default for InitSpec {
    fn default() -> Self {
        Self::Const { value: 0. }
    }
}

impl InitSpec {
    /// Builds the parameter generator described by this spec.
    ///
    /// # Arguments
    /// * `seed` - An optional seed for the rng, random generators are seeded from the os otherwise.
    /// * `scale` - The factor applied to every random sample, ignored by `Const`.
    ///
    /// # Returns
    /// A boxed generator or an `InitErr` if the distribution's parameters are invalid.
    pub fn build(&self, seed: Option<u64>, scale: f32) -> Result<Box<dyn ParamGen + Send>> {
        let param_gen: Box<dyn ParamGen + Send> = match *self {
            InitSpec::Const { value } => Box::new(ConstParamGen::new(value)),
            InitSpec::Uniform { low, high } => {
                let rng = generate_rng(seed);
                Box::new(RandParamGen::uniform(rng, low, high, scale)?)
            }
            InitSpec::UniformInclusive { low, high } => {
                let rng = generate_rng(seed);
                Box::new(RandParamGen::uniform_inclusive(rng, low, high, scale)?)
            }
            InitSpec::Normal { mean, std_dev } => {
                let rng = generate_rng(seed);
                Box::new(RandParamGen::normal(rng, mean, std_dev, scale)?)
            }
        };

        Ok(param_gen)
    }
}

/// Generates a random number generator given (or not) a seed.
fn generate_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}
