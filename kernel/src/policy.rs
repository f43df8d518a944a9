use serde::{Deserialize, Serialize};

use crate::{
    KernelErr, Result,
    initialization::{InitSpec, ParamGen},
};

/// The read only configuration shared by every value of a block.
///
/// Policies are handed around as `Arc<P>`, the kernel never mutates them.
pub trait Policy {
    /// Builds the generator that initializes the weights of new values.
    ///
    /// # Arguments
    /// * `stream` - Distinguishes the generators of different blocks built from the
    ///   same seeded policy.
    fn param_gen(&self, stream: u64) -> Result<Box<dyn ParamGen + Send>>;
}

/// Hyperparameters of the AdaGrad family optimizer.
///
/// The constants are taken as given, checkpoints written under one set of
/// constants only reproduce bit for bit under the same set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaGrad {
    pub learning_rate: f32,
    pub epsilon: f32,
    pub mom_decay_rate: f32,
    pub show_decay_rate: f32,
    pub g2sum_decay_rate: f32,
    pub initial_scale: f32,
    pub init: InitSpec,
    pub seed: Option<u64>,
}

impl Default for AdaGrad {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            epsilon: 1e-8,
            mom_decay_rate: 0.9,
            show_decay_rate: 0.98,
            g2sum_decay_rate: 1.,
            initial_scale: 1.,
            init: InitSpec::default(),
            seed: None,
        }
    }
}

impl AdaGrad {
    /// Parses and validates a policy from its json representation.
    ///
    /// Missing fields take their default value.
    pub fn from_json(json: &str) -> Result<Self> {
        let policy: Self =
            serde_json::from_str(json).map_err(|e| KernelErr::InvalidPolicy(e.to_string()))?;

        policy.validate()?;
        Ok(policy)
    }

    /// Checks that every constant is usable by the update rules.
    ///
    /// # Returns
    /// A `KernelErr::InvalidPolicy` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("learning_rate", self.learning_rate),
            ("epsilon", self.epsilon),
        ];

        for (name, x) in positive {
            if !x.is_finite() || x <= 0. {
                return Err(KernelErr::InvalidPolicy(format!(
                    "{name} must be finite and positive, got {x}"
                )));
            }
        }

        let rates = [
            ("mom_decay_rate", self.mom_decay_rate),
            ("show_decay_rate", self.show_decay_rate),
            ("g2sum_decay_rate", self.g2sum_decay_rate),
        ];

        for (name, x) in rates {
            if !(0. ..=1.).contains(&x) {
                return Err(KernelErr::InvalidPolicy(format!(
                    "{name} must be in [0, 1], got {x}"
                )));
            }
        }

        if !self.initial_scale.is_finite() {
            return Err(KernelErr::InvalidPolicy(format!(
                "initial_scale must be finite, got {}",
                self.initial_scale
            )));
        }

        Ok(())
    }
}

impl Policy for AdaGrad {
    fn param_gen(&self, stream: u64) -> Result<Box<dyn ParamGen + Send>> {
        let seed = self
            .seed
            .map(|seed| seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15));

        self.init
            .build(seed, self.initial_scale)
            .map_err(|e| KernelErr::InvalidPolicy(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        AdaGrad::default().validate().unwrap();
    }

    #[test]
    fn partial_json_takes_defaults() {
        let policy = AdaGrad::from_json(r#"{"learning_rate":0.5,"seed":3}"#).unwrap();

        assert_eq!(policy.learning_rate, 0.5);
        assert_eq!(policy.seed, Some(3));
        assert_eq!(policy.epsilon, AdaGrad::default().epsilon);
    }

    #[test]
    fn full_json() {
        let json = r#"{
            "learning_rate": 0.05,
            "epsilon": 0.001,
            "mom_decay_rate": 0.5,
            "show_decay_rate": 0.9,
            "g2sum_decay_rate": 0.99,
            "initial_scale": 0.01,
            "init": { "uniform": { "low": -1.0, "high": 1.0 } },
            "seed": 11
        }"#;

        let policy = AdaGrad::from_json(json).unwrap();
        assert_eq!(policy.init, InitSpec::Uniform { low: -1., high: 1. });
        assert_eq!(policy.g2sum_decay_rate, 0.99);
    }

    #[test]
    fn rejects_bad_constants() {
        assert!(AdaGrad::from_json(r#"{"learning_rate":0.0}"#).is_err());
        assert!(AdaGrad::from_json(r#"{"epsilon":-1.0}"#).is_err());
        assert!(AdaGrad::from_json(r#"{"show_decay_rate":1.5}"#).is_err());
        assert!(AdaGrad::from_json(r#"{"mom_decay_rate":-0.1}"#).is_err());
        assert!(AdaGrad::from_json("not json").is_err());
    }

    #[test]
    fn streams_differ_for_seeded_random_init() {
        let policy = AdaGrad {
            init: InitSpec::Normal {
                mean: 0.,
                std_dev: 1.,
            },
            seed: Some(1),
            ..AdaGrad::default()
        };

        let mut a = [0.; 4];
        let mut b = [0.; 4];
        let mut c = [0.; 4];
        policy.param_gen(0).unwrap().fill(&mut a);
        policy.param_gen(1).unwrap().fill(&mut b);
        policy.param_gen(0).unwrap().fill(&mut c);

        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
