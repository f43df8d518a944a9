use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

use super::{ParamGen, Result};

/// A parameter generator that follows a certain probabilistic distribution.
///
/// Every sample is multiplied by `scale`, embedding tables are usually initialized
/// with tiny values around zero.
#[derive(Debug, Clone)]
pub struct RandParamGen<R: Rng, D: Distribution<f32>> {
    rng: R,
    distribution: D,
    scale: f32,
}

impl<R: Rng, D: Distribution<f32>> RandParamGen<R, D> {
    /// Creates a new `RandParamGen` parameter generator.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `distribution` - The distribution to sample the random numbers from.
    /// * `scale` - The factor applied to every sample.
    pub fn new(rng: R, distribution: D, scale: f32) -> Self {
        Self {
            rng,
            distribution,
            scale,
        }
    }
}

impl<R: Rng> RandParamGen<R, Uniform<f32>> {
    /// Creates a new `RandParamGen` parameter generator with a uniform distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `low` - The inclusive lower limit.
    /// * `high` - The exclusive upper limit.
    /// * `scale` - The factor applied to every sample.
    ///
    /// # Returns
    /// An error if the range is invalid (low >= high).
    pub fn uniform(rng: R, low: f32, high: f32, scale: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new(low, high)?, scale))
    }

    /// Creates a new `RandParamGen` parameter generator with an inclusive uniform distribution.
    ///
    /// # Returns
    /// An error if the range is invalid (low > high).
    pub fn uniform_inclusive(rng: R, low: f32, high: f32, scale: f32) -> Result<Self> {
        Ok(Self::new(rng, Uniform::new_inclusive(low, high)?, scale))
    }
}

impl<R: Rng> RandParamGen<R, Normal<f32>> {
    /// Creates a new `RandParamGen` parameter generator with a normal distribution.
    ///
    /// # Arguments
    /// * `rng` - A random number generator.
    /// * `mean` - The mean of the distribution.
    /// * `std_dev` - The standard deviation of the distribution.
    /// * `scale` - The factor applied to every sample.
    ///
    /// # Returns
    /// An error if `std_dev` is not finite (Nan or infinite).
    pub fn normal(rng: R, mean: f32, std_dev: f32, scale: f32) -> Result<Self> {
        Ok(Self::new(rng, Normal::new(mean, std_dev)?, scale))
    }
}

impl<R: Rng, D: Distribution<f32>> ParamGen for RandParamGen<R, D> {
    fn fill(&mut self, out: &mut [f32]) {
        let scale = self.scale;

        out.iter_mut()
            .for_each(|w| *w = self.distribution.sample(&mut self.rng) * scale);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn seeded_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut param_gen = RandParamGen::uniform(seeded_rng(), -1., 1., 0.5).unwrap();

        let mut out = [0.; 64];
        param_gen.fill(&mut out);
        assert!(out.iter().all(|w| (-0.5..0.5).contains(w)));
    }

    #[test]
    fn invalid_uniform_range() {
        assert!(RandParamGen::uniform(seeded_rng(), 1., -1., 1.).is_err());
    }

    #[test]
    fn inclusive_uniform_stays_in_range() {
        let mut param_gen = RandParamGen::uniform_inclusive(seeded_rng(), 0., 2., 1.).unwrap();

        let mut out = [0.; 64];
        param_gen.fill(&mut out);
        assert!(out.iter().all(|w| (0. ..=2.).contains(w)));

        assert!(RandParamGen::uniform_inclusive(seeded_rng(), 1., 0., 1.).is_err());
    }

    #[test]
    fn invalid_normal_std_dev() {
        assert!(RandParamGen::normal(seeded_rng(), 0., f32::NAN, 1.).is_err());
    }

    #[test]
    fn same_seed_same_weights() {
        let mut a = RandParamGen::normal(seeded_rng(), 0., 1., 0.01).unwrap();
        let mut b = RandParamGen::normal(seeded_rng(), 0., 1., 0.01).unwrap();

        let mut out_a = [0.; 16];
        let mut out_b = [0.; 16];
        a.fill(&mut out_a);
        b.fill(&mut out_b);

        assert_eq!(out_a, out_b);
    }
}
