mod dense;
mod sparse;
mod weight;

pub use dense::DenseValue;
pub use sparse::{GradInfo, SparseValue};

use crate::{Result, codec::Codec, initialization::ParamGen, policy::Policy};

/// The per unit optimizer state owned by a `KernelBlock`.
pub trait Value: Codec + Sized {
    /// The read only optimizer policy the value is updated with.
    type Policy: Policy;

    /// The gradient accepted by `apply`.
    type Grad<'a>;

    /// Creates a new value of dimension `dim` with freshly generated weights.
    ///
    /// # Arguments
    /// * `policy` - The optimizer policy.
    /// * `dim` - The amount of weights, fixed for the lifetime of the value.
    /// * `param_gen` - The initializer for the weights.
    fn new(policy: &Self::Policy, dim: usize, param_gen: &mut dyn ParamGen) -> Self;

    fn dim(&self) -> usize;

    fn weight(&self) -> &[f32];

    /// Applies one optimization step.
    ///
    /// # Returns
    /// A `KernelErr::SizeMismatch` if the gradient doesn't match the value's dimension,
    /// in which case nothing is modified.
    fn apply(&mut self, policy: &Self::Policy, grad: Self::Grad<'_>) -> Result<()>;

    /// Restores the weights from raw little-endian floats, leaving the optimizer state untouched.
    ///
    /// # Returns
    /// A `KernelErr::SizeMismatch` unless `bytes` holds exactly `dim` floats.
    fn set_weight(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Values that track how often and how recently they were updated.
pub trait Tracked: Value {
    /// The accumulated observation weight.
    fn show(&self) -> f32;

    /// The amount of updates applied so far.
    fn version(&self) -> u32;

    /// Ages the observation statistics, never increasing them.
    fn show_decay(&mut self, policy: &Self::Policy);
}
