use super::Value;
use crate::{
    KernelErr, Result,
    codec::{ByteSink, ByteSource, Codec},
    initialization::ParamGen,
    policy::AdaGrad,
};

/// The optimizer state of a dense block of `len` weights.
///
/// The four arrays always share the same length, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseValue {
    weight: Box<[f32]>,
    d2sum: Box<[f32]>,
    g2sum: Box<[f32]>,
    momentum: Box<[f32]>,
}

impl DenseValue {
    /// Creates a new `DenseValue`.
    ///
    /// # Arguments
    /// * `len` - The amount of weights in the block.
    /// * `param_gen` - The initializer for the weights.
    ///
    /// # Returns
    /// A new `DenseValue` with zeroed accumulators.
    pub fn with_len(len: usize, param_gen: &mut dyn ParamGen) -> Self {
        let mut weight = vec![0.; len].into_boxed_slice();
        param_gen.fill(&mut weight);

        Self {
            weight,
            d2sum: vec![0.; len].into_boxed_slice(),
            g2sum: vec![0.; len].into_boxed_slice(),
            momentum: vec![0.; len].into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.weight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weight.is_empty()
    }

    pub fn d2sum(&self) -> &[f32] {
        &self.d2sum
    }

    pub fn g2sum(&self) -> &[f32] {
        &self.g2sum
    }

    pub fn momentum(&self) -> &[f32] {
        &self.momentum
    }
}

impl Value for DenseValue {
    type Policy = AdaGrad;
    type Grad<'a> = &'a [f32];

    fn new(_policy: &AdaGrad, dim: usize, param_gen: &mut dyn ParamGen) -> Self {
        Self::with_len(dim, param_gen)
    }

    fn dim(&self) -> usize {
        self.len()
    }

    fn weight(&self) -> &[f32] {
        &self.weight
    }

    fn apply(&mut self, policy: &AdaGrad, grad: Self::Grad<'_>) -> Result<()> {
        if grad.len() != self.len() {
            return Err(KernelErr::SizeMismatch {
                what: "dense gradient",
                got: grad.len(),
                expected: self.len(),
            });
        }

        let AdaGrad {
            learning_rate: lr,
            epsilon: eps,
            mom_decay_rate: mu,
            ..
        } = *policy;

        self.weight
            .iter_mut()
            .zip(grad)
            .zip(self.d2sum.iter_mut())
            .zip(self.g2sum.iter_mut())
            .zip(self.momentum.iter_mut())
            .for_each(|((((w, &g), d2), g2), m)| {
                if g == 0. {
                    return;
                }

                *d2 += 1.;
                *g2 += g * g;
                *m = mu * *m + g;
                *w -= lr * *m / (*g2 + eps).sqrt();
            });

        Ok(())
    }

    fn set_weight(&mut self, bytes: &[u8]) -> Result<()> {
        let expected = self.len() * size_of::<f32>();

        if bytes.len() != expected {
            return Err(KernelErr::SizeMismatch {
                what: "dense weight bytes",
                got: bytes.len(),
                expected,
            });
        }

        ByteSource::new(bytes).get_f32_into("dense weight", &mut self.weight)
    }
}

impl Codec for DenseValue {
    fn serialize(&self, sink: &mut ByteSink) {
        sink.put_f32_slice(&self.weight);
        sink.put_f32_slice(&self.d2sum);
        sink.put_f32_slice(&self.g2sum);
        sink.put_f32_slice(&self.momentum);
    }

    fn deserialize(&mut self, source: &mut ByteSource<'_>) -> Result<()> {
        let needed = self.data_size();
        let remaining = source.remaining();

        // Checked upfront so a short buffer never leaves a half restored value.
        if remaining < needed {
            return Err(KernelErr::Truncated {
                what: "dense value",
                needed,
                remaining,
            });
        }

        source.get_f32_into("dense weight", &mut self.weight)?;
        source.get_f32_into("dense d2sum", &mut self.d2sum)?;
        source.get_f32_into("dense g2sum", &mut self.g2sum)?;
        source.get_f32_into("dense momentum", &mut self.momentum)
    }

    fn data_size(&self) -> usize {
        self.len() * size_of::<f32>() * 4
    }
}
