use super::{
    Tracked, Value,
    weight::{HEAP_DIM, Weight},
};
use crate::{
    KernelErr, Result,
    codec::{ByteSink, ByteSource, Codec},
    initialization::ParamGen,
    policy::AdaGrad,
};

/// The gradient of a single sparse key for one update step.
#[derive(Debug, Clone, Copy)]
pub struct GradInfo<'a> {
    /// The gradient summed over `show` observations.
    pub grad: &'a [f32],
    /// The observation weight of this step.
    pub show: f32,
}

impl<'a> GradInfo<'a> {
    pub fn new(grad: &'a [f32], show: f32) -> Self {
        Self { grad, show }
    }
}

/// The optimizer state of a single sparse embedding key.
///
/// Keeps one `g2sum` accumulator for the whole embedding instead of one per
/// component, there are billions of these.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseValue {
    weight: Weight,
    g2sum: f32,
    dim: usize,
    version: u32,
    show: f32,
}

impl SparseValue {
    /// Creates a new `SparseValue`.
    ///
    /// # Arguments
    /// * `dim` - The embedding dimension, weights live inline while `dim < 2`.
    /// * `param_gen` - The initializer for the weights.
    pub fn with_dim(dim: usize, param_gen: &mut dyn ParamGen) -> Self {
        let mut weight = Weight::new(dim);
        param_gen.fill(weight.as_mut_slice(dim));

        Self {
            weight,
            g2sum: 0.,
            dim,
            version: 0,
            show: 0.,
        }
    }

    /// Whether the weights are stored inline instead of on the heap.
    pub fn is_mini_dim(&self) -> bool {
        self.dim < HEAP_DIM
    }

    pub fn weight_mut(&mut self) -> &mut [f32] {
        self.weight.as_mut_slice(self.dim)
    }

    pub fn g2sum(&self) -> f32 {
        self.g2sum
    }

    pub fn g2sum_mut(&mut self) -> &mut f32 {
        &mut self.g2sum
    }

    pub fn increase_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    pub fn add_show(&mut self, show: f32) {
        self.show += show;
    }
}

impl Value for SparseValue {
    type Policy = AdaGrad;
    type Grad<'a> = GradInfo<'a>;

    fn new(_policy: &AdaGrad, dim: usize, param_gen: &mut dyn ParamGen) -> Self {
        Self::with_dim(dim, param_gen)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn weight(&self) -> &[f32] {
        self.weight.as_slice(self.dim)
    }

    fn apply(&mut self, policy: &AdaGrad, info: Self::Grad<'_>) -> Result<()> {
        if info.grad.len() != self.dim {
            return Err(KernelErr::SizeMismatch {
                what: "sparse gradient",
                got: info.grad.len(),
                expected: self.dim,
            });
        }

        self.add_show(info.show);

        // The incoming gradient is a sum over `show` observations.
        let norm = info.show.max(1.);

        if self.dim > 0 {
            let add_g2sum: f32 = info.grad.iter().map(|g| (g / norm).powi(2)).sum();
            self.g2sum += add_g2sum / self.dim as f32;
        }

        let scale = policy.learning_rate / (self.g2sum + policy.epsilon).sqrt();

        self.weight
            .as_mut_slice(self.dim)
            .iter_mut()
            .zip(info.grad)
            .for_each(|(w, g)| *w -= scale * (g / norm));

        self.increase_version();
        Ok(())
    }

    fn set_weight(&mut self, bytes: &[u8]) -> Result<()> {
        let expected = self.dim * size_of::<f32>();

        if bytes.len() != expected {
            return Err(KernelErr::SizeMismatch {
                what: "sparse weight bytes",
                got: bytes.len(),
                expected,
            });
        }

        ByteSource::new(bytes).get_f32_into("sparse weight", self.weight_mut())
    }
}

impl Tracked for SparseValue {
    fn show(&self) -> f32 {
        self.show
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn show_decay(&mut self, policy: &AdaGrad) {
        // A negative total would grow when multiplied, those are left as is.
        self.show = self.show.min(self.show * policy.show_decay_rate);
        self.g2sum = self.g2sum.min(self.g2sum * policy.g2sum_decay_rate);
    }
}

impl Codec for SparseValue {
    fn serialize(&self, sink: &mut ByteSink) {
        sink.put_f32_slice(self.weight());
        sink.put_f32(self.g2sum);
        sink.put_u32(self.version);
        sink.put_f32(self.show);
    }

    fn deserialize(&mut self, source: &mut ByteSource<'_>) -> Result<()> {
        let needed = self.data_size();
        let remaining = source.remaining();

        if remaining < needed {
            return Err(KernelErr::Truncated {
                what: "sparse value",
                needed,
                remaining,
            });
        }

        source.get_f32_into("sparse weight", self.weight_mut())?;
        self.g2sum = source.get_f32("sparse g2sum")?;
        self.version = source.get_u32("sparse version")?;
        self.show = source.get_f32("sparse show")?;
        Ok(())
    }

    fn data_size(&self) -> usize {
        self.dim * size_of::<f32>() + size_of::<f32>() + size_of::<u32>() + size_of::<f32>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::initialization::ConstParamGen;

    fn create_value(dim: usize, init: f32) -> SparseValue {
        SparseValue::with_dim(dim, &mut ConstParamGen::new(init))
    }

    fn policy() -> AdaGrad {
        AdaGrad {
            learning_rate: 0.1,
            epsilon: 1e-6,
            show_decay_rate: 0.5,
            g2sum_decay_rate: 0.9,
            ..AdaGrad::default()
        }
    }

    fn is_inside(value: &SparseValue) -> bool {
        let start = value as *const SparseValue as usize;
        let end = start + size_of::<SparseValue>();
        let ptr = value.weight().as_ptr() as usize;
        (start..end).contains(&ptr)
    }

    #[test]
    fn construction() {
        let value = create_value(3, 0.5);

        assert_eq!(value.dim(), 3);
        assert_eq!(value.weight(), [0.5; 3]);
        assert_eq!(value.g2sum(), 0.);
        assert_eq!(value.version(), 0);
        assert_eq!(value.show(), 0.);
    }

    #[test]
    fn mini_dim_boundary() {
        for dim in 0..6 {
            let value = create_value(dim, 1.);
            assert_eq!(value.is_mini_dim(), dim < 2, "dim {dim}");
            assert_eq!(value.weight().len(), dim);
        }
    }

    #[test]
    fn inline_weights_live_inside_the_value() {
        assert!(is_inside(&create_value(1, 1.)));
        assert!(!is_inside(&create_value(2, 1.)));
        assert!(!is_inside(&create_value(5, 1.)));
    }

    #[test]
    fn apply_increases_version_once() {
        let policy = policy();
        let mut value = create_value(2, 0.);

        for n in 1..=5 {
            value.apply(&policy, GradInfo::new(&[0.1, 0.2], 1.)).unwrap();
            assert_eq!(value.version(), n);
        }
    }

    #[test]
    fn first_step() {
        let policy = policy();
        let mut value = create_value(2, 0.);

        value.apply(&policy, GradInfo::new(&[2., 4.], 2.)).unwrap();

        // normalized grad = [1, 2], g2sum = (1 + 4) / 2
        let g2sum = 2.5f32;
        let scale = 0.1 / (g2sum + 1e-6).sqrt();

        assert_eq!(value.show(), 2.);
        assert_eq!(value.g2sum(), g2sum);
        assert_eq!(value.weight(), [-scale, -scale * 2.]);
    }

    #[test]
    fn zero_show_is_not_a_divisor() {
        let policy = policy();
        let mut value = create_value(1, 0.);

        value.apply(&policy, GradInfo::new(&[1.], 0.)).unwrap();

        assert_eq!(value.g2sum(), 1.);
        assert!(value.weight()[0].is_finite());
    }

    #[test]
    fn g2sum_never_decreases_on_apply() {
        let policy = policy();
        let mut value = create_value(3, 0.);

        for grad in [[1., 0., -1.], [0., 0., 0.], [-3., 2., 0.5]] {
            let before = value.g2sum();
            value.apply(&policy, GradInfo::new(&grad, 1.)).unwrap();
            assert!(value.g2sum() >= before);
        }
    }

    #[test]
    fn dim_zero_only_tracks() {
        let policy = policy();
        let mut value = create_value(0, 0.);

        value.apply(&policy, GradInfo::new(&[], 3.)).unwrap();

        assert_eq!(value.show(), 3.);
        assert_eq!(value.g2sum(), 0.);
        assert_eq!(value.version(), 1);
    }

    #[test]
    fn apply_rejects_wrong_dim() {
        let policy = policy();
        let mut value = create_value(2, 0.);
        let before = value.clone();

        assert!(value.apply(&policy, GradInfo::new(&[1.], 1.)).is_err());
        assert_eq!(value, before);
    }

    #[test]
    fn show_decay_shrinks() {
        let policy = policy();
        let mut value = create_value(2, 0.);
        value.apply(&policy, GradInfo::new(&[1., 1.], 4.)).unwrap();

        for _ in 0..10 {
            let (show, g2sum, version) = (value.show(), value.g2sum(), value.version());
            value.show_decay(&policy);

            assert!(value.show() <= show);
            assert!(value.g2sum() <= g2sum);
            assert_eq!(value.version(), version);
        }

        assert!(value.show() < 4.);
    }

    #[test]
    fn show_decay_leaves_negative_show() {
        let policy = policy();
        let mut value = create_value(1, 0.);
        value.add_show(-2.);

        value.show_decay(&policy);
        assert_eq!(value.show(), -2.);
    }

    #[test]
    fn accessors() {
        let mut value = create_value(1, 0.);

        *value.g2sum_mut() = 3.;
        value.add_show(1.5);
        value.add_show(1.);
        value.increase_version();

        assert_eq!(value.g2sum(), 3.);
        assert_eq!(value.show(), 2.5);
        assert_eq!(value.version(), 1);
    }

    #[test]
    fn layout() {
        let mut value = create_value(2, 1.);
        *value.g2sum_mut() = 2.;
        value.increase_version();
        value.add_show(7.5);

        let mut sink = ByteSink::new();
        value.serialize(&mut sink);

        let mut expected = Vec::new();
        expected.extend_from_slice(&1f32.to_le_bytes());
        expected.extend_from_slice(&1f32.to_le_bytes());
        expected.extend_from_slice(&2f32.to_le_bytes());
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.extend_from_slice(&7.5f32.to_le_bytes());

        assert_eq!(sink.as_slice(), expected);
        assert_eq!(value.data_size(), expected.len());
    }

    #[test]
    fn codec_restores_state() {
        let policy = policy();

        for dim in [0, 1, 2, 5] {
            let mut value = create_value(dim, 0.3);
            let grad: Vec<f32> = (0..dim).map(|i| i as f32 - 1.).collect();
            value.apply(&policy, GradInfo::new(&grad, 2.)).unwrap();
            value.apply(&policy, GradInfo::new(&grad, 1.)).unwrap();

            let mut sink = ByteSink::new();
            value.serialize(&mut sink);

            let mut restored = create_value(dim, 0.);
            let mut source = ByteSource::new(sink.as_slice());
            restored.deserialize(&mut source).unwrap();

            assert!(source.is_empty());
            assert_eq!(restored.weight(), value.weight(), "dim {dim}");
            assert_eq!(restored.g2sum(), value.g2sum());
            assert_eq!(restored.version(), value.version());
            assert_eq!(restored.show(), value.show());
            assert_eq!(restored.is_mini_dim(), value.is_mini_dim());
        }
    }

    #[test]
    fn truncated_decode_is_fatal() {
        let value = create_value(3, 1.);
        let mut sink = ByteSink::new();
        value.serialize(&mut sink);
        let bytes = sink.into_vec();

        let mut restored = create_value(3, 9.);
        let err = restored
            .deserialize(&mut ByteSource::new(&bytes[..bytes.len() - 2]))
            .unwrap_err();

        assert!(matches!(err, KernelErr::Truncated { .. }));
        assert_eq!(restored.weight(), [9.; 3]);
    }

    #[test]
    fn set_weight() {
        let mut value = create_value(2, 0.);
        *value.g2sum_mut() = 5.;

        let bytes: Vec<u8> = [0.25f32, -1.].iter().flat_map(|x| x.to_le_bytes()).collect();
        value.set_weight(&bytes).unwrap();
        assert_eq!(value.weight(), [0.25, -1.]);
        assert_eq!(value.g2sum(), 5.);

        assert!(value.set_weight(&bytes[..4]).is_err());
    }
}
