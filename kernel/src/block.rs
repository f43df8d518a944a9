use std::{
    collections::HashMap,
    fmt::{self, Debug},
    sync::Arc,
};

use log::debug;

use crate::{
    KernelErr, Result,
    codec::{ByteSink, ByteSource, Codec},
    initialization::{ConstParamGen, ParamGen},
    policy::Policy,
    value::{Tracked, Value},
};

/// The values owned by a single parameter server shard.
///
/// Maps keys (dense block indices or hashed feature ids) to values of the same
/// dimension, creating them lazily on first access. There is no locking in here,
/// the owner of the block must make sure no two updates of the same key race.
///
/// The encoded form of a block is
/// `[i32 dim]` followed by `[u64 key][value]` for every key in ascending order,
/// for sparse values this is exactly the dump consumed by the embedding converter.
pub struct KernelBlock<P: Policy, V: Value<Policy = P>> {
    policy: Arc<P>,
    dim: usize,
    values: HashMap<u64, V>,
    param_gen: Box<dyn ParamGen + Send>,
}

impl<P: Policy, V: Value<Policy = P>> Debug for KernelBlock<P, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelBlock")
            .field("dim", &self.dim)
            .field("len", &self.values.len())
            .finish_non_exhaustive()
    }
}

impl<P: Policy, V: Value<Policy = P>> KernelBlock<P, V> {
    /// Creates a new empty `KernelBlock`.
    ///
    /// # Arguments
    /// * `policy` - The shared optimizer policy.
    /// * `dim` - The dimension of every value in the block.
    /// * `stream` - Selects the weight initialization stream of this block, see `Policy::param_gen`.
    ///
    /// # Returns
    /// An error if `dim` doesn't fit the block header or the policy's initializer is invalid.
    pub fn new(policy: Arc<P>, dim: usize, stream: u64) -> Result<Self> {
        let param_gen = policy.param_gen(stream)?;
        Self::with_param_gen(policy, dim, param_gen)
    }

    /// Creates a new empty `KernelBlock` with an explicit weight initializer.
    ///
    /// # Returns
    /// A `KernelErr::InvalidDim` if `dim` doesn't fit the block header.
    pub fn with_param_gen(
        policy: Arc<P>,
        dim: usize,
        param_gen: Box<dyn ParamGen + Send>,
    ) -> Result<Self> {
        if i32::try_from(dim).is_err() {
            return Err(KernelErr::InvalidDim(dim as i64));
        }

        Ok(Self {
            policy,
            dim,
            values: HashMap::new(),
            param_gen,
        })
    }

    pub fn policy(&self) -> &Arc<P> {
        &self.policy
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains(&self, key: u64) -> bool {
        self.values.contains_key(&key)
    }

    pub fn get(&self, key: u64) -> Option<&V> {
        self.values.get(&key)
    }

    pub fn get_mut(&mut self, key: u64) -> Option<&mut V> {
        self.values.get_mut(&key)
    }

    /// Returns the value of `key`, creating it if it's the first time the key is seen.
    pub fn get_or_create(&mut self, key: u64) -> &mut V {
        self.entry(key).1
    }

    /// Removes the value of `key` from the block.
    pub fn remove(&mut self, key: u64) -> Option<V> {
        self.values.remove(&key)
    }

    fn entry(&mut self, key: u64) -> (&P, &mut V) {
        let Self {
            policy,
            dim,
            values,
            param_gen,
        } = self;

        let policy: &P = policy;
        let value = values
            .entry(key)
            .or_insert_with(|| V::new(policy, *dim, &mut **param_gen));

        (policy, value)
    }

    /// Applies a gradient to the value of `key`, creating it if needed.
    ///
    /// # Returns
    /// A `KernelErr::SizeMismatch` if the gradient doesn't match the block's dimension.
    pub fn apply(&mut self, key: u64, grad: V::Grad<'_>) -> Result<()> {
        let (policy, value) = self.entry(key);
        value.apply(policy, grad)
    }

    /// Copies the weights of `key` into `out`, creating the value if needed.
    ///
    /// # Returns
    /// A `KernelErr::SizeMismatch` if `out` isn't `dim` long, no value is created then.
    pub fn pull(&mut self, key: u64, out: &mut [f32]) -> Result<()> {
        if out.len() != self.dim {
            return Err(KernelErr::SizeMismatch {
                what: "pull buffer",
                got: out.len(),
                expected: self.dim,
            });
        }

        out.copy_from_slice(self.get_or_create(key).weight());
        Ok(())
    }

    /// Overwrites only the weights of `key` with raw little-endian floats.
    pub fn set_weight(&mut self, key: u64, bytes: &[u8]) -> Result<()> {
        self.get_or_create(key).set_weight(bytes)
    }

    /// Iterates every `(key, value)` pair in ascending key order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        let mut entries: Vec<_> = self.values.iter().map(|(&key, value)| (key, value)).collect();
        entries.sort_unstable_by_key(|&(key, _)| key);
        entries.into_iter()
    }

    /// The exact amount of bytes `serialize` writes.
    pub fn data_size(&self) -> usize {
        let values: usize = self
            .values
            .values()
            .map(|v| size_of::<u64>() + v.data_size())
            .sum();

        size_of::<i32>() + values
    }

    /// Writes the whole block into `sink`.
    ///
    /// The caller must keep updates out while this runs.
    pub fn serialize(&self, sink: &mut ByteSink) {
        // The dimension was checked to fit an i32 at construction.
        sink.put_i32(self.dim as i32);

        for (key, value) in self.iter() {
            sink.put_u64(key);
            value.serialize(sink);
        }

        debug!(dim = self.dim, values = self.len(); "serialized block");
    }

    /// Serializes the block into a new buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sink = ByteSink::with_capacity(self.data_size());
        self.serialize(&mut sink);
        sink.into_vec()
    }

    /// Restores every value encoded in `source` until it's exhausted.
    ///
    /// Restored values replace the ones with the same key. Nothing is inserted unless
    /// the whole buffer decodes.
    ///
    /// # Returns
    /// The amount of restored values, or an error if the header dimension doesn't match
    /// this block or any record is truncated.
    pub fn deserialize(&mut self, source: &mut ByteSource<'_>) -> Result<usize> {
        let dim = source.get_i32("block dim")?;

        if dim < 0 {
            return Err(KernelErr::InvalidDim(i64::from(dim)));
        }

        if dim as usize != self.dim {
            return Err(KernelErr::SizeMismatch {
                what: "block dim",
                got: dim as usize,
                expected: self.dim,
            });
        }

        // Restored weights are overwritten anyway, don't consume the block's random stream.
        let mut zeros = ConstParamGen::default();
        let mut restored = Vec::new();

        while !source.is_empty() {
            let key = source.get_u64("key")?;
            let mut value = V::new(&self.policy, self.dim, &mut zeros);
            value.deserialize(source)?;
            restored.push((key, value));
        }

        let n = restored.len();
        self.values.extend(restored);

        debug!(dim = self.dim, values = n; "deserialized block");
        Ok(n)
    }

    /// Restores a block previously written by `serialize`.
    pub fn load(&mut self, bytes: &[u8]) -> Result<usize> {
        self.deserialize(&mut ByteSource::new(bytes))
    }

    /// Removes every value matching `predicate`.
    ///
    /// # Returns
    /// The amount of removed values.
    pub fn evict<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(u64, &V) -> bool,
    {
        let before = self.values.len();
        self.values.retain(|&key, value| !predicate(key, value));
        before - self.values.len()
    }
}

impl<P: Policy, V: Tracked<Policy = P>> KernelBlock<P, V> {
    /// Ages the observation statistics of every value.
    pub fn show_decay(&mut self) {
        let policy: &P = &self.policy;
        self.values.values_mut().for_each(|v| v.show_decay(policy));
    }

    /// Removes every value whose show dropped below `threshold`.
    ///
    /// # Returns
    /// The amount of removed values.
    pub fn evict_cold(&mut self, threshold: f32) -> usize {
        self.evict(|_, value| value.show() < threshold)
    }

    /// The version of `key`, without creating it.
    pub fn version(&self, key: u64) -> Option<u32> {
        self.get(key).map(Tracked::version)
    }
}
