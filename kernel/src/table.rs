use std::{num::NonZeroUsize, sync::Arc};

use log::{debug, info, warn};
use parking_lot::Mutex;
use rayon::prelude::*;

use crate::{
    KernelErr, Result,
    block::KernelBlock,
    policy::Policy,
    value::{Tracked, Value},
};

/// A set of `KernelBlock`s, each owned by a single writer at a time.
///
/// Keys are routed to the block `key % shards`, every block sits behind its own
/// lock so updates of a key are serialized while different blocks proceed in parallel.
#[derive(Debug)]
pub struct ShardedTable<P: Policy, V: Value<Policy = P>> {
    dim: usize,
    shards: Box<[Mutex<KernelBlock<P, V>>]>,
}

impl<P, V> ShardedTable<P, V>
where
    P: Policy + Send + Sync,
    V: Value<Policy = P> + Send,
{
    /// Creates a new `ShardedTable`.
    ///
    /// # Arguments
    /// * `policy` - The optimizer policy shared by every block.
    /// * `dim` - The dimension of every value.
    /// * `shards` - The amount of blocks, block `i` uses initialization stream `i`.
    ///
    /// # Returns
    /// An error if any block can't be built.
    pub fn new(policy: Arc<P>, dim: usize, shards: NonZeroUsize) -> Result<Self> {
        let shards = (0..shards.get())
            .map(|i| KernelBlock::new(Arc::clone(&policy), dim, i as u64).map(Mutex::new))
            .collect::<Result<Box<[_]>>>()?;

        debug!(dim = dim, shards = shards.len(); "created sharded table");
        Ok(Self { dim, shards })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The amount of blocks in the table.
    pub fn shards(&self) -> usize {
        self.shards.len()
    }

    /// The amount of values across every block.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.lock().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.lock().is_empty())
    }

    fn shard(&self, key: u64) -> &Mutex<KernelBlock<P, V>> {
        let idx = key % self.shards.len() as u64;
        &self.shards[idx as usize]
    }

    /// Applies a gradient to the value of `key` while holding its block's lock.
    pub fn apply(&self, key: u64, grad: V::Grad<'_>) -> Result<()> {
        self.shard(key).lock().apply(key, grad)
    }

    /// Copies the weights of `key` into `out`.
    pub fn pull(&self, key: u64, out: &mut [f32]) -> Result<()> {
        self.shard(key).lock().pull(key, out)
    }

    /// Runs `f` on the block owning `key` while holding its lock.
    pub fn with_block<F, T>(&self, key: u64, f: F) -> T
    where
        F: FnOnce(&mut KernelBlock<P, V>) -> T,
    {
        f(&mut *self.shard(key).lock())
    }

    /// Serializes every block in parallel, one buffer per block.
    ///
    /// Each block is locked while it's being written so the snapshot of a block is consistent.
    pub fn checkpoint(&self) -> Vec<Vec<u8>> {
        self.shards
            .par_iter()
            .map(|shard| shard.lock().to_bytes())
            .collect()
    }

    /// Restores the buffers written by `checkpoint`.
    ///
    /// # Returns
    /// The amount of restored values, or an error if the amount of buffers doesn't
    /// match the amount of blocks or any of them fails to decode.
    pub fn restore<B>(&self, checkpoints: &[B]) -> Result<usize>
    where
        B: AsRef<[u8]> + Sync,
    {
        if checkpoints.len() != self.shards.len() {
            return Err(KernelErr::SizeMismatch {
                what: "checkpoint shards",
                got: checkpoints.len(),
                expected: self.shards.len(),
            });
        }

        self.shards
            .par_iter()
            .zip(checkpoints.par_iter())
            .map(|(shard, bytes)| shard.lock().load(bytes.as_ref()))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    }
}

impl<P, V> ShardedTable<P, V>
where
    P: Policy + Send + Sync,
    V: Tracked<Policy = P> + Send,
{
    /// Ages the observation statistics of every value, blocks are processed in parallel.
    pub fn show_decay(&self) {
        self.shards
            .par_iter()
            .for_each(|shard| shard.lock().show_decay());
    }

    /// Evicts every value whose show dropped below `threshold`.
    ///
    /// # Returns
    /// The amount of evicted values.
    pub fn evict_cold(&self, threshold: f32) -> usize {
        let evicted: usize = self
            .shards
            .par_iter()
            .map(|shard| shard.lock().evict_cold(threshold))
            .sum();

        if evicted > 0 {
            warn!(evicted = evicted, threshold = threshold; "evicted cold keys");
        } else {
            info!(threshold = threshold; "no cold keys to evict");
        }

        evicted
    }

    /// The version of `key`, without creating it.
    pub fn version(&self, key: u64) -> Option<u32> {
        self.shard(key).lock().version(key)
    }
}
