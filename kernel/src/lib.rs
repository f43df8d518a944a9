//! Per key optimizer state and AdaGrad update kernels for an embedding parameter server.

pub mod block;
pub mod codec;
pub mod error;
pub mod initialization;
pub mod policy;
pub mod table;
pub mod value;

pub use block::KernelBlock;
pub use error::{KernelErr, Result};
pub use policy::{AdaGrad, Policy};
pub use table::ShardedTable;
pub use value::{DenseValue, GradInfo, SparseValue, Tracked, Value};

/// A block of dense AdaGrad values keyed by block index.
pub type DenseAdaGradBlock = KernelBlock<AdaGrad, DenseValue>;

/// A block of sparse AdaGrad values keyed by feature id.
pub type SparseAdaGradBlock = KernelBlock<AdaGrad, SparseValue>;
