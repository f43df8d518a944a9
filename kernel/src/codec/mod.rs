//! Fixed order little-endian encoding of kernel values.
//!
//! Nothing in the encoding is self describing: dimensions and lengths travel
//! out of band, in block headers or block metadata.

mod sink;
mod source;

pub use sink::ByteSink;
pub use source::ByteSource;

use crate::Result;

/// A value with a fixed binary layout.
pub trait Codec {
    /// Appends the value's bytes to `sink`.
    fn serialize(&self, sink: &mut ByteSink);

    /// Overwrites the value's state with the next bytes read from `source`.
    ///
    /// The value must already have been constructed with the dimension the bytes
    /// were written with.
    ///
    /// # Returns
    /// A `KernelErr::Truncated` if `source` runs out before the value is complete.
    fn deserialize(&mut self, source: &mut ByteSource<'_>) -> Result<()>;

    /// The exact amount of bytes `serialize` writes.
    fn data_size(&self) -> usize;
}
