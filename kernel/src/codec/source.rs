use bytes::Buf;

use crate::{KernelErr, Result};

/// A bounds checked cursor over an encoded buffer.
///
/// Every read checks the remaining length first, a short buffer is reported as
/// a `KernelErr::Truncated` and the cursor is left where it was.
#[derive(Debug, Clone)]
pub struct ByteSource<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ByteSource<'a> {
    /// Creates a new `ByteSource` positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn ensure(&self, what: &'static str, needed: usize) -> Result<()> {
        let remaining = self.buf.remaining();

        if remaining < needed {
            return Err(KernelErr::Truncated {
                what,
                needed,
                remaining,
            });
        }

        Ok(())
    }

    pub fn get_f32(&mut self, what: &'static str) -> Result<f32> {
        self.ensure(what, size_of::<f32>())?;
        self.pos += size_of::<f32>();
        Ok(self.buf.get_f32_le())
    }

    /// Fills `out` with the next `out.len()` floats.
    pub fn get_f32_into(&mut self, what: &'static str, out: &mut [f32]) -> Result<()> {
        let needed = out.len() * size_of::<f32>();
        self.ensure(what, needed)?;
        self.pos += needed;
        out.iter_mut().for_each(|x| *x = self.buf.get_f32_le());
        Ok(())
    }

    pub fn get_u32(&mut self, what: &'static str) -> Result<u32> {
        self.ensure(what, size_of::<u32>())?;
        self.pos += size_of::<u32>();
        Ok(self.buf.get_u32_le())
    }

    pub fn get_i32(&mut self, what: &'static str) -> Result<i32> {
        self.ensure(what, size_of::<i32>())?;
        self.pos += size_of::<i32>();
        Ok(self.buf.get_i32_le())
    }

    pub fn get_u64(&mut self, what: &'static str) -> Result<u64> {
        self.ensure(what, size_of::<u64>())?;
        self.pos += size_of::<u64>();
        Ok(self.buf.get_u64_le())
    }

    /// Skips `n` bytes whose content is irrelevant to the reader.
    pub fn skip(&mut self, what: &'static str, n: usize) -> Result<()> {
        self.ensure(what, n)?;
        self.pos += n;
        self.buf.advance(n);
        Ok(())
    }

    /// The amount of bytes left to read.
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// The offset of the cursor from the start of the original buffer.
    pub fn position(&self) -> usize {
        self.pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_in_order() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&7u32.to_le_bytes());
        buf.extend_from_slice(&1.5f32.to_le_bytes());
        buf.extend_from_slice(&(-1i32).to_le_bytes());

        let mut source = ByteSource::new(&buf);
        assert_eq!(source.get_u32("a").unwrap(), 7);
        assert_eq!(source.get_f32("b").unwrap(), 1.5);
        assert_eq!(source.get_i32("c").unwrap(), -1);
        assert!(source.is_empty());
        assert_eq!(source.position(), 12);
    }

    #[test]
    fn short_read_is_an_error() {
        let buf = [0u8; 6];
        let mut source = ByteSource::new(&buf);

        let err = source.get_u64("key").unwrap_err();
        assert_eq!(
            err,
            KernelErr::Truncated {
                what: "key",
                needed: 8,
                remaining: 6
            }
        );

        // The failed read doesn't move the cursor.
        assert_eq!(source.remaining(), 6);
        assert_eq!(source.position(), 0);
    }

    #[test]
    fn slice_read_checks_the_whole_length() {
        let buf = [0u8; 8];
        let mut source = ByteSource::new(&buf);

        let mut out = [1.0; 3];
        assert!(source.get_f32_into("weight", &mut out).is_err());
        assert_eq!(out, [1.0; 3]);

        let mut out = [1.0; 2];
        source.get_f32_into("weight", &mut out).unwrap();
        assert_eq!(out, [0.0; 2]);
    }

    #[test]
    fn skip() {
        let buf = [0u8, 1, 2, 3, 4];
        let mut source = ByteSource::new(&buf);

        source.skip("reserved", 4).unwrap();
        assert_eq!(source.remaining(), 1);
        assert!(source.skip("reserved", 2).is_err());
    }
}
