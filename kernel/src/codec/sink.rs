use bytes::{BufMut, Bytes, BytesMut};

/// An append only byte buffer for encoding values.
#[derive(Debug, Default)]
pub struct ByteSink {
    buf: BytesMut,
}

impl ByteSink {
    /// Creates a new empty `ByteSink`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `ByteSink` able to hold `capacity` bytes without reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    pub fn put_f32(&mut self, x: f32) {
        self.buf.put_f32_le(x);
    }

    pub fn put_f32_slice(&mut self, xs: &[f32]) {
        self.buf.reserve(xs.len() * size_of::<f32>());
        xs.iter().for_each(|&x| self.buf.put_f32_le(x));
    }

    pub fn put_u32(&mut self, x: u32) {
        self.buf.put_u32_le(x);
    }

    pub fn put_i32(&mut self, x: i32) {
        self.buf.put_i32_le(x);
    }

    pub fn put_u64(&mut self, x: u64) {
        self.buf.put_u64_le(x);
    }

    /// The amount of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Freezes the written bytes.
    pub fn freeze(self) -> Bytes {
        self.buf.freeze()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf.to_vec()
    }
}
