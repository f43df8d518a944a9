/// The amount of floats that fit inline in a `Weight`.
pub(super) const INLINE_CAPACITY: usize = 2;

/// The dimension from which weights move to the heap.
///
/// Even though an inline weight could hold `INLINE_CAPACITY` floats, dimension 2
/// already goes to the heap. Existing checkpoints depend on this boundary.
pub(super) const HEAP_DIM: usize = 2;

/// The backing storage of a sparse value's weights.
///
/// The variant is chosen once at construction and never changes.
#[derive(Debug, Clone, PartialEq)]
pub(super) enum Weight {
    Inline([f32; INLINE_CAPACITY]),
    Heap(Box<[f32]>),
}

impl Weight {
    pub fn new(dim: usize) -> Self {
        if dim < HEAP_DIM {
            Self::Inline([0.; INLINE_CAPACITY])
        } else {
            Self::Heap(vec![0.; dim].into_boxed_slice())
        }
    }

    pub fn as_slice(&self, dim: usize) -> &[f32] {
        match self {
            Self::Inline(w) => &w[..dim],
            Self::Heap(w) => w,
        }
    }

    pub fn as_mut_slice(&mut self, dim: usize) -> &mut [f32] {
        match self {
            Self::Inline(w) => &mut w[..dim],
            Self::Heap(w) => w,
        }
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Self::Inline(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary() {
        assert!(Weight::new(0).is_inline());
        assert!(Weight::new(1).is_inline());
        assert!(!Weight::new(2).is_inline());
        assert!(!Weight::new(3).is_inline());
    }

    #[test]
    fn views_have_dim_length() {
        for dim in 0..5 {
            let mut w = Weight::new(dim);
            assert_eq!(w.as_slice(dim).len(), dim);
            assert_eq!(w.as_mut_slice(dim).len(), dim);
        }
    }
}
