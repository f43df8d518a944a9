use std::{
    error::Error,
    fmt::{self, Display},
};

/// The result type used across the kernel crate.
pub type Result<T> = std::result::Result<T, KernelErr>;

/// The kernel's error type.
///
/// Every variant describes a consistency failure: a value that can't be restored
/// exactly is never truncated or zero filled, the caller gets one of these instead.
#[derive(Debug, Clone, PartialEq)]
pub enum KernelErr {
    SizeMismatch {
        what: &'static str,
        got: usize,
        expected: usize,
    },
    Truncated {
        what: &'static str,
        needed: usize,
        remaining: usize,
    },
    InvalidDim(i64),
    InvalidPolicy(String),
}

impl Display for KernelErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelErr::SizeMismatch { what, got, expected } => {
                write!(f, "size mismatch for {what}: got {got}, expected {expected}")
            }
            KernelErr::Truncated {
                what,
                needed,
                remaining,
            } => write!(
                f,
                "truncated buffer while reading {what}: needed {needed} bytes, {remaining} remaining"
            ),
            KernelErr::InvalidDim(dim) => write!(f, "invalid dimension {dim}"),
            KernelErr::InvalidPolicy(reason) => write!(f, "invalid optimizer policy: {reason}"),
        }
    }
}

impl Error for KernelErr {}
