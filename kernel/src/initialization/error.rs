use std::{
    error::Error,
    fmt::{self, Display},
};

use rand_distr::{NormalError, uniform::Error as UniformError};

/// The specific result type for the construction of parameter generators.
pub type Result<T> = std::result::Result<T, InitErr>;

/// Error returned by the `RandParamGen` constructors whenever the requested
/// distribution can't be built, each distribution has it's own constraints.
#[derive(Debug)]
pub struct InitErr(String);

impl From<NormalError> for InitErr {
    fn from(value: NormalError) -> Self {
        Self(value.to_string())
    }
}

impl From<UniformError> for InitErr {
    fn from(value: UniformError) -> Self {
        Self(value.to_string())
    }
}

impl Display for InitErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Error for InitErr {}
