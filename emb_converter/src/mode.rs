use std::{
    fmt::{self, Display},
    str::FromStr,
};

use crate::ConvertErr;

/// The optimizer family the dump was written by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    AdaGrad,
    Adam,
}

impl FromStr for ParseMode {
    type Err = ConvertErr;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AdaGrad" => Ok(Self::AdaGrad),
            "Adam" => Ok(Self::Adam),
            other => Err(ConvertErr::UnknownMode(other.to_string())),
        }
    }
}

impl Display for ParseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseMode::AdaGrad => f.write_str("AdaGrad"),
            ParseMode::Adam => f.write_str("Adam"),
        }
    }
}
