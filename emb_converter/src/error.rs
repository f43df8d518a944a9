use std::{
    error::Error,
    fmt::{self, Display},
    io,
    path::PathBuf,
};

use kernel::KernelErr;

use crate::ParseMode;

/// The converter's result type.
pub type Result<T> = std::result::Result<T, ConvertErr>;

/// Every way a conversion run can fail, all of them abort the run.
#[derive(Debug)]
pub enum ConvertErr {
    Usage(String),
    UnknownMode(String),
    Unsupported(ParseMode),
    InvalidRank {
        var: &'static str,
        value: String,
    },
    Io {
        path: PathBuf,
        source: io::Error,
    },
    Malformed {
        path: PathBuf,
        offset: usize,
        source: KernelErr,
    },
    TableHandle(PathBuf),
}

impl ConvertErr {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl Display for ConvertErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConvertErr::Usage(program) => write!(
                f,
                "wrong command, usage: {program} <input_path> <output_dir> <AdaGrad|Adam>"
            ),
            ConvertErr::UnknownMode(mode) => {
                write!(f, "unknown parse mode {mode:?}, expected AdaGrad or Adam")
            }
            ConvertErr::Unsupported(mode) => write!(f, "parse mode {mode} is not supported yet"),
            ConvertErr::InvalidRank { var, value } => {
                write!(f, "invalid rank {value:?} in environment variable {var}")
            }
            ConvertErr::Io { path, source } => write!(f, "io error at {}: {source}", path.display()),
            ConvertErr::Malformed {
                path,
                offset,
                source,
            } => write!(
                f,
                "malformed dump {} at byte {offset}: {source}",
                path.display()
            ),
            ConvertErr::TableHandle(path) => write!(
                f,
                "can't derive the table handle from {}, expected <table>/<rank>/<file>",
                path.display()
            ),
        }
    }
}

impl Error for ConvertErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConvertErr::Io { source, .. } => Some(source),
            ConvertErr::Malformed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Boundary conversion for the binary.
impl From<ConvertErr> for io::Error {
    fn from(value: ConvertErr) -> Self {
        match value {
            ConvertErr::Io { source, .. } => source,
            ConvertErr::Usage(_) | ConvertErr::UnknownMode(_) | ConvertErr::InvalidRank { .. } => {
                io::Error::new(io::ErrorKind::InvalidInput, value)
            }
            ConvertErr::Unsupported(_) => io::Error::new(io::ErrorKind::Unsupported, value),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
