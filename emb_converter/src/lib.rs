//! Converts binary sparse embedding dumps written by the kernel into tab separated text.

pub mod error;
pub mod files;
pub mod mode;
pub mod parse;

use std::{
    env,
    ffi::OsString,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, info};

pub use error::{ConvertErr, Result};
pub use files::{belongs_to_rank, collect_files, table_handle};
pub use mode::ParseMode;
pub use parse::parse_adagrad;

/// The environment variables the rank of the process is read from, in priority order.
pub const RANK_VARS: [&str; 3] = ["RANK", "OMPI_COMM_WORLD_RANK", "PMI_RANK"];

/// The command line of a conversion run.
#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    pub mode: ParseMode,
}

impl Args {
    /// Parses `<program> <input_path> <output_dir> <mode>`.
    ///
    /// Paths are taken as given, they don't need to be valid utf-8.
    ///
    /// # Returns
    /// A `Usage` error if the amount of arguments is wrong, or `UnknownMode` if the
    /// mode isn't one of `AdaGrad` or `Adam`.
    pub fn parse<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        let mut args = args.into_iter().map(Into::<OsString>::into);
        let program = args
            .next()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| "emb_converter".to_string());
        let rest: Vec<OsString> = args.collect();

        let [input, output_dir, mode] = <[OsString; 3]>::try_from(rest)
            .map_err(|_| ConvertErr::Usage(program))?;

        let mode = mode
            .into_string()
            .map_err(|mode| ConvertErr::UnknownMode(mode.to_string_lossy().into_owned()))?;

        Ok(Self {
            input: input.into(),
            output_dir: output_dir.into(),
            mode: mode.parse()?,
        })
    }
}

/// Summary of a conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConvertStats {
    pub files: usize,
    pub records: usize,
}

/// Reads the rank of this process from the launcher's environment, `0` if none is set.
pub fn rank_from_env() -> Result<usize> {
    rank_from(|var| env::var(var).ok())
}

fn rank_from<F>(lookup: F) -> Result<usize>
where
    F: Fn(&str) -> Option<String>,
{
    for var in RANK_VARS {
        if let Some(value) = lookup(var) {
            return value
                .trim()
                .parse()
                .map_err(|_| ConvertErr::InvalidRank { var, value });
        }
    }

    Ok(0)
}

/// Converts the dumps in `files` that belong to `rank` into `out_file`.
///
/// Files are converted in the given order, the output is only written once every
/// file was parsed so a failed run leaves no partial output behind.
///
/// # Returns
/// The amount of converted files and records.
pub fn convert(files: &[PathBuf], out_file: &Path, mode: ParseMode, rank: usize) -> Result<ConvertStats> {
    if mode != ParseMode::AdaGrad {
        return Err(ConvertErr::Unsupported(mode));
    }

    let mut out = String::new();
    let mut stats = ConvertStats::default();

    for path in files {
        if !belongs_to_rank(path, rank) {
            debug!("skipping {}, it belongs to another rank", path.display());
            continue;
        }

        let bytes = fs::read(path).map_err(|e| ConvertErr::io(path, e))?;
        debug!(bytes = bytes.len(); "read dump file {}", path.display());

        stats.records += parse_adagrad(path, &bytes, &mut out)?;
        stats.files += 1;
    }

    fs::write(out_file, out).map_err(|e| ConvertErr::io(out_file, e))?;

    info!(
        rank = rank,
        files = stats.files,
        records = stats.records;
        "wrote {}", out_file.display()
    );

    Ok(stats)
}

/// Runs a whole conversion, the output lands in `<output_dir>/part-<rank>`.
pub fn run(args: &Args, rank: usize) -> Result<ConvertStats> {
    let files = collect_files(&args.input)?;
    info!(rank = rank, files = files.len(); "collected dump files");

    fs::create_dir_all(&args.output_dir).map_err(|e| ConvertErr::io(&args.output_dir, e))?;
    let out_file = args.output_dir.join(format!("part-{rank}"));

    convert(&files, &out_file, args.mode, rank)
}
