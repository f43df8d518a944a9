use std::{fmt::Write, path::Path};

use kernel::{KernelErr, codec::ByteSource};
use log::info;

use crate::{ConvertErr, Result, files::table_handle};

/// Bytes between the weights and the show of a record, the optimizer's `g2sum` and `version`.
const RESERVED_LEN: usize = size_of::<f32>() + size_of::<u32>();

/// Converts a sparse AdaGrad dump into tab separated lines appended to `out`.
///
/// The dump is `[i32 dim]` followed by `[u64 key][dim x f32 weight][8 reserved bytes][f32 show]`
/// records until the buffer is exhausted, each record becomes the line
/// `key \t table \t weight.. \t show`.
///
/// # Arguments
/// * `path` - Where `bytes` was read from, the table handle is derived from it.
/// * `bytes` - The whole dump file.
/// * `out` - Receives the converted lines.
///
/// # Returns
/// The amount of converted records, or a `Malformed` error if any record is incomplete,
/// in which case nothing is appended to `out`.
pub fn parse_adagrad(path: &Path, bytes: &[u8], out: &mut String) -> Result<usize> {
    if bytes.is_empty() {
        info!("file [{}] processed", path.display());
        return Ok(0);
    }

    let mut source = ByteSource::new(bytes);
    let malformed = |offset, source| ConvertErr::Malformed {
        path: path.to_path_buf(),
        offset,
        source,
    };

    let dim = source
        .get_i32("dim")
        .map_err(|e| malformed(source.position(), e))?;

    if dim < 0 {
        return Err(malformed(0, KernelErr::InvalidDim(i64::from(dim))));
    }

    if source.is_empty() {
        info!("file [{}] processed", path.display());
        return Ok(0);
    }

    // The header alone must not size the weight buffer, at least one record has to back it.
    let dim = dim as usize;
    let needed = record_len(dim);
    let remaining = source.remaining();

    if remaining < needed {
        let err = KernelErr::Truncated {
            what: "record",
            needed,
            remaining,
        };
        return Err(malformed(source.position(), err));
    }

    let handle = table_handle(path)?;
    let mut lines = String::new();
    let mut weight = vec![0.; dim];
    let mut records = 0;

    while !source.is_empty() {
        let offset = source.position();
        let (key, show) =
            read_record(&mut source, &mut weight).map_err(|e| malformed(offset, e))?;

        // Writing into a `String` can't fail.
        let _ = write!(lines, "{key}\t{handle}");
        for w in &weight {
            let _ = write!(lines, "\t{w}");
        }
        let _ = writeln!(lines, "\t{show}");

        records += 1;
    }

    out.push_str(&lines);
    info!("file [{}] processed", path.display());
    Ok(records)
}

/// The encoded size of a `[u64 key][dim x f32][reserved][f32 show]` record.
fn record_len(dim: usize) -> usize {
    size_of::<u64>() + dim * size_of::<f32>() + RESERVED_LEN + size_of::<f32>()
}

fn read_record(source: &mut ByteSource<'_>, weight: &mut [f32]) -> kernel::Result<(u64, f32)> {
    let needed = record_len(weight.len());
    let remaining = source.remaining();

    if remaining < needed {
        return Err(KernelErr::Truncated {
            what: "record",
            needed,
            remaining,
        });
    }

    let key = source.get_u64("key")?;
    source.get_f32_into("weight", weight)?;
    source.skip("reserved", RESERVED_LEN)?;
    let show = source.get_f32("show")?;

    Ok((key, show))
}
