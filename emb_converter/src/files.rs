use std::{
    collections::VecDeque,
    fs,
    path::{Path, PathBuf},
};

use log::warn;

use crate::{ConvertErr, Result};

/// Lists every file under `root`, recursively, in lexicographic order.
///
/// # Returns
/// An `Io` error naming the offending path if `root` or any directory below it can't be read.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>> {
    let meta = fs::metadata(root).map_err(|e| ConvertErr::io(root, e))?;

    if !meta.is_dir() {
        return Ok(vec![root.to_path_buf()]);
    }

    let mut files = Vec::new();
    let mut pending = VecDeque::from([root.to_path_buf()]);

    while let Some(dir) = pending.pop_front() {
        let entries = fs::read_dir(&dir).map_err(|e| ConvertErr::io(&dir, e))?;

        for entry in entries {
            let entry = entry.map_err(|e| ConvertErr::io(&dir, e))?;
            let path = entry.path();
            let file_type = entry.file_type().map_err(|e| ConvertErr::io(&path, e))?;

            if file_type.is_dir() {
                pending.push_back(path);
            } else if file_type.is_symlink() && path.is_dir() {
                // Linked directories may point back up the tree.
                warn!("skipping symlinked directory {}", path.display());
            } else {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// The marker a path must contain to belong to `rank`.
pub fn rank_flag(rank: usize) -> String {
    format!("/rank_{rank}/")
}

pub fn belongs_to_rank(path: &Path, rank: usize) -> bool {
    path.to_string_lossy().contains(&rank_flag(rank))
}

/// Derives the table handle of a dump file from its path.
///
/// Dumps are laid out as `.../<table>/rank_<n>/<file>`, the handle is the third
/// component from the end.
pub fn table_handle(path: &Path) -> Result<String> {
    let path_str = path.to_string_lossy();
    let parts: Vec<_> = path_str.split('/').collect();

    match parts.len().checked_sub(3).map(|i| parts[i]) {
        Some(handle) => Ok(handle.to_string()),
        None => Err(ConvertErr::TableHandle(path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_third_from_the_end() {
        let path = Path::new("/data/model/tbl/rank_0/block_0");
        assert_eq!(table_handle(path).unwrap(), "tbl");

        let path = Path::new("tbl/rank_3/x");
        assert_eq!(table_handle(path).unwrap(), "tbl");
    }

    #[test]
    fn short_paths_have_no_handle() {
        assert!(table_handle(Path::new("rank_0/block_0")).is_err());
        assert!(table_handle(Path::new("block_0")).is_err());
    }

    #[test]
    fn rank_filter() {
        let path = Path::new("/dump/tbl/rank_1/block_0");

        assert!(belongs_to_rank(path, 1));
        assert!(!belongs_to_rank(path, 0));
        assert!(!belongs_to_rank(Path::new("/dump/tbl/rank_11/block_0"), 1));
    }

    #[test]
    fn collects_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("b").join("rank_0");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("2"), b"").unwrap();
        fs::write(nested.join("1"), b"").unwrap();
        fs::write(dir.path().join("a"), b"").unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(
            files,
            [dir.path().join("a"), nested.join("1"), nested.join("2")]
        );
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directories_are_not_followed() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("tbl").join("rank_0");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("block_0"), b"").unwrap();
        symlink(dir.path(), nested.join("loop")).unwrap();
        symlink(nested.join("block_0"), dir.path().join("linked_file")).unwrap();

        let files = collect_files(dir.path()).unwrap();
        assert_eq!(
            files,
            [dir.path().join("linked_file"), nested.join("block_0")]
        );
    }

    #[test]
    fn missing_root_names_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        match collect_files(&missing) {
            Err(ConvertErr::Io { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected an io error, got {other:?}"),
        }
    }
}
