//! Discovery of NDJSON files in the data directory.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const NDJSON_EXTENSION: &str = "ndjson";

#[derive(Debug, Error)]
pub enum DataDirError {
    #[error("data directory {0} does not exist; create it or set DATA_DIR")]
    Missing(PathBuf),

    #[error("failed to read data directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no .ndjson files found in {0}")]
    Empty(PathBuf),
}

/// List the `*.ndjson` files directly inside `dir`, sorted by path.
pub fn discover_ndjson_files(dir: &Path) -> Result<Vec<PathBuf>, DataDirError> {
    if !dir.is_dir() {
        return Err(DataDirError::Missing(dir.to_path_buf()));
    }
    let io_err = |source| DataDirError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == NDJSON_EXTENSION) {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(DataDirError::Empty(dir.to_path_buf()));
    }
    files.sort();
    tracing::info!(dir = %dir.display(), files = files.len(), "Discovered NDJSON files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_lists_only_top_level_ndjson_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["Patient.ndjson", "Encounter.1.ndjson", "notes.txt"] {
            fs::write(dir.path().join(name), "{}\n").unwrap();
        }
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/Observation.ndjson"), "{}\n").unwrap();

        let files = discover_ndjson_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["Encounter.1.ndjson", "Patient.ndjson"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            discover_ndjson_files(&missing),
            Err(DataDirError::Missing(_))
        ));
    }

    #[test]
    fn test_directory_without_ndjson() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "hi").unwrap();
        assert!(matches!(
            discover_ndjson_files(dir.path()),
            Err(DataDirError::Empty(_))
        ));
    }
}
