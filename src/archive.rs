//! Archive file persistence.
//!
//! An archive is a pretty-printed JSON array of [`Record`]s. It is always
//! rewritten in full through a temporary file in the same directory and an
//! atomic rename, so an interrupted save leaves the previous file intact.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use crate::models::Record;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("failed to read archive {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("archive {path} is not a JSON array of records: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write archive {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Load a prior archive. A missing file is an empty archive.
pub fn load_archive(path: &Path) -> Result<Vec<Record>, ArchiveError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("No archive at {}, starting empty", path.display());
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ArchiveError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(&contents).map_err(|source| ArchiveError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Replace the archive at `path` with `records`.
pub fn save_archive(path: &Path, records: &[Record]) -> Result<(), ArchiveError> {
    write_json_atomic(path, &records).map_err(|source| ArchiveError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} records to {}", records.len(), path.display());
    Ok(())
}

/// Serialize `value` as 2-space indented JSON and atomically replace `path`.
pub(crate) fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(io::Error::other)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
