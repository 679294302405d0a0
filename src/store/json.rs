//! JSON record helpers shared by the stores.

use crate::error::{Error, Result};
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Read and parse a JSON record.
///
/// Returns `Ok(None)` when the file does not exist or is blank.
pub(crate) fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        debug!("No record at {}", path.display());
        return Ok(None);
    }

    let contents = fs::read_to_string(path).map_err(|e| Error::StoreRead {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    if contents.trim().is_empty() {
        debug!("Record at {} is empty", path.display());
        return Ok(None);
    }

    serde_json::from_str(&contents)
        .map(Some)
        .map_err(|e| Error::StoreRead {
            path: path.to_path_buf(),
            source: Box::new(e),
        })
}

/// Serialize `value` and replace the record at `path`.
///
/// The JSON goes to a sibling `.bak` file first and is then renamed over
/// the record, so a crash mid-write never leaves a truncated record.
pub(crate) fn write_record<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating store directory: {}", parent.display());
            fs::create_dir_all(parent).map_err(|e| Error::StoreWrite {
                path: parent.to_path_buf(),
                source: Box::new(e),
            })?;
        }
    }

    let json = serde_json::to_string_pretty(value).map_err(|e| Error::StoreWrite {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let backup = backup_path(path);
    fs::write(&backup, json).map_err(|e| Error::StoreWrite {
        path: backup.clone(),
        source: Box::new(e),
    })?;

    fs::rename(&backup, path).map_err(|e| Error::StoreWrite {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    debug!("Wrote record {}", path.display());
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".bak");
    path.with_file_name(name)
}
