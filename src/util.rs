use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use crate::error::{PipelineError, Result};

pub fn now_utc_string() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn utc_compact_string(ts: DateTime<Utc>) -> String {
    ts.format("%Y%m%d%H%M%S").to_string()
}

pub fn ensure_directory(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| PipelineError::io(path, err))
}

/// Directory a sibling temp file for `path` should live in.
pub fn parent_or_current(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|err| PipelineError::io(path, err))?;

    let mut hasher = Sha256::new();
    let mut buf = [0_u8; 8192];

    loop {
        let count = file
            .read(&mut buf)
            .map_err(|err| PipelineError::io(path, err))?;
        if count == 0 {
            break;
        }
        hasher.update(&buf[..count]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Writes `data` to `path` through a temp file in the same directory.
pub fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let parent = parent_or_current(path);
    ensure_directory(parent)?;

    let mut file = NamedTempFile::new_in(parent).map_err(|err| PipelineError::io(parent, err))?;
    file.write_all(data)
        .map_err(|err| PipelineError::io(file.path(), err))?;
    file.persist(path)
        .map_err(|err| PipelineError::io(path, err.error))?;

    Ok(())
}

pub fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut data = serde_json::to_vec_pretty(value).map_err(|err| {
        PipelineError::io(path, io::Error::new(io::ErrorKind::InvalidData, err))
    })?;
    data.push(b'\n');

    write_atomic(path, &data)
}

/// Removes a file or directory tree. A missing path is not an error.
pub fn remove_path(path: &Path) -> Result<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(PipelineError::io(path, err)),
    };

    let removed = if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };

    match removed {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(PipelineError::io(path, err)),
    }
}

pub fn is_non_empty_dir(path: &Path) -> Result<bool> {
    if !path.is_dir() {
        return Ok(path.exists());
    }

    let mut entries = fs::read_dir(path).map_err(|err| PipelineError::io(path, err))?;
    Ok(entries.next().is_some())
}
