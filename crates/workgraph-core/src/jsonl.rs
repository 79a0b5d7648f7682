//! JSONL file primitives.
//!
//! One JSON object per line. Reads are strict: a line that fails to parse
//! fails the whole scan with the file and 1-based line number, including a
//! truncated trailing line left by an interrupted append. Whole-file writes
//! go through a temp file and a rename so readers never see a partial file;
//! appends are a single unbuffered write.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Result, WorkflowError};

/// Read every record in `path`. A missing file reads as empty.
///
/// # Errors
///
/// Returns `JsonlParse` on the first malformed line, `PermissionDenied` if
/// the file is unreadable, or `Io` for other read failures.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = match fs::File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(map_io(path, err)),
    };

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let record = serde_json::from_str(trimmed).map_err(|err| WorkflowError::JsonlParse {
            path: path.to_path_buf(),
            line: index + 1,
            reason: err.to_string(),
        })?;
        records.push(record);
    }

    tracing::trace!(path = %path.display(), count = records.len(), "Read JSONL file");
    Ok(records)
}

/// Append one record as a single write.
///
/// # Errors
///
/// Returns `PermissionDenied`, `Io` or `Json` on failure.
pub fn append<T: Serialize>(path: &Path, record: &T) -> Result<()> {
    let mut line = serde_json::to_string(record)?;
    line.push('\n');

    ensure_parent(path)?;
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|err| map_io(path, err))?;
    file.write_all(line.as_bytes()).map_err(|err| map_io(path, err))?;
    Ok(())
}

/// Replace the file's contents with `records`, atomically.
///
/// # Errors
///
/// Returns `PermissionDenied`, `Io` or `Json` on failure. On error the
/// original file is left untouched.
pub fn rewrite<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut buf = String::new();
    for record in records {
        buf.push_str(&serde_json::to_string(record)?);
        buf.push('\n');
    }
    write_atomic(path, buf.as_bytes())
}

/// Write `bytes` to `path` via a sibling temp file and rename.
///
/// # Errors
///
/// Returns `PermissionDenied` or `Io` on failure.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent(path)?;
    let tmp_path = temp_path(path);

    if let Err(err) = write_then_rename(&tmp_path, path, bytes) {
        let _ = fs::remove_file(&tmp_path);
        return Err(map_io(path, err));
    }
    Ok(())
}

/// Check that files can be created in `dir` before mutating anything.
///
/// # Errors
///
/// Returns `PermissionDenied` if the directory is not writable.
pub fn probe_writable(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|err| map_io(dir, err))?;
    let probe = dir.join(format!(".write-probe-{}", std::process::id()));
    fs::File::create(&probe).map_err(|err| map_io(dir, err))?;
    fs::remove_file(&probe).map_err(|err| map_io(dir, err))?;
    Ok(())
}

fn write_then_rename(tmp_path: &Path, path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(tmp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp_path, path)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| map_io(parent, err))?;
        }
    }
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(std::ffi::OsStr::to_os_string)
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn map_io(path: &Path, err: std::io::Error) -> WorkflowError {
    if err.kind() == IoErrorKind::PermissionDenied {
        WorkflowError::PermissionDenied {
            path: path.to_path_buf(),
        }
    } else {
        WorkflowError::Io(err)
    }
}
