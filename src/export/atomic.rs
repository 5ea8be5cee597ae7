//! Write-then-rename helpers so an interrupted save never leaves a
//! half-written export behind

use crate::export::naming::TEMP_PREFIX;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `contents` to `path` unless something already exists there
///
/// Returns `Ok(false)` when the target exists; the temporary file is cleaned
/// up in that case.
pub(crate) fn write_new(path: &Path, contents: &[u8]) -> io::Result<bool> {
    let tmp = stage(path, contents)?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(e.error),
    }
}

/// Writes `contents` to `path`, replacing any existing file
pub(crate) fn write_replace(path: &Path, contents: &[u8]) -> io::Result<()> {
    let tmp = stage(path, contents)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

fn stage(path: &Path, contents: &[u8]) -> io::Result<NamedTempFile> {
    let dir = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no parent"))?;

    let mut tmp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .tempfile_in(dir)?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    Ok(tmp)
}
