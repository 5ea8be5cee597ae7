//! File naming policy for exports
//!
//! A stem is derived from the source URL plus a `YYYYMMDD-HHMMSS` suffix
//! taken from the export's creation time. Within one directory a stem is
//! owned by a single export, so a `.meta.json` sidecar always belongs to
//! exactly one primary file.

use crate::export::record::{ExportFormat, ExportRecord};
use crate::url::{parse_target_url, sanitize_file_stem, slug_from_url};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};

/// Suffix of metadata sidecar files
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Prefix of in-flight temporary files
pub(crate) const TEMP_PREFIX: &str = ".tmp-";

/// Extensions a primary export can have
const PRIMARY_EXTENSIONS: [&str; 4] = ["md", "html", "txt", "json"];

/// Formats a creation time as a filename suffix
pub fn timestamp_suffix(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d-%H%M%S").to_string()
}

/// Base stem for a record, before any collision counter
pub fn export_stem(record: &ExportRecord) -> String {
    let stem = match record.filename.as_deref() {
        Some(name) if !name.trim().is_empty() => {
            sanitize_file_stem(strip_known_extension(name.trim()))
        }
        _ => {
            let base = match parse_target_url(&record.metadata.source_url) {
                Ok(url) => slug_from_url(&url),
                Err(_) => sanitize_file_stem(&record.metadata.source_url),
            };
            format!("{}-{}", base, timestamp_suffix(record.metadata.created_at))
        }
    };

    // Keep primaries out of the sidecar namespace
    match stem.strip_suffix(".meta") {
        Some(head) => format!("{}-meta", head),
        None => stem,
    }
}

/// Stem with the n-th collision counter applied
pub fn numbered_stem(stem: &str, counter: u32) -> String {
    if counter == 0 {
        stem.to_string()
    } else {
        format!("{}-{}", stem, counter)
    }
}

/// File name of a primary export
pub fn primary_name(stem: &str, format: ExportFormat) -> String {
    format!("{}.{}", stem, format.extension())
}

/// Path of the metadata sidecar belonging to `primary`
pub fn sidecar_path(primary: &Path) -> PathBuf {
    primary.with_extension(&SIDECAR_SUFFIX[1..])
}

pub fn is_sidecar(file_name: &str) -> bool {
    file_name.ends_with(SIDECAR_SUFFIX)
}

pub fn is_temp_file(file_name: &str) -> bool {
    file_name.starts_with(TEMP_PREFIX)
}

/// Returns true if any export in `dir` already uses `stem`
pub fn stem_taken(dir: &Path, stem: &str) -> bool {
    PRIMARY_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{}.{}", stem, ext)))
        .chain(std::iter::once(dir.join(format!("{}{}", stem, SIDECAR_SUFFIX))))
        .any(|p| p.exists())
}

fn strip_known_extension(name: &str) -> &str {
    if let Some(head) = name.strip_suffix(SIDECAR_SUFFIX) {
        return head;
    }
    match name.rsplit_once('.') {
        Some((head, ext)) if PRIMARY_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
            head
        }
        _ => name,
    }
}
