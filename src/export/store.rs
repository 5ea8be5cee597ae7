//! Filesystem-backed export store

use crate::config::ExportConfig;
use crate::export::atomic::{write_new, write_replace};
use crate::export::naming::{
    export_stem, is_sidecar, is_temp_file, numbered_stem, primary_name, sidecar_path, stem_taken,
};
use crate::export::record::{
    ExportCategory, ExportContent, ExportFormat, ExportMetadata, ExportPayload, ExportRecord,
    ExportSummary,
};
use crate::{ExplorerError, Result};
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Key holding metadata inside JSON exports
pub const METADATA_KEY: &str = "_metadata";

/// Key holding the payload when it cannot carry `_metadata` itself
pub const PAYLOAD_KEY: &str = "_payload";

/// Upper bound on collision counters tried for one save
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// Owns the on-disk representation of exports
///
/// Each category lives in its own directory (by default
/// `<root>/<category>`). A JSON export is a single self-describing file with
/// its metadata under `_metadata`; every other format is a primary file plus
/// a `<stem>.meta.json` sidecar. The directory listing is the only index.
#[derive(Debug, Clone)]
pub struct ExportStore {
    config: ExportConfig,
}

impl ExportStore {
    pub fn new(config: ExportConfig) -> Self {
        Self { config }
    }

    pub fn root_dir(&self) -> &Path {
        &self.config.root_dir
    }

    /// Directory holding exports of `category`
    pub fn category_dir(&self, category: ExportCategory) -> PathBuf {
        self.config
            .directories
            .get(category.as_str())
            .cloned()
            .unwrap_or_else(|| self.config.root_dir.join(category.as_str()))
    }

    /// Persists a record and returns the path of its primary file
    ///
    /// The category directory is created if needed. Existing exports are never
    /// overwritten: a taken name gets a `-N` counter instead.
    pub fn save(&self, record: &ExportRecord) -> Result<PathBuf> {
        let dir = self.category_dir(record.category);
        fs::create_dir_all(&dir).map_err(|e| ExplorerError::io(&dir, e))?;

        let contents = encode_primary(record)?;
        let sidecar = match record.format {
            ExportFormat::Json => None,
            _ => Some(encode_json(&metadata_value(&record.metadata)?)?),
        };

        let stem = export_stem(record);
        for counter in 0..MAX_NAME_ATTEMPTS {
            let candidate = numbered_stem(&stem, counter);
            if stem_taken(&dir, &candidate) {
                continue;
            }

            let path = dir.join(primary_name(&candidate, record.format));
            let written = write_new(&path, &contents).map_err(|e| ExplorerError::io(&path, e))?;
            if !written {
                continue;
            }

            if let Some(sidecar_contents) = &sidecar {
                let meta_path = sidecar_path(&path);
                if let Err(e) = write_replace(&meta_path, sidecar_contents) {
                    // An export without its metadata is not discoverable; drop it
                    if let Err(cleanup) = fs::remove_file(&path) {
                        tracing::warn!("Failed to remove {}: {}", path.display(), cleanup);
                    }
                    return Err(ExplorerError::io(meta_path, e));
                }
            }

            tracing::info!(
                "Saved {} export ({}) to {}",
                record.category,
                record.format,
                path.display()
            );
            return Ok(path);
        }

        Err(ExplorerError::io(
            &dir,
            io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("no free file name for '{}'", stem),
            ),
        ))
    }

    /// Lists exports of a category, optionally filtered by a search term
    ///
    /// The term matches case-insensitively against the file name and the
    /// metadata description, tags and source URL. A missing category
    /// directory lists as empty.
    pub fn list(&self, category: ExportCategory, search: Option<&str>) -> Result<Vec<ExportSummary>> {
        let dir = self.category_dir(category);
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let entries = fs::read_dir(&dir).map_err(|e| ExplorerError::io(&dir, e))?;
        let mut summaries = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| ExplorerError::io(&dir, e))?;
            let path = entry.path();

            let file_type = entry.file_type().map_err(|e| ExplorerError::io(&path, e))?;
            if !file_type.is_file() {
                continue;
            }

            let filename = entry.file_name().to_string_lossy().into_owned();
            if is_sidecar(&filename) || is_temp_file(&filename) {
                continue;
            }
            let Some(format) = format_of(&path) else {
                continue;
            };

            let metadata = load_metadata(&path, format);

            if let Some(needle) = &needle {
                let name_match = filename.to_lowercase().contains(needle.as_str());
                let meta_match = metadata.as_ref().is_some_and(|m| m.mentions(needle));
                if !name_match && !meta_match {
                    continue;
                }
            }

            let size_bytes = entry.metadata().map(|m| m.len()).unwrap_or(0);
            summaries.push(ExportSummary {
                filename,
                path,
                format,
                metadata,
                size_bytes,
            });
        }

        summaries.sort_by(|a, b| a.filename.cmp(&b.filename));
        tracing::debug!(
            "Listed {} {} exports in {}",
            summaries.len(),
            category,
            dir.display()
        );
        Ok(summaries)
    }

    /// Reads an export back, separating payload from metadata
    ///
    /// Metadata comes from the sidecar when one exists, otherwise from the
    /// `_metadata` key of a JSON export.
    pub fn read(&self, path: &Path) -> Result<ExportContent> {
        let (path, format) = self.resolve_export(path)?;

        let raw = fs::read_to_string(&path).map_err(|e| ExplorerError::io(&path, e))?;
        let sidecar_metadata = read_sidecar(&path);

        let (payload, metadata) = match format {
            ExportFormat::Json => {
                let value: Value = serde_json::from_str(&raw).map_err(|e| {
                    ExplorerError::io(&path, io::Error::new(io::ErrorKind::InvalidData, e))
                })?;
                let (payload, embedded) = split_embedded(value);
                (ExportPayload::Json(payload), sidecar_metadata.or(embedded))
            }
            _ => (ExportPayload::Text(raw), sidecar_metadata),
        };

        Ok(ExportContent {
            path,
            format,
            payload,
            metadata,
        })
    }

    /// Deletes an export and its sidecar
    ///
    /// The primary file is removed first. If the sidecar then cannot be
    /// removed the primary stays deleted and `PartialDelete` is returned.
    pub fn delete(&self, path: &Path) -> Result<()> {
        let (path, format) = self.resolve_export(path)?;

        fs::remove_file(&path).map_err(|e| ExplorerError::io(&path, e))?;
        tracing::info!("Deleted export {}", path.display());

        if format == ExportFormat::Json {
            return Ok(());
        }

        let sidecar = sidecar_path(&path);
        match fs::remove_file(&sidecar) {
            Ok(()) => {
                tracing::debug!("Deleted metadata sidecar {}", sidecar.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(ExplorerError::PartialDelete {
                path,
                sidecar,
                source,
            }),
        }
    }

    /// Canonicalizes `path` and checks it names a primary export file inside
    /// one of the category directories
    fn resolve_export(&self, path: &Path) -> Result<(PathBuf, ExportFormat)> {
        let canonical = path.canonicalize().map_err(|e| ExplorerError::io(path, e))?;

        let filename = canonical
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if is_sidecar(&filename) {
            return Err(ExplorerError::invalid(
                "path",
                format!("{} is a metadata sidecar, not an export", filename),
            ));
        }

        let parent = canonical.parent();
        let inside = ExportCategory::all().iter().any(|&category| {
            self.category_dir(category)
                .canonicalize()
                .is_ok_and(|dir| parent == Some(dir.as_path()))
        });
        if !inside {
            return Err(ExplorerError::invalid(
                "path",
                format!("{} is not inside an export directory", canonical.display()),
            ));
        }

        let format = format_of(&canonical).ok_or_else(|| {
            ExplorerError::invalid("path", format!("{} has no export extension", filename))
        })?;

        Ok((canonical, format))
    }
}

fn format_of(path: &Path) -> Option<ExportFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ExportFormat::from_extension)
}

fn encode_primary(record: &ExportRecord) -> Result<Vec<u8>> {
    match (record.format, &record.payload) {
        (ExportFormat::Json, payload) => {
            let value = match payload {
                ExportPayload::Json(value) => value.clone(),
                ExportPayload::Text(text) => serde_json::from_str(text).map_err(|e| {
                    ExplorerError::invalid("payload", format!("not valid JSON: {}", e))
                })?,
            };
            let embedded = embed_metadata(value, metadata_value(&record.metadata)?);
            encode_json(&embedded)
        }
        (_, ExportPayload::Text(text)) => Ok(text.clone().into_bytes()),
        (_, ExportPayload::Json(value)) => encode_json(value),
    }
}

fn encode_json(value: &Value) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| ExplorerError::invalid("payload", e.to_string()))?;
    bytes.push(b'\n');
    Ok(bytes)
}

fn metadata_value(metadata: &ExportMetadata) -> Result<Value> {
    serde_json::to_value(metadata).map_err(|e| ExplorerError::invalid("metadata", e.to_string()))
}

/// Adds metadata to a JSON payload
///
/// Objects get a sibling `_metadata` key. Anything else, or an object that
/// already uses one of the reserved keys, is wrapped as
/// `{"_payload": ..., "_metadata": ...}`.
fn embed_metadata(payload: Value, metadata: Value) -> Value {
    match payload {
        Value::Object(mut map)
            if !map.contains_key(METADATA_KEY) && !map.contains_key(PAYLOAD_KEY) =>
        {
            map.insert(METADATA_KEY.to_string(), metadata);
            Value::Object(map)
        }
        other => {
            let mut map = Map::new();
            map.insert(PAYLOAD_KEY.to_string(), other);
            map.insert(METADATA_KEY.to_string(), metadata);
            Value::Object(map)
        }
    }
}

/// Inverse of [`embed_metadata`]
fn split_embedded(value: Value) -> (Value, Option<ExportMetadata>) {
    let Value::Object(mut map) = value else {
        return (value, None);
    };

    let metadata = map
        .remove(METADATA_KEY)
        .and_then(|m| serde_json::from_value(m).ok());

    if metadata.is_some() && map.len() == 1 && map.contains_key(PAYLOAD_KEY) {
        let payload = map.remove(PAYLOAD_KEY).unwrap_or(Value::Null);
        return (payload, metadata);
    }

    (Value::Object(map), metadata)
}

fn read_sidecar(primary: &Path) -> Option<ExportMetadata> {
    let sidecar = sidecar_path(primary);
    let raw = match fs::read_to_string(&sidecar) {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read sidecar {}: {}", sidecar.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!("Ignoring malformed sidecar {}: {}", sidecar.display(), e);
            None
        }
    }
}

/// Metadata for a primary file: sidecar first, then embedded JSON
fn load_metadata(path: &Path, format: ExportFormat) -> Option<ExportMetadata> {
    if let Some(metadata) = read_sidecar(path) {
        return Some(metadata);
    }
    if format != ExportFormat::Json {
        return None;
    }

    let raw = fs::read_to_string(path).ok()?;
    let value: Value = serde_json::from_str(&raw).ok()?;
    split_embedded(value).1
}
