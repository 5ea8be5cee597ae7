//! Export record types
//!
//! Categories, formats, metadata and the payload shapes passed between the
//! result model and the export store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;

/// Category an export is filed under; each maps to its own directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportCategory {
    Scrape,
    Crawl,
    Map,
    Doc,
    Custom,
}

impl ExportCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scrape => "scrape",
            Self::Crawl => "crawl",
            Self::Map => "map",
            Self::Doc => "doc",
            Self::Custom => "custom",
        }
    }

    /// Parses a category name, case-insensitively
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "scrape" => Some(Self::Scrape),
            "crawl" => Some(Self::Crawl),
            "map" => Some(Self::Map),
            "doc" => Some(Self::Doc),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }

    /// Returns all categories in directory-layout order
    pub fn all() -> [Self; 5] {
        [
            Self::Scrape,
            Self::Crawl,
            Self::Map,
            Self::Doc,
            Self::Custom,
        ]
    }
}

impl fmt::Display for ExportCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// On-disk format of an export's primary file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Html,
    Text,
    Json,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Text => "text",
            Self::Json => "json",
        }
    }

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Text => "txt",
            Self::Json => "json",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "text" | "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "md" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "txt" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Descriptive metadata stored with every export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub source_url: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ExportMetadata {
    /// Metadata for `source_url`, timestamped now
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            created_at: Utc::now(),
            description: None,
            tags: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        let trimmed = description.trim();
        self.description = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Sets the tags, trimming them and dropping blanks and repeats
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.clear();
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !tag.is_empty() && !self.tags.iter().any(|t| t == tag) {
                self.tags.push(tag.to_string());
            }
        }
        self
    }

    /// Case-insensitive match against description, tags and source URL
    ///
    /// `needle` must already be lowercase.
    pub fn mentions(&self, needle: &str) -> bool {
        self.source_url.to_lowercase().contains(needle)
            || self
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(needle))
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Content of an export's primary file
#[derive(Debug, Clone, PartialEq)]
pub enum ExportPayload {
    Text(String),
    Json(Value),
}

/// Everything needed to persist one export
#[derive(Debug, Clone)]
pub struct ExportRecord {
    pub category: ExportCategory,
    pub format: ExportFormat,
    pub payload: ExportPayload,
    pub metadata: ExportMetadata,
    /// Caller-chosen file stem; derived from the source URL when absent
    pub filename: Option<String>,
}

/// One entry returned by listing a category
#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub filename: String,
    pub path: PathBuf,
    pub format: ExportFormat,
    pub metadata: Option<ExportMetadata>,
    pub size_bytes: u64,
}

/// A read-back export
#[derive(Debug, Clone)]
pub struct ExportContent {
    pub path: PathBuf,
    pub format: ExportFormat,
    pub payload: ExportPayload,
    pub metadata: Option<ExportMetadata>,
}
