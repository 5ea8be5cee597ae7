//! Scraped page document as returned by the service

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single scraped page
///
/// Only the fields the client acts on are typed; anything else the service
/// returns is kept in `extra` so a JSON export carries the full result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_html: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Structured extraction output
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub links: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<DocumentMetadata>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Page metadata reported alongside a document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    #[serde(
        rename = "sourceURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub source_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Document {
    /// URL the page was fetched from, if the service reported one
    pub fn source_url(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.source_url.as_deref())
            .or_else(|| self.extra.get("url").and_then(Value::as_str))
    }

    pub fn title(&self) -> Option<&str> {
        self.metadata.as_ref().and_then(|m| m.title.as_deref())
    }

    /// Length of the markdown content, 0 if absent
    pub fn markdown_len(&self) -> usize {
        self.markdown.as_deref().map_or(0, str::len)
    }
}
