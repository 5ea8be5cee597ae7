//! Result model for scrape, crawl and map operations
//!
//! Each result knows how to render itself into an export payload for a given
//! [`ExportFormat`]:
//!
//! | Result | markdown | html | text | json |
//! |--------|----------|------|------|------|
//! | Scrape | `markdown` field | `html` (or `rawHtml`) field | `text` field | whole document |
//! | Crawl  | - | - | - | job summary plus ordered pages |
//! | Map    | bullet list | - | one link per line | `{url, links, total}` |

mod crawl;
mod document;

pub use crawl::{CrawlResult, CrawlStatusPage};
pub use document::{Document, DocumentMetadata};

use crate::export::{ExportCategory, ExportFormat, ExportPayload};
use crate::{ExplorerError, Result};
use serde_json::{json, Value};

/// Result of a single-page scrape
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// URL that was requested
    pub url: String,
    pub document: Document,
}

impl ScrapeResult {
    pub fn render(&self, format: ExportFormat) -> Result<ExportPayload> {
        let field = match format {
            ExportFormat::Json => return Ok(ExportPayload::Json(to_json(&self.document)?)),
            ExportFormat::Markdown => self.document.markdown.as_deref(),
            ExportFormat::Html => self
                .document
                .html
                .as_deref()
                .or(self.document.raw_html.as_deref()),
            ExportFormat::Text => self.document.text.as_deref(),
        };

        field
            .map(|s| ExportPayload::Text(s.to_string()))
            .ok_or_else(|| ExplorerError::MissingContent {
                format: format.to_string(),
            })
    }

    /// The page's reported source URL, or the requested one
    pub fn source_url(&self) -> &str {
        self.document.source_url().unwrap_or(&self.url)
    }
}

/// Links discovered by a map request
#[derive(Debug, Clone, PartialEq)]
pub struct MapResult {
    /// URL that was mapped
    pub url: String,
    pub links: Vec<String>,
}

impl MapResult {
    pub fn render(&self, format: ExportFormat) -> Result<ExportPayload> {
        match format {
            ExportFormat::Json => Ok(ExportPayload::Json(json!({
                "url": self.url,
                "links": self.links,
                "total": self.links.len(),
            }))),
            ExportFormat::Text => Ok(ExportPayload::Text(join_lines(
                self.links.iter().map(String::as_str),
            ))),
            ExportFormat::Markdown => Ok(ExportPayload::Text(join_lines(
                self.links.iter().map(|link| format!("- <{}>", link)),
            ))),
            ExportFormat::Html => Err(unsupported("map", format)),
        }
    }
}

impl CrawlResult {
    pub fn render(&self, format: ExportFormat) -> Result<ExportPayload> {
        match format {
            ExportFormat::Json => Ok(ExportPayload::Json(to_json(self)?)),
            other => Err(unsupported("crawl", other)),
        }
    }
}

/// Any result the client can hand to the export store
#[derive(Debug, Clone)]
pub enum ApiResult {
    Scrape(ScrapeResult),
    Crawl(CrawlResult),
    Map(MapResult),
}

impl ApiResult {
    pub fn render(&self, format: ExportFormat) -> Result<ExportPayload> {
        match self {
            Self::Scrape(result) => result.render(format),
            Self::Crawl(result) => result.render(format),
            Self::Map(result) => result.render(format),
        }
    }

    /// URL recorded as the export's source
    pub fn source_url(&self) -> &str {
        match self {
            Self::Scrape(result) => result.source_url(),
            Self::Crawl(result) => result.url.as_deref().unwrap_or(&result.job_id),
            Self::Map(result) => &result.url,
        }
    }

    /// Category this kind of result is filed under by default
    pub fn default_category(&self) -> ExportCategory {
        match self {
            Self::Scrape(_) => ExportCategory::Scrape,
            Self::Crawl(_) => ExportCategory::Crawl,
            Self::Map(_) => ExportCategory::Map,
        }
    }
}

impl From<ScrapeResult> for ApiResult {
    fn from(result: ScrapeResult) -> Self {
        Self::Scrape(result)
    }
}

impl From<CrawlResult> for ApiResult {
    fn from(result: CrawlResult) -> Self {
        Self::Crawl(result)
    }
}

impl From<MapResult> for ApiResult {
    fn from(result: MapResult) -> Self {
        Self::Map(result)
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| ExplorerError::Protocol(format!("Failed to serialize result: {}", e)))
}

fn join_lines<I, S>(lines: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for line in lines {
        out.push_str(line.as_ref());
        out.push('\n');
    }
    out
}

fn unsupported(kind: &str, format: ExportFormat) -> ExplorerError {
    ExplorerError::invalid(
        "format",
        format!("{} results cannot be exported as {}", kind, format),
    )
}
