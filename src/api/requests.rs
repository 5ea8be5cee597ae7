//! Request builders
//!
//! Pure functions turning caller options into validated wire bodies for
//! `/v1/scrape`, `/v1/crawl` and `/v1/map`. Optional list fields are only
//! serialized when non-empty: the service treats an absent path filter
//! differently from an empty one.
//!
//! # Defaults
//!
//! | Field | Default |
//! |-------|---------|
//! | `formats` | `["markdown"]` |
//! | `maxDepth` | 2 |
//! | crawl `limit` | 10000 |
//! | map `limit` | 5000 |
//! | map `ignoreSitemap` | true (false when `sitemapOnly` is set) |
//! | map `sitemapOnly` | false |

use crate::url::parse_target_url;
use crate::{ExplorerError, Result};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const DEFAULT_MAX_DEPTH: u32 = 2;
pub const DEFAULT_CRAWL_LIMIT: u32 = 10_000;
pub const MAX_CRAWL_LIMIT: u32 = 10_000;
pub const DEFAULT_MAP_LIMIT: u32 = 5_000;
pub const MAX_MAP_LIMIT: u32 = 30_000;

/// Output formats the service can produce for a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScrapeFormat {
    Markdown,
    Html,
    RawHtml,
    Text,
    Json,
    Links,
    Screenshot,
}

impl ScrapeFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::RawHtml => "rawHtml",
            Self::Text => "text",
            Self::Json => "json",
            Self::Links => "links",
            Self::Screenshot => "screenshot",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "markdown" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "rawHtml" => Some(Self::RawHtml),
            "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            "links" => Some(Self::Links),
            "screenshot" => Some(Self::Screenshot),
            _ => None,
        }
    }
}

impl fmt::Display for ScrapeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-page scrape options, shared by scrape and crawl requests
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PageOptions {
    pub formats: Vec<ScrapeFormat>,
    pub only_main_content: Option<bool>,
    pub include_tags: Vec<String>,
    pub exclude_tags: Vec<String>,
    /// Milliseconds to wait for client-side rendering
    #[serde(rename = "waitFor")]
    pub wait_for_ms: Option<u64>,
}

/// Options for scraping a single page
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScrapeOptions {
    pub url: String,
    #[serde(default)]
    pub formats: Vec<ScrapeFormat>,
    #[serde(default)]
    pub only_main_content: Option<bool>,
    #[serde(default)]
    pub include_tags: Vec<String>,
    #[serde(default)]
    pub exclude_tags: Vec<String>,
    #[serde(default, rename = "waitFor")]
    pub wait_for_ms: Option<u64>,
}

impl ScrapeOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_formats(mut self, formats: impl IntoIterator<Item = ScrapeFormat>) -> Self {
        self.formats = formats.into_iter().collect();
        self
    }

    /// The page-level part of these options
    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            formats: self.formats.clone(),
            only_main_content: self.only_main_content,
            include_tags: self.include_tags.clone(),
            exclude_tags: self.exclude_tags.clone(),
            wait_for_ms: self.wait_for_ms,
        }
    }
}

/// Options for an asynchronous crawl job
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CrawlOptions {
    pub url: String,
    #[serde(default)]
    pub include_paths: Vec<String>,
    #[serde(default)]
    pub exclude_paths: Vec<String>,
    #[serde(default)]
    pub max_depth: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub ignore_sitemap: Option<bool>,
    #[serde(default)]
    pub allow_backward_links: Option<bool>,
    #[serde(default)]
    pub allow_external_links: Option<bool>,
    #[serde(default)]
    pub scrape_options: Option<PageOptions>,
}

impl CrawlOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Options for discovering a site's links
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MapOptions {
    pub url: String,
    #[serde(default)]
    pub search: Option<String>,
    /// Defaults to `true`, or to `false` when only `sitemap_only` is set.
    /// Both explicitly `true` is rejected.
    #[serde(default)]
    pub ignore_sitemap: Option<bool>,
    /// Restrict discovery to the sitemap; turns the `ignore_sitemap`
    /// default off when set alone
    #[serde(default)]
    pub sitemap_only: Option<bool>,
    #[serde(default)]
    pub include_subdomains: Option<bool>,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default, rename = "timeout")]
    pub timeout_ms: Option<u64>,
}

impl MapOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// Parses loosely-typed options, rejecting unknown keys
fn options_from_value<T: DeserializeOwned>(kind: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ExplorerError::invalid(format!("{} options", kind), e.to_string()))
}

impl ScrapeOptions {
    pub fn from_value(value: Value) -> Result<Self> {
        options_from_value("scrape", value)
    }
}

impl CrawlOptions {
    pub fn from_value(value: Value) -> Result<Self> {
        options_from_value("crawl", value)
    }
}

impl MapOptions {
    pub fn from_value(value: Value) -> Result<Self> {
        options_from_value("map", value)
    }
}

/// Wire form of per-page options
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub formats: Vec<ScrapeFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub only_main_content: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<u64>,
}

/// Body of `POST /v1/scrape`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScrapeRequest {
    pub url: String,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Body of `POST /v1/crawl`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub include_paths: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub exclude_paths: Vec<String>,
    pub max_depth: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_sitemap: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_backward_links: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_external_links: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrape_options: Option<PageRequest>,
}

/// Body of `POST /v1/map`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapRequest {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    pub ignore_sitemap: bool,
    pub sitemap_only: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_subdomains: Option<bool>,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

/// Validates scrape options and fills in defaults
pub fn build_scrape_request(options: &ScrapeOptions) -> Result<ScrapeRequest> {
    Ok(ScrapeRequest {
        url: target_url(&options.url)?,
        page: build_page_request(&options.page_options())?,
    })
}

/// Validates crawl options and fills in defaults
///
/// # Errors
///
/// `InvalidInput` when the URL is malformed, `maxDepth` is zero, `limit` is
/// outside `1..=10000`, or a path pattern is not a valid regex.
pub fn build_crawl_request(options: &CrawlOptions) -> Result<CrawlRequest> {
    let url = target_url(&options.url)?;

    let max_depth = options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH);
    if max_depth < 1 {
        return Err(ExplorerError::invalid("maxDepth", "must be at least 1"));
    }

    let limit = options.limit.unwrap_or(DEFAULT_CRAWL_LIMIT);
    check_range("limit", limit, MAX_CRAWL_LIMIT)?;

    let scrape_options = options
        .scrape_options
        .as_ref()
        .map(build_page_request)
        .transpose()?;

    Ok(CrawlRequest {
        url,
        include_paths: path_patterns("includePaths", &options.include_paths)?,
        exclude_paths: path_patterns("excludePaths", &options.exclude_paths)?,
        max_depth,
        limit,
        ignore_sitemap: options.ignore_sitemap,
        allow_backward_links: options.allow_backward_links,
        allow_external_links: options.allow_external_links,
        scrape_options,
    })
}

/// Validates map options and fills in defaults
///
/// `ignoreSitemap` and `sitemapOnly` cannot both be true. Setting only
/// `sitemapOnly` turns the `ignoreSitemap` default off.
pub fn build_map_request(options: &MapOptions) -> Result<MapRequest> {
    let url = target_url(&options.url)?;

    let sitemap_only = options.sitemap_only.unwrap_or(false);
    let ignore_sitemap = options.ignore_sitemap.unwrap_or(!sitemap_only);
    if sitemap_only && ignore_sitemap {
        return Err(ExplorerError::invalid(
            "sitemapOnly",
            "cannot be combined with ignoreSitemap",
        ));
    }

    let limit = options.limit.unwrap_or(DEFAULT_MAP_LIMIT);
    check_range("limit", limit, MAX_MAP_LIMIT)?;

    if options.timeout_ms == Some(0) {
        return Err(ExplorerError::invalid("timeout", "must be greater than 0"));
    }

    let search = options
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(MapRequest {
        url,
        search,
        ignore_sitemap,
        sitemap_only,
        include_subdomains: options.include_subdomains,
        limit,
        timeout: options.timeout_ms,
    })
}

fn build_page_request(options: &PageOptions) -> Result<PageRequest> {
    let mut formats: Vec<ScrapeFormat> = Vec::with_capacity(options.formats.len());
    for format in &options.formats {
        if !formats.contains(format) {
            formats.push(*format);
        }
    }
    if formats.is_empty() {
        formats.push(ScrapeFormat::Markdown);
    }

    Ok(PageRequest {
        formats,
        only_main_content: options.only_main_content,
        include_tags: clean_list(&options.include_tags),
        exclude_tags: clean_list(&options.exclude_tags),
        wait_for: options.wait_for_ms,
    })
}

fn target_url(input: &str) -> Result<String> {
    if input.trim().is_empty() {
        return Err(ExplorerError::invalid("url", "is required"));
    }
    Ok(parse_target_url(input)?.to_string())
}

fn check_range(field: &str, value: u32, max: u32) -> Result<()> {
    if value < 1 || value > max {
        return Err(ExplorerError::invalid(
            field,
            format!("must be between 1 and {}, got {}", max, value),
        ));
    }
    Ok(())
}

/// Trims entries and drops blanks and repeats
fn clean_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let item = item.trim();
        if !item.is_empty() && !out.iter().any(|existing| existing == item) {
            out.push(item.to_string());
        }
    }
    out
}

fn path_patterns(field: &str, patterns: &[String]) -> Result<Vec<String>> {
    let patterns = clean_list(patterns);
    for pattern in &patterns {
        Regex::new(pattern).map_err(|e| {
            ExplorerError::invalid(field, format!("invalid pattern '{}': {}", pattern, e))
        })?;
    }
    Ok(patterns)
}
