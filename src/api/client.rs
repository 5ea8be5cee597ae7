//! Typed client for the crawling service's v1 endpoints

use crate::api::poller::CrawlApi;
use crate::api::requests::{
    build_map_request, build_scrape_request, CrawlRequest, MapOptions, ScrapeOptions,
};
use crate::api::transport::Transport;
use crate::config::ApiConfig;
use crate::model::{CrawlStatusPage, Document, MapResult, ScrapeResult};
use crate::{ExplorerError, Result};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SCRAPE_PATH: &str = "/v1/scrape";
pub const CRAWL_PATH: &str = "/v1/crawl";
pub const MAP_PATH: &str = "/v1/map";

/// `{success, data}` envelope of a scrape response
#[derive(Debug, Deserialize)]
struct ScrapeEnvelope {
    #[serde(default)]
    data: Option<Document>,
}

/// Response to a crawl submission
#[derive(Debug, Deserialize)]
struct CrawlSubmitted {
    #[serde(default)]
    id: Option<String>,
}

/// Response of a map request
///
/// Older deployments return links as strings, newer ones as objects with a
/// `url` field; both are accepted.
#[derive(Debug, Deserialize)]
struct MapEnvelope {
    #[serde(default)]
    links: Vec<Value>,
}

/// Client for `/v1/scrape`, `/v1/crawl` and `/v1/map`
#[derive(Debug, Clone)]
pub struct ApiClient {
    transport: Transport,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self::from_transport(Transport::new(config)?))
    }

    pub fn from_transport(transport: Transport) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Scrapes a single page
    pub async fn scrape(&self, options: &ScrapeOptions) -> Result<ScrapeResult> {
        let request = build_scrape_request(options)?;
        let body = to_body(&request)?;

        let (_, value) = self
            .transport
            .send(Method::POST, SCRAPE_PATH, Some(&body))
            .await?;
        let envelope: ScrapeEnvelope = decode("scrape", value)?;

        let document = envelope.data.unwrap_or_else(|| {
            tracing::warn!("Scrape of {} returned no data", request.url);
            Document::default()
        });
        tracing::info!(
            "Scraped {} ({} bytes of markdown)",
            request.url,
            document.markdown_len()
        );

        Ok(ScrapeResult {
            url: request.url,
            document,
        })
    }

    /// Discovers links reachable from a site
    pub async fn map(&self, options: &MapOptions) -> Result<MapResult> {
        let request = build_map_request(options)?;
        let body = to_body(&request)?;

        let (_, value) = self
            .transport
            .send(Method::POST, MAP_PATH, Some(&body))
            .await?;
        let envelope: MapEnvelope = decode("map", value)?;

        let links: Vec<String> = envelope
            .links
            .into_iter()
            .filter_map(|link| match link {
                Value::String(url) => Some(url),
                Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect();
        tracing::info!("Mapped {} links from {}", links.len(), request.url);

        Ok(MapResult {
            url: request.url,
            links,
        })
    }
}

#[async_trait]
impl CrawlApi for ApiClient {
    async fn submit_crawl(
        &self,
        request: &CrawlRequest,
        idempotency_key: Option<&str>,
    ) -> Result<String> {
        let body = to_body(request)?;
        let (_, value) = self
            .transport
            .send_idempotent(Method::POST, CRAWL_PATH, Some(&body), idempotency_key)
            .await?;

        let submitted: CrawlSubmitted = decode("crawl", value)?;
        submitted
            .id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ExplorerError::Protocol("Crawl response has no job id".to_string()))
    }

    async fn crawl_status(&self, job_id: &str) -> Result<CrawlStatusPage> {
        let path = format!("{}/{}", CRAWL_PATH, job_id);
        let (_, value) = self.transport.send(Method::GET, &path, None).await?;
        decode("crawl status", value)
    }

    async fn crawl_status_next(&self, cursor: &str) -> Result<CrawlStatusPage> {
        let (_, value) = self.transport.send_url(Method::GET, cursor, None).await?;
        decode("crawl status", value)
    }
}

fn to_body<T: Serialize>(request: &T) -> Result<Value> {
    serde_json::to_value(request)
        .map_err(|e| ExplorerError::Protocol(format!("Failed to encode request: {}", e)))
}

fn decode<T: DeserializeOwned>(what: &str, value: Value) -> Result<T> {
    serde_json::from_value(value)
        .map_err(|e| ExplorerError::Protocol(format!("Unexpected {} response: {}", what, e)))
}
