//! Authenticated HTTP transport
//!
//! Every request to the crawling service goes through [`Transport`], which
//! attaches credentials, applies the configured timeout and translates
//! failures into [`ExplorerError`] variants:
//!
//! | Condition | Error |
//! |-----------|-------|
//! | Connect, DNS or timeout failure | `Unreachable` |
//! | Non-2xx with `error`/`message` in the body | `Api` with that message |
//! | Non-2xx with any other body | `Api` with the raw body |
//! | 2xx with `"success": false` | `Api` with the reported error |
//! | 2xx with malformed JSON | `Protocol` |
//!
//! Nothing is retried here.

use crate::config::ApiConfig;
use crate::{ExplorerError, Result};
use reqwest::header::{HeaderValue, ACCEPT};
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// Header carrying the caller's idempotency key on job submissions
pub const IDEMPOTENCY_HEADER: &str = "x-idempotency-key";

/// HTTP transport bound to one base URL and credential set
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

/// Builds the HTTP client shared by all requests of one transport
///
/// # Arguments
///
/// * `timeout` - Total time allowed for each request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(timeout: Duration) -> std::result::Result<Client, reqwest::Error> {
    let user_agent = format!("crawl-explorer/{}", env!("CARGO_PKG_VERSION"));

    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10).min(timeout))
        .gzip(true)
        .brotli(true)
        .build()
}

impl Transport {
    /// Creates a transport from validated API settings
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = build_http_client(timeout)
            .map_err(|e| ExplorerError::Protocol(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            api_key: config.api_key().map(str::to_string),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Absolute URL for an API path such as `/v1/scrape`
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Resolves a pagination cursor
    ///
    /// Absolute http(s) cursors must share the base URL's scheme, host and
    /// port, otherwise they are rejected with `Protocol`. Any other cursor is
    /// a path relative to the base URL.
    pub fn resolve_cursor(&self, cursor: &str) -> Result<String> {
        let cursor = cursor.trim();
        if cursor.is_empty() {
            return Err(ExplorerError::Protocol("Empty pagination cursor".to_string()));
        }

        if cursor.starts_with("http://") || cursor.starts_with("https://") {
            let parsed = url::Url::parse(cursor).map_err(|e| {
                ExplorerError::Protocol(format!("Invalid pagination cursor '{}': {}", cursor, e))
            })?;
            let base = url::Url::parse(&self.base_url).map_err(|e| {
                ExplorerError::Protocol(format!("Invalid base URL '{}': {}", self.base_url, e))
            })?;
            if parsed.origin() != base.origin() {
                tracing::warn!(
                    "Refusing pagination cursor {} outside {}",
                    parsed,
                    self.base_url
                );
                return Err(ExplorerError::Protocol(format!(
                    "Pagination cursor '{}' points outside {}",
                    parsed, self.base_url
                )));
            }
            return Ok(parsed.to_string());
        }

        Ok(self.endpoint(cursor))
    }

    /// Sends a request to `path` under the base URL
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let url = self.endpoint(path);
        self.execute(method, &url, body, None).await
    }

    /// Sends a request with an `x-idempotency-key` header when a key is given
    pub async fn send_idempotent(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        idempotency_key: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        let url = self.endpoint(path);
        self.execute(method, &url, body, idempotency_key).await
    }

    /// Sends a request to a pagination cursor
    pub async fn send_url(
        &self,
        method: Method,
        cursor: &str,
        body: Option<&Value>,
    ) -> Result<(StatusCode, Value)> {
        let url = self.resolve_cursor(cursor)?;
        self.execute(method, &url, body, None).await
    }

    async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        idempotency_key: Option<&str>,
    ) -> Result<(StatusCode, Value)> {
        tracing::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        if let Some(key) = idempotency_key.map(str::trim).filter(|k| !k.is_empty()) {
            request = request.header(IDEMPOTENCY_HEADER, key);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| unreachable(url, &e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| unreachable(url, &e))?;

        tracing::debug!("{} {} -> {} ({} bytes)", method, url, status, text.len());

        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let value = parse_body(&text)?;
        if value.get("success") == Some(&Value::Bool(false)) {
            let message = error_message(&value)
                .unwrap_or_else(|| "request reported success=false".to_string());
            return Err(ExplorerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok((status, value))
    }
}

fn unreachable(url: &str, err: &reqwest::Error) -> ExplorerError {
    let reason = if err.is_timeout() {
        format!("request timed out: {}", err)
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };

    ExplorerError::Unreachable {
        url: url.to_string(),
        reason,
    }
}

/// Parses a 2xx body; an empty body is treated as JSON `null`
fn parse_body(text: &str) -> Result<Value> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text)
        .map_err(|e| ExplorerError::Protocol(format!("Malformed JSON response: {}", e)))
}

fn api_error(status: StatusCode, text: &str) -> ExplorerError {
    let message = serde_json::from_str::<Value>(text)
        .ok()
        .and_then(|value| error_message(&value))
        .unwrap_or_else(|| {
            let raw = text.trim();
            if raw.is_empty() {
                status
                    .canonical_reason()
                    .unwrap_or("empty response body")
                    .to_string()
            } else {
                raw.to_string()
            }
        });

    ExplorerError::Api {
        status: status.as_u16(),
        message,
    }
}

/// The `error` or `message` string of an error body
fn error_message(value: &Value) -> Option<String> {
    ["error", "message"]
        .iter()
        .filter_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|msg| !msg.is_empty())
        .map(str::to_string)
}
