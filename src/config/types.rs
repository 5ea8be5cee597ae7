use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Default address of a self-hosted crawling service
pub const DEFAULT_API_URL: &str = "http://localhost:3002";

/// Directory name used under the home directory when no export root is given
pub const DEFAULT_EXPORT_DIR_NAME: &str = "firecrawl_data";

/// Main settings structure for Crawl Explorer
///
/// Every section is optional in the TOML file and falls back to its defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub poller: PollerConfig,
    #[serde(default)]
    pub exports: ExportConfig,
}

/// Remote endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the crawling service, e.g. `http://localhost:3002`
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Bearer token; self-hosted instances usually run without one
    #[serde(rename = "api-key", default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout applied to every HTTP request (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The configured key, treating a blank string as unset
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Display form of the key that never reveals it
    pub fn masked_api_key(&self) -> &'static str {
        if self.api_key().is_some() {
            "*****"
        } else {
            "Not set"
        }
    }
}

/// Crawl job polling behavior
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PollerConfig {
    /// Delay between status checks (milliseconds)
    #[serde(rename = "poll-interval-ms", default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of status checks before giving up with a timeout
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Pagination cursors followed within a single status check
    #[serde(rename = "max-page-follows", default = "default_max_page_follows")]
    pub max_page_follows: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_attempts: default_max_attempts(),
            max_page_follows: default_max_page_follows(),
        }
    }
}

impl PollerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Export directory layout
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ExportConfig {
    /// Root directory holding one subdirectory per export category
    #[serde(rename = "root-dir", default = "default_export_root")]
    pub root_dir: PathBuf,

    /// Per-category directory overrides, keyed by category name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub directories: BTreeMap<String, PathBuf>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            root_dir: default_export_root(),
            directories: BTreeMap::new(),
        }
    }
}

impl ExportConfig {
    /// Export configuration rooted at `root_dir` with no overrides
    pub fn rooted_at(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            directories: BTreeMap::new(),
        }
    }
}

/// A partial change to [`Settings`]; `None` fields are left untouched
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub base_url: Option<String>,
    /// `Some(None)` clears the key
    pub api_key: Option<Option<String>>,
    pub timeout_secs: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub max_attempts: Option<u32>,
    pub export_root: Option<PathBuf>,
}

fn default_base_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

fn default_max_attempts() -> u32 {
    30
}

fn default_max_page_follows() -> u32 {
    50
}

fn default_export_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(DEFAULT_EXPORT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_DIR_NAME))
}
