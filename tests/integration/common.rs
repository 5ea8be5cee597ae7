use crawl_explorer::config::{ExportConfig, Settings};
use crawl_explorer::Explorer;
use serde_json::{json, Value};
use std::path::Path;
use wiremock::MockServer;

/// Settings pointing at `server` with fast polling and exports under `root`
pub fn test_settings(server: &MockServer, root: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.api.base_url = server.uri();
    settings.api.timeout_secs = 5;
    settings.poller.poll_interval_ms = 1;
    settings.poller.max_attempts = 30;
    settings.exports = ExportConfig::rooted_at(root);
    settings
}

pub fn test_explorer(server: &MockServer, root: &Path) -> Explorer {
    Explorer::new(test_settings(server, root)).unwrap()
}

/// A crawl status body with one document per URL
pub fn status_body(status: &str, urls: &[&str], total: u32) -> Value {
    let data: Vec<Value> = urls
        .iter()
        .map(|url| {
            json!({
                "markdown": format!("# {}", url),
                "metadata": { "sourceURL": url, "statusCode": 200 }
            })
        })
        .collect();

    json!({
        "status": status,
        "completed": urls.len(),
        "total": total,
        "creditsUsed": urls.len(),
        "expiresAt": "2030-01-01T00:00:00.000Z",
        "data": data
    })
}
