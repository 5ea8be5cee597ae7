//! Scrape and map tests

use crate::common::{test_explorer, test_settings};
use crawl_explorer::api::{MapOptions, ScrapeFormat, ScrapeOptions};
use crawl_explorer::config::SettingsUpdate;
use crawl_explorer::explorer::ExportOptions;
use crawl_explorer::export::{ExportFormat, ExportPayload, SIDECAR_SUFFIX};
use crawl_explorer::model::ApiResult;
use crawl_explorer::{ExportCategory, Explorer, ExplorerError};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_scrape(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {
                "markdown": "# Changelog\n\n- v2 released\n",
                "html": "<h1>Changelog</h1>",
                "metadata": {
                    "title": "Changelog",
                    "sourceURL": "https://example.com/changelog",
                    "statusCode": 200
                }
            }
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_scrape_request_body() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/scrape"))
        .and(body_json(json!({
            "url": "https://example.com/changelog",
            "formats": ["markdown", "html"],
            "onlyMainContent": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": { "markdown": "# Changelog" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let mut options = ScrapeOptions::new("https://example.com/changelog")
        .with_formats([ScrapeFormat::Markdown, ScrapeFormat::Html]);
    options.only_main_content = Some(true);
    options.include_tags = Vec::new();

    let result = explorer.scrape(&options).await.unwrap();
    assert_eq!(result.document.markdown.as_deref(), Some("# Changelog"));
    server.verify().await;
}

#[tokio::test]
async fn test_scrape_markdown_export_and_delete() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_scrape(&server).await;

    let explorer = test_explorer(&server, dir.path());
    let result = explorer
        .scrape(&ScrapeOptions::new("https://example.com/changelog"))
        .await
        .unwrap();

    let mut options = ExportOptions::new(ExportFormat::Markdown);
    options.tags = vec!["releases".to_string()];
    let path = explorer
        .save_export(&ApiResult::from(result), &options)
        .unwrap();

    let filename = path.file_name().unwrap().to_string_lossy().into_owned();
    assert!(filename.starts_with("example-com-changelog-"));
    assert!(filename.ends_with(".md"));

    let sidecar = path.with_file_name(format!(
        "{}{}",
        filename.trim_end_matches(".md"),
        SIDECAR_SUFFIX
    ));
    assert!(sidecar.exists());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "# Changelog\n\n- v2 released\n"
    );

    explorer.delete_export(&path).unwrap();
    assert!(!path.exists());
    assert!(!sidecar.exists());
    assert!(explorer
        .list_exports(ExportCategory::Scrape, None)
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_scrape_missing_format_is_reported() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_scrape(&server).await;

    let explorer = test_explorer(&server, dir.path());
    let result = explorer
        .scrape(&ScrapeOptions::new("https://example.com/changelog"))
        .await
        .unwrap();

    let err = explorer
        .save_export(&ApiResult::from(result), &ExportOptions::new(ExportFormat::Text))
        .unwrap_err();
    assert!(matches!(err, ExplorerError::MissingContent { ref format } if format == "text"));
}

#[tokio::test]
async fn test_map_json_export_round_trip() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/map"))
        .and(body_json(json!({
            "url": "https://example.com/",
            "search": "docs",
            "ignoreSitemap": true,
            "sitemapOnly": false,
            "limit": 5000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "links": ["https://example.com/docs", "https://example.com/docs/api"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let mut options = MapOptions::new("https://example.com");
    options.search = Some("docs".to_string());
    let result = explorer.map(&options).await.unwrap();
    assert_eq!(result.links.len(), 2);

    let mut export = ExportOptions::new(ExportFormat::Json);
    export.description = Some("Docs pages".to_string());
    let path = explorer
        .save_export(&ApiResult::from(result), &export)
        .unwrap();

    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw["total"], 2);
    assert_eq!(raw["_metadata"]["description"], "Docs pages");

    let content = explorer.read_export(&path).unwrap();
    assert_eq!(
        content.payload,
        ExportPayload::Json(json!({
            "url": "https://example.com/",
            "links": ["https://example.com/docs", "https://example.com/docs/api"],
            "total": 2
        }))
    );
    assert_eq!(
        content.metadata.unwrap().description.as_deref(),
        Some("Docs pages")
    );
}

#[tokio::test]
async fn test_map_conflicting_sitemap_flags_rejected_locally() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let mut options = MapOptions::new("https://example.com");
    options.sitemap_only = Some(true);
    options.ignore_sitemap = Some(true);

    assert!(matches!(
        explorer.map(&options).await,
        Err(ExplorerError::InvalidInput { .. })
    ));
}

#[tokio::test]
async fn test_updated_key_is_used_for_later_requests() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/map"))
        .and(header("authorization", "Bearer fc-new"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "links": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let mut explorer = Explorer::new(test_settings(&server, dir.path())).unwrap();
    explorer
        .update_settings(SettingsUpdate {
            api_key: Some(Some("fc-new".to_string())),
            ..Default::default()
        })
        .unwrap();

    let result = explorer
        .map(&MapOptions::new("https://example.com"))
        .await
        .unwrap();
    assert!(result.links.is_empty());
    server.verify().await;
}
