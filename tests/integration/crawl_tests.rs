//! Crawl job tests
//!
//! Submission, polling, cursor following, timeouts and resumption against a
//! mock crawling service.

use crate::common::{status_body, test_explorer, test_settings};
use crawl_explorer::api::CrawlOptions;
use crawl_explorer::explorer::ExportOptions;
use crawl_explorer::export::{ExportFormat, ExportPayload};
use crawl_explorer::model::ApiResult;
use crawl_explorer::{ExportCategory, Explorer, ExplorerError, JobStatus};
use serde_json::json;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_submit(server: &MockServer, job_id: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "id": job_id,
            "url": format!("{}/v1/crawl/{}", server.uri(), job_id)
        })))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_crawl_completes_after_polling() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "job-1").await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("scraping", &["https://example.com/"], 3)),
        )
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/job-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(
            "completed",
            &[
                "https://example.com/",
                "https://example.com/docs",
                "https://example.com/blog",
            ],
            3,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let result = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.job_id, "job-1");
    assert_eq!(result.status, JobStatus::Completed);
    assert_eq!(result.page_count(), 3);
    assert_eq!(result.total, 3);
    assert!(!result.truncated);

    server.verify().await;
}

#[tokio::test]
async fn test_rejected_submission_never_polls() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .respond_with(
            ResponseTemplate::new(402).set_body_json(json!({ "error": "Insufficient credits" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed", &[], 0)))
        .expect(0)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let err = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ExplorerError::Api { status, message } => {
            assert_eq!(status, 402);
            assert_eq!(message, "Insufficient credits");
        }
        other => panic!("expected Api error, got {:?}", other),
    }

    server.verify().await;
}

#[tokio::test]
async fn test_invalid_options_never_reach_the_service() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let err = explorer
        .crawl(
            &CrawlOptions::new("https://example.com").with_limit(0),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::InvalidInput { ref field, .. } if field == "limit"));
}

#[tokio::test]
async fn test_timeout_then_resume() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "slow-job").await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/slow-job"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("scraping", &["https://example.com/"], 2)),
        )
        .up_to_n_times(3)
        .expect(3)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/slow-job"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(
            "completed",
            &["https://example.com/", "https://example.com/about"],
            2,
        )))
        .mount(&server)
        .await;

    let mut settings = test_settings(&server, dir.path());
    settings.poller.max_attempts = 3;
    let explorer = Explorer::new(settings).unwrap();

    let err = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap_err();
    let job_id = match err {
        ExplorerError::TimedOut { job_id, attempts } => {
            assert_eq!(attempts, 3);
            job_id
        }
        other => panic!("expected TimedOut, got {:?}", other),
    };

    let result = explorer
        .resume_crawl(&job_id, CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(result.job_id, "slow-job");
    assert_eq!(result.page_count(), 2);
}

#[tokio::test]
async fn test_remote_failure_keeps_partial_pages() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "doomed").await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/doomed"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(status_body("failed", &["https://example.com/"], 10)),
        )
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let err = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ExplorerError::JobFailed {
            status, partial, ..
        } => {
            assert_eq!(status, JobStatus::Failed);
            assert_eq!(partial.page_count(), 1);
        }
        other => panic!("expected JobFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_follows_next_cursor() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "paged").await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/paged"))
        .and(query_param("skip", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(
            "completed",
            &["https://example.com/c"],
            3,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut first = status_body(
        "completed",
        &["https://example.com/a", "https://example.com/b"],
        3,
    );
    first["next"] = json!(format!("{}/v1/crawl/paged?skip=2", server.uri()));
    Mock::given(method("GET"))
        .and(path("/v1/crawl/paged"))
        .respond_with(ResponseTemplate::new(200).set_body_json(first))
        .expect(1)
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let result = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap();

    let urls: Vec<_> = result.pages.iter().filter_map(|p| p.source_url()).collect();
    assert_eq!(
        urls,
        vec![
            "https://example.com/a",
            "https://example.com/b",
            "https://example.com/c"
        ]
    );
    server.verify().await;
}

#[tokio::test]
async fn test_cursor_to_another_host_is_not_followed() {
    let server = MockServer::start().await;
    let foreign = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "redirected").await;

    let mut status = status_body("completed", &["https://example.com/"], 2);
    status["next"] = json!(format!("{}/steal", foreign.uri()));
    Mock::given(method("GET"))
        .and(path("/v1/crawl/redirected"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed", &[], 0)))
        .expect(0)
        .mount(&foreign)
        .await;

    let mut settings = test_settings(&server, dir.path());
    settings.api.api_key = Some("fc-secret".to_string());
    let explorer = Explorer::new(settings).unwrap();

    let err = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ExplorerError::Protocol(_)));

    foreign.verify().await;
    server.verify().await;
}

#[tokio::test]
async fn test_submission_carries_key_and_options() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();

    Mock::given(method("POST"))
        .and(path("/v1/crawl"))
        .and(header("authorization", "Bearer fc-test"))
        .and(header("x-idempotency-key", "retry-safe"))
        .and(body_partial_json(json!({
            "url": "https://example.com/",
            "limit": 25,
            "maxDepth": 2,
            "includePaths": ["^/docs/"]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": "keyed" })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/keyed"))
        .and(header("authorization", "Bearer fc-test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("completed", &[], 0)))
        .expect(1)
        .mount(&server)
        .await;

    let mut settings = test_settings(&server, dir.path());
    settings.api.api_key = Some("fc-test".to_string());
    let explorer = Explorer::new(settings).unwrap();

    let mut options = CrawlOptions::new("https://example.com").with_limit(25);
    options.include_paths = vec!["^/docs/".to_string()];

    explorer
        .crawl_with(&options, Some("retry-safe"), CancellationToken::new(), |_| {})
        .await
        .unwrap();
    server.verify().await;
}

#[tokio::test]
async fn test_cancelled_wait_stops_polling() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "long").await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/long"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body("scraping", &[], 100)))
        .mount(&server)
        .await;

    let mut settings = test_settings(&server, dir.path());
    settings.poller.poll_interval_ms = 60_000;
    let explorer = Explorer::new(settings).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let err = explorer
        .crawl_with(
            &CrawlOptions::new("https://example.com"),
            None,
            cancel,
            move |_| trigger.cancel(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ExplorerError::Cancelled { ref job_id } if job_id == "long"));
}

#[tokio::test]
async fn test_crawl_result_exports_as_json() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    mount_submit(&server, "to-save").await;

    Mock::given(method("GET"))
        .and(path("/v1/crawl/to-save"))
        .respond_with(ResponseTemplate::new(200).set_body_json(status_body(
            "completed",
            &["https://example.com/", "https://example.com/docs"],
            2,
        )))
        .mount(&server)
        .await;

    let explorer = test_explorer(&server, dir.path());
    let result = explorer
        .crawl(&CrawlOptions::new("https://example.com"), CancellationToken::new())
        .await
        .unwrap();

    let path = explorer
        .save_export(
            &ApiResult::from(result),
            &ExportOptions::new(ExportFormat::Json),
        )
        .unwrap();
    assert_eq!(path.parent().unwrap(), dir.path().join("crawl"));

    let content = explorer.read_export(&path).unwrap();
    match content.payload {
        ExportPayload::Json(value) => {
            assert_eq!(value["job_id"], "to-save");
            assert_eq!(value["pages"].as_array().unwrap().len(), 2);
            assert!(value.get("_metadata").is_none());
        }
        other => panic!("expected JSON payload, got {:?}", other),
    }
    assert_eq!(
        content.metadata.unwrap().source_url,
        "https://example.com/"
    );

    let listed = explorer.list_exports(ExportCategory::Crawl, None).unwrap();
    assert_eq!(listed.len(), 1);

    let markdown = explorer.save_export(
        &ApiResult::from(crawl_explorer::model::CrawlResult::new("x", None)),
        &ExportOptions::new(ExportFormat::Markdown),
    );
    assert!(matches!(markdown, Err(ExplorerError::InvalidInput { .. })));
}
