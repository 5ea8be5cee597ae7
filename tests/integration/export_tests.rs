//! Export store tests through the public API

use chrono::{TimeZone, Utc};
use crawl_explorer::config::ExportConfig;
use crawl_explorer::export::{ExportPayload, ExportRecord, METADATA_KEY};
use crawl_explorer::{ExportCategory, ExportFormat, ExportMetadata, ExportStore, ExplorerError};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

fn record(url: &str, format: ExportFormat, payload: ExportPayload) -> ExportRecord {
    let mut metadata = ExportMetadata::new(url);
    metadata.created_at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
    ExportRecord {
        category: ExportCategory::Scrape,
        format,
        payload,
        metadata,
        filename: None,
    }
}

fn text(s: &str) -> ExportPayload {
    ExportPayload::Text(s.to_string())
}

#[test]
fn test_search_matches_name_case_insensitively() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path()));

    store
        .save(&record(
            "https://example.com/changelog",
            ExportFormat::Markdown,
            text("# Changes"),
        ))
        .unwrap();
    store
        .save(&record(
            "https://example.com/home",
            ExportFormat::Markdown,
            text("# Home"),
        ))
        .unwrap();

    let found = store
        .list(ExportCategory::Scrape, Some("ChangeLog"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert!(found[0].filename.starts_with("example-com-changelog-"));

    let all = store.list(ExportCategory::Scrape, None).unwrap();
    let names: Vec<_> = all.iter().map(|s| s.filename.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "example-com-changelog-20250314-092653.md",
            "example-com-home-20250314-092653.md"
        ]
    );
}

#[test]
fn test_search_matches_description_and_tags() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path()));

    let mut tagged = record("https://example.com/a", ExportFormat::Text, text("a"));
    tagged.metadata = tagged.metadata.with_tags(["Quarterly-Report"]);
    store.save(&tagged).unwrap();

    let mut described = record("https://example.com/b", ExportFormat::Json, ExportPayload::Json(json!({ "b": 1 })));
    described.metadata = described.metadata.with_description("Pricing page snapshot");
    store.save(&described).unwrap();

    let by_tag = store.list(ExportCategory::Scrape, Some("quarterly")).unwrap();
    assert_eq!(by_tag.len(), 1);
    assert_eq!(by_tag[0].format, ExportFormat::Text);

    let by_description = store.list(ExportCategory::Scrape, Some("PRICING")).unwrap();
    assert_eq!(by_description.len(), 1);
    assert_eq!(by_description[0].format, ExportFormat::Json);
}

#[test]
fn test_same_second_saves_get_distinct_names() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path()));
    let rec = record("https://example.com/", ExportFormat::Markdown, text("same"));

    let paths: Vec<_> = (0..3).map(|_| store.save(&rec).unwrap()).collect();
    let names: Vec<_> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();

    assert_eq!(
        names,
        vec![
            "example-com-20250314-092653.md",
            "example-com-20250314-092653-1.md",
            "example-com-20250314-092653-2.md"
        ]
    );
    for path in &paths {
        assert!(path.with_extension("meta.json").exists());
    }
}

#[test]
fn test_json_export_embeds_metadata() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path()));
    let mut rec = record(
        "https://example.com/",
        ExportFormat::Json,
        ExportPayload::Json(json!(["https://example.com/a", "https://example.com/b"])),
    );
    rec.category = ExportCategory::Custom;
    rec.metadata = rec.metadata.with_tags(["links"]);

    let path = store.save(&rec).unwrap();
    let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(raw[METADATA_KEY]["tags"], json!(["links"]));

    let content = store.read(&path).unwrap();
    assert_eq!(
        content.payload,
        ExportPayload::Json(json!(["https://example.com/a", "https://example.com/b"]))
    );
    assert_eq!(content.metadata, Some(rec.metadata));
}

#[test]
fn test_doc_category_with_caller_filename() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path()));
    let mut rec = record("notes", ExportFormat::Markdown, text("# Notes\n"));
    rec.category = ExportCategory::Doc;
    rec.filename = Some("Meeting Notes.md".to_string());

    let path = store.save(&rec).unwrap();
    assert_eq!(path, dir.path().join("doc").join("Meeting-Notes.md"));

    let again = store.save(&rec).unwrap();
    assert_eq!(again, dir.path().join("doc").join("Meeting-Notes-1.md"));
}

#[test]
fn test_category_directory_override() {
    let dir = TempDir::new().unwrap();
    let mut config = ExportConfig::rooted_at(dir.path().join("root"));
    config
        .directories
        .insert("map".to_string(), dir.path().join("maps"));
    let store = ExportStore::new(config);

    let mut rec = record("https://example.com/", ExportFormat::Text, text("https://example.com/a\n"));
    rec.category = ExportCategory::Map;
    let path = store.save(&rec).unwrap();

    assert_eq!(path.parent().unwrap(), dir.path().join("maps"));
    assert_eq!(store.list(ExportCategory::Map, None).unwrap().len(), 1);
    assert!(store.read(&path).is_ok());
}

#[test]
fn test_read_and_delete_reject_foreign_paths() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path().join("exports")));
    store
        .save(&record("https://example.com/", ExportFormat::Text, text("x")))
        .unwrap();

    let outside = dir.path().join("secrets.txt");
    fs::write(&outside, "keep me").unwrap();

    assert!(matches!(
        store.read(&outside),
        Err(ExplorerError::InvalidInput { .. })
    ));
    assert!(matches!(
        store.delete(&outside),
        Err(ExplorerError::InvalidInput { .. })
    ));
    assert!(outside.exists());

    let sneaky = dir
        .path()
        .join("exports")
        .join("scrape")
        .join("..")
        .join("..")
        .join("secrets.txt");
    assert!(matches!(
        store.delete(&sneaky),
        Err(ExplorerError::InvalidInput { .. })
    ));
    assert!(outside.exists());
}

#[test]
fn test_malformed_sidecar_still_lists() {
    let dir = TempDir::new().unwrap();
    let store = ExportStore::new(ExportConfig::rooted_at(dir.path()));
    let path = store
        .save(&record("https://example.com/", ExportFormat::Html, text("<p>x</p>")))
        .unwrap();
    fs::write(path.with_extension("meta.json"), "{ broken").unwrap();

    let listed = store.list(ExportCategory::Scrape, None).unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].metadata.is_none());

    let content = store.read(&path).unwrap();
    assert_eq!(content.payload, text("<p>x</p>"));
    assert!(content.metadata.is_none());
}
