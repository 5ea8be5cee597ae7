//! Export module for persisting results
//!
//! # Layout
//!
//! ```text
//! <root>/
//!   scrape/  example-com-20240101-120000.md
//!            example-com-20240101-120000.meta.json
//!   map/     example-com-20240101-120500.json
//!   crawl/ doc/ custom/
//! ```
//!
//! - JSON exports embed their metadata under `_metadata`
//! - Other formats keep metadata in a `<stem>.meta.json` sidecar
//! - Writes go through a temporary file and an atomic rename

mod atomic;
mod naming;
mod record;
mod store;

// Re-export main types
pub use naming::{timestamp_suffix, SIDECAR_SUFFIX};
pub use record::{
    ExportCategory, ExportContent, ExportFormat, ExportMetadata, ExportPayload, ExportRecord,
    ExportSummary,
};
pub use store::{ExportStore, METADATA_KEY, PAYLOAD_KEY};
