//! Settings for Crawl Explorer
//!
//! This module defines the settings schema consumed by the transport, the job
//! poller and the export store, along with validation, partial updates and an
//! optional TOML loader.
//!
//! # Example
//!
//! ```no_run
//! use crawl_explorer::config::load_config;
//! use std::path::Path;
//!
//! let settings = load_config(Path::new("explorer.toml")).unwrap();
//! println!("Talking to {}", settings.api.base_url);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ApiConfig, ExportConfig, PollerConfig, Settings, SettingsUpdate, DEFAULT_API_URL,
    DEFAULT_EXPORT_DIR_NAME,
};

// Re-export parser functions
pub use parser::{load_config, parse_config};
pub use validation::validate;

use crate::ConfigResult;

impl Settings {
    /// Applies a partial update and returns the validated result
    ///
    /// The receiver is left untouched if validation fails.
    pub fn apply(&self, update: SettingsUpdate) -> ConfigResult<Settings> {
        let mut next = self.clone();

        if let Some(base_url) = update.base_url {
            next.api.base_url = base_url.trim().to_string();
        }
        if let Some(api_key) = update.api_key {
            next.api.api_key = api_key;
        }
        if let Some(timeout_secs) = update.timeout_secs {
            next.api.timeout_secs = timeout_secs;
        }
        if let Some(poll_interval_ms) = update.poll_interval_ms {
            next.poller.poll_interval_ms = poll_interval_ms;
        }
        if let Some(max_attempts) = update.max_attempts {
            next.poller.max_attempts = max_attempts;
        }
        if let Some(root) = update.export_root {
            next.exports.root_dir = root;
        }

        next.normalize();
        validate(&next)?;
        Ok(next)
    }

    /// Drops blank API keys so "no key" has a single representation
    pub(crate) fn normalize(&mut self) {
        if self.api.api_key().is_none() {
            self.api.api_key = None;
        }
    }
}
