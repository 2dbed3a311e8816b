//! Run configuration.
//!
//! Everything that used to be a process-wide constant (directories, the
//! extension threshold, schema tags) lives here and is handed to
//! [`CatalogPipeline::new`](crate::harvest::CatalogPipeline::new), so tests
//! and concurrent runs can each use their own values.

use crate::model::{Category, HostVersion};
use std::path::PathBuf;

/// Minimum host version at which an add-on counts as an extension.
pub const DEFAULT_EXTENSION_THRESHOLD: HostVersion = HostVersion(4, 3, 0);

/// `schema_version` stamped on every catalog entry.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0.0";

/// `version` tag of each `index.json` document.
pub const DEFAULT_CATALOG_VERSION: &str = "v1";

/// File extension (lowercase, without dot) of source archives.
pub const ARCHIVE_EXTENSION: &str = "zip";

pub const INDEX_JSON: &str = "index.json";
pub const INDEX_HTML: &str = "index.html";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory scanned (non-recursively) for archives.
    pub source_dir: PathBuf,

    /// Root of the published static site.
    pub output_dir: PathBuf,

    pub extension_threshold: HostVersion,
    pub schema_version: String,
    pub catalog_version: String,

    /// Prefix for `archive_url`; relative URLs when `None`.
    pub base_url: Option<String>,

    /// Maximum number of archives processed at once.
    pub concurrency: usize,
}

impl PipelineConfig {
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
            extension_threshold: DEFAULT_EXTENSION_THRESHOLD,
            schema_version: DEFAULT_SCHEMA_VERSION.to_string(),
            catalog_version: DEFAULT_CATALOG_VERSION.to_string(),
            base_url: None,
            concurrency: default_concurrency(),
        }
    }

    pub fn with_extension_threshold(mut self, threshold: HostVersion) -> Self {
        self.extension_threshold = threshold;
        self
    }

    pub fn with_schema_version(mut self, schema_version: impl Into<String>) -> Self {
        self.schema_version = schema_version.into();
        self
    }

    pub fn with_catalog_version(mut self, catalog_version: impl Into<String>) -> Self {
        self.catalog_version = catalog_version.into();
        self
    }

    /// Sets the public URL the output directory is served from.
    ///
    /// Empty strings are treated as unset; a trailing `/` is dropped.
    pub fn with_base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// `archive_url` of `file_name` published under `category`.
    pub fn archive_url(&self, category: Category, file_name: &str) -> String {
        let relative = relative_archive_path(category, file_name);
        match &self.base_url {
            Some(base) => format!("{base}/{relative}"),
            None => relative,
        }
    }
}

/// Path of a published archive relative to the output root.
pub fn relative_archive_path(category: Category, file_name: &str) -> String {
    format!("{}/{}", category.dir_name(), file_name)
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
