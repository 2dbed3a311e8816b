//! Harvest module - archive scanning, manifest extraction and catalog output.
//!
//! This module provides the stages of a catalog build:
//! - **Scan**: [`scan`] lists the source archives
//! - **Extract**: [`ManifestExtractor`] reads one of the [`formats`]
//! - **Classify**: [`classify`] picks the category
//! - **Hash**: [`compute_archive_digest`] fingerprints the published copy
//! - **Catalog**: [`CatalogBuilder`] assembles and sorts `index.json`
//! - **Dashboard**: [`render_dashboard`] produces `index.html`
//! - **Pipeline**: [`CatalogPipeline`] runs them all and publishes atomically

pub mod catalog;
pub mod classify;
pub mod dashboard;
pub mod extract;
pub mod formats;
pub mod hash;
pub mod pipeline;
pub mod scan;

pub use catalog::{build_entry, publish_archive, write_catalog, CatalogBuilder, Catalogs};
pub use classify::{classify, ADDON_TYPE};
pub use dashboard::{escape_html, render_dashboard};
pub use extract::ManifestExtractor;
pub use hash::{compute_archive_digest, ArchiveDigest};
pub use pipeline::{CatalogPipeline, PipelineError, RunReport, SkippedArtifact};
pub use scan::{scan, SourceArtifact};
