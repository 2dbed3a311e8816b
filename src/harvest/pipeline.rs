//! Catalog build pipeline.
//!
//! This module provides the [`CatalogPipeline`] coordinator that runs one
//! full rebuild (Scan → {Extract → Classify → Copy+Hash}* → Sort+Serialize →
//! Render → Publish) with:
//! - Bounded parallel archive processing via [`CatalogExecutor`]
//! - Structured logging via `tracing`
//! - A staging directory that is swapped into place only once every output
//!   file has been written, and removed via RAII otherwise

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::TempDir;
use tracing::{error, info, instrument, warn};

use crate::config::{PipelineConfig, INDEX_HTML, INDEX_JSON};
use crate::executor::{ArtifactJob, CatalogExecutor};
use crate::harvest::catalog::{discard, write_catalog, CatalogBuilder, Catalogs};
use crate::harvest::dashboard::render_dashboard;
use crate::harvest::extract::ManifestExtractor;
use crate::harvest::scan::scan;
use crate::model::Category;

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that abort a run before anything is published.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Source unreadable, or output cannot be created, written or replaced
    #[error("cannot access '{}': {source}", path.display())]
    DirectoryAccess {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A catalog could not be serialized
    #[error("failed to serialize catalog: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking task panicked or was cancelled
    #[error("worker error: {0}")]
    Worker(String),
}

fn access_error(path: &Path) -> impl FnOnce(std::io::Error) -> PipelineError + '_ {
    move |source| PipelineError::DirectoryAccess {
        path: path.to_path_buf(),
        source,
    }
}

// ============================================================================
// Run Report
// ============================================================================

/// An archive left out of the run, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedArtifact {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// The catalogs as published
    pub catalogs: Catalogs,

    /// Archives excluded from every output
    pub skipped: Vec<SkippedArtifact>,

    /// Published `index.json` files, legacy first
    pub index_files: Vec<PathBuf>,

    /// Published `index.html`
    pub dashboard: PathBuf,

    /// Wall time of the whole run (milliseconds)
    pub total_duration_ms: u64,
}

impl RunReport {
    pub fn count(&self, category: Category) -> usize {
        self.catalogs.get(category).data.len()
    }
}

// ============================================================================
// Staging
// ============================================================================

/// Build directory inside the output root.
///
/// Everything a run produces is written here first; [`Staging::publish`]
/// then moves it over the live output. Dropping an unpublished `Staging`
/// deletes it, so an aborted run leaves the previous output untouched.
struct Staging {
    dir: TempDir,
}

/// A failed swap, and whether the previous output is back in place.
struct SwapError {
    error: PipelineError,
    restored: bool,
}

impl Staging {
    const PREFIX: &'static str = ".catalog-build-";

    /// Name of the directory holding replaced outputs until cleanup.
    const RETIRED: &'static str = ".retired";

    /// Creates the output root if needed, clears leftover build directories
    /// and creates a fresh one.
    fn create(output_dir: &Path) -> Result<Self, PipelineError> {
        std::fs::create_dir_all(output_dir).map_err(access_error(output_dir))?;
        Self::sweep(output_dir);

        let dir = tempfile::Builder::new()
            .prefix(Self::PREFIX)
            .tempdir_in(output_dir)
            .map_err(access_error(output_dir))?;

        for category in Category::ALL {
            let path = dir.path().join(category.dir_name());
            std::fs::create_dir(&path).map_err(access_error(&path))?;
        }
        Ok(Self { dir })
    }

    /// Removes build directories left by runs that never finished.
    ///
    /// A directory that still holds retired outputs is left in place, since
    /// it may be the only copy of an earlier catalog.
    fn sweep(output_dir: &Path) {
        let Ok(entries) = std::fs::read_dir(output_dir) else {
            return;
        };
        for entry in entries.filter_map(Result::ok) {
            if !entry.file_name().to_string_lossy().starts_with(Self::PREFIX) {
                continue;
            }
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let holds_retired = std::fs::read_dir(path.join(Self::RETIRED))
                .map(|mut d| d.next().is_some())
                .unwrap_or(false);
            if holds_retired {
                warn!(path = %path.display(), "Keeping interrupted build that holds retired outputs");
                continue;
            }
            match std::fs::remove_dir_all(&path) {
                Ok(()) => info!(path = %path.display(), "Removed leftover build directory"),
                Err(e) => warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to remove leftover build directory"
                ),
            }
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn category_dir(&self, category: Category) -> PathBuf {
        self.root().join(category.dir_name())
    }

    /// Removes anything a failed artifact may have left behind.
    fn discard_artifact(&self, file_name: &str) {
        for category in Category::ALL {
            discard(&self.category_dir(category).join(file_name));
        }
    }

    /// Replaces the published outputs in `output_dir` with the staged ones.
    ///
    /// Each output is moved aside before its replacement is moved in; on
    /// failure the outputs swapped so far are rolled back.
    fn publish(self, output_dir: &Path) -> Result<(), PipelineError> {
        self.publish_names(
            output_dir,
            &[
                Category::Legacy.dir_name(),
                Category::Extension.dir_name(),
                INDEX_HTML,
            ],
        )
    }

    fn publish_names(self, output_dir: &Path, names: &[&str]) -> Result<(), PipelineError> {
        let retired = self.root().join(Self::RETIRED);
        std::fs::create_dir(&retired).map_err(access_error(&retired))?;

        let mut swapped: Vec<(&str, bool)> = Vec::new();
        for &name in names {
            match self.swap(output_dir, &retired, name) {
                Ok(had_previous) => swapped.push((name, had_previous)),
                Err(SwapError { error, mut restored }) => {
                    for (name, had_previous) in swapped.into_iter().rev() {
                        restored &= self.rollback(output_dir, &retired, name, had_previous);
                    }
                    self.abandon(restored);
                    return Err(error);
                }
            }
        }

        let path = self.root().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!(path = %path.display(), error = %e, "Failed to remove staging directory");
        }
        Ok(())
    }

    /// Moves `output_dir/name` aside (if present) and the staged copy in.
    fn swap(&self, output_dir: &Path, retired: &Path, name: &str) -> Result<bool, SwapError> {
        let target = output_dir.join(name);
        let had_previous = target.symlink_metadata().is_ok();
        if had_previous {
            if let Err(source) = std::fs::rename(&target, retired.join(name)) {
                return Err(SwapError {
                    error: PipelineError::DirectoryAccess {
                        path: target,
                        source,
                    },
                    restored: true,
                });
            }
        }

        let staged = self.root().join(name);
        if let Err(source) = std::fs::rename(&staged, &target) {
            let restored = !had_previous || restore(&retired.join(name), &target);
            return Err(SwapError {
                error: PipelineError::DirectoryAccess {
                    path: target,
                    source,
                },
                restored,
            });
        }
        Ok(had_previous)
    }

    /// Undoes a completed swap. Returns whether the previous output is back.
    fn rollback(
        &self,
        output_dir: &Path,
        retired: &Path,
        name: &str,
        had_previous: bool,
    ) -> bool {
        let target = output_dir.join(name);
        if let Err(e) = std::fs::rename(&target, self.root().join(name)) {
            error!(path = %target.display(), error = %e, "Failed to withdraw new output");
            return false;
        }
        !had_previous || restore(&retired.join(name), &target)
    }

    /// Disposes of a staging directory after a failed publish.
    ///
    /// When some previous output could not be put back the directory is kept
    /// on disk, and its path returned, so the retired copy is not lost.
    fn abandon(self, restored: bool) -> Option<PathBuf> {
        if restored {
            return None;
        }
        let path = self.dir.keep();
        error!(
            path = %path.join(Self::RETIRED).display(),
            "Previous output could not be restored; retired copy kept"
        );
        Some(path)
    }
}

fn restore(retired: &Path, target: &Path) -> bool {
    match std::fs::rename(retired, target) {
        Ok(()) => true,
        Err(e) => {
            error!(path = %target.display(), error = %e, "Failed to restore previous output");
            false
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> PipelineError {
    PipelineError::Worker(format!("Task join error: {}", e))
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Full-rebuild catalog pipeline.
///
/// # Example
///
/// ```ignore
/// use addon_catalog::{CatalogPipeline, PipelineConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = PipelineConfig::new("src", "repo").with_concurrency(4);
///     let report = CatalogPipeline::new(config).run().await?;
///     println!("Skipped {} archives", report.skipped.len());
///     Ok(())
/// }
/// ```
pub struct CatalogPipeline {
    config: Arc<PipelineConfig>,
    extractor: Arc<ManifestExtractor>,
    executor: CatalogExecutor,
}

impl CatalogPipeline {
    /// Creates a pipeline with the default manifest formats
    /// (extension manifest first, then legacy `bl_info`).
    pub fn new(config: PipelineConfig) -> Self {
        let executor = CatalogExecutor::new(config.concurrency);
        Self {
            config: Arc::new(config),
            extractor: Arc::new(ManifestExtractor::default()),
            executor,
        }
    }

    /// Replaces the manifest extractor.
    pub fn with_extractor(mut self, extractor: ManifestExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Runs one complete rebuild of the output directory.
    ///
    /// Archives whose manifest is missing or broken, or whose copy cannot be
    /// hashed, are skipped and listed in [`RunReport::skipped`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if the source directory cannot be read or
    /// the output cannot be written. Nothing is published in that case.
    #[instrument(skip(self), fields(
        source = %self.config.source_dir.display(),
        output = %self.config.output_dir.display()
    ))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let config = Arc::clone(&self.config);

        // ====================================================================
        // Stage 1: Scan
        // ====================================================================

        let source_dir = config.source_dir.clone();
        let artifacts = tokio::task::spawn_blocking(move || {
            scan(&source_dir).map_err(access_error(&source_dir))
        })
        .await
        .map_err(join_error)??;
        info!(archives = artifacts.len(), "Scanned source directory");

        // ====================================================================
        // Stage 2: Staging
        // ====================================================================

        let output_dir = config.output_dir.clone();
        let staging = {
            let output_dir = output_dir.clone();
            tokio::task::spawn_blocking(move || Staging::create(&output_dir))
                .await
                .map_err(join_error)??
        };

        // ====================================================================
        // Stage 3: Extract → Classify → Copy+Hash (per archive)
        // ====================================================================

        let job = Arc::new(ArtifactJob::new(
            Arc::clone(&self.extractor),
            Arc::clone(&config),
            staging.root().to_path_buf(),
        ));
        let outcomes = self.executor.execute(job, artifacts).await;

        let mut builder = CatalogBuilder::new(config.catalog_version.as_str());
        let mut skipped = Vec::new();
        let mut discarded = Vec::new();
        for outcome in outcomes {
            match outcome.result {
                Ok(processed) => builder.push(processed.category, processed.entry),
                Err(e) => {
                    warn!(
                        artifact = %outcome.artifact.path.display(),
                        reason = %e,
                        "Skipping archive"
                    );
                    discarded.push(outcome.artifact.file_name);
                    skipped.push(SkippedArtifact {
                        path: outcome.artifact.path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        // ====================================================================
        // Stage 4: Sort + Serialize, Render, Publish
        // ====================================================================

        let catalogs = builder.finish();
        let published = catalogs.clone();
        tokio::task::spawn_blocking(move || {
            for file_name in &discarded {
                staging.discard_artifact(file_name);
            }
            for category in Category::ALL {
                write_catalog(&staging.category_dir(category), published.get(category))?;
            }
            let html_path = staging.root().join(INDEX_HTML);
            std::fs::write(&html_path, render_dashboard(&published))
                .map_err(access_error(&html_path))?;
            staging.publish(&output_dir)
        })
        .await
        .map_err(join_error)??;

        let output_dir = &config.output_dir;
        let report = RunReport {
            catalogs,
            skipped,
            index_files: Category::ALL
                .iter()
                .map(|c| output_dir.join(c.dir_name()).join(INDEX_JSON))
                .collect(),
            dashboard: output_dir.join(INDEX_HTML),
            total_duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            addons = report.count(Category::Legacy),
            extensions = report.count(Category::Extension),
            skipped = report.skipped.len(),
            duration_ms = report.total_duration_ms,
            "Catalog published"
        );
        Ok(report)
    }
}

// ============================================================================
// Tests
// ============================================================================
