use crate::config::PipelineConfig;
use crate::harvest::catalog::{build_entry, publish_archive};
use crate::harvest::classify::classify;
use crate::harvest::extract::ManifestExtractor;
use crate::harvest::scan::SourceArtifact;
use crate::model::{CatalogEntry, Category};
use crate::traits::ManifestError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument};

/// Reasons a single archive is left out of the run.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    #[error("failed to copy archive to '{}': {source}", path.display())]
    Copy {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to hash '{}': {source}", path.display())]
    HashComputation {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("worker error: {0}")]
    Worker(String),
}

/// An archive that made it into a category.
#[derive(Debug, Clone)]
pub struct ProcessedArtifact {
    pub category: Category,
    pub entry: CatalogEntry,
}

#[derive(Debug)]
pub struct ArtifactOutcome {
    pub artifact: SourceArtifact,
    pub result: Result<ProcessedArtifact, ArtifactError>,
}

/// Extract → classify → copy → hash for one archive.
///
/// Shares nothing mutable with other artifacts; each one writes only its own
/// file under `staging_root/<category>/`.
pub struct ArtifactJob {
    extractor: Arc<ManifestExtractor>,
    config: Arc<PipelineConfig>,
    staging_root: PathBuf,
}

impl ArtifactJob {
    pub fn new(
        extractor: Arc<ManifestExtractor>,
        config: Arc<PipelineConfig>,
        staging_root: PathBuf,
    ) -> Self {
        Self {
            extractor,
            config,
            staging_root,
        }
    }

    pub fn process(&self, artifact: &SourceArtifact) -> Result<ProcessedArtifact, ArtifactError> {
        let manifest = self.extractor.extract(artifact)?;
        let category = classify(&manifest, self.config.extension_threshold);
        debug!(
            artifact = %artifact.file_name,
            id = %manifest.id,
            category = %category,
            "Classified archive"
        );

        let dest = self
            .staging_root
            .join(category.dir_name())
            .join(&artifact.file_name);
        let digest = publish_archive(&artifact.path, &dest)?;

        let archive_url = self.config.archive_url(category, &artifact.file_name);
        let entry = build_entry(manifest, &self.config.schema_version, digest, archive_url);
        Ok(ProcessedArtifact { category, entry })
    }
}

/// Runs [`ArtifactJob`]s on the blocking pool with bounded concurrency.
pub struct CatalogExecutor {
    semaphore: Arc<Semaphore>,
}

impl CatalogExecutor {
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(concurrency_limit.max(1))),
        }
    }

    /// Processes every artifact and returns outcomes in input order.
    ///
    /// A failing or panicking artifact only affects its own outcome.
    #[instrument(skip_all, fields(artifacts = artifacts.len()))]
    pub async fn execute(
        &self,
        job: Arc<ArtifactJob>,
        artifacts: Vec<SourceArtifact>,
    ) -> Vec<ArtifactOutcome> {
        let handles: Vec<_> = artifacts
            .iter()
            .cloned()
            .map(|artifact| {
                tokio::spawn(run_one(
                    Arc::clone(&self.semaphore),
                    Arc::clone(&job),
                    artifact,
                ))
            })
            .collect();

        let mut outcomes = Vec::with_capacity(artifacts.len());
        for (artifact, handle) in artifacts.into_iter().zip(handles) {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(ArtifactError::Worker(format!("Task join error: {}", e))),
            };
            outcomes.push(ArtifactOutcome { artifact, result });
        }

        info!(
            processed = outcomes.iter().filter(|o| o.result.is_ok()).count(),
            total = outcomes.len(),
            "Finished processing archives"
        );
        outcomes
    }
}

async fn run_one(
    semaphore: Arc<Semaphore>,
    job: Arc<ArtifactJob>,
    artifact: SourceArtifact,
) -> Result<ProcessedArtifact, ArtifactError> {
    let _permit = semaphore
        .acquire_owned()
        .await
        .map_err(|e| ArtifactError::Worker(format!("Semaphore error: {}", e)))?;

    tokio::task::spawn_blocking(move || job.process(&artifact))
        .await
        .map_err(|e| ArtifactError::Worker(format!("Task join error: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::extract::tests::write_zip;
    use crate::harvest::scan::scan;
    use tempfile::TempDir;

    fn job(staging: &TempDir) -> Arc<ArtifactJob> {
        for category in Category::ALL {
            std::fs::create_dir_all(staging.path().join(category.dir_name())).unwrap();
        }
        let config = Arc::new(PipelineConfig::new("unused", "unused"));
        Arc::new(ArtifactJob::new(
            Arc::new(ManifestExtractor::default()),
            config,
            staging.path().to_path_buf(),
        ))
    }

    #[tokio::test]
    async fn test_execute_keeps_input_order_and_isolates_failures() {
        let source = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        write_zip(
            &source.path().join("a.zip"),
            &[("blender_manifest.toml", "id = \"a\"\nversion = \"1.0.0\"\ntype = \"add-on\"\nblender_version_min = \"4.3.0\"\n")],
        );
        write_zip(&source.path().join("b.zip"), &[("README.md", "none")]);
        write_zip(
            &source.path().join("c.zip"),
            &[("c/__init__.py", "bl_info = {'name': 'C Tool', 'blender': (2, 80, 0)}")],
        );

        let artifacts = scan(source.path()).unwrap();
        let outcomes = CatalogExecutor::new(2).execute(job(&staging), artifacts).await;

        let names: Vec<_> = outcomes.iter().map(|o| o.artifact.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.zip", "b.zip", "c.zip"]);

        let a = outcomes[0].result.as_ref().unwrap();
        assert_eq!(a.category, Category::Extension);
        assert_eq!(a.entry.archive_url, "extensions/a.zip");
        assert!(staging.path().join("extensions/a.zip").exists());

        assert!(matches!(
            outcomes[1].result,
            Err(ArtifactError::Manifest(ManifestError::NotFound))
        ));
        assert!(!staging.path().join("addons/b.zip").exists());
        assert!(!staging.path().join("extensions/b.zip").exists());

        let c = outcomes[2].result.as_ref().unwrap();
        assert_eq!(c.category, Category::Legacy);
        assert_eq!(c.entry.id, "c_tool");
        assert!(staging.path().join("addons/c.zip").exists());
    }

    #[tokio::test]
    async fn test_missing_staging_dir_is_copy_error() {
        let source = TempDir::new().unwrap();
        let staging = TempDir::new().unwrap();
        write_zip(
            &source.path().join("a.zip"),
            &[("__init__.py", "bl_info = {'name': 'A'}")],
        );
        let job = Arc::new(ArtifactJob::new(
            Arc::new(ManifestExtractor::default()),
            Arc::new(PipelineConfig::new("unused", "unused")),
            staging.path().join("absent"),
        ));

        let outcomes = CatalogExecutor::new(1)
            .execute(job, scan(source.path()).unwrap())
            .await;
        assert!(matches!(outcomes[0].result, Err(ArtifactError::Copy { .. })));
    }
}
