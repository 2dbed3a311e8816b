//! Catalog assembly and `index.json` serialization.

use super::hash::{compute_archive_digest, ArchiveDigest};
use super::pipeline::PipelineError;
use crate::config::INDEX_JSON;
use crate::executor::ArtifactError;
use crate::model::{Catalog, CatalogEntry, Category, Manifest};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Copies an archive byte-for-byte to `dest` and hashes the copy.
///
/// Copy and hash form one unit: if either fails, nothing is left at `dest`.
pub fn publish_archive(source: &Path, dest: &Path) -> Result<ArchiveDigest, ArtifactError> {
    if let Err(source_err) = std::fs::copy(source, dest) {
        discard(dest);
        return Err(ArtifactError::Copy {
            path: dest.to_path_buf(),
            source: source_err,
        });
    }

    compute_archive_digest(dest).map_err(|source_err| {
        discard(dest);
        ArtifactError::HashComputation {
            path: dest.to_path_buf(),
            source: source_err,
        }
    })
}

/// Best-effort removal of a partially published archive.
pub(crate) fn discard(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial archive"),
    }
}

/// Combines a manifest with its published archive's details.
pub fn build_entry(
    manifest: Manifest,
    schema_version: &str,
    digest: ArchiveDigest,
    archive_url: String,
) -> CatalogEntry {
    CatalogEntry {
        id: manifest.id,
        schema_version: schema_version.to_string(),
        name: manifest.name,
        version: manifest.version,
        tagline: manifest.tagline,
        archive_hash: digest.hash,
        archive_size: digest.size,
        archive_url,
        kind: manifest.kind,
        blender_version_min: manifest.blender_version_min,
        website: manifest.website,
        maintainer: manifest.maintainer,
        license: manifest.license,
    }
}

/// Collects entries per category and produces the sorted catalogs.
#[derive(Debug)]
pub struct CatalogBuilder {
    catalog_version: String,
    legacy: Vec<CatalogEntry>,
    extensions: Vec<CatalogEntry>,
}

impl CatalogBuilder {
    pub fn new(catalog_version: impl Into<String>) -> Self {
        Self {
            catalog_version: catalog_version.into(),
            legacy: Vec::new(),
            extensions: Vec::new(),
        }
    }

    fn list_mut(&mut self, category: Category) -> &mut Vec<CatalogEntry> {
        match category {
            Category::Legacy => &mut self.legacy,
            Category::Extension => &mut self.extensions,
        }
    }

    /// Appends an entry. Entries sharing an `id` are all kept.
    pub fn push(&mut self, category: Category, entry: CatalogEntry) {
        let list = self.list_mut(category);
        if let Some(existing) = list.iter().find(|e| e.id == entry.id) {
            warn!(
                id = %entry.id,
                category = %category,
                first = %existing.archive_url,
                second = %entry.archive_url,
                "Duplicate id in category, keeping both entries"
            );
        }
        list.push(entry);
    }

    pub fn len(&self, category: Category) -> usize {
        match category {
            Category::Legacy => self.legacy.len(),
            Category::Extension => self.extensions.len(),
        }
    }

    /// Sorts each list by `version` and wraps it in a [`Catalog`].
    ///
    /// Versions compare as plain strings, so `"1.10.0"` sorts before
    /// `"1.2.0"`. The sort is stable: equal versions keep insertion order.
    pub fn finish(self) -> Catalogs {
        let wrap = |mut data: Vec<CatalogEntry>| {
            data.sort_by(|a, b| a.version.cmp(&b.version));
            Catalog {
                blocklist: Vec::new(),
                data,
                version: self.catalog_version.clone(),
            }
        };
        Catalogs {
            legacy: wrap(self.legacy),
            extensions: wrap(self.extensions),
        }
    }
}

/// The two finished catalogs of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalogs {
    pub legacy: Catalog,
    pub extensions: Catalog,
}

impl Catalogs {
    pub fn get(&self, category: Category) -> &Catalog {
        match category {
            Category::Legacy => &self.legacy,
            Category::Extension => &self.extensions,
        }
    }
}

/// Writes `catalog` as `index.json` inside `dir`.
pub fn write_catalog(dir: &Path, catalog: &Catalog) -> Result<PathBuf, PipelineError> {
    let path = dir.join(INDEX_JSON);
    let mut json = serde_json::to_string_pretty(catalog)?;
    json.push('\n');
    std::fs::write(&path, json).map_err(|source| PipelineError::DirectoryAccess {
        path: path.clone(),
        source,
    })?;
    info!(path = %path.display(), entries = catalog.data.len(), "Catalog written");
    Ok(path)
}
