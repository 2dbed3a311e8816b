//! Source directory enumeration.

use crate::config::ARCHIVE_EXTENSION;
use std::path::{Path, PathBuf};

/// Handle to one archive in the source directory for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceArtifact {
    /// Full path of the archive in the source directory
    pub path: PathBuf,

    /// File name, kept verbatim for the published copy
    pub file_name: String,

    /// File name without the archive extension
    pub stem: String,
}

impl SourceArtifact {
    fn from_path(path: PathBuf) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let stem = path.file_stem()?.to_str()?.to_string();
        Some(Self {
            path,
            file_name,
            stem,
        })
    }
}

/// Lists archives directly inside `source_dir` (non-recursive).
///
/// Entries are returned sorted by file name so repeated runs see the same
/// order. Non-UTF-8 file names are skipped with a warning.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory or one of its entries
/// cannot be read.
pub fn scan(source_dir: &Path) -> std::io::Result<Vec<SourceArtifact>> {
    let mut artifacts = Vec::new();

    for entry in std::fs::read_dir(source_dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() && !entry.path().is_file() {
            continue;
        }

        let path = entry.path();
        let is_archive = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(ARCHIVE_EXTENSION));
        if !is_archive {
            continue;
        }

        match SourceArtifact::from_path(path) {
            Some(artifact) => artifacts.push(artifact),
            None => tracing::warn!(
                path = %entry.path().display(),
                "Skipping archive with non UTF-8 file name"
            ),
        }
    }

    artifacts.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(artifacts)
}
