//! Manifest extraction from ZIP archives.

use super::formats::{ExtensionManifest, LegacyManifest};
use super::scan::SourceArtifact;
use crate::model::Manifest;
use crate::traits::{ManifestError, ManifestFormat};
use std::fs::File;
use std::io::{BufReader, Read};
use tracing::debug;

/// Tries each [`ManifestFormat`] in priority order against an archive.
pub struct ManifestExtractor {
    formats: Vec<Box<dyn ManifestFormat>>,
}

impl Default for ManifestExtractor {
    /// Extension manifest first, then legacy `bl_info`.
    fn default() -> Self {
        Self::new(vec![Box::new(ExtensionManifest), Box::new(LegacyManifest)])
    }
}

impl ManifestExtractor {
    pub fn new(formats: Vec<Box<dyn ManifestFormat>>) -> Self {
        Self { formats }
    }

    /// Reads the manifest of one archive.
    ///
    /// The first format whose marker file is present decides; later formats
    /// are not consulted even if that marker fails to parse.
    ///
    /// # Errors
    ///
    /// - [`ManifestError::NotFound`] when no format has a marker in the archive
    /// - [`ManifestError::Parse`] when the marker exists but is malformed
    /// - [`ManifestError::Archive`] / [`ManifestError::Io`] when the archive
    ///   itself cannot be read
    pub fn extract(&self, artifact: &SourceArtifact) -> Result<Manifest, ManifestError> {
        let file = File::open(&artifact.path)?;
        let mut archive = zip::ZipArchive::new(BufReader::new(file))?;

        let entries = (0..archive.len())
            .map(|i| archive.by_index_raw(i).map(|entry| entry.name().to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        for format in &self.formats {
            let Some(index) = format.locate(&entries) else {
                continue;
            };
            let marker = &entries[index];
            debug!(
                artifact = %artifact.file_name,
                format = format.format_id(),
                marker = %marker,
                "Found manifest marker"
            );

            let mut content = String::new();
            archive
                .by_index(index)?
                .read_to_string(&mut content)
                .map_err(|e| ManifestError::parse(marker.as_str(), e))?;

            return format.parse(marker, &content, &artifact.stem);
        }

        Err(ManifestError::NotFound)
    }
}
