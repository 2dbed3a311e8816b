//! `blender_manifest.toml` manifests.

use crate::model::Manifest;
use crate::traits::{base_name, ManifestError, ManifestFormat};
use serde::Deserialize;

pub const MANIFEST_FILE: &str = "blender_manifest.toml";

/// Keys read from the manifest. Unknown keys and tables (`[permissions]`,
/// `[build]`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct RawManifest {
    id: String,
    version: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    tagline: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    blender_version_min: String,
    #[serde(default)]
    website: String,
    #[serde(default)]
    maintainer: Option<String>,
    #[serde(default)]
    copyright: Vec<String>,
    #[serde(default)]
    license: Vec<String>,
}

/// Structured TOML manifest of the extension packaging model.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionManifest;

impl ManifestFormat for ExtensionManifest {
    fn format_id(&self) -> &'static str {
        "extension"
    }

    fn locate(&self, entries: &[String]) -> Option<usize> {
        entries.iter().position(|entry| base_name(entry) == MANIFEST_FILE)
    }

    fn parse(
        &self,
        file: &str,
        content: &str,
        _archive_stem: &str,
    ) -> Result<Manifest, ManifestError> {
        let raw: RawManifest = toml::from_str(content).map_err(|e| ManifestError::parse(file, e))?;

        if raw.id.trim().is_empty() {
            return Err(ManifestError::parse(file, "`id` must not be empty"));
        }
        if raw.version.trim().is_empty() {
            return Err(ManifestError::parse(file, "`version` must not be empty"));
        }

        let maintainer = match raw.maintainer {
            Some(maintainer) => maintainer,
            None => raw.copyright.join(", "),
        };

        Ok(Manifest {
            name: raw.name.unwrap_or_else(|| raw.id.clone()),
            id: raw.id,
            version: raw.version,
            tagline: raw.tagline,
            kind: raw.kind,
            blender_version_min: raw.blender_version_min,
            website: raw.website,
            maintainer,
            license: raw.license,
        })
    }
}
