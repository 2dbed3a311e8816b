//! `bl_info` dictionaries embedded in an add-on's `__init__.py`.

use super::literal::{find_assignment, Literal};
use crate::harvest::classify::ADDON_TYPE;
use crate::model::Manifest;
use crate::traits::{base_name, ManifestError, ManifestFormat};

pub const ENTRY_POINT_FILE: &str = "__init__.py";
pub const INFO_VARIABLE: &str = "bl_info";

/// Version used when `bl_info` has no `version` key.
const FALLBACK_VERSION: &str = "0.0.0";

#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyManifest;

impl ManifestFormat for LegacyManifest {
    fn format_id(&self) -> &'static str {
        "legacy"
    }

    /// Shallowest `__init__.py`; listing order breaks ties.
    fn locate(&self, entries: &[String]) -> Option<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| base_name(entry) == ENTRY_POINT_FILE)
            .min_by_key(|(index, entry)| (depth(entry), *index))
            .map(|(index, _)| index)
    }

    fn parse(
        &self,
        file: &str,
        content: &str,
        archive_stem: &str,
    ) -> Result<Manifest, ManifestError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let info =
            find_assignment(content, INFO_VARIABLE).map_err(|e| ManifestError::parse(file, e))?;
        if !matches!(info, Literal::Dict(_)) {
            return Err(ManifestError::parse(file, format!("`{INFO_VARIABLE}` is not a dict")));
        }

        let name = optional_str(&info, "name", file)?;
        let version = match info.get("version") {
            None => FALLBACK_VERSION.to_string(),
            Some(Literal::Str(version)) => version.clone(),
            Some(other) => other.join_dotted().ok_or_else(|| {
                ManifestError::parse(file, "`version` must be a string or a sequence of numbers")
            })?,
        };
        let blender_version_min = match info.get("blender") {
            None => String::new(),
            Some(other) => other.join_dotted().ok_or_else(|| {
                ManifestError::parse(file, "`blender` must be a sequence of numbers")
            })?,
        };
        let website = match optional_str(&info, "doc_url", file)? {
            Some(url) if !url.is_empty() => url,
            _ => optional_str(&info, "wiki_url", file)?.unwrap_or_default(),
        };

        let id = match &name {
            Some(name) => name.to_lowercase().replace(' ', "_"),
            None => archive_stem.to_string(),
        };

        Ok(Manifest {
            id,
            name: name.unwrap_or_else(|| archive_stem.to_string()),
            version,
            tagline: optional_str(&info, "description", file)?.unwrap_or_default(),
            kind: ADDON_TYPE.to_string(),
            blender_version_min,
            website,
            maintainer: optional_str(&info, "author", file)?.unwrap_or_default(),
            license: Vec::new(),
        })
    }
}

fn depth(entry: &str) -> usize {
    entry.matches(['/', '\\']).count()
}

fn optional_str(info: &Literal, key: &str, file: &str) -> Result<Option<String>, ManifestError> {
    match info.get(key) {
        None | Some(Literal::None) => Ok(None),
        Some(Literal::Str(value)) => Ok(Some(value.clone())),
        Some(_) => Err(ManifestError::parse(file, format!("`{key}` must be a string"))),
    }
}
