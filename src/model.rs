use serde::{Deserialize, Serialize};
use std::fmt;

/// Packaging category an archive is published under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Old-style add-on described by `bl_info` in its `__init__.py`.
    Legacy,
    /// New-style extension described by `blender_manifest.toml`.
    Extension,
}

impl Category {
    pub const ALL: [Category; 2] = [Category::Legacy, Category::Extension];

    /// Output directory name (relative to the output root).
    pub fn dir_name(self) -> &'static str {
        match self {
            Category::Legacy => "addons",
            Category::Extension => "extensions",
        }
    }

    /// Heading used by the dashboard.
    pub fn title(self) -> &'static str {
        match self {
            Category::Legacy => "Legacy add-ons",
            Category::Extension => "Extensions",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dir_name())
    }
}

/// A `major.minor.patch` host application version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HostVersion(pub u32, pub u32, pub u32);

impl HostVersion {
    /// Parses exactly three dot-separated non-negative integers.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let patch = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Self(major, minor, patch))
    }
}

impl fmt::Display for HostVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.0, self.1, self.2)
    }
}

/// Metadata extracted from one archive, in either manifest format.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    pub id: String,
    pub name: String,
    pub version: String,
    pub tagline: String,
    pub kind: String, // "add-on", "theme", ...
    pub blender_version_min: String,
    pub website: String,
    pub maintainer: String,
    pub license: Vec<String>,
}

/// One published archive inside a [`Catalog`].
///
/// Field order is the serialized key order of `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    pub schema_version: String,
    pub name: String,
    pub version: String,
    pub tagline: String,
    pub archive_hash: String,
    pub archive_size: u64,
    pub archive_url: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub blender_version_min: String,
    pub website: String,
    pub maintainer: String,
    pub license: Vec<String>,
}

/// The `index.json` document of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub blocklist: Vec<String>,
    pub data: Vec<CatalogEntry>,
    pub version: String,
}
