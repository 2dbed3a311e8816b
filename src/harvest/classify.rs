//! Packaging category decision.

use crate::model::{Category, HostVersion, Manifest};

/// `type` value of a code add-on.
pub const ADDON_TYPE: &str = "add-on";

/// Decides which catalog a manifest belongs to.
///
/// Extension iff `type` is `"add-on"` and `blender_version_min` parses as
/// `major.minor.patch` and is at least `threshold`. Everything else,
/// including unparsable versions, is legacy.
pub fn classify(manifest: &Manifest, threshold: HostVersion) -> Category {
    if manifest.kind != ADDON_TYPE {
        return Category::Legacy;
    }
    match HostVersion::parse(&manifest.blender_version_min) {
        Some(min) if min >= threshold => Category::Extension,
        _ => Category::Legacy,
    }
}
