//! Manifest format implementations.
//!
//! Each dialect implements [`ManifestFormat`](crate::traits::ManifestFormat):
//! - `extension` - `blender_manifest.toml`
//! - `legacy` - `bl_info` in `__init__.py`, read with the restricted
//!   evaluator in `literal`

pub mod extension;
pub mod legacy;
pub mod literal;

pub use extension::ExtensionManifest;
pub use legacy::LegacyManifest;
