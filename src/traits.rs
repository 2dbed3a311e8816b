use crate::model::Manifest;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("no manifest marker file in archive")]
    NotFound,
    #[error("failed to parse '{file}': {detail}")]
    Parse { file: String, detail: String },
    #[error("unreadable archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ManifestError {
    pub fn parse(file: impl Into<String>, detail: impl ToString) -> Self {
        ManifestError::Parse {
            file: file.into(),
            detail: detail.to_string(),
        }
    }
}

/// One of the manifest dialects an archive can carry.
pub trait ManifestFormat: Send + Sync {
    /// Returns the format identifier used in logs (e.g. "extension", "legacy").
    fn format_id(&self) -> &'static str;

    /// Picks the marker file from the archive listing, in listing order.
    ///
    /// Returns the index into `entries`, or `None` when this format has no
    /// marker in the archive.
    fn locate(&self, entries: &[String]) -> Option<usize>;

    /// Parses the marker file's text into a [`Manifest`].
    ///
    /// `file` is the marker's path inside the archive and `archive_stem` the
    /// archive file name without extension, used for fallback identifiers.
    fn parse(&self, file: &str, content: &str, archive_stem: &str)
        -> Result<Manifest, ManifestError>;
}

/// Base name of an archive member path (`a/b/c.txt` -> `c.txt`).
pub(crate) fn base_name(entry: &str) -> &str {
    entry.rsplit(['/', '\\']).next().unwrap_or(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name("blender_manifest.toml"), "blender_manifest.toml");
        assert_eq!(base_name("pkg/sub/__init__.py"), "__init__.py");
        assert_eq!(base_name("pkg\\__init__.py"), "__init__.py");
        assert_eq!(base_name("pkg/"), "");
    }

    #[test]
    fn test_parse_error_display() {
        let err = ManifestError::parse("pkg/blender_manifest.toml", "missing key `id`");
        assert_eq!(
            err.to_string(),
            "failed to parse 'pkg/blender_manifest.toml': missing key `id`"
        );
    }
}
