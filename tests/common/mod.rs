//! Common test utilities for catalog integration tests

use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Source and output directories for one pipeline run
pub struct TestRepo {
    #[allow(dead_code)]
    temp: TempDir,
    pub source: PathBuf,
    pub output: PathBuf,
}

impl TestRepo {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp directory");
        let source = temp.path().join("src");
        let output = temp.path().join("repo");
        std::fs::create_dir_all(&source).expect("Failed to create source directory");
        Self {
            temp,
            source,
            output,
        }
    }

    /// Writes a ZIP archive into the source directory
    pub fn add_archive(&self, file_name: &str, members: &[(&str, &str)]) -> PathBuf {
        let path = self.source.join(file_name);
        write_zip(&path, members);
        path
    }

    /// Path inside the output directory
    pub fn out(&self, relative: &str) -> PathBuf {
        self.output.join(relative)
    }

    /// Parsed `index.json` of a category directory
    pub fn index(&self, category_dir: &str) -> serde_json::Value {
        let text = std::fs::read_to_string(self.out(category_dir).join("index.json"))
            .expect("Failed to read index.json");
        serde_json::from_str(&text).expect("index.json is not valid JSON")
    }
}

pub fn write_zip(path: &Path, members: &[(&str, &str)]) {
    let file = std::fs::File::create(path).expect("Failed to create archive");
    let mut writer = zip::ZipWriter::new(file);
    for (name, content) in members {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start archive member");
        writer
            .write_all(content.as_bytes())
            .expect("Failed to write archive member");
    }
    writer.finish().expect("Failed to finish archive");
}

/// `blender_manifest.toml` body
pub fn extension_manifest(id: &str, version: &str, min: &str) -> String {
    format!(
        "schema_version = \"1.0.0\"\nid = \"{id}\"\nversion = \"{version}\"\nname = \"{id}\"\n\
         type = \"add-on\"\nblender_version_min = \"{min}\"\nlicense = [\"SPDX:GPL-3.0-or-later\"]\n"
    )
}
