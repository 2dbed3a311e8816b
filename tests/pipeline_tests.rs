//! End-to-end catalog builds against real ZIP archives

mod common;

use addon_catalog::harvest::compute_archive_digest;
use addon_catalog::{CatalogPipeline, Category, HostVersion, PipelineConfig};
use common::{extension_manifest, TestRepo};

fn config(repo: &TestRepo) -> PipelineConfig {
    PipelineConfig::new(&repo.source, &repo.output).with_concurrency(4)
}

async fn build(repo: &TestRepo) -> addon_catalog::RunReport {
    CatalogPipeline::new(config(repo))
        .run()
        .await
        .expect("pipeline run failed")
}

fn is_sha256(hash: &str) -> bool {
    hash.strip_prefix("sha256:").is_some_and(|hex| {
        hex.len() == 64 && hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
    })
}

#[tokio::test]
async fn test_extension_archive_is_published() {
    let repo = TestRepo::new();
    let manifest = extension_manifest("cooltool", "1.2.0", "4.5.0");
    repo.add_archive(
        "cooltool-extension.zip",
        &[
            ("cooltool/blender_manifest.toml", manifest.as_str()),
            ("cooltool/__init__.py", "def register():\n    pass\n"),
        ],
    );

    build(&repo).await;

    assert!(repo.out("extensions/cooltool-extension.zip").exists());
    let index = repo.index("extensions");
    assert_eq!(index["version"], "v1");
    assert_eq!(index["blocklist"], serde_json::json!([]));
    let data = index["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], "cooltool");
    assert_eq!(data[0]["version"], "1.2.0");
    assert_eq!(data[0]["type"], "add-on");
    assert_eq!(data[0]["schema_version"], "1.0.0");
    assert_eq!(data[0]["archive_url"], "extensions/cooltool-extension.zip");
    assert!(is_sha256(data[0]["archive_hash"].as_str().unwrap()));

    assert!(repo.index("addons")["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_legacy_archive_is_published() {
    let repo = TestRepo::new();
    repo.add_archive(
        "old_addon.zip",
        &[(
            "old_addon/__init__.py",
            r#"bl_info = {"name": "Old Tool", "version": (1, 0), "blender": (2, 93, 0)}"#,
        )],
    );

    let report = build(&repo).await;

    assert_eq!(report.count(Category::Legacy), 1);
    assert!(repo.out("addons/old_addon.zip").exists());
    let data = repo.index("addons")["data"].clone();
    assert_eq!(data[0]["id"], "old_tool");
    assert_eq!(data[0]["version"], "1.0");
    assert_eq!(data[0]["blender_version_min"], "2.93.0");
}

#[tokio::test]
async fn test_threshold_boundary_end_to_end() {
    let repo = TestRepo::new();
    let new = extension_manifest("new", "1.0.0", "4.3.0");
    let old = extension_manifest("old", "1.0.0", "4.2.9");
    repo.add_archive("new.zip", &[("blender_manifest.toml", new.as_str())]);
    repo.add_archive("old.zip", &[("blender_manifest.toml", old.as_str())]);

    build(&repo).await;

    assert!(repo.out("extensions/new.zip").exists());
    assert!(repo.out("addons/old.zip").exists());
    assert!(!repo.out("extensions/old.zip").exists());
    assert_eq!(repo.index("addons")["data"][0]["id"], "old");
}

#[tokio::test]
async fn test_custom_threshold() {
    let repo = TestRepo::new();
    let manifest = extension_manifest("tool", "1.0.0", "4.2.0");
    repo.add_archive("tool.zip", &[("blender_manifest.toml", manifest.as_str())]);

    let config = config(&repo).with_extension_threshold(HostVersion(4, 2, 0));
    CatalogPipeline::new(config).run().await.unwrap();

    assert!(repo.out("extensions/tool.zip").exists());
}

#[tokio::test]
async fn test_skipped_archives_appear_nowhere() {
    let repo = TestRepo::new();
    repo.add_archive("no_manifest.zip", &[("README.md", "hello")]);
    repo.add_archive(
        "bad_legacy.zip",
        &[("__init__.py", "bl_info = {'name': make_name()}")],
    );
    repo.add_archive("bad_ext.zip", &[("blender_manifest.toml", "version = \"1.0\"")]);
    std::fs::write(repo.source.join("corrupt.zip"), b"PK\x03\x04 not really").unwrap();

    let report = build(&repo).await;

    assert_eq!(report.skipped.len(), 4);
    for name in ["no_manifest.zip", "bad_legacy.zip", "bad_ext.zip", "corrupt.zip"] {
        assert!(!repo.out("addons").join(name).exists());
        assert!(!repo.out("extensions").join(name).exists());
    }
    assert!(repo.index("addons")["data"].as_array().unwrap().is_empty());
    assert!(repo.index("extensions")["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_source_still_writes_catalogs() {
    let repo = TestRepo::new();

    let report = build(&repo).await;

    for dir in ["addons", "extensions"] {
        let index = repo.index(dir);
        assert_eq!(index["version"], "v1");
        assert!(index["data"].as_array().unwrap().is_empty());
    }
    assert!(repo.out("index.html").exists());
    assert!(report.skipped.is_empty());
}

#[tokio::test]
async fn test_copies_are_byte_identical() {
    let repo = TestRepo::new();
    let manifest = extension_manifest("tool", "1.0.0", "4.4.0");
    let payload = "x".repeat(50_000);
    let source = repo.add_archive(
        "tool.zip",
        &[
            ("tool/blender_manifest.toml", manifest.as_str()),
            ("tool/data.txt", payload.as_str()),
        ],
    );

    build(&repo).await;

    let copy = repo.out("extensions/tool.zip");
    assert_eq!(std::fs::read(&source).unwrap(), std::fs::read(&copy).unwrap());

    let original = compute_archive_digest(&source).unwrap();
    let entry = repo.index("extensions")["data"][0].clone();
    assert_eq!(entry["archive_hash"], original.hash.as_str());
    assert_eq!(entry["archive_size"], original.size);
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let repo = TestRepo::new();
    for (i, version) in ["1.10.0", "1.2.0", "1.2.0", "0.5.0"].iter().enumerate() {
        let manifest = extension_manifest(&format!("tool{i}"), version, "4.3.0");
        repo.add_archive(&format!("tool{i}.zip"), &[("blender_manifest.toml", manifest.as_str())]);
    }
    repo.add_archive("legacy.zip", &[("__init__.py", "bl_info = {'name': 'Legacy <One>'}")]);

    build(&repo).await;
    let first: Vec<_> = ["extensions/index.json", "addons/index.json", "index.html"]
        .iter()
        .map(|p| std::fs::read(repo.out(p)).unwrap())
        .collect();

    build(&repo).await;
    let second: Vec<_> = ["extensions/index.json", "addons/index.json", "index.html"]
        .iter()
        .map(|p| std::fs::read(repo.out(p)).unwrap())
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_entries_sorted_by_raw_version_string() {
    let repo = TestRepo::new();
    for (id, version) in [("a", "1.2.0"), ("b", "1.10.0"), ("c", "0.9.0")] {
        let manifest = extension_manifest(id, version, "4.3.0");
        repo.add_archive(&format!("{id}.zip"), &[("blender_manifest.toml", manifest.as_str())]);
    }

    build(&repo).await;

    let index = repo.index("extensions");
    let versions: Vec<_> = index["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["version"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(versions, vec!["0.9.0", "1.10.0", "1.2.0"]);
}

#[tokio::test]
async fn test_rebuild_drops_removed_archives() {
    let repo = TestRepo::new();
    let manifest = extension_manifest("gone", "1.0.0", "4.3.0");
    let path = repo.add_archive("gone.zip", &[("blender_manifest.toml", manifest.as_str())]);

    build(&repo).await;
    assert!(repo.out("extensions/gone.zip").exists());

    std::fs::remove_file(path).unwrap();
    build(&repo).await;

    assert!(!repo.out("extensions/gone.zip").exists());
    assert!(repo.index("extensions")["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_base_url_prefixes_archive_url() {
    let repo = TestRepo::new();
    let manifest = extension_manifest("tool", "1.0.0", "4.3.0");
    repo.add_archive("tool.zip", &[("blender_manifest.toml", manifest.as_str())]);

    let config = config(&repo).with_base_url(Some("https://example.org/repo".to_string()));
    CatalogPipeline::new(config).run().await.unwrap();

    let entry = repo.index("extensions")["data"][0].clone();
    assert_eq!(entry["archive_url"], "https://example.org/repo/extensions/tool.zip");
    let html = std::fs::read_to_string(repo.out("index.html")).unwrap();
    assert!(html.contains("href=\"extensions/tool.zip\""));
}

#[tokio::test]
async fn test_dashboard_escapes_manifest_text() {
    let repo = TestRepo::new();
    repo.add_archive(
        "xss.zip",
        &[(
            "__init__.py",
            "bl_info = {'name': '<img src=x onerror=alert(1)>', 'version': '1.0'}",
        )],
    );

    build(&repo).await;

    let html = std::fs::read_to_string(repo.out("index.html")).unwrap();
    assert!(!html.contains("<img"));
    assert!(html.contains("&lt;img_src=x_onerror=alert(1)&gt;"));
}

#[tokio::test]
async fn test_deeply_nested_manifest_is_skipped() {
    let repo = TestRepo::new();
    let manifest = extension_manifest("good", "1.0.0", "4.3.0");
    repo.add_archive("good.zip", &[("blender_manifest.toml", manifest.as_str())]);
    let nested = format!("bl_info = {{'name': {}", "[".repeat(200_000));
    repo.add_archive("nested.zip", &[("__init__.py", nested.as_str())]);

    let report = build(&repo).await;

    assert_eq!(report.skipped.len(), 1);
    assert!(report.skipped[0].path.ends_with("nested.zip"));
    assert!(repo.out("extensions/good.zip").exists());
    assert!(!repo.out("addons/nested.zip").exists());
    assert_eq!(repo.index("extensions")["data"][0]["id"], "good");
}
