//! JSON component manifests.

use super::{ComponentInfo, DeclaredItem, Version};
use crate::crypto::digest;
use crate::LicentiaError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    name: String,
    version: Version,
    #[serde(default)]
    file_version: Option<Version>,
    #[serde(default)]
    product: Option<String>,
    #[serde(default)]
    public_key: Option<String>,
    #[serde(default)]
    public_key_file: Option<PathBuf>,
    #[serde(default)]
    license_public_key: Option<String>,
    #[serde(default)]
    artifact: Option<PathBuf>,
    #[serde(default)]
    license_items: Vec<DeclaredItem>,
    #[serde(default)]
    resources: Vec<ManifestResource>,
}

#[derive(Debug, Deserialize)]
struct ManifestResource {
    name: String,
    file: PathBuf,
}

fn read_bytes(path: &Path) -> Result<Vec<u8>, LicentiaError> {
    std::fs::read(path)
        .map_err(|e| LicentiaError::ConfigError(format!("Failed to read {}: {}", path.display(), e)))
}

pub(super) fn read(path: &Path) -> Result<ComponentInfo, LicentiaError> {
    let text = read_bytes(path)?;
    let manifest: Manifest = serde_json::from_slice(&text).map_err(|e| {
        LicentiaError::ConfigError(format!("Invalid manifest {}: {}", path.display(), e))
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));

    let mut info = ComponentInfo::new(manifest.name, manifest.version).with_content(&text);

    if let Some(version) = manifest.file_version {
        info = info.with_file_version(version);
    }
    if let Some(product) = manifest.product {
        info = info.with_product(product);
    }

    let blob = match (manifest.public_key, manifest.public_key_file) {
        (Some(encoded), _) => Some(digest::bytes_from_string(&encoded)?),
        (None, Some(file)) => Some(read_bytes(&base.join(file))?),
        (None, None) => None,
    };
    if let Some(blob) = blob {
        info = info.with_strong_name(&blob)?;
    }

    if let Some(xml) = manifest.license_public_key {
        info = info.with_license_public_key(xml);
    }

    if let Some(artifact) = manifest.artifact {
        let artifact = base.join(artifact);
        info = info.with_content(&read_bytes(&artifact)?).with_location(artifact);
    }

    for item in manifest.license_items {
        info = info.with_license_item(item.name, item.description);
    }
    for resource in manifest.resources {
        let content = read_bytes(&base.join(&resource.file))?;
        info = info.with_resource(resource.name, content);
    }

    debug!(component = %info.id(), manifest = %path.display(), "Read component manifest");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const VENDOR_PUB: &[u8] = include_bytes!("../../tests/fixtures/vendor.pub");

    fn write_manifest(dir: &TempDir, json: &str) -> PathBuf {
        let path = dir.path().join("component.json");
        fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_read_full_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("vendor.pub"), VENDOR_PUB).unwrap();
        fs::write(dir.path().join("Acme.Grid.dll"), b"component bytes").unwrap();
        fs::write(dir.path().join("embedded.lic"), b"Signature:...").unwrap();

        let path = write_manifest(
            &dir,
            r#"{
                "name": "Acme.Grid",
                "version": "2.1.9131.0",
                "product": "Acme Grid",
                "publicKeyFile": "vendor.pub",
                "artifact": "Acme.Grid.dll",
                "licenseItems": [{"name": "Export", "description": "Export to file"}],
                "resources": [{"name": "Acme.Grid.Acme.Grid.920152bf6f9182ee.lic", "file": "embedded.lic"}]
            }"#,
        );

        let info = ComponentInfo::read_manifest(&path).unwrap();
        assert_eq!(info.name(), "Acme.Grid");
        assert_eq!(info.version(), Version::new(2, 1, 9131, 0));
        assert_eq!(info.product(), Some("Acme Grid"));
        assert_eq!(info.public_key_token(), "920152bf6f9182ee");
        assert_eq!(info.content_hash(), digest::sha256_b64(b"component bytes"));
        assert_eq!(info.location(), Some(dir.path().join("Acme.Grid.dll").as_path()));
        assert_eq!(info.license_items()[0].name, "Export");
        assert_eq!(info.resources()[0].content, b"Signature:...");
    }

    #[test]
    fn test_read_inline_public_key() {
        let dir = TempDir::new().unwrap();
        let json = format!(
            r#"{{"name": "Acme.Chart", "version": "1.0", "publicKey": "{}"}}"#,
            digest::bytes_to_string(VENDOR_PUB)
        );
        let info = ComponentInfo::read_manifest(write_manifest(&dir, &json)).unwrap();
        assert!(info.is_signed());
        assert_eq!(info.fingerprint(), "Acme.Chart,920152bf6f9182ee");
    }

    #[test]
    fn test_unsigned_manifest_hashes_manifest_text() {
        let dir = TempDir::new().unwrap();
        let json = r#"{"name": "Tool", "version": "1.0.0.0"}"#;
        let info = ComponentInfo::read_manifest(write_manifest(&dir, json)).unwrap();
        assert!(!info.is_signed());
        assert_eq!(info.content_hash(), digest::sha256_b64(json.as_bytes()));
    }

    #[test]
    fn test_missing_manifest() {
        let dir = TempDir::new().unwrap();
        let result = ComponentInfo::read_manifest(dir.path().join("absent.json"));
        assert!(matches!(result, Err(LicentiaError::ConfigError(_))));
    }

    #[test]
    fn test_malformed_manifest() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(&dir, r#"{"name": "Tool", "version": "one"}"#);
        assert!(matches!(
            ComponentInfo::read_manifest(path),
            Err(LicentiaError::ConfigError(_))
        ));
    }

    #[test]
    fn test_missing_artifact() {
        let dir = TempDir::new().unwrap();
        let path = write_manifest(
            &dir,
            r#"{"name": "Tool", "version": "1.0", "artifact": "Tool.dll"}"#,
        );
        assert!(matches!(
            ComponentInfo::read_manifest(path),
            Err(LicentiaError::ConfigError(_))
        ));
    }
}
