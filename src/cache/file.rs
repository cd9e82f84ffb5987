//! Local license store with atomic writes.
//!
//! Signed license text is stored under `dirs::data_dir()/<namespace>/`,
//! one file per component, named by the license file convention
//! (`<Name>.<token>.lic`). Writes go to a temp file and are renamed into
//! place.

use crate::component::ComponentInfo;
use crate::LicentiaError;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory of stored license files.
#[derive(Debug, Clone)]
pub struct LicenseStore {
    dir: PathBuf,
}

impl LicenseStore {
    /// Open the store for `namespace` under the platform data directory.
    pub fn new(namespace: &str) -> Result<Self, LicentiaError> {
        if namespace.trim().is_empty() {
            return Err(LicentiaError::ConfigError(
                "Store namespace cannot be empty".to_string(),
            ));
        }
        let base_dir = dirs::data_dir()
            .ok_or_else(|| LicentiaError::StoreIO("Could not find data directory".to_string()))?;
        Self::with_path(base_dir.join(namespace))
    }

    /// Open a store at an explicit directory.
    pub fn with_path(dir: impl Into<PathBuf>) -> Result<Self, LicentiaError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .map_err(|e| LicentiaError::StoreIO(format!("Failed to create store dir: {}", e)))?;
        Ok(Self { dir })
    }

    /// Store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn license_path(&self, component: &ComponentInfo) -> PathBuf {
        self.dir.join(component.license_file_name())
    }

    /// Save signed license text for a component.
    pub fn save(&self, component: &ComponentInfo, signed_license: &str) -> Result<(), LicentiaError> {
        let target_path = self.license_path(component);
        let temp_path = self
            .dir
            .join(format!("{}.tmp", component.license_file_name()));

        fs::write(&temp_path, signed_license)
            .map_err(|e| LicentiaError::StoreIO(format!("Failed to write temp file: {}", e)))?;
        fs::rename(&temp_path, &target_path)
            .map_err(|e| LicentiaError::StoreIO(format!("Failed to rename license file: {}", e)))?;

        debug!(component = %component.id(), path = %target_path.display(), "Stored license");
        Ok(())
    }

    /// Load the stored license text for a component.
    pub fn load(&self, component: &ComponentInfo) -> Result<Option<String>, LicentiaError> {
        let path = self.license_path(component);
        if !path.exists() {
            return Ok(None);
        }
        let text = fs::read_to_string(&path)
            .map_err(|e| LicentiaError::StoreIO(format!("Failed to read license file: {}", e)))?;
        Ok(Some(text))
    }

    /// Delete the stored license for a component.
    pub fn delete(&self, component: &ComponentInfo) -> Result<(), LicentiaError> {
        let path = self.license_path(component);
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| LicentiaError::StoreIO(format!("Failed to delete license: {}", e)))?;
        }
        Ok(())
    }

    /// Delete every stored license.
    pub fn clear(&self) -> Result<(), LicentiaError> {
        for entry in fs::read_dir(&self.dir)
            .map_err(|e| LicentiaError::StoreIO(format!("Failed to read store dir: {}", e)))?
        {
            let entry =
                entry.map_err(|e| LicentiaError::StoreIO(format!("Failed to read entry: {}", e)))?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "lic") {
                fs::remove_file(&path)
                    .map_err(|e| LicentiaError::StoreIO(format!("Failed to delete: {}", e)))?;
            }
        }
        Ok(())
    }
}
