//! License files on disk.

use super::LicenseSource;
use crate::component::ComponentInfo;
use std::fs;
use std::path::{Path, PathBuf};

/// Platform folders a license file may live under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialFolder {
    /// Roaming application data (`dirs::data_dir`).
    Data,
    /// Local application data (`dirs::data_local_dir`).
    LocalData,
    /// Configuration (`dirs::config_dir`).
    Config,
    /// User home (`dirs::home_dir`).
    Home,
}

impl SpecialFolder {
    fn path(self) -> Option<PathBuf> {
        match self {
            SpecialFolder::Data => dirs::data_dir(),
            SpecialFolder::LocalData => dirs::data_local_dir(),
            SpecialFolder::Config => dirs::config_dir(),
            SpecialFolder::Home => dirs::home_dir(),
        }
    }
}

/// Where a [`FileSource`] looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileLocation {
    /// A fixed path.
    Absolute(PathBuf),
    /// Beside the component. `None` means the component path plus `.lic`;
    /// a name is resolved in the component's directory.
    BesideComponent(Option<String>),
    /// A path relative to a platform folder.
    SpecialFolder(SpecialFolder, PathBuf),
}

/// Reads license text from a file.
#[derive(Debug, Clone)]
pub struct FileSource {
    location: FileLocation,
}

impl FileSource {
    /// Source reading from `location`.
    pub fn new(location: FileLocation) -> Self {
        Self { location }
    }

    /// `<component path>.lic`.
    pub fn beside_component() -> Self {
        Self::new(FileLocation::BesideComponent(None))
    }

    /// Resolve the file path for `component`.
    pub fn resolve(&self, component: &ComponentInfo) -> Result<PathBuf, String> {
        match &self.location {
            FileLocation::Absolute(path) => Ok(path.clone()),
            FileLocation::BesideComponent(name) => {
                let location = component
                    .location()
                    .ok_or_else(|| format!("Location of {} is unknown.", component.name()))?;
                Ok(match name {
                    None => {
                        let mut path = location.as_os_str().to_owned();
                        path.push(".lic");
                        PathBuf::from(path)
                    }
                    Some(name) => location
                        .parent()
                        .unwrap_or_else(|| Path::new("."))
                        .join(name),
                })
            }
            FileLocation::SpecialFolder(folder, relative) => folder
                .path()
                .map(|base| base.join(relative))
                .ok_or_else(|| format!("Special folder {:?} is not available.", folder)),
        }
    }
}

impl LicenseSource for FileSource {
    fn name(&self) -> String {
        format!("file({:?})", self.location)
    }

    fn load(&self, component: &ComponentInfo) -> Result<String, String> {
        let path = self.resolve(component)?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(format!("License file {} not found.", path.display()));
            }
            Err(e) => return Err(format!("Cannot read license file {}: {}", path.display(), e)),
        };
        if text.trim().is_empty() {
            return Err(format!("License file {} is empty.", path.display()));
        }
        Ok(text)
    }
}
