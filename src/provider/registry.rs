//! License text stored in a registry-style key/value store.

use super::LicenseSource;
use crate::component::ComponentInfo;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Read access to a hierarchical key/value store.
pub trait RegistryBackend: Send + Sync {
    /// Read a string value. `Ok(None)` when the key or value is absent.
    fn read_string(&self, key: &str, value_name: &str) -> Result<Option<String>, String>;
}

/// In-process registry. Key paths are case-insensitive.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    values: RwLock<HashMap<(String, String), String>>,
}

impl MemoryRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(key: &str, value_name: &str) -> (String, String) {
        (
            key.trim_end_matches('\\').to_lowercase(),
            value_name.to_lowercase(),
        )
    }

    /// Write a value.
    pub fn set(&self, key: &str, value_name: &str, value: impl Into<String>) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(Self::slot(key, value_name), value.into());
    }

    /// Remove a value.
    pub fn remove(&self, key: &str, value_name: &str) {
        self.values
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&Self::slot(key, value_name));
    }
}

impl RegistryBackend for MemoryRegistry {
    fn read_string(&self, key: &str, value_name: &str) -> Result<Option<String>, String> {
        Ok(self
            .values
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&Self::slot(key, value_name))
            .cloned())
    }
}

/// Registry hive for [`WindowsRegistry`].
#[cfg(windows)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryHive {
    /// `HKEY_CURRENT_USER`.
    CurrentUser,
    /// `HKEY_LOCAL_MACHINE`.
    LocalMachine,
}

/// The Windows registry.
#[cfg(windows)]
#[derive(Debug, Clone, Copy)]
pub struct WindowsRegistry {
    hive: RegistryHive,
}

#[cfg(windows)]
impl WindowsRegistry {
    /// Registry rooted at `hive`.
    pub fn new(hive: RegistryHive) -> Self {
        Self { hive }
    }
}

#[cfg(windows)]
impl RegistryBackend for WindowsRegistry {
    fn read_string(&self, key: &str, value_name: &str) -> Result<Option<String>, String> {
        use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE};
        use winreg::RegKey;

        let root = match self.hive {
            RegistryHive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
            RegistryHive::LocalMachine => RegKey::predef(HKEY_LOCAL_MACHINE),
        };
        let subkey = match root.open_subkey(key.trim_end_matches('\\')) {
            Ok(subkey) => subkey,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(format!("Cannot open registry key {}: {}", key, e)),
        };
        match subkey.get_value::<String, _>(value_name) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(format!("Cannot read registry value {}: {}", value_name, e)),
        }
    }
}

/// Reads license text from a registry value.
///
/// A key ending in `\` gets the component's `major.minor` appended, so
/// each minor release line has its own license.
#[derive(Clone)]
pub struct RegistrySource {
    backend: Arc<dyn RegistryBackend>,
    key: String,
    value_name: String,
}

impl RegistrySource {
    /// Source reading `value_name` under `key`.
    pub fn new(
        backend: Arc<dyn RegistryBackend>,
        key: impl Into<String>,
        value_name: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            key: key.into(),
            value_name: value_name.into(),
        }
    }

    /// Key path used for `component`.
    pub fn resolve_key(&self, component: &ComponentInfo) -> String {
        if self.key.ends_with('\\') {
            format!("{}{}", self.key, component.version().major_minor())
        } else {
            self.key.clone()
        }
    }
}

impl LicenseSource for RegistrySource {
    fn name(&self) -> String {
        format!("registry({}\\{})", self.key.trim_end_matches('\\'), self.value_name)
    }

    fn load(&self, component: &ComponentInfo) -> Result<String, String> {
        let key = self.resolve_key(component);
        match self.backend.read_string(&key, &self.value_name)? {
            Some(text) if !text.trim().is_empty() => Ok(text),
            Some(_) => Err(format!("Registry value {}\\{} is empty.", key, self.value_name)),
            None => Err(format!(
                "Registry value {}\\{} not found.",
                key, self.value_name
            )),
        }
    }
}
