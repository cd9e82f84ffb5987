//! Store-backed and host-supplied license sources.

use super::LicenseSource;
use crate::cache::LicenseStore;
use crate::component::ComponentInfo;

/// Reads the license saved in the local [`LicenseStore`].
#[derive(Debug, Clone)]
pub struct StoreSource {
    store: LicenseStore,
}

impl StoreSource {
    /// Source over `store`.
    pub fn new(store: LicenseStore) -> Self {
        Self { store }
    }
}

impl LicenseSource for StoreSource {
    fn name(&self) -> String {
        format!("store({})", self.store.dir().display())
    }

    fn load(&self, component: &ComponentInfo) -> Result<String, String> {
        match self.store.load(component) {
            Ok(Some(text)) if !text.trim().is_empty() => Ok(text),
            Ok(Some(_)) => Err(format!("Stored license for {} is empty.", component.name())),
            Ok(None) => Err(format!("No stored license for {}.", component.name())),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Host closure as a license source.
pub struct FnSource<F> {
    name: String,
    load: F,
}

impl<F> FnSource<F>
where
    F: Fn(&ComponentInfo) -> Result<String, String> + Send + Sync,
{
    /// Named source calling `load`.
    pub fn new(name: impl Into<String>, load: F) -> Self {
        Self {
            name: name.into(),
            load,
        }
    }
}

impl<F> LicenseSource for FnSource<F>
where
    F: Fn(&ComponentInfo) -> Result<String, String> + Send + Sync,
{
    fn name(&self) -> String {
        self.name.clone()
    }

    fn load(&self, component: &ComponentInfo) -> Result<String, String> {
        (self.load)(component)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Version;
    use tempfile::TempDir;

    fn grid() -> ComponentInfo {
        ComponentInfo::new("Acme.Grid", Version::new(1, 0, 0, 0))
    }

    #[test]
    fn test_store_source() {
        let dir = TempDir::new().unwrap();
        let store = LicenseStore::with_path(dir.path()).unwrap();
        let source = StoreSource::new(store.clone());

        assert!(source.load(&grid()).unwrap_err().contains("No stored license"));
        store.save(&grid(), "Signature:x\n{}").unwrap();
        assert_eq!(source.load(&grid()).unwrap(), "Signature:x\n{}");
    }

    #[test]
    fn test_fn_source() {
        let source = FnSource::new("inline", |c: &ComponentInfo| {
            if c.name() == "Acme.Grid" {
                Ok("text".to_string())
            } else {
                Err("unknown".to_string())
            }
        });
        assert_eq!(source.name(), "inline");
        assert_eq!(source.load(&grid()).unwrap(), "text");
        let other = ComponentInfo::new("Other", Version::default());
        assert_eq!(source.load(&other).unwrap_err(), "unknown");
    }
}
