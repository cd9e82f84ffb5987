//! License providers.
//!
//! A component registers an ordered chain of providers with the
//! [`LicenseManager`](crate::LicenseManager). The first provider that
//! yields license text wins; error messages fall through to the next
//! provider.
//!
//! Simple sources implement [`LicenseSource`] and are wrapped in
//! [`CachedProvider`], which remembers the first result until reset.
//! Providers that depend on the caller implement [`LicenseProvider`]
//! directly.

pub mod cached;
pub mod embedded;
pub mod file;
pub mod registry;
pub mod sources;

use crate::component::ComponentInfo;
use crate::policy::trust::CallContext;
use crate::LicentiaError;

pub use cached::CachedProvider;
pub use embedded::EmbeddedResourceProvider;
pub use file::{FileLocation, FileSource, SpecialFolder};
pub use registry::{MemoryRegistry, RegistryBackend, RegistrySource};
#[cfg(windows)]
pub use registry::{RegistryHive, WindowsRegistry};
pub use sources::{FnSource, StoreSource};

/// Outcome of a provider lookup: license text or an error message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseProviderResult {
    license: Option<String>,
    error: Option<String>,
    data: Option<String>,
}

impl LicenseProviderResult {
    /// License text found.
    pub fn license(text: impl Into<String>) -> Self {
        Self {
            license: Some(text.into()),
            error: None,
            data: None,
        }
    }

    /// Nothing found, with the reason.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            license: None,
            error: Some(message.into()),
            data: None,
        }
    }

    /// Attach provider data. For component licenses this is the
    /// fingerprint of the component the license was found in.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// License text, if any.
    pub fn license_text(&self) -> Option<&str> {
        self.license.as_deref()
    }

    /// Error message, if any.
    pub fn error_message(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Provider data.
    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    /// Reject results that carry neither license text nor an error message.
    pub fn ensure_not_empty(self, provider: &str) -> Result<Self, LicentiaError> {
        let has_license = self.license.as_deref().is_some_and(|s| !s.trim().is_empty());
        let has_error = self.error.as_deref().is_some_and(|s| !s.trim().is_empty());
        if has_license || has_error {
            Ok(self)
        } else {
            Err(LicentiaError::EmptyProviderResult {
                provider: provider.to_string(),
            })
        }
    }
}

/// A link in a component's provider chain.
pub trait LicenseProvider: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> String;

    /// Whether this provider serves design-time lookups.
    fn design_mode(&self) -> bool {
        false
    }

    /// Whether the result depends on the call context. The manager never
    /// caches a resolution that consulted such a provider.
    fn depends_on_context(&self) -> bool {
        false
    }

    /// Look up the license for `component`.
    fn get_license(
        &self,
        component: &ComponentInfo,
        context: &CallContext,
    ) -> Result<LicenseProviderResult, LicentiaError>;

    /// Drop any memoized result.
    fn reset(&self) {}
}

/// A plain license text source.
pub trait LicenseSource: Send + Sync {
    /// Name used in logs and errors.
    fn name(&self) -> String;

    /// Load license text, or explain why there is none.
    fn load(&self, component: &ComponentInfo) -> Result<String, String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_license_result() {
        let result = LicenseProviderResult::license("text").with_data("App,token");
        assert_eq!(result.license_text(), Some("text"));
        assert_eq!(result.error_message(), None);
        assert_eq!(result.data(), Some("App,token"));
        assert!(result.ensure_not_empty("test").is_ok());
    }

    #[test]
    fn test_error_result() {
        let result = LicenseProviderResult::error("not found");
        assert_eq!(result.license_text(), None);
        assert_eq!(result.error_message(), Some("not found"));
        assert!(result.ensure_not_empty("test").is_ok());
    }

    #[test]
    fn test_empty_results_rejected() {
        for result in [
            LicenseProviderResult::license(""),
            LicenseProviderResult::error("  "),
        ] {
            assert!(matches!(
                result.ensure_not_empty("file"),
                Err(LicentiaError::EmptyProviderResult { provider }) if provider == "file"
            ));
        }
    }
}
