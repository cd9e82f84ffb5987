//! Memoizing wrapper for simple license sources.

use super::{LicenseProvider, LicenseProviderResult, LicenseSource};
use crate::component::ComponentInfo;
use crate::policy::trust::CallContext;
use crate::LicentiaError;
use std::sync::Mutex;
use tracing::trace;

/// Wraps a [`LicenseSource`], loading once and replaying the result until
/// [`reset`](LicenseProvider::reset).
pub struct CachedProvider<S> {
    source: S,
    design_mode: bool,
    cached: Mutex<Option<LicenseProviderResult>>,
}

impl<S: LicenseSource> CachedProvider<S> {
    /// Runtime provider over `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            design_mode: false,
            cached: Mutex::new(None),
        }
    }

    /// Mark as a design-time provider.
    pub fn design_time(mut self) -> Self {
        self.design_mode = true;
        self
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S: LicenseSource> LicenseProvider for CachedProvider<S> {
    fn name(&self) -> String {
        self.source.name()
    }

    fn design_mode(&self) -> bool {
        self.design_mode
    }

    fn get_license(
        &self,
        component: &ComponentInfo,
        _context: &CallContext,
    ) -> Result<LicenseProviderResult, LicentiaError> {
        let mut cached = self.cached.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(result) = cached.as_ref() {
            return Ok(result.clone());
        }

        let result = match self.source.load(component) {
            Ok(text) => LicenseProviderResult::license(text),
            Err(message) => LicenseProviderResult::error(message),
        }
        .ensure_not_empty(&self.source.name())?;

        trace!(component = %component.id(), provider = %self.source.name(), "Loaded license source");
        *cached = Some(result.clone());
        Ok(result)
    }

    fn reset(&self) {
        *self.cached.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
