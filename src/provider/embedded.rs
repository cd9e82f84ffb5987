//! Licenses embedded as resources in the calling component.
//!
//! An application that ships with a license for a component carries it as
//! a resource whose name ends with the component's license file name
//! (`<Name>.<token>.lic`, case-insensitive), or names a
//! [`LicenseLoader`](crate::component::LicenseLoader) that supplies it. The
//! license is then bound to the application that carried it.

use super::{LicenseProvider, LicenseProviderResult};
use crate::component::{ComponentId, ComponentInfo};
use crate::policy::trust::CallContext;
use crate::LicentiaError;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::trace;

/// Searches callers (or only the entry component) for an embedded license.
#[derive(Debug, Default)]
pub struct EmbeddedResourceProvider {
    entry_only: bool,
    design_mode: bool,
    // Per caller: resource text found for a license file name, if any.
    cache: Mutex<HashMap<(ComponentId, String), Option<String>>>,
}

impl EmbeddedResourceProvider {
    /// Search the callers, nearest first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Search only the entry component.
    pub fn entry_only() -> Self {
        Self {
            entry_only: true,
            ..Self::default()
        }
    }

    /// Mark as a design-time provider.
    pub fn design_time(mut self) -> Self {
        self.design_mode = true;
        self
    }

    fn lookup(&self, holder: &ComponentInfo, component: &ComponentInfo) -> Option<String> {
        let file_name = component.license_file_name();
        let key = (holder.id(), file_name.clone());
        if let Some(hit) = self.cache.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return hit.clone();
        }

        let found = match holder.license_loader() {
            Some(loader) => loader.load(component).filter(|text| !text.trim().is_empty()),
            None => find_resource(holder, &file_name),
        };
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert(found)
            .clone()
    }
}

fn find_resource(holder: &ComponentInfo, file_name: &str) -> Option<String> {
    let suffix = file_name.to_lowercase();
    holder
        .resources()
        .iter()
        .find(|r| r.name.to_lowercase().ends_with(&suffix))
        .and_then(|r| String::from_utf8(r.content.clone()).ok())
        .filter(|text| !text.trim().is_empty())
}

impl LicenseProvider for EmbeddedResourceProvider {
    fn name(&self) -> String {
        if self.entry_only {
            "embedded(entry)".to_string()
        } else {
            "embedded(callers)".to_string()
        }
    }

    fn design_mode(&self) -> bool {
        self.design_mode
    }

    fn depends_on_context(&self) -> bool {
        true
    }

    fn get_license(
        &self,
        component: &ComponentInfo,
        context: &CallContext,
    ) -> Result<LicenseProviderResult, LicentiaError> {
        let file_name = component.license_file_name();

        let candidates: Vec<&ComponentInfo> = if self.entry_only {
            context.entry().into_iter().collect()
        } else {
            context.callers_excluding(component.id()).collect()
        };

        for holder in candidates {
            if let Some(text) = self.lookup(holder, component) {
                trace!(component = %component.id(), holder = %holder.id(), "Found embedded license");
                return Ok(LicenseProviderResult::license(text).with_data(holder.fingerprint()));
            }
        }

        Ok(LicenseProviderResult::error(format!(
            "No embedded license resource {} found.",
            file_name
        )))
    }

    fn reset(&self) {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
