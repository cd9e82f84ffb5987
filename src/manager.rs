//! License Manager - the main public API for Licentia.
//!
//! Components are registered once with an ordered chain of license
//! providers. A check then:
//! - resolves the license through the chain (cached per component and mode,
//!   unless a caller-dependent provider was consulted)
//! - verifies its signature with the component's license public key
//! - runs the validation rules
//! - falls back to the same-signing-key bypass when any of that fails

use crate::clock::{Clock, SystemClock};
use crate::component::{ComponentId, ComponentInfo};
use crate::crypto::rsa::RsaKey;
use crate::identity::{IdentitySource, SystemIdentity};
use crate::license::{verify_signed_license, License, LicenseError, LicenseErrorReason};
use crate::policy::trust::{same_key_caller, CallContext};
use crate::policy::validate::{evaluate, ItemValidator, KindValidator, ValidationContext};
use crate::provider::LicenseProvider;
use crate::LicentiaError;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};
use tracing::{debug, trace};

struct Registration {
    component: Arc<ComponentInfo>,
    providers: Vec<Arc<dyn LicenseProvider>>,
    public_key: OnceCell<RsaKey>,
}

impl Registration {
    fn public_key(&self) -> Result<&RsaKey, LicentiaError> {
        self.public_key.get_or_try_init(|| {
            self.component
                .license_public_key()?
                .ok_or_else(|| LicentiaError::NullPublicKey(self.component.id().to_string()))
        })
    }
}

/// Outcome of walking a provider chain.
#[derive(Clone, Default)]
struct Resolved {
    license: Option<Arc<License>>,
    provider_data: Option<String>,
}

/// Main license manager for Licentia.
///
/// Create one instance per process and share it. All methods take `&self`.
/// The resolution cache lock is held only to read or insert entries, never
/// while providers run, and validating a resolved license only reads shared
/// state.
pub struct LicenseManager {
    clock: Arc<dyn Clock>,
    identity: Arc<dyn IdentitySource>,
    registrations: RwLock<HashMap<ComponentId, Arc<Registration>>>,
    kind_validators: RwLock<HashMap<String, Arc<dyn KindValidator>>>,
    item_validators: RwLock<HashMap<String, Arc<dyn ItemValidator>>>,
    resolved: Mutex<HashMap<(ComponentId, bool), Resolved>>,
}

impl Default for LicenseManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LicenseManager {
    /// Manager using the system clock and system identity.
    pub fn new() -> Self {
        Self {
            clock: Arc::new(SystemClock),
            identity: Arc::new(SystemIdentity),
            registrations: RwLock::new(HashMap::new()),
            kind_validators: RwLock::new(HashMap::new()),
            item_validators: RwLock::new(HashMap::new()),
            resolved: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the clock used for expiration checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the identity used by machine and user licenses.
    pub fn with_identity(mut self, identity: Arc<dyn IdentitySource>) -> Self {
        self.identity = identity;
        self
    }

    /// Register `component` with its provider chain, in lookup order.
    ///
    /// Registering the same component again replaces the chain and drops
    /// any license resolved for it.
    pub fn register(
        &self,
        component: ComponentInfo,
        providers: Vec<Arc<dyn LicenseProvider>>,
    ) -> Arc<ComponentInfo> {
        let component = Arc::new(component);
        let id = component.id();
        debug!(component = %id, providers = providers.len(), "Registered component");

        self.registrations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id.clone(),
                Arc::new(Registration {
                    component: component.clone(),
                    providers,
                    public_key: OnceCell::new(),
                }),
            );
        self.forget(&id);
        component
    }

    /// Register the hook for licenses of kind `LicenseKind::Custom(kind)`.
    pub fn register_kind_validator(&self, kind: impl Into<String>, validator: Arc<dyn KindValidator>) {
        self.kind_validators
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(kind.into(), validator);
    }

    /// Register an extra check for the license item named `item`.
    pub fn register_item_validator(&self, item: impl Into<String>, validator: Arc<dyn ItemValidator>) {
        self.item_validators
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(item.into(), validator);
    }

    /// Resolve the license for `component` without validating it.
    ///
    /// The returned license may still fail [`check`](Self::check).
    ///
    /// # Errors
    /// - `UnknownComponent` - the component was never registered
    /// - `EmptyProviderResult` - a provider broke its contract
    /// - `NullPublicKey` - license text was found but no key can verify it
    /// - `SignatureInvalid` / `ProtocolError` - the license text is forged or corrupt
    pub fn get_license(
        &self,
        component: &ComponentInfo,
        context: &CallContext,
    ) -> Result<Option<Arc<License>>, LicentiaError> {
        let registration = self.registration(component)?;
        Ok(self.resolve(&registration, context)?.license)
    }

    /// Check whether `item_name` may be granted to `component`.
    ///
    /// Returns `Ok(None)` when granted and the refusal as data otherwise.
    /// Faults (unknown component, forged license text) are errors.
    pub fn check(
        &self,
        item_name: &str,
        component: &ComponentInfo,
        context: &CallContext,
    ) -> Result<Option<LicenseError>, LicentiaError> {
        if item_name.trim().is_empty() {
            return Err(LicentiaError::ConfigError(
                "license item name cannot be empty".to_string(),
            ));
        }

        let registration = self.registration(component)?;
        let component = registration.component.as_ref();
        let resolved = self.resolve(&registration, context)?;

        let error = match &resolved.license {
            Some(license) => {
                let kind_validators = self.kind_validators.read().unwrap_or_else(|e| e.into_inner());
                let item_validators = self.item_validators.read().unwrap_or_else(|e| e.into_inner());
                let validation = ValidationContext {
                    component,
                    provider_data: resolved.provider_data.as_deref(),
                    now: self.clock.now_utc(),
                    identity: self.identity.as_ref(),
                    kind_validators: &kind_validators,
                    item_validators: &item_validators,
                };
                evaluate(license, item_name, &validation)
            }
            None => Some(LicenseError::new(
                component.id().to_string(),
                LicenseErrorReason::NullLicense,
                "No license could be found.",
                None,
            )),
        };

        let Some(error) = error else {
            trace!(component = %component.id(), item = item_name, "License granted");
            return Ok(None);
        };

        if let Some(caller) = same_key_caller(component, context) {
            debug!(
                component = %component.id(),
                caller = %caller.id(),
                "Granted to caller signed with the same key"
            );
            return Ok(None);
        }

        debug!(
            component = %component.id(),
            item = item_name,
            reason = %error.reason(),
            detail = error.message(),
            "License refused"
        );
        Ok(Some(error))
    }

    /// Like [`check`](Self::check), but a refusal becomes
    /// [`LicentiaError::License`].
    pub fn validate(
        &self,
        item_name: &str,
        component: &ComponentInfo,
        context: &CallContext,
    ) -> Result<(), LicentiaError> {
        match self.check(item_name, component, context)? {
            Some(error) => Err(error.into()),
            None => Ok(()),
        }
    }

    /// Drop the resolved license of `component` and reset its providers,
    /// so the next check looks the license up again.
    pub fn reset(&self, component: &ComponentInfo) {
        let id = component.id();
        let registration = self
            .registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned();
        if let Some(registration) = registration {
            for provider in &registration.providers {
                provider.reset();
            }
        }
        self.forget(&id);
        debug!(component = %id, "License reset");
    }

    /// Reset every registered component.
    pub fn reset_all(&self) {
        let registrations: Vec<_> = self
            .registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        for registration in &registrations {
            for provider in &registration.providers {
                provider.reset();
            }
        }
        self.resolved.lock().unwrap_or_else(|e| e.into_inner()).clear();
        debug!(components = registrations.len(), "All licenses reset");
    }

    fn forget(&self, id: &ComponentId) {
        self.resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|(cached, _), _| cached != id);
    }

    fn registration(&self, component: &ComponentInfo) -> Result<Arc<Registration>, LicentiaError> {
        let id = component.id();
        self.registrations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
            .ok_or_else(|| LicentiaError::UnknownComponent(id.to_string()))
    }

    fn resolve(
        &self,
        registration: &Registration,
        context: &CallContext,
    ) -> Result<Resolved, LicentiaError> {
        let component = registration.component.as_ref();
        let design_mode = context.is_design_time();
        let key = (component.id(), design_mode);

        if let Some(hit) = self
            .resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
        {
            return Ok(hit.clone());
        }

        // Providers run without the lock held; they may do I/O or call back
        // into the manager.
        let mut resolved = Resolved::default();
        let mut cacheable = true;
        let chain = registration
            .providers
            .iter()
            .filter(|p| p.design_mode() == design_mode);
        for provider in chain {
            cacheable &= !provider.depends_on_context();
            let name = provider.name();
            let result = provider
                .get_license(component, context)?
                .ensure_not_empty(&name)?;

            match result.license_text().filter(|text| !text.trim().is_empty()) {
                Some(text) => {
                    let license = verify_signed_license(registration.public_key()?, text)?;
                    debug!(
                        component = %key.0,
                        provider = %name,
                        license_id = license.id(),
                        "License resolved"
                    );
                    resolved = Resolved {
                        license: Some(Arc::new(license)),
                        provider_data: result.data().map(str::to_string),
                    };
                    break;
                }
                None => {
                    trace!(
                        component = %key.0,
                        provider = %name,
                        error = result.error_message().unwrap_or_default(),
                        "Provider has no license"
                    );
                }
            }
        }

        if !cacheable {
            return Ok(resolved);
        }
        let resolved = self
            .resolved
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(key)
            .or_insert(resolved)
            .clone();
        Ok(resolved)
    }
}
