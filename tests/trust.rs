//! Same-key trust and licenses carried by the calling application.

mod common;

use common::*;
use licentia::provider::{EmbeddedResourceProvider, LicenseProvider};
use licentia::{
    CallContext, ComponentInfo, LicenseErrorReason, LicenseKind, LicenseManager, Version,
};
use std::sync::Arc;

fn vendor_app() -> ComponentInfo {
    ComponentInfo::new("Acme.Designer", Version::new(3, 2, 0, 0))
        .with_strong_name(VENDOR_PUB)
        .unwrap()
}

fn customer_app(resource: Option<String>) -> ComponentInfo {
    let app = ComponentInfo::new("Shop.Backoffice", Version::new(1, 4, 0, 0))
        .with_content(b"shop backoffice build 1.4");
    match resource {
        Some(text) => app.with_resource("Shop.Backoffice.Licenses.Acme.Grid.920152bf6f9182ee.lic", text),
        None => app,
    }
}

fn manager() -> (LicenseManager, Arc<ComponentInfo>) {
    let manager = LicenseManager::new();
    let providers: Vec<Arc<dyn LicenseProvider>> = vec![Arc::new(EmbeddedResourceProvider::new())];
    let grid = manager.register(grid(), providers);
    (manager, grid)
}

#[test]
fn same_vendor_caller_needs_no_license() {
    let (manager, grid) = manager();
    let context = CallContext::new().with_caller(vendor_app());
    assert!(manager.check("Export", &grid, &context).unwrap().is_none());
}

#[test]
fn same_vendor_entry_needs_no_license() {
    let (manager, grid) = manager();
    let context = CallContext::new()
        .with_entry(vendor_app())
        .with_caller(customer_app(None));
    assert!(manager.check("Export", &grid, &context).unwrap().is_none());
}

#[test]
fn unrelated_caller_gets_null_license() {
    let (manager, grid) = manager();
    let other_vendor = ComponentInfo::new("Other.Tool", Version::new(1, 0, 0, 0))
        .with_strong_name(OTHER_PUB)
        .unwrap();
    let context = CallContext::new()
        .with_entry(customer_app(None))
        .with_caller(other_vendor);

    let error = manager.check("Export", &grid, &context).unwrap().unwrap();
    assert_eq!(error.reason(), LicenseErrorReason::NullLicense);
    assert!(error.license().is_none());
}

#[test]
fn embedded_component_license_bound_to_carrier() {
    let carrier = customer_app(None);
    let text = signed(
        &vendor_key(),
        unrestricted()
            .kind(LicenseKind::Component)
            .data(carrier.fingerprint()),
    );
    let (manager, grid) = manager();

    let context = CallContext::new().with_caller(customer_app(Some(text.clone())));
    assert!(manager.check("Export", &grid, &context).unwrap().is_none());

    // A later caller of the same manager does not inherit the carrier's license.
    let unrelated = ComponentInfo::new("Unrelated.Script", Version::new(0, 1, 0, 0));
    let context = CallContext::new().with_caller(unrelated);
    let error = manager.check("Export", &grid, &context).unwrap().unwrap();
    assert_eq!(error.reason(), LicenseErrorReason::NullLicense);
    assert!(manager
        .get_license(&grid, &CallContext::new())
        .unwrap()
        .is_none());

    // The same license text carried by a different application is refused.
    let impostor = ComponentInfo::new("Impostor", Version::new(1, 0, 0, 0))
        .with_resource("Acme.Grid.920152bf6f9182ee.lic", text.clone());
    let context = CallContext::new().with_caller(impostor);
    let error = manager.check("Export", &grid, &context).unwrap().unwrap();
    assert_eq!(error.reason(), LicenseErrorReason::InvalidLicense);

    let context = CallContext::new().with_caller(customer_app(Some(text)));
    assert!(manager.check("Export", &grid, &context).unwrap().is_none());
}
