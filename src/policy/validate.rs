//! License validation rules.
//!
//! A resolved license is checked in a fixed order, stopping at the first
//! failure:
//!
//! 1. the requested item exists;
//! 2. the license product matches the component's declared product;
//! 3. the license has not expired, unless the item overrides expiration;
//! 4. the component release date falls inside the upgrade window;
//! 5. the kind-specific check passes (evaluated once per license);
//! 6. the item-specific check passes.
//!
//! Presence of a license and the same-key bypass are handled by the
//! [`LicenseManager`](crate::LicenseManager).

use crate::component::ComponentInfo;
use crate::identity::IdentitySource;
use crate::license::model::format_date;
use crate::license::{License, LicenseError, LicenseErrorReason, LicenseItem, LicenseKind};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Host hook for [`LicenseKind::Custom`] licenses.
pub trait KindValidator: Send + Sync {
    /// Return `None` if the license is acceptable, or the reason it is not.
    fn validate(&self, license: &License, component: &ComponentInfo) -> Option<String>;
}

/// Host hook run for a specific license item after all other checks.
pub trait ItemValidator: Send + Sync {
    /// Return `None` if the item may be granted, or the reason it may not.
    fn validate(&self, license: &License, item: &LicenseItem, component: &ComponentInfo)
        -> Option<String>;
}

/// Everything a validation pass needs besides the license itself.
pub struct ValidationContext<'a> {
    /// Component being validated.
    pub component: &'a ComponentInfo,
    /// Data reported by the provider that supplied the license.
    pub provider_data: Option<&'a str>,
    /// Current time.
    pub now: DateTime<Utc>,
    /// Machine and user identity.
    pub identity: &'a dyn IdentitySource,
    /// Hooks for custom license kinds, by kind name.
    pub kind_validators: &'a HashMap<String, Arc<dyn KindValidator>>,
    /// Hooks for license items, by item name.
    pub item_validators: &'a HashMap<String, Arc<dyn ItemValidator>>,
}

/// Check a resolved license for `item_name`. `None` means valid.
pub fn evaluate(
    license: &Arc<License>,
    item_name: &str,
    ctx: &ValidationContext<'_>,
) -> Option<LicenseError> {
    let fail = |reason, message: String| {
        Some(LicenseError::new(
            ctx.component.id().to_string(),
            reason,
            message,
            Some(license.clone()),
        ))
    };

    let Some(item) = license.item(item_name) else {
        return fail(
            LicenseErrorReason::InvalidLicense,
            format!("License item {} is not granted.", item_name),
        );
    };

    if let Some(product) = ctx.component.product() {
        if license.product() != product {
            return fail(
                LicenseErrorReason::InvalidLicense,
                format!(
                    "License is for product {:?}, not {:?}.",
                    license.product(),
                    product
                ),
            );
        }
    }

    if license.is_expired(ctx.now) && !item.override_expiration_date() {
        return fail(
            LicenseErrorReason::ExpiredLicense,
            format!("License expired on {}.", format_date(license.expiration())),
        );
    }

    let release_date = ctx.component.release_date();
    if release_date > license.upgrade_expiration() {
        return fail(
            LicenseErrorReason::InvalidLicense,
            format!(
                "License covers releases up to {}; this release is from {}.",
                format_date(license.upgrade_expiration()),
                format_date(release_date)
            ),
        );
    }

    if let Some(message) = license.kind_check(|| kind_check(license, ctx)) {
        return fail(LicenseErrorReason::InvalidLicense, message);
    }

    if let Some(validator) = ctx.item_validators.get(item_name) {
        if let Some(message) = validator.validate(license, item, ctx.component) {
            return fail(LicenseErrorReason::InvalidLicense, message);
        }
    }

    None
}

fn kind_check(license: &License, ctx: &ValidationContext<'_>) -> Option<String> {
    let expect = |expected: String, what: &str| {
        (license.data() != expected).then(|| format!("License is bound to another {}.", what))
    };

    match license.kind() {
        LicenseKind::Unrestricted => None,
        LicenseKind::Component => {
            let expected = ctx
                .provider_data
                .map(str::to_string)
                .unwrap_or_else(|| ctx.component.fingerprint());
            expect(expected, "component")
        }
        LicenseKind::Machine => expect(ctx.identity.machine_id(), "machine"),
        LicenseKind::User => expect(ctx.identity.user_id(), "user"),
        LicenseKind::Custom(name) => match ctx.kind_validators.get(name) {
            Some(validator) => validator.validate(license, ctx.component),
            None => Some(format!("No validator registered for license kind {}.", name)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Version;
    use crate::identity::StaticIdentity;
    use crate::license::{LicenseBuilder, LicenseItem};
    use chrono::{Duration, TimeZone};

    struct Fixture {
        component: ComponentInfo,
        identity: StaticIdentity,
        kinds: HashMap<String, Arc<dyn KindValidator>>,
        items: HashMap<String, Arc<dyn ItemValidator>>,
        now: DateTime<Utc>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                component: ComponentInfo::new("Acme.Grid", Version::new(1, 0, 9000, 0))
                    .with_product("Acme Grid"),
                identity: StaticIdentity {
                    machine: "machine-a".into(),
                    user: "HOST\\sam".into(),
                },
                kinds: HashMap::new(),
                items: HashMap::new(),
                now: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
            }
        }

        fn ctx(&self) -> ValidationContext<'_> {
            ValidationContext {
                component: &self.component,
                provider_data: None,
                now: self.now,
                identity: &self.identity,
                kind_validators: &self.kinds,
                item_validators: &self.items,
            }
        }
    }

    fn license(builder: LicenseBuilder) -> Arc<License> {
        Arc::new(builder.build().unwrap())
    }

    fn base() -> LicenseBuilder {
        LicenseBuilder::new(LicenseKind::Unrestricted)
            .product("Acme Grid")
            .item(LicenseItem::new("Export"))
            .item(LicenseItem::overriding_expiration("View"))
    }

    fn reason(error: Option<LicenseError>) -> Option<LicenseErrorReason> {
        error.map(|e| e.reason())
    }

    #[test]
    fn test_valid_license() {
        let fixture = Fixture::new();
        assert!(evaluate(&license(base()), "Export", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_missing_item_invalid() {
        let fixture = Fixture::new();
        let error = evaluate(&license(base()), "Print", &fixture.ctx()).unwrap();
        assert_eq!(error.reason(), LicenseErrorReason::InvalidLicense);
        assert!(error.message().contains("Print"));
        assert!(error.license().is_some());
    }

    #[test]
    fn test_product_mismatch_invalid() {
        let fixture = Fixture::new();
        let lic = license(base().product("Acme Charts"));
        assert_eq!(
            reason(evaluate(&lic, "Export", &fixture.ctx())),
            Some(LicenseErrorReason::InvalidLicense)
        );
    }

    #[test]
    fn test_product_ignored_when_component_declares_none() {
        let mut fixture = Fixture::new();
        fixture.component = ComponentInfo::new("Acme.Grid", Version::new(1, 0, 0, 0));
        let lic = license(base().product("Anything"));
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_expired_unless_overridden() {
        let fixture = Fixture::new();
        let lic = license(base().expiration(fixture.now - Duration::days(1)));
        assert_eq!(
            reason(evaluate(&lic, "Export", &fixture.ctx())),
            Some(LicenseErrorReason::ExpiredLicense)
        );
        assert!(evaluate(&lic, "View", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_expiration_is_start_of_day() {
        let fixture = Fixture::new();
        let lic = license(base().expiration(fixture.now));
        // Expiration is midnight of the same day, so noon is past it.
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_some());
        let lic = license(base().expiration(fixture.now + Duration::days(1)));
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_upgrade_window() {
        let fixture = Fixture::new();
        let release = fixture.component.release_date();
        let lic = license(base().upgrade_expiration(release - Duration::days(1)));
        assert_eq!(
            reason(evaluate(&lic, "View", &fixture.ctx())),
            Some(LicenseErrorReason::InvalidLicense)
        );
        let lic = license(base().upgrade_expiration(release));
        assert!(evaluate(&lic, "View", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_expiration_checked_before_upgrade() {
        let fixture = Fixture::new();
        let release = fixture.component.release_date();
        let lic = license(
            base()
                .expiration(fixture.now - Duration::days(1))
                .upgrade_expiration(release - Duration::days(1)),
        );
        assert_eq!(
            reason(evaluate(&lic, "Export", &fixture.ctx())),
            Some(LicenseErrorReason::ExpiredLicense)
        );
    }

    #[test]
    fn test_machine_and_user_kinds() {
        let fixture = Fixture::new();
        let ok = license(base().data("machine-a").kind(LicenseKind::Machine));
        assert!(evaluate(&ok, "Export", &fixture.ctx()).is_none());
        let bad = license(base().data("machine-b").kind(LicenseKind::Machine));
        assert!(evaluate(&bad, "Export", &fixture.ctx()).is_some());

        let user = license(base().data("HOST\\sam").kind(LicenseKind::User));
        assert!(evaluate(&user, "Export", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_component_kind_uses_provider_data() {
        let fixture = Fixture::new();
        let own = license(
            base()
                .data(fixture.component.fingerprint())
                .kind(LicenseKind::Component),
        );
        assert!(evaluate(&own, "Export", &fixture.ctx()).is_none());

        let carried = license(base().data("Shop.App,abc").kind(LicenseKind::Component));
        let mut ctx = fixture.ctx();
        ctx.provider_data = Some("Shop.App,abc");
        assert!(evaluate(&carried, "Export", &ctx).is_none());
    }

    #[test]
    fn test_kind_check_memoized_per_license() {
        let mut fixture = Fixture::new();
        let lic = license(base().data("machine-a").kind(LicenseKind::Machine));
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_none());
        fixture.identity.machine = "machine-b".into();
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_none());
        // A fresh license instance is evaluated again.
        let fresh = license(lic.to_builder());
        assert!(evaluate(&fresh, "Export", &fixture.ctx()).is_some());
    }

    struct SeatLimit;

    impl KindValidator for SeatLimit {
        fn validate(&self, license: &License, _component: &ComponentInfo) -> Option<String> {
            (license.data() != "5 seats").then(|| "Seat count mismatch".to_string())
        }
    }

    struct DenyExport;

    impl ItemValidator for DenyExport {
        fn validate(
            &self,
            _license: &License,
            item: &LicenseItem,
            _component: &ComponentInfo,
        ) -> Option<String> {
            Some(format!("{} disabled by policy", item.name()))
        }
    }

    #[test]
    fn test_custom_kind_validator() {
        let mut fixture = Fixture::new();
        let lic = license(base().data("5 seats").kind(LicenseKind::Custom("seats".into())));
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_some());

        fixture.kinds.insert("seats".into(), Arc::new(SeatLimit));
        let lic = license(lic.to_builder());
        assert!(evaluate(&lic, "Export", &fixture.ctx()).is_none());
    }

    #[test]
    fn test_item_validator() {
        let mut fixture = Fixture::new();
        fixture.items.insert("Export".into(), Arc::new(DenyExport));
        let lic = license(base());
        let error = evaluate(&lic, "Export", &fixture.ctx()).unwrap();
        assert!(error.message().contains("disabled by policy"));
        assert!(evaluate(&lic, "View", &fixture.ctx()).is_none());
    }
}
