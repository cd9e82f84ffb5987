//! Shared fixtures for integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use licentia::{
    sign_license, Clock, ComponentInfo, LicenseBuilder, LicenseItem, LicenseKind, RsaKey, Version,
};
use std::sync::Mutex;

pub const VENDOR_PUB: &[u8] = include_bytes!("../fixtures/vendor.pub");
pub const OTHER_PUB: &[u8] = include_bytes!("../fixtures/other.pub");
pub const VENDOR_PRIVATE_XML: &str = include_str!("../fixtures/vendor_private.xml");
pub const VENDOR_PUBLIC_XML: &str = include_str!("../fixtures/vendor_public.xml");
pub const OTHER_PRIVATE_XML: &str = include_str!("../fixtures/other_private.xml");

/// Clock a test can move.
pub struct FixedClock(Mutex<DateTime<Utc>>);

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

/// The vendor's licensed component.
pub fn grid() -> ComponentInfo {
    ComponentInfo::new("Acme.Grid", Version::new(1, 0, 9000, 0))
        .with_strong_name(VENDOR_PUB)
        .unwrap()
        .with_product("Acme Grid")
        .with_license_item("Export", "Export grid data")
        .with_license_item("View", "Display grids")
}

pub fn vendor_key() -> RsaKey {
    RsaKey::from_xml(VENDOR_PRIVATE_XML).unwrap()
}

pub fn unrestricted() -> LicenseBuilder {
    LicenseBuilder::new(LicenseKind::Unrestricted)
        .product("Acme Grid")
        .item(LicenseItem::new("Export"))
        .item(LicenseItem::overriding_expiration("View"))
}

/// Signed license text for `builder`.
pub fn signed(key: &RsaKey, builder: LicenseBuilder) -> String {
    sign_license(key, builder)
        .unwrap()
        .signed_string()
        .unwrap()
        .to_string()
}
