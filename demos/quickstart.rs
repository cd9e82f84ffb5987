//! End-to-end licensing walkthrough, entirely in process.
//!
//! A vendor publisher issues a 30-day evaluation license, the client
//! verifies it and saves it to the local store, and the license manager
//! grants license items from it.
//!
//! # Running
//!
//! ```bash
//! cargo run --example quickstart
//! ```
//!
//! # Note
//!
//! The publisher's private key must never ship with the client. It is
//! included here only so the walkthrough runs without a server.

use chrono::{Duration, Utc};
use licentia::provider::{CachedProvider, LicenseProvider, StoreSource};
use licentia::{
    CallContext, ComponentInfo, LicenseBuilder, LicenseClient, LicenseIssuer, LicenseItem,
    LicenseKey, LicenseKind, LicenseManager, LicensePublisher, LicenseRequest, LicenseStore,
    Licensee, LicentiaError, PublisherResponse, Version,
};
use std::sync::Arc;

const VENDOR_PRIVATE_XML: &str = include_str!("../tests/fixtures/vendor_private.xml");
const VENDOR_PUBLIC_XML: &str = include_str!("../tests/fixtures/vendor_public.xml");
const VENDOR_PUBLIC_BLOB: &[u8] = include_bytes!("../tests/fixtures/vendor.pub");

struct EvaluationIssuer;

impl LicenseIssuer for EvaluationIssuer {
    fn private_key_xml(&self, _product: &str) -> Option<String> {
        Some(VENDOR_PRIVATE_XML.to_string())
    }

    fn issue(&self, request: &LicenseRequest) -> PublisherResponse {
        if request.category != "Evaluation" {
            return PublisherResponse::Error("Only evaluations are offered".to_string());
        }
        let license = LicenseBuilder::new(LicenseKind::Unrestricted)
            .category("Evaluation")
            .product(request.product.clone())
            .user_name(request.name.clone())
            .expiration(Utc::now() + Duration::days(30))
            .item(LicenseItem::new("Export"))
            .build();
        match license {
            Ok(license) => PublisherResponse::License(license),
            Err(e) => PublisherResponse::Error(e.to_string()),
        }
    }
}

fn main() -> Result<(), LicentiaError> {
    let grid = ComponentInfo::new("Acme.Grid", Version::new(1, 0, 9000, 0))
        .with_strong_name(VENDOR_PUBLIC_BLOB)?
        .with_product("Acme Grid");

    // Client side: ask the publisher for an evaluation.
    let client = LicenseClient::new(LicensePublisher::new(EvaluationIssuer), VENDOR_PUBLIC_XML)?;
    let licensee = Licensee {
        name: "Sam".to_string(),
        ..Licensee::default()
    };
    let response = client.get_license(
        "Acme Grid",
        grid.version(),
        &LicenseKey::empty(),
        "Evaluation",
        &licensee,
    )?;
    let license = match response.into_result() {
        Ok(license) => license,
        Err(message) => {
            eprintln!("Publisher refused: {}", message);
            std::process::exit(1);
        }
    };
    println!("Issued {} license, expires {}", license.category(), license.expiration());

    // Persist it where the store provider will find it.
    let store = LicenseStore::with_path(std::env::temp_dir().join("licentia-quickstart"))?;
    if let Some(text) = license.signed_string() {
        store.save(&grid, text)?;
    }

    // Runtime side: validate license items.
    let manager = LicenseManager::new();
    let providers: Vec<Arc<dyn LicenseProvider>> =
        vec![Arc::new(CachedProvider::new(StoreSource::new(store.clone())))];
    let grid = manager.register(grid, providers);
    let context = CallContext::new();

    for item in ["Export", "Print"] {
        match manager.check(item, &grid, &context)? {
            None => println!("{}: granted", item),
            Some(error) => println!("{}: {}", item, error.exception_message()),
        }
    }

    store.delete(&grid)?;
    Ok(())
}
