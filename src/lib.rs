//! # Licentia
//!
//! **Offline license certificates for Rust components.**
//!
//! A vendor signs licenses with an RSA key that is also the component's
//! strong-name key. The shipped component verifies them with the public
//! half and grants named license items at runtime.
//!
//! ## Features
//!
//! - **From-scratch RSA** with PKCS#1 v1.5 encryption and SHA-1/MD5 signatures
//! - **License keys** of 25 base-31 symbols with a checksum digit
//! - **Publisher protocol** where the key is RSA-wrapped on the way out and
//!   the response is triple-DES encrypted under the key on the way back
//! - **Provider chains** that look for a license in files, the registry,
//!   the local store or resources embedded in the calling application
//! - **Same-key trust**: components signed by the same vendor key call each
//!   other without licenses
//!
//! ## Quickstart
//!
//! ```no_run
//! use licentia::provider::{CachedProvider, FileSource, LicenseProvider};
//! use licentia::{CallContext, ComponentInfo, LicenseManager, Version};
//! use std::sync::Arc;
//!
//! fn main() -> Result<(), licentia::LicentiaError> {
//!     let grid = ComponentInfo::new("Acme.Grid", Version::new(1, 0, 9000, 0))
//!         .with_strong_name(&std::fs::read("Acme.Grid.pub").unwrap_or_default())?;
//!
//!     let manager = LicenseManager::new();
//!     let providers: Vec<Arc<dyn LicenseProvider>> =
//!         vec![Arc::new(CachedProvider::new(FileSource::beside_component()))];
//!     let grid = manager.register(grid, providers);
//!
//!     match manager.check("Export", &grid, &CallContext::new())? {
//!         None => println!("Export enabled"),
//!         Some(error) => println!("{}", error.exception_message()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Threat Model
//!
//! Licentia protects against:
//! - **Forged licenses**: license text must carry the vendor's signature
//! - **Edited licenses**: any change to the signed body fails verification
//! - **Response tampering**: publisher answers are encrypted under the
//!   client's license key and signed
//!
//! Licentia does **not** prevent binary patching or code modification.
//! Client-side licensing can always be bypassed by a determined attacker
//! with access to the binary.

#![warn(missing_docs)]
#![doc(html_root_url = "https://docs.rs/licentia/0.1.0")]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Crypto layer
pub mod crypto;

// License model
pub mod license;

// Component metadata and identity
pub mod component;
pub mod identity;

// Providers
pub mod provider;

// Policy layer
pub mod policy;

// Protocol layer
pub mod protocol;

// Client layer
pub mod client;

// Store layer
pub mod cache;

// Update check
pub mod update;

// Manager (main public API)
pub mod manager;

// Re-exports for public API
pub use cache::LicenseStore;
pub use clock::{Clock, SystemClock};
pub use component::{ComponentId, ComponentInfo, LicenseLoader, Version};
pub use config::ClientConfig;
pub use crypto::rsa::{HashAlgorithm, RsaKey};
pub use errors::LicentiaError;
pub use identity::{IdentitySource, StaticIdentity, SystemIdentity};
pub use license::{
    sign_license, verify_signed_license, License, LicenseBuilder, LicenseError,
    LicenseErrorReason, LicenseItem, LicenseKey, LicenseKind,
};
pub use manager::LicenseManager;
pub use policy::{CallContext, ItemValidator, KindValidator};
pub use protocol::{
    LicenseClient, LicenseIssuer, LicensePublisher, LicenseRequest, Licensee, PublishRequest,
    PublisherResponse, PublisherTransport,
};
pub use update::{ProductRelease, UpdateCheckResult, UpdateChecker};

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
