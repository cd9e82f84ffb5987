//! License keys, the license model and its signed document form.

pub mod document;
pub mod error;
pub mod key;
pub mod model;

pub use document::{sign_license, verify_signed_license};
pub use error::{LicenseError, LicenseErrorReason};
pub use key::LicenseKey;
pub use model::{License, LicenseBuilder, LicenseItem, LicenseKind};
