//! Publisher side of the license protocol.
//!
//! The publisher unwraps the client's license key with the product's
//! private key, asks its [`LicenseIssuer`] for a decision, signs the issued
//! license and encrypts the answer under the client's license key.

use super::client::PublisherTransport;
use super::models::{LicenseRequest, PublishRequest, PublisherResponse, ERROR_HEADER};
use crate::crypto::rsa::RsaKey;
use crate::crypto::signing;
use crate::license::document::to_document;
use crate::license::LicenseKey;
use crate::LicentiaError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Product-specific publishing policy.
pub trait LicenseIssuer: Send + Sync {
    /// Private key XML for `product`, or `None` for unknown products.
    fn private_key_xml(&self, product: &str) -> Option<String>;

    /// Grant a license or refuse the request.
    fn issue(&self, request: &LicenseRequest) -> PublisherResponse;
}

/// Serves publish requests for an issuer.
pub struct LicensePublisher<I> {
    issuer: I,
    cache_private_keys: bool,
    private_keys: Mutex<HashMap<String, Arc<RsaKey>>>,
}

impl<I: LicenseIssuer> LicensePublisher<I> {
    /// Publisher that parses each product's private key once.
    pub fn new(issuer: I) -> Self {
        Self {
            issuer,
            cache_private_keys: true,
            private_keys: Mutex::new(HashMap::new()),
        }
    }

    /// Publisher that asks the issuer for the private key on every request.
    pub fn without_key_cache(issuer: I) -> Self {
        Self {
            cache_private_keys: false,
            ..Self::new(issuer)
        }
    }

    /// The issuer.
    pub fn issuer(&self) -> &I {
        &self.issuer
    }

    /// Handle one request and return the encrypted response text.
    ///
    /// # Errors
    /// - `NullPrivateKey` - the issuer knows no key for the product
    /// - `InvalidPadding` / `InvalidLicenseKey` - the wrapped key is corrupt
    /// - `ConfigError` - the version string does not parse
    pub fn respond(&self, request: &PublishRequest) -> Result<String, LicentiaError> {
        let private_key = self.private_key(&request.product)?;
        let license_key =
            LicenseKey::decrypt_from(&private_key, request.encrypted_license_key.as_deref())?;

        let license_request = LicenseRequest {
            culture: request.culture,
            product: request.product.clone(),
            version: request.version.parse()?,
            license_key,
            category: request.category.clone(),
            name: request.name.clone(),
            company: request.company.clone(),
            email: request.email.clone(),
            data: request.data.clone(),
        };

        let response = match self.issuer.issue(&license_request) {
            PublisherResponse::License(license) => {
                info!(
                    product = %request.product,
                    category = %request.category,
                    license_id = license.id(),
                    "Issued license"
                );
                signing::sign_document(&private_key, &to_document(&license)?)?
            }
            PublisherResponse::Error(message) => {
                info!(product = %request.product, reason = %message, "Refused license request");
                format!("{}{}", ERROR_HEADER, message)
            }
        };

        license_request.license_key.encrypt(&response)
    }

    fn private_key(&self, product: &str) -> Result<Arc<RsaKey>, LicentiaError> {
        if !self.cache_private_keys {
            return self.load_private_key(product);
        }

        let mut keys = self.private_keys.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(key) = keys.get(product) {
            return Ok(key.clone());
        }
        let key = self.load_private_key(product)?;
        keys.insert(product.to_string(), key.clone());
        debug!(product, "Cached private key");
        Ok(key)
    }

    fn load_private_key(&self, product: &str) -> Result<Arc<RsaKey>, LicentiaError> {
        let xml = self
            .issuer
            .private_key_xml(product)
            .filter(|xml| !xml.trim().is_empty())
            .ok_or_else(|| LicentiaError::NullPrivateKey(product.to_string()))?;
        let key = RsaKey::from_xml(&xml)?;
        if !key.has_private() {
            return Err(LicentiaError::MissingPrivateKey);
        }
        Ok(Arc::new(key))
    }
}

impl<I: LicenseIssuer> PublisherTransport for LicensePublisher<I> {
    fn publish(&self, request: &PublishRequest) -> Result<String, LicentiaError> {
        self.respond(request)
    }
}
