//! Licentia client configuration.

use crate::crypto::rsa::RsaKey;
use crate::LicentiaError;
use std::time::Duration;

/// Settings for talking to a license publisher from a shipped application.
///
/// All values are compiled into the host application.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Application name and version (e.g., "gridview/2.1.0")
    pub app_name: &'static str,

    /// Product name the publisher issues licenses for.
    pub product: &'static str,

    /// Publisher endpoint (http or https URL).
    pub publisher_url: &'static str,

    /// Publisher RSA public key in `RSAKeyValue` XML form.
    /// SECURITY: This should be hard-coded in your application, not read from disk.
    pub publisher_public_key_xml: &'static str,

    /// User-Agent product identifier (e.g., "acme-grid")
    pub user_agent_product: &'static str,

    /// Namespace of the local license store directory.
    pub store_namespace: &'static str,

    /// Release feed consulted by the update checker.
    pub release_feed_url: Option<&'static str>,

    /// Timeout for each publisher or feed request.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), LicentiaError> {
        if self.product.trim().is_empty() {
            return Err(LicentiaError::ConfigError(
                "product cannot be empty".to_string(),
            ));
        }
        if self.store_namespace.trim().is_empty() {
            return Err(LicentiaError::ConfigError(
                "store_namespace cannot be empty".to_string(),
            ));
        }
        check_url("publisher_url", self.publisher_url)?;
        if let Some(url) = self.release_feed_url {
            check_url("release_feed_url", url)?;
        }

        let key = RsaKey::from_xml(self.publisher_public_key_xml).map_err(|e| {
            LicentiaError::ConfigError(format!("publisher_public_key_xml is invalid: {}", e))
        })?;
        if key.has_private() {
            return Err(LicentiaError::ConfigError(
                "publisher_public_key_xml must not contain private key parameters".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_url(field: &str, url: &str) -> Result<(), LicentiaError> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() => Ok(()),
        _ => Err(LicentiaError::ConfigError(format!(
            "{} must be an http(s) URL, got {:?}",
            field, url
        ))),
    }
}
