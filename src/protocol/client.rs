//! Client side of the license protocol.

use super::models::{Licensee, PublishRequest, PublisherResponse, ERROR_HEADER, INVARIANT_CULTURE};
use crate::component::Version;
use crate::crypto::rsa::RsaKey;
use crate::license::{verify_signed_license, LicenseKey};
use crate::LicentiaError;
use tracing::{debug, warn};

/// Carries a publish request to a publisher and returns its raw,
/// still encrypted answer.
pub trait PublisherTransport: Send + Sync {
    /// Send `request` and return the response text.
    fn publish(&self, request: &PublishRequest) -> Result<String, LicentiaError>;
}

/// Requests licenses from a publisher and verifies what comes back.
pub struct LicenseClient<T> {
    transport: T,
    public_key: RsaKey,
    culture: i32,
}

impl<T: PublisherTransport> LicenseClient<T> {
    /// Client talking through `transport` to the publisher whose public key
    /// is `public_key_xml`.
    ///
    /// Private parameters in the XML are discarded.
    pub fn new(transport: T, public_key_xml: &str) -> Result<Self, LicentiaError> {
        if public_key_xml.trim().is_empty() {
            return Err(LicentiaError::ConfigError(
                "publisher public key cannot be empty".to_string(),
            ));
        }
        let public_key = RsaKey::from_xml(public_key_xml)?.public_key();
        Ok(Self {
            transport,
            public_key,
            culture: INVARIANT_CULTURE,
        })
    }

    /// Send `lcid` as the requesting culture.
    pub fn with_culture(mut self, lcid: i32) -> Self {
        self.culture = lcid;
        self
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Ask the publisher for a license.
    ///
    /// A refusal is returned as [`PublisherResponse::Error`]. A granted
    /// license is signature-checked before it is returned.
    ///
    /// # Errors
    /// - `Transport` - the publisher could not be reached
    /// - `CipherError` / `EncodingError` - the response was not encrypted
    ///   under `license_key`
    /// - `SignatureInvalid` - the license was not signed by the publisher
    pub fn get_license(
        &self,
        product: &str,
        version: Version,
        license_key: &LicenseKey,
        category: &str,
        licensee: &Licensee,
    ) -> Result<PublisherResponse, LicentiaError> {
        let request = PublishRequest {
            culture: self.culture,
            product: product.to_string(),
            version: version.to_string(),
            encrypted_license_key: license_key.encrypt_for(&self.public_key)?,
            category: category.to_string(),
            name: licensee.name.clone(),
            company: licensee.company.clone(),
            email: licensee.email.clone(),
            data: licensee.data.clone(),
        };

        debug!(product, version = %version, category, "Requesting license");
        let encrypted = self.transport.publish(&request)?;
        let response = license_key.decrypt(&encrypted)?;

        if let Some(message) = response.strip_prefix(ERROR_HEADER) {
            warn!(product, reason = message, "Publisher refused license");
            return Ok(PublisherResponse::Error(message.to_string()));
        }

        let license = verify_signed_license(&self.public_key, &response)?;
        debug!(product, license_id = license.id(), "Verified issued license");
        Ok(PublisherResponse::License(license))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::signing::sign_document;

    const VENDOR_PRIVATE: &str = include_str!("../../tests/fixtures/vendor_private.xml");
    const OTHER_PRIVATE: &str = include_str!("../../tests/fixtures/other_private.xml");

    /// Replies with fixed plaintext, encrypted under the requested key.
    struct Canned {
        reply: String,
        key: LicenseKey,
    }

    impl PublisherTransport for Canned {
        fn publish(&self, request: &PublishRequest) -> Result<String, LicentiaError> {
            assert_eq!(request.culture, 1031);
            self.key.encrypt(&self.reply)
        }
    }

    struct Offline;

    impl PublisherTransport for Offline {
        fn publish(&self, _request: &PublishRequest) -> Result<String, LicentiaError> {
            Err(LicentiaError::Transport("connection refused".into()))
        }
    }

    fn client(reply: String, key: &LicenseKey) -> LicenseClient<Canned> {
        let transport = Canned {
            reply,
            key: key.clone(),
        };
        LicenseClient::new(transport, VENDOR_PRIVATE)
            .unwrap()
            .with_culture(1031)
    }

    fn document(signer: &str) -> String {
        let key = RsaKey::from_xml(signer).unwrap();
        sign_document(&key, r#"{"kind":"unrestricted","id":"lic-9","items":[]}"#).unwrap()
    }

    #[test]
    fn test_granted_license_verified() {
        let key = LicenseKey::generate();
        let response = client(document(VENDOR_PRIVATE), &key)
            .get_license("Acme Grid", Version::new(1, 0, 0, 0), &key, "Standard", &Licensee::default())
            .unwrap();
        assert_eq!(response.license().unwrap().id(), "lic-9");
    }

    #[test]
    fn test_refusal_returned_as_data() {
        let key = LicenseKey::generate();
        let response = client("Error:Key revoked".to_string(), &key)
            .get_license("Acme Grid", Version::new(1, 0, 0, 0), &key, "Standard", &Licensee::default())
            .unwrap();
        assert_eq!(response.error_message(), Some("Key revoked"));
    }

    #[test]
    fn test_license_from_other_signer_rejected() {
        let key = LicenseKey::generate();
        let result = client(document(OTHER_PRIVATE), &key).get_license(
            "Acme Grid",
            Version::new(1, 0, 0, 0),
            &key,
            "Standard",
            &Licensee::default(),
        );
        assert!(matches!(result, Err(LicentiaError::SignatureInvalid)));
    }

    #[test]
    fn test_transport_error_propagates() {
        let client = LicenseClient::new(Offline, VENDOR_PRIVATE).unwrap();
        let result = client.get_license(
            "Acme Grid",
            Version::new(1, 0, 0, 0),
            &LicenseKey::empty(),
            "Evaluation",
            &Licensee::default(),
        );
        assert!(matches!(result, Err(LicentiaError::Transport(_))));
    }

    #[test]
    fn test_empty_public_key_rejected() {
        assert!(matches!(
            LicenseClient::new(Offline, "  "),
            Err(LicentiaError::ConfigError(_))
        ));
    }
}
