//! Licentia error types.

use crate::license::error::LicenseError;
use thiserror::Error;

/// Faults raised by the cryptographic, transport and licensing layers.
///
/// Validation outcomes (null, invalid or expired licenses) are reported as
/// [`LicenseError`] values; they only become a `LicentiaError` through the
/// enforcing [`LicenseManager::validate`](crate::LicenseManager::validate).
#[derive(Debug, Error)]
pub enum LicentiaError {
    /// Configuration is invalid.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// RSA key XML is malformed or incomplete.
    #[error("Invalid RSA key XML: {0}")]
    InvalidKeyXml(String),

    /// Strong-name key blob is malformed.
    #[error("Invalid strong-name key blob: {0}")]
    InvalidKeyBlob(String),

    /// A private-key operation was attempted with a public-only key.
    #[error("RSA key has no private parameters")]
    MissingPrivateKey,

    /// Plaintext does not fit into a single PKCS#1 block.
    #[error("Input too long for RSA block ({len} bytes, max {max})")]
    PlaintextTooLong {
        /// Length of the rejected input.
        len: usize,
        /// Largest accepted input for this key.
        max: usize,
    },

    /// Raw RSA input is not smaller than the modulus.
    #[error("RSA input exceeds modulus")]
    InputExceedsModulus,

    /// Decrypted PKCS#1 block has a bad header or no separator.
    #[error("Invalid PKCS#1 padding")]
    InvalidPadding,

    /// Signature length does not match the key size.
    #[error("Signature must be {expected} bytes, got {actual}")]
    InvalidSignatureLength {
        /// Key size in bytes.
        expected: usize,
        /// Length of the supplied signature.
        actual: usize,
    },

    /// Signed license text failed verification.
    #[error("Signed license verification failed")]
    SignatureInvalid,

    /// License key text has the wrong format or checksum.
    #[error("Invalid license key: {0}")]
    InvalidLicenseKey(String),

    /// Symmetric transport cipher failure.
    #[error("Cipher error: {0}")]
    CipherError(String),

    /// Base64 / UTF-8 decoding failed.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Failed to parse a wire message or license document.
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Transport error communicating with the publisher.
    #[error("Publisher transport error: {0}")]
    Transport(String),

    /// A license item has an empty name.
    #[error("License item at index {index} has an empty name")]
    EmptyItemName {
        /// Position of the offending item.
        index: usize,
    },

    /// Two license items share a name.
    #[error("Duplicate license item name: {0}")]
    DuplicateItemName(String),

    /// A provider returned neither license text nor an error message.
    #[error("License provider {provider} returned an empty result")]
    EmptyProviderResult {
        /// Description of the offending provider.
        provider: String,
    },

    /// No license public key is known for the component.
    #[error("No license public key for component {0}")]
    NullPublicKey(String),

    /// The issuer has no private key for the product.
    #[error("No private key for product {0}")]
    NullPrivateKey(String),

    /// The component was never registered with the manager.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// License store I/O error.
    #[error("License store I/O error: {0}")]
    StoreIO(String),

    /// Release feed could not be fetched or parsed.
    #[error("Update feed error: {0}")]
    UpdateFeed(String),

    /// Enforced validation failed.
    #[error("{0}")]
    License(Box<LicenseError>),
}

impl From<LicenseError> for LicentiaError {
    fn from(error: LicenseError) -> Self {
        LicentiaError::License(Box::new(error))
    }
}

impl From<base64::DecodeError> for LicentiaError {
    fn from(error: base64::DecodeError) -> Self {
        LicentiaError::EncodingError(format!("Invalid base64: {}", error))
    }
}

impl From<std::string::FromUtf8Error> for LicentiaError {
    fn from(error: std::string::FromUtf8Error) -> Self {
        LicentiaError::EncodingError(format!("Invalid UTF-8: {}", error))
    }
}
