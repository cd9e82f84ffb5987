//! Publisher wire contract and response types.

use crate::component::Version;
use crate::license::{License, LicenseKey};
use crate::LicentiaError;
use serde::{Deserialize, Serialize};

/// Prefix marking an error message in a decrypted publisher response.
pub const ERROR_HEADER: &str = "Error:";

/// LCID of the invariant culture, sent when the host does not choose one.
pub const INVARIANT_CULTURE: i32 = 127;

/// The single publish call: client to publisher.
///
/// The license key travels RSA-wrapped under the publisher's public key;
/// `None` stands for the empty key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    /// Culture LCID of the requesting host.
    pub culture: i32,
    /// Product name; selects the publisher's private key.
    pub product: String,
    /// Product version, dotted.
    pub version: String,
    /// Base64 RSA-wrapped license key.
    #[serde(default)]
    pub encrypted_license_key: Option<String>,
    /// Requested license category (e.g. "Evaluation").
    #[serde(default)]
    pub category: String,
    /// Licensee name.
    #[serde(default)]
    pub name: String,
    /// Licensee company.
    #[serde(default)]
    pub company: String,
    /// Licensee email.
    #[serde(default)]
    pub email: String,
    /// Opaque host payload, e.g. a machine fingerprint.
    #[serde(default)]
    pub data: String,
}

/// Parse a JSON publish request body.
pub fn parse_publish_request(body: &[u8]) -> Result<PublishRequest, LicentiaError> {
    serde_json::from_slice(body)
        .map_err(|e| LicentiaError::ProtocolError(format!("Invalid publish request: {}", e)))
}

/// Who is asking for a license. Sent verbatim to the publisher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Licensee {
    /// Licensee name.
    pub name: String,
    /// Licensee company.
    pub company: String,
    /// Licensee email.
    pub email: String,
    /// Opaque host payload.
    pub data: String,
}

/// A publish request after the publisher has unwrapped the license key.
#[derive(Debug, Clone)]
pub struct LicenseRequest {
    /// Culture LCID of the requesting host.
    pub culture: i32,
    /// Product name.
    pub product: String,
    /// Product version.
    pub version: Version,
    /// The client's license key.
    pub license_key: LicenseKey,
    /// Requested license category.
    pub category: String,
    /// Licensee name.
    pub name: String,
    /// Licensee company.
    pub company: String,
    /// Licensee email.
    pub email: String,
    /// Opaque host payload.
    pub data: String,
}

/// What the publisher answered: a license or a reason for refusing.
#[derive(Debug, Clone)]
pub enum PublisherResponse {
    /// License granted.
    License(License),
    /// Request refused.
    Error(String),
}

impl PublisherResponse {
    /// The license, if granted.
    pub fn license(&self) -> Option<&License> {
        match self {
            PublisherResponse::License(license) => Some(license),
            PublisherResponse::Error(_) => None,
        }
    }

    /// The refusal message, if refused.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            PublisherResponse::License(_) => None,
            PublisherResponse::Error(message) => Some(message),
        }
    }

    /// Consume into the license or the refusal message.
    pub fn into_result(self) -> Result<License, String> {
        match self {
            PublisherResponse::License(license) => Ok(license),
            PublisherResponse::Error(message) => Err(message),
        }
    }
}
