//! Serialized license document and its signed form.
//!
//! The document is a camelCase JSON object. Dates are `YYYY/MM/DD` and are
//! omitted when unlimited.

use crate::crypto::rsa::RsaKey;
use crate::crypto::signing;
use crate::license::model::{
    format_date, max_utc_date, parse_date, License, LicenseBuilder, LicenseItem, LicenseKind,
};
use crate::LicentiaError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LicenseDocument {
    kind: LicenseKind,
    #[serde(default)]
    id: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    product: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    user_name: String,
    #[serde(default)]
    user_company: String,
    #[serde(default)]
    data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    upgrade_expiration: Option<String>,
    #[serde(default)]
    items: Vec<LicenseItem>,
}

fn date_field(date: chrono::DateTime<chrono::Utc>) -> Option<String> {
    (date != max_utc_date()).then(|| format_date(date))
}

/// Serialize a license to its document text.
pub fn to_document(license: &License) -> Result<String, LicentiaError> {
    let document = LicenseDocument {
        kind: license.kind().clone(),
        id: license.id().to_string(),
        category: license.category().to_string(),
        product: license.product().to_string(),
        company: license.company().to_string(),
        user_name: license.user_name().to_string(),
        user_company: license.user_company().to_string(),
        data: license.data().to_string(),
        expiration: date_field(license.expiration()),
        upgrade_expiration: date_field(license.upgrade_expiration()),
        items: license.items().to_vec(),
    };
    serde_json::to_string(&document)
        .map_err(|e| LicentiaError::ProtocolError(format!("Failed to serialize license: {}", e)))
}

/// Parse document text into a builder.
pub fn from_document(text: &str) -> Result<LicenseBuilder, LicentiaError> {
    let document: LicenseDocument = serde_json::from_str(text)
        .map_err(|e| LicentiaError::ProtocolError(format!("Invalid license document: {}", e)))?;

    let expiration = parse_date(document.expiration.as_deref().unwrap_or_default())?;
    let upgrade_expiration = parse_date(document.upgrade_expiration.as_deref().unwrap_or_default())?;

    Ok(LicenseBuilder::new(document.kind)
        .id(document.id)
        .category(document.category)
        .product(document.product)
        .company(document.company)
        .user_name(document.user_name)
        .user_company(document.user_company)
        .data(document.data)
        .expiration(expiration)
        .upgrade_expiration(upgrade_expiration)
        .items(document.items))
}

/// Freeze, serialize and sign a license with the publisher's private key.
///
/// The returned license carries its signed text.
pub fn sign_license(private_key: &RsaKey, builder: LicenseBuilder) -> Result<License, LicentiaError> {
    let license = builder.build()?;
    let signed = signing::sign_document(private_key, &to_document(&license)?)?;
    Ok(license.with_signed_string(signed))
}

/// Verify signed license text and materialize the license.
pub fn verify_signed_license(public_key: &RsaKey, text: &str) -> Result<License, LicentiaError> {
    let body = signing::verify_signed_document(public_key, text)?;
    let license = from_document(body)?.build()?;
    Ok(license.with_signed_string(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn vendor() -> RsaKey {
        RsaKey::from_xml(include_str!("../../tests/fixtures/vendor_private.xml")).unwrap()
    }

    fn sample() -> LicenseBuilder {
        LicenseBuilder::new(LicenseKind::Machine)
            .id("7d2c")
            .category("Standard")
            .product("Acme Grid")
            .company("Acme")
            .user_name("Sam")
            .data("machine-fingerprint")
            .expiration(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap())
            .item(LicenseItem::new("Export"))
            .item(LicenseItem::overriding_expiration("View"))
    }

    #[test]
    fn test_document_uses_license_date_format() {
        let license = sample().build().unwrap();
        let text = to_document(&license).unwrap();
        assert!(text.contains("\"expiration\":\"2026/02/01\""));
        assert!(!text.contains("upgradeExpiration"));
        assert!(text.contains("\"userName\":\"Sam\""));
        assert!(text.contains("\"overrideExpirationDate\":true"));
    }

    #[test]
    fn test_document_roundtrip() {
        let license = sample().build().unwrap();
        let parsed = from_document(&to_document(&license).unwrap()).unwrap();
        assert_eq!(parsed, license.to_builder());
    }

    #[test]
    fn test_minimal_document() {
        let builder = from_document("{\"kind\":\"unrestricted\"}").unwrap();
        let license = builder.build().unwrap();
        assert_eq!(license.expiration(), max_utc_date());
        assert!(license.items().is_empty());
    }

    #[test]
    fn test_invalid_document() {
        assert!(matches!(
            from_document("not json"),
            Err(LicentiaError::ProtocolError(_))
        ));
        assert!(matches!(
            from_document("{\"kind\":\"unrestricted\",\"expiration\":\"tomorrow\"}"),
            Err(LicentiaError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_sign_and_verify() {
        let key = vendor();
        let signed = sign_license(&key, sample()).unwrap();
        let text = signed.signed_string().unwrap();
        assert!(text.starts_with("Signature:"));

        let verified = verify_signed_license(&key.public_key(), text).unwrap();
        assert_eq!(verified.to_builder(), signed.to_builder());
        assert_eq!(verified.signed_string(), Some(text));
    }

    #[test]
    fn test_tampered_license_rejected() {
        let key = vendor();
        let signed = sign_license(&key, sample()).unwrap();
        let tampered = signed
            .signed_string()
            .unwrap()
            .replace("2026/02/01", "2099/02/01");
        assert!(matches!(
            verify_signed_license(&key, &tampered),
            Err(LicentiaError::SignatureInvalid)
        ));
    }

    #[test]
    fn test_signed_document_with_duplicate_items_rejected() {
        let key = vendor();
        let body = "{\"kind\":\"user\",\"items\":[{\"name\":\"A\"},{\"name\":\"A\"}]}";
        let text = signing::sign_document(&key, body).unwrap();
        assert!(matches!(
            verify_signed_license(&key, &text),
            Err(LicentiaError::DuplicateItemName(_))
        ));
    }
}
