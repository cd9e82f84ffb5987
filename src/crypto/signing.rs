//! Signed text envelope.
//!
//! ```text
//! Signature:<base64 PKCS#1 v1.5 SHA-1 signature of the body>
//! <body>
//! ```
//!
//! The first line break may be LF or CRLF; the body is taken verbatim.

use crate::crypto::digest;
use crate::crypto::rsa::{HashAlgorithm, RsaKey};
use crate::LicentiaError;

/// Prefix of the signature line.
pub const SIGNATURE_HEADER: &str = "Signature:";

/// Sign `body` and wrap it in the envelope.
pub fn sign_document(key: &RsaKey, body: &str) -> Result<String, LicentiaError> {
    let signature = key.sign_data(body.as_bytes(), HashAlgorithm::Sha1)?;
    Ok(format!(
        "{}{}\n{}",
        SIGNATURE_HEADER,
        digest::bytes_to_string(&signature),
        body
    ))
}

/// Split an envelope into its base64 signature and body.
pub fn split_signed_document(text: &str) -> Result<(&str, &str), LicentiaError> {
    let rest = text.strip_prefix(SIGNATURE_HEADER).ok_or_else(|| {
        LicentiaError::ProtocolError("Signed text must start with Signature:".to_string())
    })?;
    let (line, body) = rest.split_once('\n').ok_or_else(|| {
        LicentiaError::ProtocolError("Signed text has no body".to_string())
    })?;
    Ok((line.trim_end_matches('\r').trim(), body))
}

/// Verify an envelope against `key` and return the body.
///
/// Any mismatch, including a malformed signature, is reported as
/// [`LicentiaError::SignatureInvalid`].
pub fn verify_signed_document<'a>(key: &RsaKey, text: &'a str) -> Result<&'a str, LicentiaError> {
    let (signature_b64, body) = split_signed_document(text)?;
    let signature =
        digest::bytes_from_string(signature_b64).map_err(|_| LicentiaError::SignatureInvalid)?;

    match key.verify_data(body.as_bytes(), HashAlgorithm::Sha1, &signature) {
        Ok(true) => Ok(body),
        Ok(false) | Err(LicentiaError::InvalidSignatureLength { .. }) => {
            Err(LicentiaError::SignatureInvalid)
        }
        Err(e) => Err(e),
    }
}
