//! Digests and base64 text encoding.

use crate::LicentiaError;
use base64::{engine::general_purpose::STANDARD, Engine};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};

/// Encode bytes as standard base64.
pub fn bytes_to_string(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Decode standard base64.
pub fn bytes_from_string(text: &str) -> Result<Vec<u8>, LicentiaError> {
    Ok(STANDARD.decode(text.trim())?)
}

/// SHA-1 of `data`.
pub fn sha1(data: &[u8]) -> Vec<u8> {
    Sha1::digest(data).to_vec()
}

/// MD5 of `data`.
pub fn md5(data: &[u8]) -> Vec<u8> {
    Md5::digest(data).to_vec()
}

/// Compute the SHA-256 of `data` and return it base64-encoded.
///
/// Used as the content hash of unsigned components.
pub fn sha256_b64(data: &[u8]) -> String {
    STANDARD.encode(Sha256::digest(data))
}
