//! Strong-name key blobs.
//!
//! Two layouts are recognized:
//! - public key blob: 12-byte signature header, `PUBLICKEYSTRUC`, then
//!   `RSA1` at offset 20 (160 bytes for a 1024-bit key);
//! - private key pair (`.snk`): `PUBLICKEYSTRUC`, then `RSA2` at offset 8
//!   (596 bytes for a 1024-bit key).
//!
//! All integers in a blob are little-endian.

use crate::crypto::bigint::BigUint;
use crate::crypto::digest;
use crate::crypto::rsa::RsaKey;
use crate::LicentiaError;

const RSA1: &[u8; 4] = b"RSA1";
const RSA2: &[u8; 4] = b"RSA2";
const PUBLIC_MAGIC_OFFSET: usize = 20;
const PRIVATE_MAGIC_OFFSET: usize = 8;

const CALG_RSA_SIGN: u32 = 0x0000_2400;
const CALG_SHA1: u32 = 0x0000_8004;
const PUBLICKEYBLOB: u8 = 0x06;
const CUR_BLOB_VERSION: u8 = 0x02;

/// Parse a strong-name blob into an RSA key.
///
/// `RSA2` blobs yield a private key, `RSA1` blobs a public key.
pub fn key_from_blob(blob: &[u8]) -> Result<RsaKey, LicentiaError> {
    if has_magic(blob, PRIVATE_MAGIC_OFFSET, RSA2) {
        return parse_private(blob);
    }
    if has_magic(blob, PUBLIC_MAGIC_OFFSET, RSA1) {
        return parse_public(blob);
    }
    Err(LicentiaError::InvalidKeyBlob(
        "Expected RSA1 public blob or RSA2 key pair".to_string(),
    ))
}

/// Public-key-only extraction from any strong-name blob.
pub fn public_key_from_blob(blob: &[u8]) -> Result<RsaKey, LicentiaError> {
    Ok(key_from_blob(blob)?.public_key())
}

/// Build the 12-byte-header public key blob for `key`.
pub fn public_blob(key: &RsaKey) -> Result<Vec<u8>, LicentiaError> {
    let key_bytes = key.key_bytes();
    let exponent = key
        .exponent()
        .to_bytes_be_padded(4)
        .ok_or_else(|| LicentiaError::InvalidKeyBlob("Exponent exceeds 32 bits".to_string()))?;
    let modulus = key
        .modulus()
        .to_bytes_be_padded(key_bytes)
        .ok_or_else(|| LicentiaError::InvalidKeyBlob("Modulus size mismatch".to_string()))?;

    let mut blob = Vec::with_capacity(32 + key_bytes);
    blob.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
    blob.extend_from_slice(&CALG_SHA1.to_le_bytes());
    blob.extend_from_slice(&((20 + key_bytes) as u32).to_le_bytes());
    blob.extend_from_slice(&[PUBLICKEYBLOB, CUR_BLOB_VERSION, 0, 0]);
    blob.extend_from_slice(&CALG_RSA_SIGN.to_le_bytes());
    blob.extend_from_slice(RSA1);
    blob.extend_from_slice(&((key_bytes * 8) as u32).to_le_bytes());
    blob.extend(exponent.iter().rev());
    blob.extend(modulus.iter().rev());
    Ok(blob)
}

/// Public key token: the last 8 bytes of the SHA-1 of the public blob,
/// reversed, as lowercase hex.
pub fn public_key_token(public_blob: &[u8]) -> String {
    let hash = digest::sha1(public_blob);
    let mut token: Vec<u8> = hash[hash.len() - 8..].to_vec();
    token.reverse();
    hex::encode(token)
}

fn has_magic(blob: &[u8], offset: usize, magic: &[u8; 4]) -> bool {
    blob.get(offset..offset + 4) == Some(&magic[..])
}

/// Cursor over the little-endian fields that follow the magic.
struct BlobReader<'a> {
    blob: &'a [u8],
    pos: usize,
}

impl<'a> BlobReader<'a> {
    fn new(blob: &'a [u8], pos: usize) -> Self {
        Self { blob, pos }
    }

    fn u32(&mut self) -> Result<u32, LicentiaError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn integer(&mut self, len: usize) -> Result<BigUint, LicentiaError> {
        let mut bytes = self.take(len)?.to_vec();
        bytes.reverse();
        Ok(BigUint::from_bytes_be(&bytes))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], LicentiaError> {
        let end = self.pos + len;
        let slice = self.blob.get(self.pos..end).ok_or_else(|| {
            LicentiaError::InvalidKeyBlob(format!(
                "Blob truncated: need {} bytes, have {}",
                end,
                self.blob.len()
            ))
        })?;
        self.pos = end;
        Ok(slice)
    }
}

fn key_sizes(bit_len: u32) -> Result<(usize, usize), LicentiaError> {
    if bit_len == 0 || bit_len % 16 != 0 {
        return Err(LicentiaError::InvalidKeyBlob(format!(
            "Unsupported key length {} bits",
            bit_len
        )));
    }
    let full = bit_len as usize / 8;
    Ok((full, full / 2))
}

fn parse_public(blob: &[u8]) -> Result<RsaKey, LicentiaError> {
    let mut reader = BlobReader::new(blob, PUBLIC_MAGIC_OFFSET + 4);
    let (full, _) = key_sizes(reader.u32()?)?;
    let exponent = reader.integer(4)?;
    let modulus = reader.integer(full)?;
    RsaKey::from_public_components(modulus, exponent)
}

fn parse_private(blob: &[u8]) -> Result<RsaKey, LicentiaError> {
    let mut reader = BlobReader::new(blob, PRIVATE_MAGIC_OFFSET + 4);
    let (full, half) = key_sizes(reader.u32()?)?;
    let exponent = reader.integer(4)?;
    let modulus = reader.integer(full)?;
    let p = reader.integer(half)?;
    let q = reader.integer(half)?;
    let dp = reader.integer(half)?;
    let dq = reader.integer(half)?;
    let inverse_q = reader.integer(half)?;
    let d = reader.integer(full)?;
    RsaKey::from_private_components(modulus, exponent, d, p, q, dp, dq, inverse_q)
}
