//! Transport cipher for publisher requests and responses.
//!
//! Two-key triple DES (EDE, K1 K2 K1) in CBC mode with PKCS#7 padding.

use crate::LicentiaError;
use cbc::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use des::TdesEde2;

type Encryptor = cbc::Encryptor<TdesEde2>;
type Decryptor = cbc::Decryptor<TdesEde2>;

/// Cipher key length in bytes.
pub const KEY_LEN: usize = 16;

/// IV length in bytes.
pub const IV_LEN: usize = 8;

/// Whether a 16-byte two-key triple DES key is weak.
///
/// The key degrades to single DES when both halves are equal once the
/// parity bits are ignored.
pub fn is_weak_key(key: &[u8]) -> bool {
    if key.len() != KEY_LEN {
        return false;
    }
    key[..8]
        .iter()
        .zip(&key[8..])
        .all(|(a, b)| a & 0xFE == b & 0xFE)
}

/// Symmetric cipher bound to one key and IV.
#[derive(Clone)]
pub struct TransportCipher {
    key: [u8; KEY_LEN],
    iv: [u8; IV_LEN],
}

impl std::fmt::Debug for TransportCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TransportCipher { .. }")
    }
}

impl TransportCipher {
    /// Create a cipher from raw key and IV bytes.
    pub fn new(key: &[u8], iv: &[u8]) -> Result<Self, LicentiaError> {
        let key: [u8; KEY_LEN] = key.try_into().map_err(|_| {
            LicentiaError::CipherError(format!("Key must be {} bytes, got {}", KEY_LEN, key.len()))
        })?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| {
            LicentiaError::CipherError(format!("IV must be {} bytes, got {}", IV_LEN, iv.len()))
        })?;
        if is_weak_key(&key) {
            return Err(LicentiaError::CipherError("Weak key".to_string()));
        }
        Ok(Self { key, iv })
    }

    /// Encrypt with PKCS#7 padding.
    pub fn encrypt(&self, plaintext: &[u8]) -> Vec<u8> {
        Encryptor::new(&self.key.into(), &self.iv.into()).encrypt_padded_vec_mut::<Pkcs7>(plaintext)
    }

    /// Decrypt and strip PKCS#7 padding.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, LicentiaError> {
        Decryptor::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| LicentiaError::CipherError("Bad padding or wrong key".to_string()))
    }
}
