//! License keys.
//!
//! A key is 25 symbols from a 31-symbol alphabet (no `0`, `1`, `I`, `O`,
//! `U`). The last symbol is a checksum over the first 24. The display form
//! groups the symbols 5-5-5-5-5 with hyphens.
//!
//! The key doubles as the transport secret between client and publisher:
//! its UTF-8 bytes `[0..16]` are the triple DES key and `[16..24]` the IV.

use crate::crypto::digest;
use crate::crypto::rsa::RsaKey;
use crate::crypto::symmetric::{self, TransportCipher};
use crate::LicentiaError;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

/// Symbols a license key is drawn from.
pub const ALPHABET: &[u8; 31] = b"23456789ABCDEFGHJKLMNPQRSTVWXYZ";

/// Length of the bare key.
pub const KEY_LEN: usize = 25;

/// Length of the hyphenated display form.
pub const DISPLAY_LEN: usize = 29;

const GROUP_LEN: usize = 5;
const HYPHEN_POSITIONS: [usize; 4] = [5, 11, 17, 23];

/// A license key, or the empty "no key" used by free categories.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// The empty key.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Whether this is the empty key.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Generate a random key from the OS RNG.
    pub fn generate() -> Self {
        Self::generate_with(&mut OsRng)
    }

    /// Generate a random key, rejecting candidates that form a weak cipher
    /// key.
    pub fn generate_with<R: Rng>(rng: &mut R) -> Self {
        loop {
            let mut symbols = Vec::with_capacity(KEY_LEN);
            for _ in 0..KEY_LEN - 1 {
                symbols.push(ALPHABET[rng.gen_range(0..ALPHABET.len())]);
            }
            symbols.push(checksum(&symbols));

            let candidate = String::from_utf8(symbols).unwrap_or_default();
            if candidate.len() == KEY_LEN && !has_weak_cipher_key(&candidate) {
                return Self(candidate);
            }
        }
    }

    /// Whether `text` is a valid key in bare or display form.
    pub fn can_convert_from(text: &str) -> bool {
        normalize(text).is_some()
    }

    /// The bare 25-symbol form (empty for the empty key).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn cipher(&self) -> Result<Option<TransportCipher>, LicentiaError> {
        if self.is_empty() {
            return Ok(None);
        }
        let bytes = self.0.as_bytes();
        let key = &bytes[..symmetric::KEY_LEN];
        let iv = &bytes[symmetric::KEY_LEN..symmetric::KEY_LEN + symmetric::IV_LEN];
        TransportCipher::new(key, iv).map(Some)
    }

    /// Encrypt text under this key and return base64.
    ///
    /// The empty key only base64-encodes.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, LicentiaError> {
        let bytes = match self.cipher()? {
            Some(cipher) => cipher.encrypt(plaintext.as_bytes()),
            None => plaintext.as_bytes().to_vec(),
        };
        Ok(digest::bytes_to_string(&bytes))
    }

    /// Inverse of [`encrypt`](Self::encrypt).
    pub fn decrypt(&self, text: &str) -> Result<String, LicentiaError> {
        let bytes = digest::bytes_from_string(text)?;
        let plaintext = match self.cipher()? {
            Some(cipher) => cipher.decrypt(&bytes)?,
            None => bytes,
        };
        Ok(String::from_utf8(plaintext)?)
    }

    /// Wrap the key with the publisher's RSA public key for transport.
    ///
    /// The empty key is sent as `None`.
    pub fn encrypt_for(&self, publisher_key: &RsaKey) -> Result<Option<String>, LicentiaError> {
        if self.is_empty() {
            return Ok(None);
        }
        let wrapped = publisher_key.encrypt(self.0.as_bytes())?;
        Ok(Some(digest::bytes_to_string(&wrapped)))
    }

    /// Unwrap a key sent with [`encrypt_for`](Self::encrypt_for).
    pub fn decrypt_from(private_key: &RsaKey, wrapped: Option<&str>) -> Result<Self, LicentiaError> {
        let Some(wrapped) = wrapped.filter(|w| !w.trim().is_empty()) else {
            return Ok(Self::empty());
        };
        let bytes = private_key.decrypt(&digest::bytes_from_string(wrapped)?)?;
        String::from_utf8(bytes)?.parse()
    }
}

impl FromStr for LicenseKey {
    type Err = LicentiaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        normalize(s)
            .map(Self)
            .ok_or_else(|| LicentiaError::InvalidLicenseKey("Not a valid license key".to_string()))
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, group) in self.0.as_bytes().chunks(GROUP_LEN).enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            f.write_str(std::str::from_utf8(group).map_err(|_| fmt::Error)?)?;
        }
        Ok(())
    }
}

impl fmt::Debug for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("LicenseKey(<empty>)");
        }
        write!(f, "LicenseKey({}-*****-*****-*****-*****)", &self.0[..GROUP_LEN])
    }
}

fn symbol_index(symbol: u8) -> Option<usize> {
    ALPHABET.iter().position(|&s| s == symbol)
}

fn checksum(symbols: &[u8]) -> u8 {
    let sum: usize = symbols.iter().filter_map(|&s| symbol_index(s)).sum();
    let index = (ALPHABET.len() - sum % ALPHABET.len()) % ALPHABET.len();
    ALPHABET[index]
}

fn has_weak_cipher_key(key: &str) -> bool {
    symmetric::is_weak_key(&key.as_bytes()[..symmetric::KEY_LEN])
}

/// Validate `text` and return the bare form.
fn normalize(text: &str) -> Option<String> {
    let text = text.trim();
    let bare: String = match text.len() {
        KEY_LEN => text.to_string(),
        DISPLAY_LEN => {
            let bytes = text.as_bytes();
            if HYPHEN_POSITIONS.iter().any(|&i| bytes[i] != b'-') {
                return None;
            }
            text.chars().filter(|&c| c != '-').collect()
        }
        _ => return None,
    };

    let bytes = bare.as_bytes();
    if bytes.len() != KEY_LEN || !bytes.iter().all(|&b| symbol_index(b).is_some()) {
        return None;
    }
    if checksum(&bytes[..KEY_LEN - 1]) != bytes[KEY_LEN - 1] {
        return None;
    }
    if has_weak_cipher_key(&bare) {
        return None;
    }
    Some(bare)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const SAMPLE: &str = "6VL8P-QHCRS-PF2GJ-8XLYG-VKHH4";

    fn vendor() -> RsaKey {
        RsaKey::from_xml(include_str!("../../tests/fixtures/vendor_private.xml")).unwrap()
    }

    #[test]
    fn test_sample_key_parses() {
        let key: LicenseKey = SAMPLE.parse().unwrap();
        assert_eq!(key.as_str(), "6VL8PQHCRSPF2GJ8XLYGVKHH4");
        assert_eq!(key.to_string(), SAMPLE);
        assert_eq!(key, "6VL8PQHCRSPF2GJ8XLYGVKHH4".parse().unwrap());
    }

    #[test]
    fn test_sample_key_altered_checksum_rejected() {
        for last in ALPHABET.iter().filter(|&&c| c != b'4') {
            let mut altered = SAMPLE.as_bytes().to_vec();
            *altered.last_mut().unwrap() = *last;
            let altered = String::from_utf8(altered).unwrap();
            assert!(!LicenseKey::can_convert_from(&altered), "{}", altered);
        }
    }

    #[test]
    fn test_generated_keys_roundtrip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let key = LicenseKey::generate_with(&mut rng);
            let display = key.to_string();
            assert_eq!(display.len(), DISPLAY_LEN);
            assert!(LicenseKey::can_convert_from(&display));
            assert!(LicenseKey::can_convert_from(key.as_str()));
            assert_eq!(display.parse::<LicenseKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_generate_from_os_rng() {
        let a = LicenseKey::generate();
        let b = LicenseKey::generate();
        assert_ne!(a, b);
        assert!(LicenseKey::can_convert_from(a.as_str()));
    }

    #[test]
    fn test_wrong_lengths_rejected() {
        for text in ["", "6VL8P", "6VL8PQHCRSPF2GJ8XLYGVKHH", "6VL8PQHCRSPF2GJ8XLYGVKHH44"] {
            assert!(!LicenseKey::can_convert_from(text));
        }
    }

    #[test]
    fn test_bad_alphabet_rejected() {
        // Ambiguous glyphs and lowercase are outside the alphabet.
        for text in [
            "0VL8PQHCRSPF2GJ8XLYGVKHH4",
            "6VL8PQHCRSPF2GJ8XLYGVKHI4",
            "6vl8pqhcrspf2gj8xlygvkhh4",
        ] {
            assert!(!LicenseKey::can_convert_from(text));
        }
    }

    #[test]
    fn test_misplaced_hyphens_rejected() {
        assert!(!LicenseKey::can_convert_from("6VL8PQ-HCRS-PF2GJ-8XLYG-VKHH4"));
        assert!(!LicenseKey::can_convert_from("6VL8P QHCRS PF2GJ 8XLYG VKHH4"));
    }

    #[test]
    fn test_single_symbol_mutation_detected() {
        let original = "6VL8PQHCRSPF2GJ8XLYGVKHH4".as_bytes().to_vec();
        let mut accepted = 0;
        let mut total = 0;
        for i in 0..KEY_LEN - 1 {
            for &s in ALPHABET.iter().filter(|&&s| s != original[i]) {
                let mut mutated = original.clone();
                mutated[i] = s;
                total += 1;
                if LicenseKey::can_convert_from(std::str::from_utf8(&mutated).unwrap()) {
                    accepted += 1;
                }
            }
        }
        // Changing one symbol always changes the checksum.
        assert_eq!(accepted, 0, "{} of {}", accepted, total);
    }

    #[test]
    fn test_weak_key_rejected() {
        // First 16 symbols form two equal halves.
        let mut symbols = b"ABCDEFGHABCDEFGH23456789".to_vec();
        symbols.push(checksum(&symbols));
        let text = String::from_utf8(symbols).unwrap();
        assert!(!LicenseKey::can_convert_from(&text));
    }

    #[test]
    fn test_invalid_parse_error() {
        let result = "nope".parse::<LicenseKey>();
        assert!(matches!(result, Err(LicentiaError::InvalidLicenseKey(_))));
    }

    #[test]
    fn test_debug_redacts() {
        let key: LicenseKey = SAMPLE.parse().unwrap();
        let debug = format!("{:?}", key);
        assert!(debug.contains("6VL8P"));
        assert!(!debug.contains("QHCRS"));
    }

    #[test]
    fn test_empty_key() {
        let key = LicenseKey::empty();
        assert!(key.is_empty());
        assert_eq!(key.to_string(), "");
        assert_eq!(key.encrypt("hello").unwrap(), "aGVsbG8=");
        assert_eq!(key.decrypt("aGVsbG8=").unwrap(), "hello");
    }

    #[test]
    fn test_symmetric_roundtrip() {
        let key: LicenseKey = SAMPLE.parse().unwrap();
        let encrypted = key.encrypt("{\"product\":\"Demo\"}").unwrap();
        assert_ne!(encrypted, "eyJwcm9kdWN0IjoiRGVtbyJ9");
        assert_eq!(key.decrypt(&encrypted).unwrap(), "{\"product\":\"Demo\"}");
    }

    #[test]
    fn test_decrypt_with_other_key_fails() {
        let key: LicenseKey = SAMPLE.parse().unwrap();
        let other = LicenseKey::generate_with(&mut StdRng::seed_from_u64(1));
        let encrypted = key.encrypt("some longer payload that spans blocks").unwrap();
        assert!(other.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_rsa_wrapped_transport() {
        let private = vendor();
        let key: LicenseKey = SAMPLE.parse().unwrap();
        let wrapped = key.encrypt_for(&private.public_key()).unwrap().unwrap();
        assert!(!wrapped.contains("6VL8P"));
        let unwrapped = LicenseKey::decrypt_from(&private, Some(&wrapped)).unwrap();
        assert_eq!(unwrapped, key);
    }

    #[test]
    fn test_rsa_wrapped_empty_key() {
        let private = vendor();
        assert_eq!(LicenseKey::empty().encrypt_for(&private).unwrap(), None);
        assert!(LicenseKey::decrypt_from(&private, None).unwrap().is_empty());
        assert!(LicenseKey::decrypt_from(&private, Some("")).unwrap().is_empty());
    }
}
