//! RSA with PKCS#1 v1.5 padding over [`BigUint`].
//!
//! Keys are exchanged in the `RSAKeyValue` XML format, each element holding
//! the base64 of a big-endian unsigned integer:
//!
//! ```text
//! <RSAKeyValue><Modulus>..</Modulus><Exponent>..</Exponent>
//!   [<P>..</P><Q>..</Q><DP>..</DP><DQ>..</DQ><InverseQ>..</InverseQ><D>..</D>]
//! </RSAKeyValue>
//! ```

use crate::crypto::bigint::BigUint;
use crate::crypto::digest;
use crate::LicentiaError;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;

/// Minimum PKCS#1 v1.5 overhead: header, 8 padding bytes, separator.
const PKCS1_OVERHEAD: usize = 11;

const MD5_DIGEST_INFO: [u8; 18] = [
    0x30, 0x20, 0x30, 0x0c, 0x06, 0x08, 0x2a, 0x86, 0x48, 0x86, 0xf7, 0x0d, 0x02, 0x05, 0x05, 0x00,
    0x04, 0x10,
];

const SHA1_DIGEST_INFO: [u8; 15] = [
    0x30, 0x21, 0x30, 0x09, 0x06, 0x05, 0x2b, 0x0e, 0x03, 0x02, 0x1a, 0x05, 0x00, 0x04, 0x14,
];

/// Hash algorithms supported for signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// MD5 (legacy).
    Md5,
    /// SHA-1, used for license signatures.
    Sha1,
}

impl HashAlgorithm {
    /// Hash `data` with this algorithm.
    pub fn hash(self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Md5 => digest::md5(data),
            HashAlgorithm::Sha1 => digest::sha1(data),
        }
    }

    /// ASN.1 DigestInfo prefix placed in front of the hash.
    pub fn digest_info_prefix(self) -> &'static [u8] {
        match self {
            HashAlgorithm::Md5 => &MD5_DIGEST_INFO,
            HashAlgorithm::Sha1 => &SHA1_DIGEST_INFO,
        }
    }
}

#[derive(Clone)]
struct CrtParams {
    p: BigUint,
    q: BigUint,
    dp: BigUint,
    dq: BigUint,
    inverse_q: BigUint,
}

#[derive(Clone)]
struct PrivateParams {
    d: Option<BigUint>,
    crt: Option<CrtParams>,
}

/// An RSA key: public (modulus and exponent) or full private key.
#[derive(Clone)]
pub struct RsaKey {
    modulus: BigUint,
    exponent: BigUint,
    private: Option<PrivateParams>,
    key_bytes: usize,
}

impl fmt::Debug for RsaKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaKey")
            .field("bits", &self.modulus.bits())
            .field("private", &self.has_private())
            .finish()
    }
}

impl PartialEq for RsaKey {
    /// Keys are equal when their public halves match.
    fn eq(&self, other: &Self) -> bool {
        self.modulus == other.modulus && self.exponent == other.exponent
    }
}

impl Eq for RsaKey {}

impl RsaKey {
    /// Build a public key from modulus and exponent.
    pub fn from_public_components(modulus: BigUint, exponent: BigUint) -> Result<Self, LicentiaError> {
        if modulus.is_zero() || exponent.is_zero() {
            return Err(LicentiaError::InvalidKeyXml(
                "Modulus and exponent must be non-zero".to_string(),
            ));
        }
        let key_bytes = (modulus.bits() + 7) / 8;
        if key_bytes <= PKCS1_OVERHEAD {
            return Err(LicentiaError::InvalidKeyXml(format!(
                "Modulus of {} bytes is too short; at least {} required",
                key_bytes,
                PKCS1_OVERHEAD + 1
            )));
        }
        Ok(Self {
            modulus,
            exponent,
            private: None,
            key_bytes,
        })
    }

    /// Build a private key from the full parameter set.
    #[allow(clippy::too_many_arguments)]
    pub fn from_private_components(
        modulus: BigUint,
        exponent: BigUint,
        d: BigUint,
        p: BigUint,
        q: BigUint,
        dp: BigUint,
        dq: BigUint,
        inverse_q: BigUint,
    ) -> Result<Self, LicentiaError> {
        let mut key = Self::from_public_components(modulus, exponent)?;
        key.private = Some(PrivateParams {
            d: Some(d),
            crt: Some(CrtParams {
                p,
                q,
                dp,
                dq,
                inverse_q,
            }),
        });
        Ok(key)
    }

    /// Parse an `RSAKeyValue` XML document.
    pub fn from_xml(xml: &str) -> Result<Self, LicentiaError> {
        let xml = xml.trim();
        if xml_element(xml, "RSAKeyValue").is_none() {
            return Err(LicentiaError::InvalidKeyXml(
                "Missing RSAKeyValue root element".to_string(),
            ));
        }

        let modulus = xml_integer(xml, "Modulus")?
            .ok_or_else(|| LicentiaError::InvalidKeyXml("Missing Modulus".to_string()))?;
        let exponent = xml_integer(xml, "Exponent")?
            .ok_or_else(|| LicentiaError::InvalidKeyXml("Missing Exponent".to_string()))?;

        let mut key = Self::from_public_components(modulus, exponent)?;

        let d = xml_integer(xml, "D")?;
        let p = xml_integer(xml, "P")?;
        let q = xml_integer(xml, "Q")?;
        let dp = xml_integer(xml, "DP")?;
        let dq = xml_integer(xml, "DQ")?;
        let inverse_q = xml_integer(xml, "InverseQ")?;

        let crt = match (p, q, dp, dq, inverse_q) {
            (Some(p), Some(q), Some(dp), Some(dq), Some(inverse_q))
                if !p.is_zero() && !q.is_zero() =>
            {
                Some(CrtParams {
                    p,
                    q,
                    dp,
                    dq,
                    inverse_q,
                })
            }
            _ => None,
        };

        if d.is_some() || crt.is_some() {
            key.private = Some(PrivateParams { d, crt });
        }

        Ok(key)
    }

    /// Serialize to `RSAKeyValue` XML.
    ///
    /// Fails with [`LicentiaError::MissingPrivateKey`] if private parameters
    /// are requested from a public-only key.
    pub fn to_xml(&self, include_private: bool) -> Result<String, LicentiaError> {
        let mut xml = String::from("<RSAKeyValue>");
        push_element(&mut xml, "Modulus", &self.modulus);
        push_element(&mut xml, "Exponent", &self.exponent);

        if include_private {
            let private = self
                .private
                .as_ref()
                .ok_or(LicentiaError::MissingPrivateKey)?;
            if let Some(crt) = &private.crt {
                push_element(&mut xml, "P", &crt.p);
                push_element(&mut xml, "Q", &crt.q);
                push_element(&mut xml, "DP", &crt.dp);
                push_element(&mut xml, "DQ", &crt.dq);
                push_element(&mut xml, "InverseQ", &crt.inverse_q);
            }
            if let Some(d) = &private.d {
                push_element(&mut xml, "D", d);
            }
        }

        xml.push_str("</RSAKeyValue>");
        Ok(xml)
    }

    /// Copy of this key without private parameters.
    pub fn public_key(&self) -> RsaKey {
        RsaKey {
            private: None,
            ..self.clone()
        }
    }

    /// Whether the key carries private parameters.
    pub fn has_private(&self) -> bool {
        self.private.is_some()
    }

    /// Key size in bytes, derived from the modulus.
    pub fn key_bytes(&self) -> usize {
        self.key_bytes
    }

    /// Modulus.
    pub fn modulus(&self) -> &BigUint {
        &self.modulus
    }

    /// Public exponent.
    pub fn exponent(&self) -> &BigUint {
        &self.exponent
    }

    /// Largest plaintext accepted by [`encrypt`](Self::encrypt).
    pub fn max_plaintext_len(&self) -> usize {
        self.key_bytes.saturating_sub(PKCS1_OVERHEAD)
    }

    /// PKCS#1 v1.5 type 2 encryption with the public key.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, LicentiaError> {
        let max = self.max_plaintext_len();
        if plaintext.len() > max {
            return Err(LicentiaError::PlaintextTooLong {
                len: plaintext.len(),
                max,
            });
        }

        let padding_len = self
            .key_bytes
            .checked_sub(3 + plaintext.len())
            .ok_or(LicentiaError::PlaintextTooLong {
                len: plaintext.len(),
                max,
            })?;
        let mut block = Vec::with_capacity(self.key_bytes);
        block.extend_from_slice(&[0x00, 0x02]);
        block.extend_from_slice(&random_nonzero_bytes(padding_len));
        block.push(0x00);
        block.extend_from_slice(plaintext);

        let m = BigUint::from_bytes_be(&block);
        self.encode_block(&self.public_op(&m))
    }

    /// PKCS#1 v1.5 type 2 decryption with the private key.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, LicentiaError> {
        let c = BigUint::from_bytes_be(ciphertext);
        let block = self.encode_block(&self.private_op(&c)?)?;

        if !block.starts_with(&[0x00, 0x02]) {
            return Err(LicentiaError::InvalidPadding);
        }

        let separator = block[2..]
            .iter()
            .position(|&b| b == 0x00)
            .map(|i| i + 2)
            .ok_or(LicentiaError::InvalidPadding)?;

        if separator < 10 {
            return Err(LicentiaError::InvalidPadding);
        }

        Ok(block[separator + 1..].to_vec())
    }

    /// Hash `data` and sign it (PKCS#1 v1.5 type 1) with the private key.
    pub fn sign_data(&self, data: &[u8], hash: HashAlgorithm) -> Result<Vec<u8>, LicentiaError> {
        if !self.has_private() {
            return Err(LicentiaError::MissingPrivateKey);
        }
        let block = self.signature_block(data, hash)?;
        let m = BigUint::from_bytes_be(&block);
        self.encode_block(&self.private_op(&m)?)
    }

    /// Verify a signature produced by [`sign_data`](Self::sign_data).
    ///
    /// A signature of the wrong length is an error; a signature that simply
    /// does not match yields `Ok(false)`.
    pub fn verify_data(
        &self,
        data: &[u8],
        hash: HashAlgorithm,
        signature: &[u8],
    ) -> Result<bool, LicentiaError> {
        if signature.len() != self.key_bytes {
            return Err(LicentiaError::InvalidSignatureLength {
                expected: self.key_bytes,
                actual: signature.len(),
            });
        }

        let s = BigUint::from_bytes_be(signature);
        if s >= self.modulus {
            return Ok(false);
        }

        let expected = self.signature_block(data, hash)?;
        let actual = self.encode_block(&self.public_op(&s))?;
        Ok(actual == expected)
    }

    fn signature_block(&self, data: &[u8], hash: HashAlgorithm) -> Result<Vec<u8>, LicentiaError> {
        let prefix = hash.digest_info_prefix();
        let digest = hash.hash(data);
        let t_len = prefix.len() + digest.len();

        if t_len > self.max_plaintext_len() {
            return Err(LicentiaError::PlaintextTooLong {
                len: t_len,
                max: self.max_plaintext_len(),
            });
        }

        let mut block = Vec::with_capacity(self.key_bytes);
        block.extend_from_slice(&[0x00, 0x01]);
        block.resize(self.key_bytes - t_len - 1, 0xFF);
        block.push(0x00);
        block.extend_from_slice(prefix);
        block.extend_from_slice(&digest);
        Ok(block)
    }

    fn public_op(&self, m: &BigUint) -> BigUint {
        m.mod_pow(&self.exponent, &self.modulus)
    }

    fn private_op(&self, c: &BigUint) -> Result<BigUint, LicentiaError> {
        let private = self
            .private
            .as_ref()
            .ok_or(LicentiaError::MissingPrivateKey)?;

        if *c >= self.modulus {
            return Err(LicentiaError::InputExceedsModulus);
        }

        if let Some(crt) = &private.crt {
            let m1 = c.mod_pow(&crt.dp, &crt.p);
            let m2 = c.mod_pow(&crt.dq, &crt.q);
            // m1 < p, so m1 + p never underflows below m2 mod p.
            let diff = m1
                .add(&crt.p)
                .checked_sub(&m2.rem(&crt.p))
                .unwrap_or_default()
                .rem(&crt.p);
            let h = crt.inverse_q.mul(&diff).rem(&crt.p);
            return Ok(m2.add(&h.mul(&crt.q)));
        }

        match &private.d {
            Some(d) => Ok(c.mod_pow(d, &self.modulus)),
            None => Err(LicentiaError::MissingPrivateKey),
        }
    }

    fn encode_block(&self, value: &BigUint) -> Result<Vec<u8>, LicentiaError> {
        value
            .to_bytes_be_padded(self.key_bytes)
            .ok_or(LicentiaError::InputExceedsModulus)
    }
}

fn random_nonzero_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    for b in bytes.iter_mut() {
        while *b == 0 {
            let mut one = [0u8; 1];
            OsRng.fill_bytes(&mut one);
            *b = one[0];
        }
    }
    bytes
}

fn xml_element<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    Some(&xml[start..end])
}

fn xml_integer(xml: &str, tag: &str) -> Result<Option<BigUint>, LicentiaError> {
    let Some(text) = xml_element(xml, tag) else {
        return Ok(None);
    };
    let text: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = digest::bytes_from_string(&text)
        .map_err(|e| LicentiaError::InvalidKeyXml(format!("{}: {}", tag, e)))?;
    Ok(Some(BigUint::from_bytes_be(&bytes)))
}

fn push_element(xml: &mut String, tag: &str, value: &BigUint) {
    xml.push('<');
    xml.push_str(tag);
    xml.push('>');
    xml.push_str(&digest::bytes_to_string(&value.to_bytes_be()));
    xml.push_str("</");
    xml.push_str(tag);
    xml.push('>');
}
