//! RSA key material.
//!
//! Private keys are never printed: their `Debug` output is redacted and the
//! underlying `RsaPrivateKey` zeroizes its limbs on drop. Keys cross the
//! storage boundary as PEM text (SPKI for public keys, PKCS#8 for private
//! keys).

use std::fmt;

use rsa::{
    RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding},
    traits::PublicKeyParts,
};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::error::CryptoError;

/// RSA modulus size for every Cipherpost keypair.
pub const KEY_BITS: usize = 2048;

/// A principal's public key. Safe to disclose.
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Parse an SPKI PEM public key.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: not valid PEM, or the modulus is not
    ///   [`KEY_BITS`] wide
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;

        let key = Self(key);
        if key.modulus_bits() != KEY_BITS {
            return Err(CryptoError::InvalidKeyMaterial {
                reason: format!("expected {KEY_BITS}-bit modulus, got {}", key.modulus_bits()),
            });
        }

        Ok(key)
    }

    /// Encode as SPKI PEM.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.0.n().bits()
    }

    /// Modulus size in bytes (length of every RSA ciphertext block).
    pub fn modulus_bytes(&self) -> usize {
        self.0.size()
    }

    /// Lowercase hex SHA-256 of the SPKI DER encoding.
    ///
    /// Suitable for comparing keys out of band.
    pub fn fingerprint(&self) -> Result<String, CryptoError> {
        let der = self
            .0
            .to_public_key_der()
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;

        Ok(hex::encode(Sha256::digest(der.as_bytes())))
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.0
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey").field("modulus_bits", &self.modulus_bits()).finish()
    }
}

/// A principal's private key. Must never leave its owner.
pub struct PrivateKey(RsaPrivateKey);

impl PrivateKey {
    /// Parse a PKCS#8 PEM private key.
    ///
    /// # Errors
    ///
    /// - `InvalidKeyMaterial`: not valid PEM, or the modulus is not
    ///   [`KEY_BITS`] wide
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;

        let bits = key.n().bits();
        if bits != KEY_BITS {
            return Err(CryptoError::InvalidKeyMaterial {
                reason: format!("expected {KEY_BITS}-bit modulus, got {bits}"),
            });
        }

        Ok(Self(key))
    }

    /// Encode as PKCS#8 PEM. The returned string is zeroized on drop.
    pub fn to_pem(&self) -> Result<Zeroizing<String>, CryptoError> {
        self.0
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })
    }

    /// Public half of this key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.to_public_key())
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey").field("value", &"***").finish()
    }
}

/// Public and private halves generated together.
pub struct Keypair {
    public: PublicKey,
    private: PrivateKey,
}

impl Keypair {
    pub(crate) fn from_private(private: RsaPrivateKey) -> Self {
        let public = PublicKey(private.to_public_key());
        Self { public, private: PrivateKey(private) }
    }

    /// Public half.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Private half.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private
    }

    /// Split into halves.
    pub fn into_parts(self) -> (PublicKey, PrivateKey) {
        (self.public, self.private)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public", &self.public)
            .field("private", &self.private)
            .finish()
    }
}
