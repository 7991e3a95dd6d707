//! Hybrid encryption engine.
//!
//! RSA-OAEP (SHA-256) wraps a fresh symmetric key and nonce, and
//! `XChaCha20-Poly1305` encrypts the payload. The engine holds nothing but its
//! entropy source, so it can be cloned freely and shared across threads.

use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit, Payload},
};
use rand_chacha::{ChaCha20Rng, rand_core::RngCore};
use rsa::{Oaep, RsaPrivateKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{
    entropy::{Entropy, seeded_rng},
    envelope::{self, Envelope, NONCE_SIZE},
    error::CryptoError,
    keys::{KEY_BITS, Keypair, PrivateKey, PublicKey},
};

/// Number of times key generation will try the entropy source.
pub const KEYGEN_ENTROPY_ATTEMPTS: u32 = 3;

/// Largest plaintext a single envelope will carry (16 MiB).
pub const MAX_ENVELOPE_PAYLOAD: usize = 16 * 1024 * 1024;

/// XChaCha20-Poly1305 key size.
const SYMMETRIC_KEY_SIZE: usize = 32;

/// Output size of the OAEP hash (SHA-256).
const OAEP_HASH_SIZE: usize = 32;

/// Material wrapped under RSA: symmetric key followed by nonce.
const WRAPPED_SECRET_SIZE: usize = SYMMETRIC_KEY_SIZE + NONCE_SIZE;

/// Stateless encrypt/decrypt over byte payloads and key material.
///
/// # Security
///
/// - Every call draws fresh randomness, so encrypting the same plaintext twice
///   yields unrelated envelopes
/// - [`decrypt`](Self::decrypt) collapses every failure into
///   [`CryptoError::Decryption`]
#[derive(Clone)]
pub struct CipherEngine<E: Entropy> {
    entropy: E,
}

impl<E: Entropy> CipherEngine<E> {
    /// Create an engine over the given entropy source.
    pub fn new(entropy: E) -> Self {
        Self { entropy }
    }

    /// Entropy source backing this engine.
    pub fn entropy(&self) -> &E {
        &self.entropy
    }

    /// Largest message RSA-OAEP-SHA256 can encrypt directly under `key`.
    ///
    /// 190 bytes for a 2048-bit modulus. The envelope only ever hands RSA the
    /// 56-byte wrapped secret, far below this ceiling.
    pub fn oaep_capacity(key: &PublicKey) -> usize {
        key.modulus_bytes().saturating_sub(2 * OAEP_HASH_SIZE + 2)
    }

    /// Generate a fresh 2048-bit RSA keypair.
    ///
    /// The entropy draw is retried up to [`KEYGEN_ENTROPY_ATTEMPTS`] times.
    /// Persisting the keypair is the caller's job.
    ///
    /// # Errors
    ///
    /// - `KeyGeneration`: entropy unavailable on every attempt, or the RSA
    ///   generator rejected the parameters
    pub fn generate_keypair(&self) -> Result<Keypair, CryptoError> {
        let mut rng = self.keygen_rng()?;

        let private = RsaPrivateKey::new(&mut rng, KEY_BITS)
            .map_err(|e| CryptoError::KeyGeneration { reason: e.to_string() })?;

        Ok(Keypair::from_private(private))
    }

    /// Seal `plaintext` for the holder of `recipient`'s private key.
    ///
    /// # Errors
    ///
    /// - `PayloadTooLarge`: plaintext above [`MAX_ENVELOPE_PAYLOAD`], or the
    ///   key is too small to wrap the symmetric secret
    /// - `Entropy`: random source unavailable (not retried)
    pub fn encrypt(&self, plaintext: &[u8], recipient: &PublicKey) -> Result<Vec<u8>, CryptoError> {
        if plaintext.len() > MAX_ENVELOPE_PAYLOAD {
            return Err(CryptoError::PayloadTooLarge {
                size: plaintext.len(),
                max: MAX_ENVELOPE_PAYLOAD,
            });
        }

        let capacity = Self::oaep_capacity(recipient);
        if WRAPPED_SECRET_SIZE > capacity {
            return Err(CryptoError::PayloadTooLarge { size: WRAPPED_SECRET_SIZE, max: capacity });
        }

        let mut rng = seeded_rng(&self.entropy)?;

        let mut secret = Zeroizing::new([0u8; WRAPPED_SECRET_SIZE]);
        rng.fill_bytes(&mut secret[..]);

        let wrapped_key = wrap_secret(&mut rng, recipient, &secret[..])?;

        let (key, nonce_bytes) = secret.split_at(SYMMETRIC_KEY_SIZE);
        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(nonce_bytes);

        let aad = envelope::associated_data(&wrapped_key)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;

        let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
        let payload = Payload { msg: plaintext, aad: &aad };
        let Ok(sealed) = cipher.encrypt(XNonce::from_slice(&nonce), payload) else {
            unreachable!("XChaCha20-Poly1305 encryption cannot fail below MAX_ENVELOPE_PAYLOAD");
        };

        let envelope = Envelope::from_sealed(wrapped_key, nonce, sealed)
            .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })?;

        Ok(envelope.encode())
    }

    /// Open an envelope produced by [`encrypt`](Self::encrypt).
    ///
    /// # Errors
    ///
    /// - `Decryption`: malformed envelope, unsupported version, wrong key,
    ///   nonce mismatch or failed authentication. The cause is not reported.
    pub fn decrypt(&self, ciphertext: &[u8], key: &PrivateKey) -> Result<Vec<u8>, CryptoError> {
        let envelope = Envelope::parse(ciphertext).map_err(|_| CryptoError::Decryption)?;

        let secret = Zeroizing::new(
            key.as_rsa()
                .decrypt(Oaep::new::<Sha256>(), &envelope.wrapped_key)
                .map_err(|_| CryptoError::Decryption)?,
        );

        if secret.len() != WRAPPED_SECRET_SIZE {
            return Err(CryptoError::Decryption);
        }

        let (symmetric_key, wrapped_nonce) = secret.split_at(SYMMETRIC_KEY_SIZE);
        if wrapped_nonce != envelope.nonce {
            return Err(CryptoError::Decryption);
        }

        let cipher = XChaCha20Poly1305::new(Key::from_slice(symmetric_key));
        let sealed = envelope.sealed();
        let aad = envelope.associated_data();

        cipher
            .decrypt(XNonce::from_slice(&envelope.nonce), Payload { msg: &sealed, aad: &aad })
            .map_err(|_| CryptoError::Decryption)
    }

    /// Seeded stream for key generation, with bounded entropy retries.
    fn keygen_rng(&self) -> Result<ChaCha20Rng, CryptoError> {
        let mut last_error = None;

        for attempt in 1..=KEYGEN_ENTROPY_ATTEMPTS {
            match seeded_rng(&self.entropy) {
                Ok(rng) => return Ok(rng),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "entropy draw failed during keygen");
                    last_error = Some(e);
                },
            }
        }

        Err(CryptoError::KeyGeneration {
            reason: last_error
                .map_or_else(|| "entropy source unavailable".to_string(), |e| e.to_string()),
        })
    }
}

fn wrap_secret(
    rng: &mut ChaCha20Rng,
    recipient: &PublicKey,
    secret: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    recipient
        .as_rsa()
        .encrypt(rng, Oaep::new::<Sha256>(), secret)
        .map_err(|e| CryptoError::InvalidKeyMaterial { reason: e.to_string() })
}
