//! Cipherpost Cryptographic Primitives
//!
//! Stateless building blocks for point-to-point message confidentiality:
//! RSA keypairs, and a hybrid envelope that wraps a fresh per-message
//! symmetric key under the recipient's public key.
//!
//! # Envelope Construction
//!
//! Every message, whatever its length, takes the same path. There is no
//! "small message" shortcut that encrypts directly under RSA.
//!
//! ```text
//! Entropy (32-byte seed, per call)
//!        │
//!        ▼
//! ChaCha20 stream → symmetric key (32) ‖ nonce (24)
//!        │                     │
//!        ▼                     ▼
//! RSA-OAEP-SHA256        XChaCha20-Poly1305(plaintext, aad = header)
//!        │                     │
//!        ▼                     ▼
//! [version ‖ len ‖ wrapped key ‖ nonce ‖ ciphertext ‖ tag]
//! ```
//!
//! # Security
//!
//! Confidentiality:
//! - Only the holder of the RSA private key can unwrap the symmetric key
//! - Symmetric keys are single use and zeroized after sealing
//!
//! Integrity:
//! - Poly1305 authenticates the ciphertext and the envelope header
//! - OAEP rejects any modification of the wrapped key block
//! - The nonce is also bound inside the wrapped block
//!
//! Oracle resistance:
//! - Wrong key, malformed envelope and failed tag all surface as the same
//!   [`CryptoError::Decryption`]
//!
//! Randomness:
//! - The caller supplies an [`Entropy`] source; production uses
//!   [`OsEntropy`], tests use [`SeededEntropy`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod engine;
mod entropy;
pub mod envelope;
mod error;
mod keys;

pub use engine::{CipherEngine, KEYGEN_ENTROPY_ATTEMPTS, MAX_ENVELOPE_PAYLOAD};
pub use entropy::{Entropy, EntropyError, OsEntropy, SeededEntropy};
pub use envelope::{Envelope, EnvelopeError};
pub use error::CryptoError;
pub use keys::{KEY_BITS, Keypair, PrivateKey, PublicKey};
