//! Error types for cryptographic operations

use thiserror::Error;

use crate::entropy::EntropyError;

/// Errors from the cipher engine and key handling
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Keypair generation failed (entropy exhausted or invalid parameters)
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Reason for the failure
        reason: String,
    },

    /// Input exceeds what the envelope or the asymmetric primitive can carry
    #[error("payload too large: {size} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Size that was offered
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Envelope could not be opened.
    ///
    /// Deliberately carries no detail: a wrong key, a malformed envelope and
    /// a failed authentication tag are indistinguishable to the caller.
    #[error("decryption failed")]
    Decryption,

    /// Random source could not be read outside of key generation
    #[error(transparent)]
    Entropy(#[from] EntropyError),

    /// Key material could not be parsed, encoded or used
    #[error("invalid key material: {reason}")]
    InvalidKeyMaterial {
        /// Reason for the failure
        reason: String,
    },
}

impl CryptoError {
    /// Returns true if repeating the same call may succeed.
    ///
    /// Only randomness failures are transient. Decryption failures are
    /// deterministic in their inputs and never worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::KeyGeneration { .. } | Self::Entropy(_) => true,

            Self::PayloadTooLarge { .. } | Self::Decryption | Self::InvalidKeyMaterial { .. } => {
                false
            },
        }
    }
}
