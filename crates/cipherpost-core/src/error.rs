//! Codex error types.
//!
//! One taxonomy for every vault and codex operation. Callers match on the
//! variant; none of them is swallowed or downgraded on the way up.

use cipherpost_crypto::CryptoError;
use thiserror::Error;

use crate::{
    storage::StorageError,
    types::{MessageId, PrincipalId},
};

/// Errors from the key vault, the message codex and the async service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodexError {
    /// Keypair generation failed or timed out.
    ///
    /// Transient: the random source may recover. Nothing was persisted.
    #[error("key generation failed: {reason}")]
    KeyGeneration {
        /// Reason for the failure
        reason: String,
    },

    /// Principal already has a keypair.
    ///
    /// Conflict, not retried: keypairs are generated once and never replaced.
    #[error("keypair already exists for {principal}")]
    DuplicateKeypair {
        /// Principal that is already registered
        principal: PrincipalId,
    },

    /// Principal has no keypair.
    #[error("principal not found: {principal}")]
    PrincipalNotFound {
        /// Principal that was looked up
        principal: PrincipalId,
    },

    /// Input exceeds what a single envelope can carry.
    #[error("payload too large: {size} bytes exceeds limit of {max}")]
    PayloadTooLarge {
        /// Size that was offered
        size: usize,
        /// Maximum accepted size
        max: usize,
    },

    /// Plaintext exceeds the configured maximum message size.
    ///
    /// Raised before any key lookup or cryptographic work.
    #[error("message too large: {size} bytes exceeds limit of {max}")]
    MessageTooLarge {
        /// Plaintext size
        size: usize,
        /// Configured `max_message_size`
        max: usize,
    },

    /// Requester may not perform this operation.
    ///
    /// Carries no detail: it never reveals whether the target exists.
    #[error("unauthorized")]
    Unauthorized,

    /// Stored ciphertext could not be opened with the recipient's key.
    ///
    /// Indicates corruption or a key mismatch. Reported, never retried.
    #[error("decryption failed")]
    Decryption,

    /// No message with this id.
    #[error("message not found: {id}")]
    MessageNotFound {
        /// Id that was looked up
        id: MessageId,
    },

    /// Configuration rejected by [`CodexConfig::validate`](crate::CodexConfig::validate).
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// What is wrong
        reason: String,
    },

    /// A worker task panicked or was cancelled.
    ///
    /// Points at a bug rather than a flaky backend, so it is not retryable.
    #[error("worker task failed: {reason}")]
    TaskFailed {
        /// Join error reported by the runtime
        reason: String,
    },

    /// Storage backend failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Remaining cipher engine faults (entropy at encrypt time, corrupt
    /// stored key material).
    #[error("crypto error: {0}")]
    Crypto(CryptoError),
}

impl CodexError {
    /// Returns true if repeating the same call may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::KeyGeneration { .. } => true,
            Self::Storage(err) => err.is_transient(),
            Self::Crypto(err) => err.is_retryable(),

            Self::DuplicateKeypair { .. }
            | Self::PrincipalNotFound { .. }
            | Self::PayloadTooLarge { .. }
            | Self::MessageTooLarge { .. }
            | Self::Unauthorized
            | Self::Decryption
            | Self::MessageNotFound { .. }
            | Self::InvalidConfig { .. }
            | Self::TaskFailed { .. } => false,
        }
    }
}

impl From<CryptoError> for CodexError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::KeyGeneration { reason } => Self::KeyGeneration { reason },
            CryptoError::PayloadTooLarge { size, max } => Self::PayloadTooLarge { size, max },
            CryptoError::Decryption => Self::Decryption,
            other @ (CryptoError::Entropy(_) | CryptoError::InvalidKeyMaterial { .. }) => {
                Self::Crypto(other)
            },
        }
    }
}
