//! Codex configuration.

use std::time::Duration;

use cipherpost_crypto::MAX_ENVELOPE_PAYLOAD;

use crate::error::CodexError;

/// Default largest plaintext accepted by `send` (64 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default bound on key generation in the async service.
pub const DEFAULT_KEYGEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Limits applied by the codex and the async service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodexConfig {
    /// Largest plaintext, in bytes, that `send` will encrypt. A plaintext of
    /// exactly this size is accepted.
    pub max_message_size: usize,

    /// How long registration waits for key generation before giving up.
    pub keygen_timeout: Duration,
}

impl Default for CodexConfig {
    fn default() -> Self {
        Self { max_message_size: DEFAULT_MAX_MESSAGE_SIZE, keygen_timeout: DEFAULT_KEYGEN_TIMEOUT }
    }
}

impl CodexConfig {
    /// Check the limits are usable.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig`: `max_message_size` is zero or above what one
    ///   envelope can carry, or `keygen_timeout` is zero
    pub fn validate(&self) -> Result<(), CodexError> {
        if self.max_message_size == 0 {
            return Err(CodexError::InvalidConfig {
                reason: "max_message_size must be greater than zero".to_string(),
            });
        }

        if self.max_message_size > MAX_ENVELOPE_PAYLOAD {
            return Err(CodexError::InvalidConfig {
                reason: format!(
                    "max_message_size {} exceeds envelope limit {MAX_ENVELOPE_PAYLOAD}",
                    self.max_message_size
                ),
            });
        }

        if self.keygen_timeout.is_zero() {
            return Err(CodexError::InvalidConfig {
                reason: "keygen_timeout must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
