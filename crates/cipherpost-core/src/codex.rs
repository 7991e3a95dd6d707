//! Send and read pipeline.
//!
//! # Send
//!
//! ```text
//! size check → recipient public key → encrypt → append (store assigns id)
//! ```
//!
//! # Read
//!
//! ```text
//! load record → requester == recipient? → vault private key → decrypt
//! ```
//!
//! The codex keeps no mutable state of its own. Ordering and visibility come
//! from the store's transactions.

use cipherpost_crypto::CipherEngine;

use crate::{
    config::CodexConfig,
    env::Environment,
    error::CodexError,
    storage::Storage,
    types::{Message, MessageId, MessageSummary, NewMessage, PrincipalId, SentSummary},
    vault::KeyVault,
};

/// Orchestrates the vault, the cipher engine and the message store.
#[derive(Clone)]
pub struct MessageCodex<S: Storage, E: Environment> {
    vault: KeyVault<S, E>,
    storage: S,
    env: E,
    config: CodexConfig,
}

impl<S: Storage, E: Environment> MessageCodex<S, E> {
    /// Create a codex. The environment seeds the cipher engine and stamps
    /// message times.
    ///
    /// # Errors
    ///
    /// - `InvalidConfig`: `config` failed validation
    pub fn new(storage: S, env: E, config: CodexConfig) -> Result<Self, CodexError> {
        config.validate()?;

        let vault = KeyVault::new(storage.clone(), CipherEngine::new(env.clone()));
        Ok(Self { vault, storage, env, config })
    }

    /// Key vault backing this codex.
    pub fn vault(&self) -> &KeyVault<S, E> {
        &self.vault
    }

    /// Active limits.
    pub fn config(&self) -> &CodexConfig {
        &self.config
    }

    /// Encrypt `plaintext` for `recipient` and store it.
    ///
    /// The sender is trusted as authenticated upstream and need not hold a
    /// keypair. Only the recipient will be able to read the result; the
    /// sender cannot.
    ///
    /// # Errors
    ///
    /// - `MessageTooLarge`: `plaintext` is longer than `max_message_size`.
    ///   Checked before any key lookup.
    /// - `PrincipalNotFound`: `recipient` has no keypair
    /// - `Crypto`: random source unavailable
    /// - `Storage`: append failed (nothing is stored)
    pub fn send(
        &self,
        sender: &PrincipalId,
        recipient: &PrincipalId,
        plaintext: &[u8],
    ) -> Result<Message, CodexError> {
        let max = self.config.max_message_size;
        if plaintext.len() > max {
            return Err(CodexError::MessageTooLarge { size: plaintext.len(), max });
        }

        let public_key = self.vault.public_key_of(recipient)?;
        let ciphertext = self.vault.engine().encrypt(plaintext, &public_key)?;

        let message = self.storage.append_message(NewMessage {
            sender: sender.clone(),
            recipient: recipient.clone(),
            ciphertext,
            created_at_secs: self.env.wall_clock_secs(),
        })?;

        tracing::info!(
            message_id = %message.id,
            sender = %sender,
            recipient = %recipient,
            size = plaintext.len(),
            "message stored"
        );

        Ok(message)
    }

    /// Decrypt message `id` for `requester`.
    ///
    /// Reads do not mutate the stored record, so repeating one returns the
    /// same plaintext.
    ///
    /// # Errors
    ///
    /// - `MessageNotFound`: no message with this id
    /// - `Unauthorized`: `requester` is not the recipient
    /// - `Decryption`: ciphertext does not open under the recipient's key
    ///   (corruption or key mismatch); not retried
    pub fn read(&self, id: MessageId, requester: &PrincipalId) -> Result<Vec<u8>, CodexError> {
        let message =
            self.storage.load_message(id)?.ok_or(CodexError::MessageNotFound { id })?;

        if requester != &message.recipient {
            tracing::warn!(message_id = %id, %requester, "refused read by non-recipient");
            return Err(CodexError::Unauthorized);
        }

        let private_key = self.vault.private_key_of(&message.recipient, requester)?;

        match self.vault.engine().decrypt(&message.ciphertext, &private_key) {
            Ok(plaintext) => {
                tracing::debug!(message_id = %id, "message opened");
                Ok(plaintext)
            },
            Err(e) => {
                tracing::error!(message_id = %id, "stored message failed to decrypt");
                Err(e.into())
            },
        }
    }

    /// Inbox metadata for `principal`, ascending by id. Nothing is decrypted.
    pub fn list_for(&self, principal: &PrincipalId) -> Result<Vec<MessageSummary>, CodexError> {
        Ok(self.storage.messages_for_recipient(principal)?)
    }

    /// Outbox metadata for `principal`, ascending by id. Nothing is decrypted.
    pub fn list_sent_by(&self, principal: &PrincipalId) -> Result<Vec<SentSummary>, CodexError> {
        Ok(self.storage.messages_from_sender(principal)?)
    }
}
