//! Async front end over the codex.
//!
//! Every codex call is CPU-bound (RSA, AEAD) or blocking (storage), so each
//! one runs on Tokio's blocking pool. Key generation is additionally bounded
//! by `keygen_timeout`; on expiry the generated key, if any, is discarded and
//! nothing is persisted.

use std::sync::Arc;

use cipherpost_crypto::PublicKey;

use crate::{
    codex::MessageCodex,
    env::Environment,
    error::CodexError,
    storage::Storage,
    types::{Message, MessageId, MessageSummary, PrincipalId, SentSummary},
};

/// Async service exposing the core operations.
///
/// Cheap to clone; clones share one codex.
pub struct Postmaster<S: Storage, E: Environment> {
    codex: Arc<MessageCodex<S, E>>,
}

impl<S: Storage, E: Environment> Clone for Postmaster<S, E> {
    fn clone(&self) -> Self {
        Self { codex: Arc::clone(&self.codex) }
    }
}

impl<S: Storage, E: Environment> Postmaster<S, E> {
    /// Wrap a codex.
    pub fn new(codex: MessageCodex<S, E>) -> Self {
        Self { codex: Arc::new(codex) }
    }

    /// Underlying codex, for synchronous callers.
    pub fn codex(&self) -> &MessageCodex<S, E> {
        &self.codex
    }

    /// Generate and persist a keypair for `principal`; returns the public half.
    ///
    /// # Errors
    ///
    /// - `DuplicateKeypair`: already registered
    /// - `KeyGeneration`: random source unavailable, or generation did not
    ///   finish within `keygen_timeout`
    /// - `Storage`: backend failure
    /// - `TaskFailed`: a worker panicked
    pub async fn register_keypair(&self, principal: PrincipalId) -> Result<PublicKey, CodexError> {
        let timeout = self.codex.config().keygen_timeout;

        let codex = Arc::clone(&self.codex);
        let candidate = principal.clone();
        let registered = self.blocking(move || codex.vault().has_keypair(&candidate)).await?;
        if registered {
            return Err(CodexError::DuplicateKeypair { principal });
        }

        let engine = self.codex.vault().engine().clone();
        let generation = tokio::task::spawn_blocking(move || engine.generate_keypair());

        let keypair = match tokio::time::timeout(timeout, generation).await {
            Ok(joined) => {
                joined.map_err(|e| CodexError::TaskFailed { reason: e.to_string() })??
            },
            Err(_) => {
                tracing::warn!(principal = %principal, ?timeout, "key generation timed out");
                return Err(CodexError::KeyGeneration {
                    reason: format!("timed out after {timeout:?}"),
                });
            },
        };

        let codex = Arc::clone(&self.codex);
        self.blocking(move || {
            codex.vault().store_keypair(&principal, &keypair)?;
            Ok(keypair.into_parts().0)
        })
        .await
    }

    /// Encrypt and store a message.
    ///
    /// See [`MessageCodex::send`].
    pub async fn send_message(
        &self,
        sender: PrincipalId,
        recipient: PrincipalId,
        plaintext: Vec<u8>,
    ) -> Result<Message, CodexError> {
        let codex = Arc::clone(&self.codex);
        self.blocking(move || codex.send(&sender, &recipient, &plaintext)).await
    }

    /// Decrypt a message for its recipient.
    ///
    /// See [`MessageCodex::read`].
    pub async fn read_message(
        &self,
        id: MessageId,
        requester: PrincipalId,
    ) -> Result<Vec<u8>, CodexError> {
        let codex = Arc::clone(&self.codex);
        self.blocking(move || codex.read(id, &requester)).await
    }

    /// Inbox metadata. See [`MessageCodex::list_for`].
    pub async fn inbox(&self, principal: PrincipalId) -> Result<Vec<MessageSummary>, CodexError> {
        let codex = Arc::clone(&self.codex);
        self.blocking(move || codex.list_for(&principal)).await
    }

    /// Outbox metadata. See [`MessageCodex::list_sent_by`].
    pub async fn outbox(&self, principal: PrincipalId) -> Result<Vec<SentSummary>, CodexError> {
        let codex = Arc::clone(&self.codex);
        self.blocking(move || codex.list_sent_by(&principal)).await
    }

    /// Public key of any registered principal.
    pub async fn public_key_of(&self, principal: PrincipalId) -> Result<PublicKey, CodexError> {
        let codex = Arc::clone(&self.codex);
        self.blocking(move || codex.vault().public_key_of(&principal)).await
    }

    /// Registered principals in ascending order.
    pub async fn directory(&self) -> Result<Vec<PrincipalId>, CodexError> {
        let codex = Arc::clone(&self.codex);
        self.blocking(move || codex.vault().directory()).await
    }

    /// Run `f` on the blocking pool. A panicked task surfaces as
    /// `TaskFailed` rather than tearing down the caller.
    async fn blocking<T, F>(&self, f: F) -> Result<T, CodexError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, CodexError> + Send + 'static,
    {
        match tokio::task::spawn_blocking(f).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "blocking task failed");
                Err(CodexError::TaskFailed { reason: e.to_string() })
            },
        }
    }
}
