//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling.
//! Used for chaos testing to ensure the vault and codex surface storage
//! failures instead of losing or half-writing records.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use zeroize::Zeroizing;

use super::{KeypairRecord, Storage, StorageError};
use crate::types::{Message, MessageId, MessageSummary, NewMessage, PrincipalId, SentSummary};

/// Error message carried by every injected failure.
pub const INJECTED_FAILURE: &str = "chaotic failure injection";

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but fails operations
/// with `StorageError::Io` based on a configured failure rate. A failed
/// operation never reaches the inner storage, so it has no effect.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// RNG state for deterministic chaos
    rng: Arc<Mutex<ChaoticRng>>,
    /// Operations attempted, including injected failures
    operation_count: Arc<AtomicUsize>,
}

/// Linear congruential generator, so chaos runs replay from a seed.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Wrap `inner` with a fixed default seed.
    ///
    /// `failure_rate` is clamped into [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos.
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Count the operation and decide whether it fails.
    fn inject(&self) -> Result<(), StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        let mut rng = self
            .rng
            .lock()
            .map_err(|_| StorageError::Io("chaotic rng mutex poisoned".to_string()))?;

        if rng.next() < self.failure_rate {
            return Err(StorageError::Io(INJECTED_FAILURE.to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn insert_keypair(
        &self,
        principal: &PrincipalId,
        record: &KeypairRecord,
    ) -> Result<(), StorageError> {
        self.inject()?;
        self.inner.insert_keypair(principal, record)
    }

    fn load_public_key(&self, principal: &PrincipalId) -> Result<Option<String>, StorageError> {
        self.inject()?;
        self.inner.load_public_key(principal)
    }

    fn load_private_key(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Zeroizing<String>>, StorageError> {
        self.inject()?;
        self.inner.load_private_key(principal)
    }

    fn list_principals(&self) -> Result<Vec<PrincipalId>, StorageError> {
        self.inject()?;
        self.inner.list_principals()
    }

    fn append_message(&self, message: NewMessage) -> Result<Message, StorageError> {
        self.inject()?;
        self.inner.append_message(message)
    }

    fn load_message(&self, id: MessageId) -> Result<Option<Message>, StorageError> {
        self.inject()?;
        self.inner.load_message(id)
    }

    fn messages_for_recipient(
        &self,
        recipient: &PrincipalId,
    ) -> Result<Vec<MessageSummary>, StorageError> {
        self.inject()?;
        self.inner.messages_for_recipient(recipient)
    }

    fn messages_from_sender(&self, sender: &PrincipalId) -> Result<Vec<SentSummary>, StorageError> {
        self.inject()?;
        self.inner.messages_from_sender(sender)
    }
}
