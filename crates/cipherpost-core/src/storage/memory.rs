#![allow(clippy::disallowed_types, reason = "Synchronous in-memory operations only")]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use zeroize::Zeroizing;

use super::{KeypairRecord, Storage, StorageError};
use crate::types::{Message, MessageId, MessageSummary, NewMessage, PrincipalId, SentSummary};

/// In-memory storage implementation for testing and simulation
///
/// Uses `BTreeMap` so principal and message listings come out ordered without
/// sorting. All state is wrapped in Arc<Mutex<>> to allow Clone and
/// concurrent access. A poisoned mutex surfaces as `StorageError::Io`.
#[derive(Clone)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryStorageInner>>,
}

struct MemoryStorageInner {
    /// Keypairs by principal
    keypairs: BTreeMap<PrincipalId, KeypairRecord>,

    /// Messages by id
    messages: BTreeMap<MessageId, Message>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStorageInner {
                keypairs: BTreeMap::new(),
                messages: BTreeMap::new(),
            })),
        }
    }

    /// Number of stored keypairs.
    pub fn keypair_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.keypairs.len())
    }

    /// Number of stored messages.
    pub fn message_count(&self) -> Result<usize, StorageError> {
        Ok(self.lock()?.messages.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryStorageInner>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Io("memory storage mutex poisoned".to_string()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for MemoryStorage {
    fn insert_keypair(
        &self,
        principal: &PrincipalId,
        record: &KeypairRecord,
    ) -> Result<(), StorageError> {
        let mut inner = self.lock()?;

        if inner.keypairs.contains_key(principal) {
            return Err(StorageError::AlreadyExists { principal: principal.to_string() });
        }

        inner.keypairs.insert(principal.clone(), record.clone());
        Ok(())
    }

    fn load_public_key(&self, principal: &PrincipalId) -> Result<Option<String>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.keypairs.get(principal).map(|record| record.public_key_pem.clone()))
    }

    fn load_private_key(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Zeroizing<String>>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.keypairs.get(principal).map(|record| record.private_key_pem.clone()))
    }

    fn list_principals(&self) -> Result<Vec<PrincipalId>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.keypairs.keys().cloned().collect())
    }

    fn append_message(&self, message: NewMessage) -> Result<Message, StorageError> {
        let mut inner = self.lock()?;

        let next = inner.messages.last_key_value().map_or(1, |(id, _)| id.0 + 1);
        let message = message.with_id(MessageId(next));

        inner.messages.insert(message.id, message.clone());

        debug_assert_eq!(inner.messages.len() as u64, next);
        Ok(message)
    }

    fn load_message(&self, id: MessageId) -> Result<Option<Message>, StorageError> {
        let inner = self.lock()?;
        Ok(inner.messages.get(&id).cloned())
    }

    fn messages_for_recipient(
        &self,
        recipient: &PrincipalId,
    ) -> Result<Vec<MessageSummary>, StorageError> {
        let inner = self.lock()?;

        Ok(inner
            .messages
            .values()
            .filter(|message| &message.recipient == recipient)
            .map(MessageSummary::from)
            .collect())
    }

    fn messages_from_sender(&self, sender: &PrincipalId) -> Result<Vec<SentSummary>, StorageError> {
        let inner = self.lock()?;

        Ok(inner
            .messages
            .values()
            .filter(|message| &message.sender == sender)
            .map(SentSummary::from)
            .collect())
    }
}
