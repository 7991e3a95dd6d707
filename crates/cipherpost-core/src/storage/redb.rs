//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety.
//! Keypair uniqueness and message id assignment each happen inside a single
//! write transaction, so concurrent writers cannot interleave them.

use std::{fmt::Display, path::Path, sync::Arc};

use redb::{Database, ReadableTable, TableDefinition};
use serde::{Serialize, de::DeserializeOwned};
use zeroize::Zeroizing;

use super::{KeypairRecord, Storage, StorageError};
use crate::types::{Message, MessageId, MessageSummary, NewMessage, PrincipalId, SentSummary};

/// Table: public_keys
/// Key: principal id
/// Value: SPKI PEM
const PUBLIC_KEYS: TableDefinition<&str, &str> = TableDefinition::new("public_keys");

/// Table: private_keys
/// Key: principal id
/// Value: PKCS#8 PEM
const PRIVATE_KEYS: TableDefinition<&str, &str> = TableDefinition::new("private_keys");

/// Table: messages
/// Key: message id
/// Value: CBOR-encoded Message
const MESSAGES: TableDefinition<u64, &[u8]> = TableDefinition::new("messages");

/// Table: inbox
/// Key: (recipient, message id), see [`encode_index_key`]
/// Value: CBOR-encoded MessageSummary
const INBOX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("inbox");

/// Table: outbox
/// Key: (sender, message id), see [`encode_index_key`]
/// Value: CBOR-encoded SentSummary
const OUTBOX: TableDefinition<&[u8], &[u8]> = TableDefinition::new("outbox");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates tables if they don't exist (PUBLIC_KEYS, PRIVATE_KEYS,
    /// MESSAGES, INBOX, OUTBOX).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(io_err)?;

        let txn = db.begin_write().map_err(io_err)?;
        {
            let _ = txn.open_table(PUBLIC_KEYS).map_err(io_err)?;
            let _ = txn.open_table(PRIVATE_KEYS).map_err(io_err)?;
            let _ = txn.open_table(MESSAGES).map_err(io_err)?;
            let _ = txn.open_table(INBOX).map_err(io_err)?;
            let _ = txn.open_table(OUTBOX).map_err(io_err)?;
        }
        txn.commit().map_err(io_err)?;

        tracing::debug!(path = %path.as_ref().display(), "opened message store");

        Ok(Self { db: Arc::new(db) })
    }

    /// Decode every index entry under `principal` from an INBOX/OUTBOX table.
    fn scan_index<T, V>(table: &T, principal: &PrincipalId) -> Result<Vec<V>, StorageError>
    where
        T: ReadableTable<&'static [u8], &'static [u8]>,
        V: DeserializeOwned,
    {
        let start_key = encode_index_key(principal, MessageId(0));
        let end_key = encode_index_key(principal, MessageId(u64::MAX));

        let results = table.range(start_key.as_slice()..=end_key.as_slice()).map_err(io_err)?;

        let mut entries = Vec::new();
        for result in results {
            let (_, value) = result.map_err(io_err)?;
            entries.push(decode(value.value())?);
        }

        Ok(entries)
    }
}

impl Storage for RedbStorage {
    fn insert_keypair(
        &self,
        principal: &PrincipalId,
        record: &KeypairRecord,
    ) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(io_err)?;

        {
            let mut public = txn.open_table(PUBLIC_KEYS).map_err(io_err)?;

            if public.get(principal.as_str()).map_err(io_err)?.is_some() {
                return Err(StorageError::AlreadyExists { principal: principal.to_string() });
            }

            public.insert(principal.as_str(), record.public_key_pem.as_str()).map_err(io_err)?;

            let mut private = txn.open_table(PRIVATE_KEYS).map_err(io_err)?;
            private.insert(principal.as_str(), record.private_key_pem.as_str()).map_err(io_err)?;
        }

        txn.commit().map_err(io_err)?;

        Ok(())
    }

    fn load_public_key(&self, principal: &PrincipalId) -> Result<Option<String>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(PUBLIC_KEYS).map_err(io_err)?;

        Ok(table.get(principal.as_str()).map_err(io_err)?.map(|value| value.value().to_string()))
    }

    fn load_private_key(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Zeroizing<String>>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(PRIVATE_KEYS).map_err(io_err)?;

        Ok(table
            .get(principal.as_str())
            .map_err(io_err)?
            .map(|value| Zeroizing::new(value.value().to_string())))
    }

    fn list_principals(&self) -> Result<Vec<PrincipalId>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(PUBLIC_KEYS).map_err(io_err)?;

        let mut principals = Vec::new();
        for result in table.iter().map_err(io_err)? {
            let (key, _) = result.map_err(io_err)?;
            let principal = PrincipalId::new(key.value())
                .map_err(|e| StorageError::Serialization(e.to_string()))?;
            principals.push(principal);
        }

        Ok(principals)
    }

    fn append_message(&self, message: NewMessage) -> Result<Message, StorageError> {
        let txn = self.db.begin_write().map_err(io_err)?;

        let message = {
            let mut messages = txn.open_table(MESSAGES).map_err(io_err)?;

            let next = match messages.last().map_err(io_err)? {
                Some((key, _)) => key.value() + 1,
                None => 1,
            };

            let message = message.with_id(MessageId(next));
            messages.insert(next, encode(&message)?.as_slice()).map_err(io_err)?;

            let mut inbox = txn.open_table(INBOX).map_err(io_err)?;
            let key = encode_index_key(&message.recipient, message.id);
            let summary = encode(&MessageSummary::from(&message))?;
            inbox.insert(key.as_slice(), summary.as_slice()).map_err(io_err)?;

            let mut outbox = txn.open_table(OUTBOX).map_err(io_err)?;
            let key = encode_index_key(&message.sender, message.id);
            let summary = encode(&SentSummary::from(&message))?;
            outbox.insert(key.as_slice(), summary.as_slice()).map_err(io_err)?;

            message
        };

        txn.commit().map_err(io_err)?;

        Ok(message)
    }

    fn load_message(&self, id: MessageId) -> Result<Option<Message>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(MESSAGES).map_err(io_err)?;

        match table.get(id.0).map_err(io_err)? {
            Some(value) => Ok(Some(decode(value.value())?)),
            None => Ok(None),
        }
    }

    fn messages_for_recipient(
        &self,
        recipient: &PrincipalId,
    ) -> Result<Vec<MessageSummary>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(INBOX).map_err(io_err)?;

        Self::scan_index(&table, recipient)
    }

    fn messages_from_sender(&self, sender: &PrincipalId) -> Result<Vec<SentSummary>, StorageError> {
        let txn = self.db.begin_read().map_err(io_err)?;
        let table = txn.open_table(OUTBOX).map_err(io_err)?;

        Self::scan_index(&table, sender)
    }
}

fn io_err(e: impl Display) -> StorageError {
    StorageError::Io(e.to_string())
}

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

/// Encode (principal, message_id) as an index key.
///
/// Layout: [principal length: 2 bytes BE][principal bytes][message_id: 8 bytes BE]
/// The length prefix keeps one principal's range from overlapping another's,
/// and the big-endian id makes lexicographic order match numeric order.
fn encode_index_key(principal: &PrincipalId, id: MessageId) -> Vec<u8> {
    let principal = principal.as_str().as_bytes();
    debug_assert!(principal.len() <= usize::from(u16::MAX));

    let mut key = Vec::with_capacity(2 + principal.len() + 8);
    key.extend_from_slice(&(principal.len() as u16).to_be_bytes());
    key.extend_from_slice(principal);
    key.extend_from_slice(&id.0.to_be_bytes());
    key
}
