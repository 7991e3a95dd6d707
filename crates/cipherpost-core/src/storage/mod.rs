//! Storage abstraction for Cipherpost
//!
//! Trait-based abstraction for persisting keypairs and messages. The trait is
//! synchronous (no async) so the vault and codex stay plain functions; the
//! async service moves calls onto blocking workers.

mod chaotic;
mod error;
mod memory;
mod redb;

use std::fmt;

pub use chaotic::{ChaoticStorage, INJECTED_FAILURE};
pub use error::StorageError;
pub use memory::MemoryStorage;
use zeroize::Zeroizing;

pub use self::redb::RedbStorage;
use crate::types::{Message, MessageId, MessageSummary, NewMessage, PrincipalId, SentSummary};

/// Serialized keypair as it crosses the storage boundary.
///
/// Keys are PEM text: SPKI for the public half, PKCS#8 for the private half.
/// The private PEM is scrubbed from memory on drop and never printed.
#[derive(Clone)]
pub struct KeypairRecord {
    /// SPKI PEM public key
    pub public_key_pem: String,
    /// PKCS#8 PEM private key
    pub private_key_pem: Zeroizing<String>,
}

impl fmt::Debug for KeypairRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeypairRecord")
            .field("public_key_pem", &self.public_key_pem)
            .field("private_key_pem", &"***")
            .finish()
    }
}

/// Storage abstraction for keypairs and messages
///
/// Must be Clone (shared by the vault and the codex), Send + Sync
/// (thread-safe), and synchronous (no async methods). Implementations share
/// internal state via Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Persist both halves of a principal's keypair
    ///
    /// # Invariants
    ///
    /// - Pre: no keypair is stored for `principal`
    /// - Post: both halves are visible together, or neither is
    ///
    /// # Errors
    ///
    /// - `AlreadyExists`: a keypair is already stored. Checked in the same
    ///   transaction as the write.
    fn insert_keypair(
        &self,
        principal: &PrincipalId,
        record: &KeypairRecord,
    ) -> Result<(), StorageError>;

    /// Public key PEM for a principal. `None` if not registered.
    fn load_public_key(&self, principal: &PrincipalId) -> Result<Option<String>, StorageError>;

    /// Private key PEM for a principal. `None` if not registered.
    ///
    /// Only the vault calls this, and only after its ownership check.
    fn load_private_key(
        &self,
        principal: &PrincipalId,
    ) -> Result<Option<Zeroizing<String>>, StorageError>;

    /// All principals holding a keypair, in ascending order.
    fn list_principals(&self) -> Result<Vec<PrincipalId>, StorageError>;

    /// Append a message and assign its id
    ///
    /// # Invariants
    ///
    /// - Post: returned id is one greater than the previous largest id (1 for
    ///   the first message)
    /// - Post: the message is visible to `load_message` and both listings
    ///   once this returns `Ok`
    fn append_message(&self, message: NewMessage) -> Result<Message, StorageError>;

    /// Load a message by id. `None` if no such message.
    fn load_message(&self, id: MessageId) -> Result<Option<Message>, StorageError>;

    /// Inbox metadata for `recipient`, ascending by id.
    fn messages_for_recipient(
        &self,
        recipient: &PrincipalId,
    ) -> Result<Vec<MessageSummary>, StorageError>;

    /// Outbox metadata for `sender`, ascending by id.
    fn messages_from_sender(&self, sender: &PrincipalId) -> Result<Vec<SentSummary>, StorageError>;
}
