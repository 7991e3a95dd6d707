//! Identifiers and records shared by the vault, the codex and storage.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest accepted principal identifier, in bytes.
pub const MAX_PRINCIPAL_LEN: usize = 128;

/// A principal identifier was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid principal id {id:?}: {reason}")]
pub struct InvalidPrincipalId {
    /// Rejected input
    pub id: String,
    /// Why it was rejected
    pub reason: &'static str,
}

/// Opaque identifier of a registered party.
///
/// # Invariants
///
/// - Non-empty, at most [`MAX_PRINCIPAL_LEN`] bytes
/// - No whitespace or control characters
///
/// Authentication happens upstream; a `PrincipalId` is trusted as given.
///
/// Deserialization goes through [`PrincipalId::new`], so a decoded record
/// cannot carry an id that construction would reject.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Validate and wrap an identifier.
    pub fn new(id: impl Into<String>) -> Result<Self, InvalidPrincipalId> {
        let id = id.into();

        let reason = if id.is_empty() {
            Some("must not be empty")
        } else if id.len() > MAX_PRINCIPAL_LEN {
            Some("too long")
        } else if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
            Some("must not contain whitespace or control characters")
        } else {
            None
        };

        match reason {
            Some(reason) => Err(InvalidPrincipalId { id, reason }),
            None => Ok(Self(id)),
        }
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PrincipalId {
    type Err = InvalidPrincipalId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PrincipalId {
    type Error = InvalidPrincipalId;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<PrincipalId> for String {
    fn from(id: PrincipalId) -> Self {
        id.0
    }
}

/// Store-assigned message identifier. The first message gets id 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// A persisted message. Immutable once stored.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Assigned by the store
    pub id: MessageId,
    /// Principal that sent the message
    pub sender: PrincipalId,
    /// Principal whose key sealed the ciphertext
    pub recipient: PrincipalId,
    /// Envelope bytes, opaque outside the cipher engine
    #[serde(with = "serde_bytes")]
    pub ciphertext: Vec<u8>,
    /// Unix timestamp (seconds) when the message was stored
    pub created_at_secs: u64,
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("id", &self.id)
            .field("sender", &self.sender)
            .field("recipient", &self.recipient)
            .field("ciphertext_len", &self.ciphertext.len())
            .field("created_at_secs", &self.created_at_secs)
            .finish()
    }
}

/// A message before the store has assigned its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    /// Principal that sent the message
    pub sender: PrincipalId,
    /// Principal whose key sealed the ciphertext
    pub recipient: PrincipalId,
    /// Envelope bytes
    pub ciphertext: Vec<u8>,
    /// Unix timestamp (seconds)
    pub created_at_secs: u64,
}

impl NewMessage {
    /// Attach the id the store picked.
    pub fn with_id(self, id: MessageId) -> Message {
        Message {
            id,
            sender: self.sender,
            recipient: self.recipient,
            ciphertext: self.ciphertext,
            created_at_secs: self.created_at_secs,
        }
    }
}

/// Inbox entry. Carries no plaintext and no ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageSummary {
    /// Message id
    pub id: MessageId,
    /// Who sent it
    pub sender: PrincipalId,
    /// When it was stored
    pub created_at_secs: u64,
}

/// Outbox entry. Carries no plaintext and no ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentSummary {
    /// Message id
    pub id: MessageId,
    /// Who it was sent to
    pub recipient: PrincipalId,
    /// When it was stored
    pub created_at_secs: u64,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            sender: message.sender.clone(),
            created_at_secs: message.created_at_secs,
        }
    }
}

impl From<&Message> for SentSummary {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            recipient: message.recipient.clone(),
            created_at_secs: message.created_at_secs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_accepts_plain_names() {
        for id in ["alice", "bob@example.org", "user-42", "Ünïcode"] {
            assert_eq!(PrincipalId::new(id).unwrap().as_str(), id);
        }
    }

    #[test]
    fn principal_rejects_empty() {
        let err = PrincipalId::new("").unwrap_err();
        assert_eq!(err.reason, "must not be empty");
    }

    #[test]
    fn principal_rejects_whitespace_and_control() {
        assert!(PrincipalId::new("al ice").is_err());
        assert!(PrincipalId::new("alice\n").is_err());
        assert!(PrincipalId::new("a\u{0}b").is_err());
    }

    #[test]
    fn principal_length_limit() {
        assert!(PrincipalId::new("a".repeat(MAX_PRINCIPAL_LEN)).is_ok());
        assert!(PrincipalId::new("a".repeat(MAX_PRINCIPAL_LEN + 1)).is_err());
    }

    #[test]
    fn principal_decoding_validates() {
        let mut bytes = Vec::new();
        ciborium::into_writer("has space", &mut bytes).unwrap();
        assert!(ciborium::from_reader::<PrincipalId, _>(bytes.as_slice()).is_err());

        let mut bytes = Vec::new();
        ciborium::into_writer(&PrincipalId::new("alice").unwrap(), &mut bytes).unwrap();
        let decoded: PrincipalId = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded.as_str(), "alice");
    }

    #[test]
    fn ciphertext_is_stored_as_byte_string() {
        let message = NewMessage {
            sender: PrincipalId::new("alice").unwrap(),
            recipient: PrincipalId::new("bob").unwrap(),
            ciphertext: vec![0xFF; 1024],
            created_at_secs: 1,
        }
        .with_id(MessageId(1));

        let mut bytes = Vec::new();
        ciborium::into_writer(&message, &mut bytes).unwrap();

        // Integer arrays would cost 2 bytes per high byte
        assert!(bytes.len() < 1024 + 64, "encoded {} bytes", bytes.len());
        let decoded: Message = ciborium::from_reader(bytes.as_slice()).unwrap();
        assert_eq!(decoded, message);
    }

    #[test]
    fn message_id_parses() {
        assert_eq!("17".parse::<MessageId>().unwrap(), MessageId(17));
        assert!("x".parse::<MessageId>().is_err());
    }

    #[test]
    fn message_debug_hides_ciphertext_bytes() {
        let message = NewMessage {
            sender: PrincipalId::new("alice").unwrap(),
            recipient: PrincipalId::new("bob").unwrap(),
            ciphertext: vec![0xAB; 300],
            created_at_secs: 7,
        }
        .with_id(MessageId(1));

        let rendered = format!("{message:?}");
        assert!(rendered.contains("ciphertext_len: 300"));
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn summaries_copy_metadata() {
        let message = NewMessage {
            sender: PrincipalId::new("alice").unwrap(),
            recipient: PrincipalId::new("bob").unwrap(),
            ciphertext: vec![1, 2, 3],
            created_at_secs: 99,
        }
        .with_id(MessageId(5));

        let inbox = MessageSummary::from(&message);
        assert_eq!(inbox.id, MessageId(5));
        assert_eq!(inbox.sender.as_str(), "alice");
        assert_eq!(inbox.created_at_secs, 99);

        let outbox = SentSummary::from(&message);
        assert_eq!(outbox.recipient.as_str(), "bob");
    }
}
