//! Cipherpost core.
//!
//! Point-to-point message confidentiality between registered principals.
//! Authentication happens upstream; this crate receives an already
//! authenticated [`PrincipalId`] and trusts it.
//!
//! # Components
//!
//! - [`KeyVault`]: generates and persists keypairs, exposes public keys to
//!   anyone, releases a private key only to its owner
//! - [`MessageCodex`]: send (encrypt for recipient, store) and read (check
//!   recipient, decrypt), plus metadata-only listings
//! - [`Storage`]: durable append-only message store and keypair table, with
//!   [`MemoryStorage`], [`RedbStorage`] and [`ChaoticStorage`]
//! - [`Postmaster`]: async service running codex calls on blocking workers,
//!   with a bounded key generation timeout
//! - [`Environment`]: wall clock and entropy; [`SystemEnv`] in production,
//!   [`SimEnv`] for reproducible tests
//!
//! # Guarantees
//!
//! - Only the recipient can decrypt a message; not even its sender can
//! - Exactly one keypair per principal, enforced by the store
//! - Oversized messages are rejected before any key lookup or crypto
//! - Every failure is a typed [`CodexError`]; none is swallowed

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod codex;
mod config;
mod env;
mod error;
mod service;
pub mod storage;
mod types;
mod vault;

pub use codex::MessageCodex;
pub use config::{CodexConfig, DEFAULT_KEYGEN_TIMEOUT, DEFAULT_MAX_MESSAGE_SIZE};
pub use env::{Environment, SimEnv, SystemEnv};
pub use error::CodexError;
pub use service::Postmaster;
pub use storage::{ChaoticStorage, KeypairRecord, MemoryStorage, RedbStorage, Storage, StorageError};
pub use types::{
    InvalidPrincipalId, MAX_PRINCIPAL_LEN, Message, MessageId, MessageSummary, NewMessage,
    PrincipalId, SentSummary,
};
pub use vault::KeyVault;
