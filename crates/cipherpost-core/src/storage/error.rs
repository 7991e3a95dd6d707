//! Storage error types.
//!
//! Defines errors that can occur during storage operations:
//! - `AlreadyExists`: Keypair uniqueness constraint violated
//! - `Serialization`: Failed to encode/decode a stored record
//! - `Io`: Underlying storage system errors

use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A keypair is already stored for this principal
    ///
    /// Raised by the uniqueness check inside the insert transaction, so two
    /// concurrent registrations cannot both succeed.
    #[error("keypair already stored for principal {principal}")]
    AlreadyExists {
        /// Principal that already has a keypair
        principal: String,
    },

    /// Serialization or deserialization failed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (file system, database, poisoned lock, etc.)
    #[error("I/O error: {0}")]
    Io(String),
}

impl StorageError {
    /// Returns true if the operation may succeed when repeated.
    ///
    /// Uniqueness conflicts and corrupt records are permanent.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}
