//! Key custody.
//!
//! The vault is the only component that reads private key material out of
//! storage, and it hands a private key only to its owner. The ownership check
//! runs before any lookup, so a refused request learns nothing about whether
//! the principal exists.

use cipherpost_crypto::{CipherEngine, Entropy, Keypair, PrivateKey, PublicKey};

use crate::{
    error::CodexError,
    storage::{KeypairRecord, Storage, StorageError},
    types::PrincipalId,
};

/// Generates, persists and releases keypairs.
///
/// # Invariants
///
/// - At most one keypair per principal, enforced by the storage uniqueness
///   check
/// - A private key is only returned when `requester == owner`
/// - Private key material is never logged and never cached here
#[derive(Clone)]
pub struct KeyVault<S: Storage, E: Entropy> {
    storage: S,
    engine: CipherEngine<E>,
}

impl<S: Storage, E: Entropy> KeyVault<S, E> {
    /// Create a vault over `storage`, generating keys with `engine`.
    pub fn new(storage: S, engine: CipherEngine<E>) -> Self {
        Self { storage, engine }
    }

    /// Engine used for key generation.
    pub fn engine(&self) -> &CipherEngine<E> {
        &self.engine
    }

    /// Generate and persist a keypair for `principal`.
    ///
    /// The returned keypair belongs to `principal`; callers that only need
    /// the public half should drop the rest.
    ///
    /// # Errors
    ///
    /// - `DuplicateKeypair`: `principal` is already registered
    /// - `KeyGeneration`: random source unavailable
    /// - `Storage`: backend failure (nothing is persisted)
    pub fn create_keypair_for(&self, principal: &PrincipalId) -> Result<Keypair, CodexError> {
        // Skips RSA generation for duplicates; the insert stays authoritative
        if self.has_keypair(principal)? {
            return Err(CodexError::DuplicateKeypair { principal: principal.clone() });
        }

        let keypair = self.engine.generate_keypair()?;
        self.store_keypair(principal, &keypair)?;

        Ok(keypair)
    }

    /// Persist a keypair generated elsewhere.
    ///
    /// # Errors
    ///
    /// - `DuplicateKeypair`: `principal` is already registered
    /// - `Crypto`: key could not be PEM-encoded
    /// - `Storage`: backend failure
    pub fn store_keypair(
        &self,
        principal: &PrincipalId,
        keypair: &Keypair,
    ) -> Result<(), CodexError> {
        let record = KeypairRecord {
            public_key_pem: keypair.public_key().to_pem()?,
            private_key_pem: keypair.private_key().to_pem()?,
        };

        match self.storage.insert_keypair(principal, &record) {
            Ok(()) => {
                tracing::info!(principal = %principal, "keypair registered");
                Ok(())
            },
            Err(StorageError::AlreadyExists { .. }) => {
                tracing::debug!(principal = %principal, "duplicate keypair rejected");
                Err(CodexError::DuplicateKeypair { principal: principal.clone() })
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Returns true if `principal` has a keypair.
    pub fn has_keypair(&self, principal: &PrincipalId) -> Result<bool, CodexError> {
        Ok(self.storage.load_public_key(principal)?.is_some())
    }

    /// Public key of `principal`. Safe to call for anyone.
    ///
    /// # Errors
    ///
    /// - `PrincipalNotFound`: no keypair for `principal`
    /// - `Crypto`: stored PEM is corrupt
    pub fn public_key_of(&self, principal: &PrincipalId) -> Result<PublicKey, CodexError> {
        let pem = self
            .storage
            .load_public_key(principal)?
            .ok_or_else(|| CodexError::PrincipalNotFound { principal: principal.clone() })?;

        Ok(PublicKey::from_pem(&pem)?)
    }

    /// Private key of `principal`, released only to `principal` itself.
    ///
    /// # Errors
    ///
    /// - `Unauthorized`: `requester != principal`. Checked before any lookup.
    /// - `PrincipalNotFound`: the owner has no keypair
    /// - `Crypto`: stored PEM is corrupt
    pub fn private_key_of(
        &self,
        principal: &PrincipalId,
        requester: &PrincipalId,
    ) -> Result<PrivateKey, CodexError> {
        if requester != principal {
            tracing::warn!(
                principal = %principal,
                requester = %requester,
                "refused private key request from non-owner"
            );
            return Err(CodexError::Unauthorized);
        }

        let pem = self
            .storage
            .load_private_key(principal)?
            .ok_or_else(|| CodexError::PrincipalNotFound { principal: principal.clone() })?;

        Ok(PrivateKey::from_pem(&pem)?)
    }

    /// Registered principals in ascending order.
    pub fn directory(&self) -> Result<Vec<PrincipalId>, CodexError> {
        Ok(self.storage.list_principals()?)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use cipherpost_crypto::SeededEntropy;

    use super::*;
    use crate::storage::MemoryStorage;

    static PREBUILT: LazyLock<Keypair> = LazyLock::new(|| {
        CipherEngine::new(SeededEntropy::new(404)).generate_keypair().unwrap()
    });

    fn vault() -> KeyVault<MemoryStorage, SeededEntropy> {
        KeyVault::new(MemoryStorage::new(), CipherEngine::new(SeededEntropy::new(1)))
    }

    fn principal(id: &str) -> PrincipalId {
        PrincipalId::new(id).unwrap()
    }

    #[test]
    fn create_then_lookup_public_key() {
        let vault = vault();
        let alice = principal("alice");

        let keypair = vault.create_keypair_for(&alice).unwrap();

        assert_eq!(&vault.public_key_of(&alice).unwrap(), keypair.public_key());
        assert!(vault.has_keypair(&alice).unwrap());
    }

    #[test]
    fn second_registration_is_duplicate() {
        let vault = vault();
        let alice = principal("alice");

        vault.store_keypair(&alice, &PREBUILT).unwrap();

        assert_eq!(
            vault.create_keypair_for(&alice).unwrap_err(),
            CodexError::DuplicateKeypair { principal: alice.clone() }
        );
        assert_eq!(
            vault.store_keypair(&alice, &PREBUILT).unwrap_err(),
            CodexError::DuplicateKeypair { principal: alice }
        );
    }

    #[test]
    fn unknown_principal_not_found() {
        let vault = vault();
        let ghost = principal("ghost");

        assert_eq!(
            vault.public_key_of(&ghost).unwrap_err(),
            CodexError::PrincipalNotFound { principal: ghost.clone() }
        );
        assert_eq!(
            vault.private_key_of(&ghost, &ghost).unwrap_err(),
            CodexError::PrincipalNotFound { principal: ghost }
        );
    }

    #[test]
    fn owner_gets_private_key() {
        let vault = vault();
        let alice = principal("alice");
        vault.store_keypair(&alice, &PREBUILT).unwrap();

        let private = vault.private_key_of(&alice, &alice).unwrap();

        assert_eq!(&private.public_key(), PREBUILT.public_key());
    }

    #[test]
    fn non_owner_refused_whether_or_not_principal_exists() {
        let vault = vault();
        let alice = principal("alice");
        let mallory = principal("mallory");
        vault.store_keypair(&alice, &PREBUILT).unwrap();

        assert_eq!(vault.private_key_of(&alice, &mallory).unwrap_err(), CodexError::Unauthorized);
        assert_eq!(
            vault.private_key_of(&principal("ghost"), &mallory).unwrap_err(),
            CodexError::Unauthorized
        );
    }

    #[test]
    fn directory_lists_registered() {
        let vault = vault();
        assert!(vault.directory().unwrap().is_empty());

        vault.store_keypair(&principal("bob"), &PREBUILT).unwrap();
        vault.store_keypair(&principal("alice"), &PREBUILT).unwrap();

        assert_eq!(vault.directory().unwrap(), vec![principal("alice"), principal("bob")]);
    }
}
