//! Chaos property tests for the codex over failing storage
//!
//! These tests wrap storage in `ChaoticStorage` and verify:
//! - A failed send leaves no record behind (no partial writes)
//! - Successful sends receive contiguous ids in call order
//! - Every stored message stays readable by its recipient
//! - Keypair registration is all-or-nothing
//! - Storage failures surface as retryable `CodexError::Storage`

use std::sync::LazyLock;

use cipherpost_core::{
    ChaoticStorage, CodexConfig, CodexError, MemoryStorage, MessageCodex, MessageId, PrincipalId,
    RedbStorage, SimEnv, Storage, StorageError, storage::INJECTED_FAILURE,
};
use cipherpost_crypto::{CipherEngine, Keypair, SeededEntropy};
use proptest::prelude::*;
use tempfile::tempdir;

static BOB_KEYS: LazyLock<Keypair> =
    LazyLock::new(|| CipherEngine::new(SeededEntropy::new(0xB0B)).generate_keypair().unwrap());

fn principal(id: &str) -> PrincipalId {
    PrincipalId::new(id).unwrap()
}

fn is_injected(err: &CodexError) -> bool {
    matches!(err, CodexError::Storage(StorageError::Io(msg)) if msg == INJECTED_FAILURE)
}

/// Drive `count` sends through chaos and check the store afterwards.
fn sends_under_chaos<S: Storage>(inner: S, failure_rate: f64, seed: u64, count: usize) {
    // Register on the clean store so chaos only hits the sends
    let setup =
        MessageCodex::new(inner.clone(), SimEnv::new(seed), CodexConfig::default()).unwrap();
    setup.vault().store_keypair(&principal("bob"), &BOB_KEYS).unwrap();

    let chaotic = ChaoticStorage::with_seed(inner.clone(), failure_rate, seed);
    let codex = MessageCodex::new(chaotic, SimEnv::new(seed), CodexConfig::default()).unwrap();
    let (alice, bob) = (principal("alice"), principal("bob"));

    let mut delivered = Vec::new();
    for i in 0..count {
        let body = format!("message {i}").into_bytes();

        match codex.send(&alice, &bob, &body) {
            Ok(message) => delivered.push((message.id, body)),
            Err(err) => {
                assert!(is_injected(&err), "Unexpected error: {err:?}");
                assert!(err.is_retryable());
            },
        }
    }

    // ORACLE: ids are 1..=n in the order sends succeeded
    let expected: Vec<_> = (1..=delivered.len() as u64).map(MessageId).collect();
    let ids: Vec<_> = delivered.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, expected);

    // ORACLE: inbox on the clean store lists exactly the delivered messages
    let inbox = setup.list_for(&bob).unwrap();
    assert_eq!(inbox.iter().map(|s| s.id).collect::<Vec<_>>(), ids);

    // ORACLE: each delivered message decrypts to what was sent
    for (id, body) in &delivered {
        assert_eq!(&setup.read(*id, &bob).unwrap(), body);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_chaos_sends_memory(
        failure_rate in 0.0..0.8,
        seed in any::<u64>(),
        count in 1usize..24,
    ) {
        sends_under_chaos(MemoryStorage::new(), failure_rate, seed, count);
    }
}

#[test]
fn chaos_sends_redb() {
    let dir = tempdir().unwrap();
    let storage = RedbStorage::open(dir.path().join("chaos.redb")).unwrap();

    sends_under_chaos(storage, 0.4, 0xC4A0_5EED, 30);
}

#[test]
fn chaos_reads_never_corrupt() {
    let inner = MemoryStorage::new();
    let setup = MessageCodex::new(inner.clone(), SimEnv::new(1), CodexConfig::default()).unwrap();
    let bob = principal("bob");
    setup.vault().store_keypair(&bob, &BOB_KEYS).unwrap();
    let message = setup.send(&principal("alice"), &bob, b"steady").unwrap();

    let chaotic = ChaoticStorage::with_seed(inner, 0.5, 99);
    let codex = MessageCodex::new(chaotic.clone(), SimEnv::new(1), CodexConfig::default()).unwrap();

    let mut successes = 0;
    for _ in 0..40 {
        match codex.read(message.id, &bob) {
            Ok(plaintext) => {
                assert_eq!(plaintext, b"steady");
                successes += 1;
            },
            Err(err) => assert!(is_injected(&err), "Unexpected error: {err:?}"),
        }
    }

    assert!(successes > 0);
    assert!(chaotic.operation_count() >= 40);
}

#[test]
fn chaos_registration_is_all_or_nothing() {
    let inner = MemoryStorage::new();
    let chaotic = ChaoticStorage::with_seed(inner.clone(), 0.5, 7);
    let codex = MessageCodex::new(chaotic, SimEnv::new(7), CodexConfig::default()).unwrap();

    for i in 0..20 {
        let who = principal(&format!("user{i}"));
        let result = codex.vault().store_keypair(&who, &BOB_KEYS);

        let stored_public = inner.load_public_key(&who).unwrap();
        let stored_private = inner.load_private_key(&who).unwrap();

        match result {
            Ok(()) => assert!(stored_public.is_some() && stored_private.is_some()),
            Err(err) => {
                assert!(is_injected(&err), "Unexpected error: {err:?}");
                assert!(stored_public.is_none() && stored_private.is_none());
            },
        }
    }
}
