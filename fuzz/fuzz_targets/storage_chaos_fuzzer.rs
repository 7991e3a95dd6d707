//! Fuzz target for the codex under storage failures
//!
//! Uses ChaoticStorage to inject I/O errors at configurable rates, then
//! checks the clean inner store against a model of what succeeded.
//!
//! # Strategy
//!
//! - Variable failure rates (0% to 90%)
//! - Interleaved sends, reads and listings across a few principals
//!
//! # Invariants
//!
//! - The codex NEVER panics on storage errors
//! - Storage errors surface as retryable `CodexError::Storage`
//! - No partial writes: the inner store holds exactly the successful sends
//! - Successful sends get contiguous ids in call order

#![no_main]

use std::sync::LazyLock;

use arbitrary::Arbitrary;
use cipherpost_core::{
    ChaoticStorage, CodexConfig, CodexError, MemoryStorage, MessageCodex, MessageId, PrincipalId,
    SimEnv, Storage,
};
use cipherpost_crypto::{CipherEngine, Keypair, SeededEntropy};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 3] = ["alice", "bob", "carol"];

static KEYS: LazyLock<Vec<Keypair>> = LazyLock::new(|| {
    let engine = CipherEngine::new(SeededEntropy::new(0xC4A0));
    (0..NAMES.len()).map(|_| engine.generate_keypair().expect("keygen")).collect()
});

#[derive(Debug, Clone, Arbitrary)]
struct ChaosScenario {
    /// Seed for ChaoticStorage RNG (deterministic failures)
    chaos_seed: u64,
    /// Failure rate 0-9 maps to 0%-90%
    failure_rate_tenth: u8,
    /// Sequence of operations to perform
    operations: Vec<ChaosOperation>,
}

#[derive(Debug, Clone, Arbitrary)]
enum ChaosOperation {
    Send { from: u8, to: u8, body: Vec<u8> },
    Read { id: u8, reader: u8 },
    Inbox { principal: u8 },
    Outbox { principal: u8 },
}

fn principal(index: u8) -> PrincipalId {
    PrincipalId::new(NAMES[index as usize % NAMES.len()]).expect("valid name")
}

fn assert_transient(err: &CodexError) {
    assert!(matches!(err, CodexError::Storage(_)), "unexpected error: {err:?}");
    assert!(err.is_retryable());
}

fuzz_target!(|scenario: ChaosScenario| {
    let failure_rate = f64::from(scenario.failure_rate_tenth % 10) / 10.0;
    let inner = MemoryStorage::new();
    let config = CodexConfig { max_message_size: 1024, ..Default::default() };

    let setup = MessageCodex::new(inner.clone(), SimEnv::new(0), config).expect("config");
    for (index, keys) in KEYS.iter().enumerate() {
        setup.vault().store_keypair(&principal(index as u8), keys).expect("clean store");
    }

    let chaotic = ChaoticStorage::with_seed(inner.clone(), failure_rate, scenario.chaos_seed);
    let codex = MessageCodex::new(chaotic, SimEnv::new(0), config).expect("config");

    // (id, recipient, body) for every send that succeeded
    let mut delivered: Vec<(MessageId, PrincipalId, Vec<u8>)> = Vec::new();

    for operation in scenario.operations.into_iter().take(64) {
        match operation {
            ChaosOperation::Send { from, to, body } => {
                match codex.send(&principal(from), &principal(to), &body) {
                    Ok(message) => {
                        let expected = MessageId(delivered.len() as u64 + 1);
                        assert_eq!(message.id, expected, "ids must be contiguous");
                        delivered.push((message.id, principal(to), body));
                    },
                    Err(CodexError::MessageTooLarge { .. }) => assert!(body.len() > 1024),
                    Err(err) => assert_transient(&err),
                }
            },
            ChaosOperation::Read { id, reader } => {
                let reader = principal(reader);
                match codex.read(MessageId(u64::from(id)), &reader) {
                    Ok(plaintext) => {
                        let (_, recipient, body) = &delivered[id as usize - 1];
                        assert_eq!(recipient, &reader);
                        assert_eq!(&plaintext, body);
                    },
                    Err(CodexError::MessageNotFound { id: missing }) => {
                        assert!(missing.0 == 0 || missing.0 as usize > delivered.len());
                    },
                    Err(CodexError::Unauthorized) => {},
                    Err(err) => assert_transient(&err),
                }
            },
            ChaosOperation::Inbox { principal: who } => {
                if let Err(err) = codex.list_for(&principal(who)) {
                    assert_transient(&err);
                }
            },
            ChaosOperation::Outbox { principal: who } => {
                if let Err(err) = codex.list_sent_by(&principal(who)) {
                    assert_transient(&err);
                }
            },
        }
    }

    // ORACLE: the clean store holds exactly the successful sends
    for (id, recipient, body) in &delivered {
        let stored = inner.load_message(*id).expect("clean store").expect("delivered message");
        assert_eq!(&stored.recipient, recipient);
        assert_eq!(&setup.read(*id, recipient).expect("readable"), body);
    }
    let next = MessageId(delivered.len() as u64 + 1);
    assert!(inner.load_message(next).expect("clean store").is_none());
});
