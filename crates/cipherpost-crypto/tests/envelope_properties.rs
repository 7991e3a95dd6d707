//! Property-based tests for the hybrid envelope
//!
//! These tests verify the fundamental invariants of the cipher engine:
//!
//! 1. **Round-trip**: decrypt(encrypt(m, pub), priv) == m for all messages
//! 2. **Non-determinism**: Two encryptions of the same message differ
//! 3. **Wrong-key rejection**: Another principal's key cannot open an envelope
//! 4. **Tamper detection**: Any single bit flip is rejected, never silently
//!    corrupted
//! 5. **Parser robustness**: Arbitrary bytes never panic the decoder

use std::sync::LazyLock;

use cipherpost_crypto::{CipherEngine, CryptoError, Envelope, Keypair, SeededEntropy};
use proptest::prelude::*;

static ENGINE: LazyLock<CipherEngine<SeededEntropy>> =
    LazyLock::new(|| CipherEngine::new(SeededEntropy::new(0xC1_9E_E0)));

static KEYPAIR_A: LazyLock<Keypair> = LazyLock::new(|| ENGINE.generate_keypair().unwrap());

static KEYPAIR_B: LazyLock<Keypair> = LazyLock::new(|| ENGINE.generate_keypair().unwrap());

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_encrypt_decrypt_roundtrip(
        plaintext in prop::collection::vec(any::<u8>(), 0..4096),
    ) {
        let ciphertext = ENGINE.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();
        let decrypted = ENGINE.decrypt(&ciphertext, KEYPAIR_A.private_key()).unwrap();

        prop_assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn prop_encryption_is_randomized(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let first = ENGINE.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();
        let second = ENGINE.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();

        prop_assert_ne!(first, second);
    }

    #[test]
    fn prop_wrong_key_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 0..256),
    ) {
        let ciphertext = ENGINE.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();

        prop_assert_eq!(
            ENGINE.decrypt(&ciphertext, KEYPAIR_B.private_key()),
            Err(CryptoError::Decryption)
        );
    }

    #[test]
    fn prop_single_bit_flip_rejected(
        plaintext in prop::collection::vec(any::<u8>(), 1..128),
        position in any::<prop::sample::Index>(),
        bit in 0u8..8,
    ) {
        let mut ciphertext = ENGINE.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();
        let byte = position.index(ciphertext.len());
        ciphertext[byte] ^= 1 << bit;

        prop_assert_eq!(
            ENGINE.decrypt(&ciphertext, KEYPAIR_A.private_key()),
            Err(CryptoError::Decryption)
        );
    }

    #[test]
    fn prop_arbitrary_bytes_never_panic(
        bytes in prop::collection::vec(any::<u8>(), 0..600),
    ) {
        let _ = Envelope::parse(&bytes);
        prop_assert!(ENGINE.decrypt(&bytes, KEYPAIR_A.private_key()).is_err());
    }

    #[test]
    fn prop_parse_encode_preserves_bytes(
        plaintext in prop::collection::vec(any::<u8>(), 0..512),
    ) {
        let ciphertext = ENGINE.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();
        let envelope = Envelope::parse(&ciphertext).unwrap();

        prop_assert_eq!(envelope.encode(), ciphertext);
        prop_assert_eq!(envelope.ciphertext.len(), plaintext.len());
    }
}

/// Exhaustive sweep over every bit of one short envelope.
#[test]
fn every_bit_flip_is_detected() {
    let ciphertext = ENGINE.encrypt(b"hello", KEYPAIR_A.public_key()).unwrap();

    for byte in 0..ciphertext.len() {
        for bit in 0..8 {
            let mut tampered = ciphertext.clone();
            tampered[byte] ^= 1 << bit;

            assert_eq!(
                ENGINE.decrypt(&tampered, KEYPAIR_A.private_key()),
                Err(CryptoError::Decryption),
                "flip of bit {bit} in byte {byte} was not detected"
            );
        }
    }
}

#[test]
fn engine_is_shareable_across_threads() {
    let handles: Vec<_> = (0..4u8)
        .map(|i| {
            let engine = ENGINE.clone();
            std::thread::spawn(move || {
                let plaintext = vec![i; 100];
                let ciphertext = engine.encrypt(&plaintext, KEYPAIR_A.public_key()).unwrap();
                let decrypted = engine.decrypt(&ciphertext, KEYPAIR_A.private_key()).unwrap();
                assert_eq!(decrypted, plaintext);
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
}
