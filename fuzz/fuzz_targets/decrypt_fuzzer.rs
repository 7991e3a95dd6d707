//! Fuzz target for decryption of untrusted ciphertext
//!
//! # Strategy
//!
//! - Arbitrary bytes handed straight to `decrypt`
//! - Mutations of a genuine envelope: bit flips, truncation, extension
//!
//! # Invariants
//!
//! - `decrypt` NEVER panics
//! - Every failure is `CryptoError::Decryption` (no oracle detail leaks)
//! - Only the untouched envelope decrypts

#![no_main]

use std::sync::LazyLock;

use arbitrary::Arbitrary;
use cipherpost_crypto::{CipherEngine, CryptoError, Keypair, SeededEntropy};
use libfuzzer_sys::fuzz_target;

static ENGINE: LazyLock<CipherEngine<SeededEntropy>> =
    LazyLock::new(|| CipherEngine::new(SeededEntropy::new(0xF022)));

static KEYPAIR: LazyLock<Keypair> =
    LazyLock::new(|| ENGINE.generate_keypair().expect("keygen"));

static GENUINE: LazyLock<Vec<u8>> = LazyLock::new(|| {
    ENGINE.encrypt(b"fuzzing the envelope", KEYPAIR.public_key()).expect("encrypt")
});

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    FlipBit { position: u32 },
    Truncate { len: u32 },
    Extend { tail: Vec<u8> },
}

fuzz_target!(|input: Input| {
    let mut bytes = GENUINE.clone();
    let untouched = match input {
        Input::Raw(raw) => {
            bytes = raw;
            bytes == *GENUINE
        },
        Input::FlipBit { position } => {
            let bit = position as usize % (bytes.len() * 8);
            bytes[bit / 8] ^= 1 << (bit % 8);
            false
        },
        Input::Truncate { len } => {
            bytes.truncate(len as usize % bytes.len());
            false
        },
        Input::Extend { tail } => {
            bytes.extend_from_slice(&tail);
            tail.is_empty()
        },
    };

    match ENGINE.decrypt(&bytes, KEYPAIR.private_key()) {
        Ok(plaintext) => {
            assert!(untouched, "tampered envelope decrypted");
            assert_eq!(plaintext, b"fuzzing the envelope");
        },
        Err(err) => {
            assert!(!untouched, "genuine envelope rejected");
            assert_eq!(err, CryptoError::Decryption);
        },
    }
});
