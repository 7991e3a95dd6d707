//! Fuzz target for envelope parsing
//!
//! # Strategy
//!
//! - Raw bytes: completely arbitrary input
//! - Lying headers: valid version byte with a wrapped-key length that does
//!   not match the remaining bytes
//!
//! # Invariants
//!
//! - `Envelope::parse` NEVER panics
//! - Anything that parses re-encodes to the exact input bytes
//! - Associated data is always a prefix of the encoding

#![no_main]

use arbitrary::Arbitrary;
use cipherpost_crypto::Envelope;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Clone, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    LyingHeader { claimed_len: u16, body: Vec<u8> },
}

fuzz_target!(|input: Input| {
    let bytes = match input {
        Input::Raw(bytes) => bytes,
        Input::LyingHeader { claimed_len, body } => {
            let mut bytes = vec![1];
            bytes.extend_from_slice(&claimed_len.to_be_bytes());
            bytes.extend_from_slice(&body);
            bytes
        },
    };

    if let Ok(envelope) = Envelope::parse(&bytes) {
        let encoded = envelope.encode();
        assert_eq!(encoded, bytes, "parse/encode changed the bytes");
        assert_eq!(envelope.encoded_len(), bytes.len());
        assert!(encoded.starts_with(&envelope.associated_data()));
    }
});
