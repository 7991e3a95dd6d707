//! Randomness sources.
//!
//! The engine never reaches for ambient randomness. Callers hand it an
//! [`Entropy`] implementation: [`OsEntropy`] in production, [`SeededEntropy`]
//! wherever reproducible output is wanted.
//!
//! Each cryptographic operation draws a single 32-byte seed from the source
//! and expands it with ChaCha20, so a source is touched exactly once per
//! call.

#![allow(clippy::disallowed_types, reason = "Locking simple RNG state")]

use std::sync::{Arc, Mutex};

use rand_chacha::{
    ChaCha20Rng,
    rand_core::{RngCore, SeedableRng},
};
use thiserror::Error;
use zeroize::Zeroizing;

/// Size of the seed drawn from the entropy source per operation.
const SEED_SIZE: usize = 32;

/// The random source could not be read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("entropy source unavailable: {reason}")]
pub struct EntropyError {
    /// Reason reported by the source
    pub reason: String,
}

/// Source of cryptographically secure random bytes.
///
/// # Invariants
///
/// - Production implementations MUST be cryptographically secure
/// - `fill` either fills the whole buffer or returns an error
pub trait Entropy: Clone + Send + Sync + 'static {
    /// Fill `buffer` with random bytes.
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError>;
}

/// Operating system randomness via getrandom (e.g., `getrandom(2)` on Linux,
/// `BCryptGenRandom` on Windows).
///
/// Failure is reported instead of panicking so registration can surface it as
/// a retryable key generation error.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        getrandom::fill(buffer).map_err(|e| EntropyError { reason: e.to_string() })
    }
}

/// Deterministic entropy from a fixed seed.
///
/// Successive calls return different bytes, but the whole sequence is a
/// function of the seed. Clones share the same stream. Intended for tests and
/// simulation only.
#[derive(Clone)]
pub struct SeededEntropy {
    rng: Arc<Mutex<ChaCha20Rng>>,
}

impl SeededEntropy {
    /// Create a source whose output is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self { rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))) }
    }
}

impl Entropy for SeededEntropy {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| EntropyError { reason: "seeded rng mutex poisoned".to_string() })?;
        rng.fill_bytes(buffer);
        Ok(())
    }
}

/// Draw one seed from `entropy` and expand it into a ChaCha20 stream.
pub(crate) fn seeded_rng<E: Entropy>(entropy: &E) -> Result<ChaCha20Rng, EntropyError> {
    let mut seed = Zeroizing::new([0u8; SEED_SIZE]);
    entropy.fill(&mut seed[..])?;
    Ok(ChaCha20Rng::from_seed(*seed))
}
