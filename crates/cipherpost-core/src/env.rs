//! Environment abstraction for deterministic testing.
//!
//! Decouples the codex from system resources (wall clock, randomness). The
//! same environment value seeds the cipher engine and timestamps messages, so
//! a [`SimEnv`] makes a whole run reproducible.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use cipherpost_crypto::{Entropy, EntropyError, OsEntropy, SeededEntropy};

/// Randomness plus a wall clock.
///
/// # Invariants
///
/// - The [`Entropy`] half MUST be cryptographically secure in production
/// - `wall_clock_secs` is informational only (message timestamps); nothing
///   orders or authorizes on it
pub trait Environment: Entropy {
    /// Seconds since the Unix epoch.
    fn wall_clock_secs(&self) -> u64;
}

/// Production environment: OS randomness and system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    pub fn new() -> Self {
        Self
    }
}

impl Entropy for SystemEnv {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        OsEntropy.fill(buffer)
    }
}

impl Environment for SystemEnv {
    fn wall_clock_secs(&self) -> u64 {
        // A clock set before 1970 stamps messages with 0 rather than failing
        SystemTime::now().duration_since(UNIX_EPOCH).map_or(0, |elapsed| elapsed.as_secs())
    }
}

/// Simulation environment: seeded entropy and a manually driven clock.
///
/// Clones share both the entropy stream and the clock.
#[derive(Clone)]
pub struct SimEnv {
    entropy: SeededEntropy,
    clock_secs: Arc<AtomicU64>,
}

impl SimEnv {
    /// Clock starts at an arbitrary fixed instant (2024-01-01T00:00:00Z).
    pub const START_SECS: u64 = 1_704_067_200;

    /// Create an environment whose randomness is fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            entropy: SeededEntropy::new(seed),
            clock_secs: Arc::new(AtomicU64::new(Self::START_SECS)),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock_secs.fetch_add(by.as_secs(), Ordering::SeqCst);
    }

    /// Set the clock to an absolute value.
    pub fn set_wall_clock_secs(&self, secs: u64) {
        self.clock_secs.store(secs, Ordering::SeqCst);
    }
}

impl Entropy for SimEnv {
    fn fill(&self, buffer: &mut [u8]) -> Result<(), EntropyError> {
        self.entropy.fill(buffer)
    }
}

impl Environment for SimEnv {
    fn wall_clock_secs(&self) -> u64 {
        self.clock_secs.load(Ordering::SeqCst)
    }
}
