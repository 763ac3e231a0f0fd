//! Deterministic identifiers for UI-schema nodes.

use std::sync::atomic::{AtomicU64, Ordering};

use sha2::{Digest, Sha256};

/// Length of every generated identifier.
pub const UID_LEN: usize = 11;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Produces 11-character `[0-9a-z]` identifiers derived from a seed, a scope
/// label and a per-generator counter.
///
/// Two generators with the same seed yield the same sequence; the counter
/// keeps identifiers unique within one generator.
#[derive(Debug)]
pub struct UidGenerator {
    seed: String,
    counter: AtomicU64,
}

impl UidGenerator {
    /// Generator for `seed`, counter starting at zero.
    #[must_use]
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Seed this generator was built with.
    #[must_use]
    pub fn seed(&self) -> &str {
        &self.seed
    }

    /// Next identifier for `scope` (for example `row`, `col`, `grid`).
    #[must_use]
    pub fn next(&self, scope: &str) -> String {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        let digest = Sha256::new()
            .chain_update(self.seed.as_bytes())
            .chain_update(b"|")
            .chain_update(scope.as_bytes())
            .chain_update(b"|")
            .chain_update(counter.to_le_bytes())
            .finalize();
        digest
            .iter()
            .take(UID_LEN)
            .map(|byte| char::from(ALPHABET[usize::from(*byte) % ALPHABET.len()]))
            .collect()
    }
}
