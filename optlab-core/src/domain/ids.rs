//! Trade identifiers and the allocators that hand them out.
//!
//! Trade ids are 5-digit integers. The engine takes an [`IdAllocator`] so
//! tests get reproducible ids ([`SequentialIds`]) while several engines in one
//! process can share a collision-checked registry ([`SharedIdRegistry`]).

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, OnceLock};
use thiserror::Error;

/// Smallest valid trade id.
pub const MIN_TRADE_ID: u32 = 10_000;
/// Largest valid trade id.
pub const MAX_TRADE_ID: u32 = 99_999;

/// Unique identity of a position within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradeId(pub u32);

impl fmt::Display for TradeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("trade id space {MIN_TRADE_ID}..={MAX_TRADE_ID} exhausted")]
    Exhausted,
}

/// Source of unique trade ids.
pub trait IdAllocator: Send {
    fn allocate(&mut self) -> Result<TradeId, IdError>;
}

/// Monotonically increasing ids starting at [`MIN_TRADE_ID`].
#[derive(Debug, Clone)]
pub struct SequentialIds {
    next: u32,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self { next: MIN_TRADE_ID }
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdAllocator for SequentialIds {
    fn allocate(&mut self) -> Result<TradeId, IdError> {
        if self.next > MAX_TRADE_ID {
            return Err(IdError::Exhausted);
        }
        let id = TradeId(self.next);
        self.next += 1;
        Ok(id)
    }
}

/// Random 5-digit ids checked against a registry shared by every clone.
///
/// Clones share the same set of issued ids, so handing a clone to each
/// engine in a process guarantees no id is ever issued twice.
#[derive(Debug, Clone)]
pub struct SharedIdRegistry {
    issued: Arc<Mutex<HashSet<u32>>>,
    rng: StdRng,
}

impl SharedIdRegistry {
    pub fn new(seed: u64) -> Self {
        Self {
            issued: Arc::new(Mutex::new(HashSet::new())),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Process-wide registry. Each call returns a handle onto the same id set
    /// with its own entropy-seeded generator.
    pub fn global() -> Self {
        static ISSUED: OnceLock<Arc<Mutex<HashSet<u32>>>> = OnceLock::new();
        let issued = ISSUED
            .get_or_init(|| Arc::new(Mutex::new(HashSet::new())))
            .clone();
        Self { issued, rng: StdRng::from_entropy() }
    }

    /// Handle onto the same registry with an independent generator.
    pub fn handle(&self, seed: u64) -> Self {
        Self { issued: Arc::clone(&self.issued), rng: StdRng::seed_from_u64(seed) }
    }

    pub fn issued_count(&self) -> usize {
        self.issued.lock().map(|set| set.len()).unwrap_or_default()
    }
}

impl IdAllocator for SharedIdRegistry {
    fn allocate(&mut self) -> Result<TradeId, IdError> {
        // A poisoned lock still holds a consistent set; keep using it.
        let mut issued = match self.issued.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let capacity = (MAX_TRADE_ID - MIN_TRADE_ID + 1) as usize;
        if issued.len() >= capacity {
            return Err(IdError::Exhausted);
        }
        loop {
            let candidate = self.rng.gen_range(MIN_TRADE_ID..=MAX_TRADE_ID);
            if issued.insert(candidate) {
                return Ok(TradeId(candidate));
            }
        }
    }
}
