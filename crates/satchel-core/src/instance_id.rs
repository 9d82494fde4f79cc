//! Allocation of process-unique item instance ids.

use ahash::AHashSet;
use satchel_common::InstanceId;
use tracing::{error, warn};

use crate::error::{InventoryError, InventoryResult};

/// Random draws attempted before giving up.
pub const MAX_ALLOCATION_ATTEMPTS: u32 = 1000;

/// Hands out random six-digit instance ids and tracks which are live.
#[derive(Debug)]
pub struct InstanceIdAllocator {
    live: AHashSet<InstanceId>,
    rng: fastrand::Rng,
}

impl Default for InstanceIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceIdAllocator {
    /// Creates an allocator seeded from the OS.
    #[must_use]
    pub fn new() -> Self {
        Self {
            live: AHashSet::new(),
            rng: fastrand::Rng::new(),
        }
    }

    /// Creates an allocator with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            live: AHashSet::new(),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    /// Draws a fresh id not currently live.
    pub fn allocate(&mut self) -> InventoryResult<InstanceId> {
        for _ in 0..MAX_ALLOCATION_ATTEMPTS {
            let id = InstanceId::from_raw(self.rng.u32(InstanceId::MIN..=InstanceId::MAX));
            if self.live.insert(id) {
                return Ok(id);
            }
        }
        error!(
            "Instance id pool exhausted with {} live ids; ids are leaking",
            self.live.len()
        );
        Err(InventoryError::AllocationExhausted {
            attempts: MAX_ALLOCATION_ATTEMPTS,
        })
    }

    /// Marks a specific id live. Returns false if it is out of range or taken.
    pub fn reserve(&mut self, id: InstanceId) -> bool {
        if !id.is_valid() {
            warn!("Refusing to reserve out-of-range instance id {}", id.raw());
            return false;
        }
        self.live.insert(id)
    }

    /// Returns an id to the pool. Releasing an id that is not live is a no-op.
    pub fn release(&mut self, id: InstanceId) {
        self.live.remove(&id);
    }

    /// Checks whether an id is currently live.
    #[must_use]
    pub fn is_live(&self, id: InstanceId) -> bool {
        self.live.contains(&id)
    }

    /// Number of live ids.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// Forgets every live id.
    pub fn clear(&mut self) {
        self.live.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_in_range_and_unique() {
        let mut ids = InstanceIdAllocator::with_seed(7);
        let mut seen = AHashSet::new();
        for _ in 0..500 {
            let id = ids.allocate().unwrap();
            assert!(id.is_valid());
            assert!(seen.insert(id));
        }
        assert_eq!(ids.live_count(), 500);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut ids = InstanceIdAllocator::with_seed(1);
        let id = ids.allocate().unwrap();
        ids.release(id);
        ids.release(id);
        ids.release(InstanceId::from_raw(123_456));
        assert!(!ids.is_live(id));
        assert_eq!(ids.live_count(), 0);
    }

    #[test]
    fn test_reserve_rejects_duplicates_and_out_of_range() {
        let mut ids = InstanceIdAllocator::new();
        assert!(ids.reserve(InstanceId::from_raw(111_111)));
        assert!(!ids.reserve(InstanceId::from_raw(111_111)));
        assert!(!ids.reserve(InstanceId::NONE));
        assert!(!ids.reserve(InstanceId::from_raw(1_000_000)));
        assert_eq!(ids.live_count(), 1);
    }

    #[test]
    fn test_exhaustion_is_reported() {
        let mut ids = InstanceIdAllocator::with_seed(3);
        for raw in InstanceId::MIN..=InstanceId::MAX {
            ids.reserve(InstanceId::from_raw(raw));
        }
        assert_eq!(
            ids.allocate(),
            Err(InventoryError::AllocationExhausted {
                attempts: MAX_ALLOCATION_ATTEMPTS
            })
        );
    }
}
