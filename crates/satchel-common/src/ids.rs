//! ID types for item definitions and item instances.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an item type in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemTypeId(u32);

impl ItemTypeId {
    /// Creates an item type ID from a raw value.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ItemTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "item#{}", self.0)
    }
}

/// Identifier of one physical item unit held by the player.
///
/// Live ids are six-digit numbers in `MIN..=MAX`. The raw value `0` is
/// reserved for "no instance" and is what empty slots and unbound quick
/// slots carry.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct InstanceId(u32);

impl InstanceId {
    /// Smallest id the allocator hands out.
    pub const MIN: u32 = 100_000;

    /// Largest id the allocator hands out.
    pub const MAX: u32 = 999_999;

    /// Null/invalid instance ID.
    pub const NONE: Self = Self(0);

    /// Creates an instance ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u32) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Checks if this is the null id.
    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Checks if this id lies in the allocatable range.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::MIN && self.0 <= Self::MAX
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}
