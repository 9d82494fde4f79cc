//! Error types for inventory operations.

use satchel_common::InstanceId;
use thiserror::Error;

use crate::item::{EquipSocket, ItemKind};
use crate::quick_slots::Direction;

/// Broad failure class of an [`InventoryError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// No room for an item; prior state is unchanged.
    CapacityExceeded,
    /// A slot index, instance, binding or name that does not resolve.
    InvalidReference,
    /// The operation is not allowed for this item or empty target.
    PolicyViolation,
    /// The instance id pool ran dry.
    AllocationExhausted,
}

/// Inventory error types.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InventoryError {
    /// Inventory full
    #[error("Inventory full: capacity {capacity}")]
    Full {
        /// Inventory capacity
        capacity: usize,
    },
    /// Slot index outside the store
    #[error("Slot index {index} out of range (capacity {capacity})")]
    SlotOutOfRange {
        /// Requested index
        index: usize,
        /// Inventory capacity
        capacity: usize,
    },
    /// Slot holds nothing
    #[error("Slot {0} is empty")]
    EmptySlot(usize),
    /// Socket holds nothing
    #[error("Socket {0} is empty")]
    EmptySocket(EquipSocket),
    /// Instance id not present in the store
    #[error("Instance {0} is not in the inventory")]
    UnknownInstance(InstanceId),
    /// Item kind not present in the store
    #[error("'{0}' is not in the inventory")]
    NotHeld(String),
    /// Quick slot has no binding
    #[error("Quick slot {0} is not bound")]
    Unbound(Direction),
    /// Quick slot points at an instance that no longer exists
    #[error("Quick slot {direction} points at vanished instance {instance}")]
    StaleBinding {
        /// Direction of the binding
        direction: Direction,
        /// Instance it referenced
        instance: InstanceId,
    },
    /// Every held instance of the item is already bound
    #[error("No unbound instance of '{0}' available")]
    NoUnboundInstance(String),
    /// Item is the wrong kind for the operation
    #[error("'{item}' is not {expected:?}")]
    WrongKind {
        /// Item name
        item: String,
        /// Kind the operation requires
        expected: ItemKind,
    },
    /// Item may not be discarded
    #[error("'{0}' is quest-protected")]
    QuestProtected(String),
    /// Id pool exhausted
    #[error("Instance id pool exhausted after {attempts} attempts")]
    AllocationExhausted {
        /// Draws attempted
        attempts: u32,
    },
}

impl InventoryError {
    /// Returns the failure class.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Full { .. } => ErrorCategory::CapacityExceeded,
            Self::SlotOutOfRange { .. }
            | Self::UnknownInstance(_)
            | Self::NotHeld(_)
            | Self::Unbound(_)
            | Self::StaleBinding { .. }
            | Self::NoUnboundInstance(_) => ErrorCategory::InvalidReference,
            Self::EmptySlot(_)
            | Self::EmptySocket(_)
            | Self::WrongKind { .. }
            | Self::QuestProtected(_) => ErrorCategory::PolicyViolation,
            Self::AllocationExhausted { .. } => ErrorCategory::AllocationExhausted,
        }
    }
}

/// Result type for inventory operations.
pub type InventoryResult<T> = Result<T, InventoryError>;
