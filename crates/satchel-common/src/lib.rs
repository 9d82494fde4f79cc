//! # Satchel Common
//!
//! Common types shared by the Satchel inventory crates.
//!
//! This crate provides:
//! - ID types (`ItemTypeId`, `InstanceId`)
//! - Version information for persisted schemas
//! - Save/load error types
//! - Prelude for convenient imports

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instance_id_range() {
        assert!(!InstanceId::NONE.is_valid());
        assert!(InstanceId::from_raw(InstanceId::MIN).is_valid());
        assert!(InstanceId::from_raw(InstanceId::MAX).is_valid());
        assert!(!InstanceId::from_raw(InstanceId::MAX + 1).is_valid());
        assert!(!InstanceId::from_raw(42).is_valid());
    }

    #[test]
    fn test_version_can_read() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v1.can_read(&v2));
        assert!(v2.can_read(&v1));
        assert!(!v1.can_read(&v3));
    }
}
