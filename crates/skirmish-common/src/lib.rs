//! # Skirmish Common
//!
//! Common types shared by the Skirmish combat crates.
//!
//! This crate provides:
//! - Entity handles (`EntityId`), the non-owning references used for targets and owners
//! - Tag and faction sets used by perception and area filters
//! - Schema versions for save-hook snapshots
//! - The snapshot error type

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod ids;
pub mod tags;
pub mod version;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::*;
    pub use crate::ids::*;
    pub use crate::tags::*;
    pub use crate::version::*;
}

pub use prelude::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_generation() {
        let id1 = EntityId::new();
        let id2 = EntityId::new();
        assert_ne!(id1, id2);
        assert!(id1.is_valid());
        assert!(!EntityId::NULL.is_valid());
    }

    #[test]
    fn test_version_compatibility() {
        let v1 = SchemaVersion::new(1, 0, 0);
        let v2 = SchemaVersion::new(1, 1, 0);
        let v3 = SchemaVersion::new(2, 0, 0);

        assert!(v1.can_read(&v2));
        assert!(v2.can_read(&v1));
        assert!(!v1.can_read(&v3));
    }

    #[test]
    fn test_tag_set_membership() {
        let set = TagSet::of(&[Tag::Monster, Tag::Turret]);
        assert!(set.contains(Tag::Monster));
        assert!(!set.contains(Tag::Player));
        assert!(set.intersects(TagSet::single(Tag::Turret)));
    }
}
