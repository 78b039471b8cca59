//! Entity references.

use std::fmt;

/// An opaque entity reference. A [`CapabilitySet`](crate::CapabilitySet)
/// held by the [`Container`](crate::Container) is what the entity exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(pub(crate) u64);

impl Entity {
    /// Rebuild a reference from an id printed earlier, e.g. one typed into
    /// the console. Nothing checks that the entity is live.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Issues ids from 1 upward. Ids are never reused.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    pub fn allocate(&mut self) -> Entity {
        let entity = Entity(self.next_id);
        self.next_id += 1;
        entity
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_start_at_one() {
        let mut alloc = EntityAllocator::new();
        let ids: Vec<u64> = (0..3).map(|_| alloc.allocate().id()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_raw_round_trip_and_display() {
        let entity = Entity::from_raw(42);
        assert_eq!(entity.id(), 42);
        assert_eq!(entity, Entity(42));
        assert_eq!(entity.to_string(), "Entity(42)");
    }
}
