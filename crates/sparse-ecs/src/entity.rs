//! Entity identifiers with packed generational indices.
//!
//! An [`EntityId`] is a single `u32`: the low [`ENTITY_INDEX_BITS`] bits hold
//! the slot index, the remaining bits hold a version counter that advances
//! every time the slot is recycled. Stale handles keep their old version and
//! stop comparing equal to whatever now lives in the slot.

use std::fmt;

use tracing::{trace, warn};

use crate::{
    error::{Error, Result},
    sparse::{Indexer, SparseSet},
};

/// Raw packed entity identifier.
pub type EntityId = u32;

/// Number of low bits used for the slot index.
pub const ENTITY_INDEX_BITS: u32 = 22;

/// Mask selecting the slot index of an [`EntityId`].
pub const ENTITY_INDEX_MASK: u32 = (1 << ENTITY_INDEX_BITS) - 1;

/// Mask selecting the version once shifted down by [`ENTITY_INDEX_BITS`].
pub const ENTITY_VERSION_MASK: u32 = (1 << (32 - ENTITY_INDEX_BITS)) - 1;

/// Pack a slot index and version into one identifier.
#[must_use]
pub const fn join(index: u32, version: u32) -> EntityId {
    (index & ENTITY_INDEX_MASK) | ((version & ENTITY_VERSION_MASK) << ENTITY_INDEX_BITS)
}

/// Slot index of an identifier.
#[must_use]
pub const fn index_of(id: EntityId) -> u32 {
    id & ENTITY_INDEX_MASK
}

/// Version of an identifier.
#[must_use]
pub const fn version_of(id: EntityId) -> u32 {
    (id >> ENTITY_INDEX_BITS) & ENTITY_VERSION_MASK
}

/// Same slot, next version. Wraps to 0 past [`ENTITY_VERSION_MASK`].
#[must_use]
pub const fn upgrade(id: EntityId) -> EntityId {
    join(index_of(id), version_of(id) + 1)
}

/// A lightweight entity handle.
///
/// Carries no registry reference; see [`EntityRef`](crate::EntityRef) and
/// [`EntityMut`](crate::EntityMut) for handles bound to a registry.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity(EntityId);

impl Entity {
    /// Create an entity from a slot index and version.
    #[must_use]
    pub const fn new(index: u32, version: u32) -> Self {
        Self(join(index, version))
    }

    /// Wrap a raw packed identifier.
    #[must_use]
    pub const fn from_id(id: EntityId) -> Self {
        Self(id)
    }

    /// Raw packed identifier.
    #[must_use]
    pub const fn id(self) -> EntityId {
        self.0
    }

    /// Slot index.
    #[must_use]
    pub const fn index(self) -> u32 {
        index_of(self.0)
    }

    /// Generation counter.
    #[must_use]
    pub const fn version(self) -> u32 {
        version_of(self.0)
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({}v{})", self.index(), self.version())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index(), self.version())
    }
}

/// Projects an identifier onto its slot index.
///
/// Sparse containers keyed by this indexer store at most one identifier per
/// slot, and membership compares the full identifier, so a stale version is
/// never reported as present.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityIndexer;

impl Indexer<EntityId> for EntityIndexer {
    fn index_of(&self, value: &EntityId) -> usize {
        index_of(*value) as usize
    }

    fn domain(&self) -> usize {
        ENTITY_INDEX_MASK as usize + 1
    }
}

/// Allocator for entity slots with version tracking.
///
/// Fresh slots are handed out in increasing order; destroyed slots go to a
/// LIFO free list with their version already advanced.
pub struct EntityAllocator {
    /// Next never-used slot index.
    next_index: u32,
    /// Cap on `next_index`.
    max_entities: u32,
    /// Recycled identifiers, already upgraded.
    free_list: Vec<EntityId>,
    /// Identifiers currently alive.
    live: SparseSet<EntityId, EntityIndexer>,
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityAllocator {
    /// Create an allocator that may use every representable slot.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(ENTITY_INDEX_MASK)
    }

    /// Create an allocator handing out at most `max_entities` fresh slots.
    #[must_use]
    pub fn with_limit(max_entities: u32) -> Self {
        Self {
            next_index: 0,
            max_entities: max_entities.min(ENTITY_INDEX_MASK),
            free_list: Vec::new(),
            live: SparseSet::with_indexer(EntityIndexer),
        }
    }

    /// Reserve room for `capacity` live entities.
    pub fn reserve(&mut self, capacity: usize) {
        self.live.reserve(capacity);
    }

    /// Allocate an entity, recycling a free slot first.
    pub fn allocate(&mut self) -> Result<Entity> {
        if let Some(&id) = self.free_list.last() {
            self.live.insert(id)?;
            self.free_list.pop();
            let entity = Entity::from_id(id);
            trace!(%entity, "recycled entity slot");
            return Ok(entity);
        }

        if self.next_index >= self.max_entities {
            warn!(limit = self.max_entities, "entity slot space exhausted");
            return Err(Error::CapacityExceeded {
                limit: self.max_entities as usize,
            });
        }

        let id = join(self.next_index, 0);
        self.live.insert(id)?;
        self.next_index += 1;
        let entity = Entity::from_id(id);
        trace!(%entity, "allocated entity slot");
        Ok(entity)
    }

    /// Release an entity's slot.
    ///
    /// Returns `false` if the entity was not alive (already destroyed or stale).
    pub fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.live.unordered_erase(&entity.id()) {
            return false;
        }
        self.free_list.push(upgrade(entity.id()));
        trace!(%entity, "released entity slot");
        true
    }

    /// Check if an entity is currently alive (slot live and version matches).
    #[must_use]
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.live.has(&entity.id())
    }

    /// Number of currently alive entities.
    #[must_use]
    pub fn alive_count(&self) -> usize {
        self.live.len()
    }

    /// Number of slots ever handed out.
    #[must_use]
    pub fn slots_used(&self) -> u32 {
        self.next_index
    }

    /// The live entity at a dense position, used by cursors.
    #[must_use]
    pub fn get(&self, position: usize) -> Option<Entity> {
        self.live.as_slice().get(position).copied().map(Entity::from_id)
    }

    /// Iterate live entities in dense (unspecified) order.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.live.iter().copied().map(Entity::from_id)
    }

    /// Structural revision of the live set.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.live.revision()
    }

    /// Bytes held by the live set and the free list.
    #[must_use]
    pub fn memory_usage(&self) -> usize {
        self.live.memory_usage() + self.free_list.capacity() * size_of::<EntityId>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_round_trip() {
        for index in [0, 1, 42, ENTITY_INDEX_MASK] {
            for version in [0, 1, 500, ENTITY_VERSION_MASK] {
                let id = join(index, version);
                assert_eq!(index_of(id), index);
                assert_eq!(version_of(id), version);
            }
        }
    }

    #[test]
    fn test_upgrade_wraps() {
        assert_eq!(upgrade(join(0, 0)), join(0, 1));
        assert_eq!(upgrade(join(7, ENTITY_VERSION_MASK)), join(7, 0));
        assert_eq!(upgrade(join(ENTITY_INDEX_MASK, 3)), join(ENTITY_INDEX_MASK, 4));
    }

    #[test]
    fn test_entity_formatting() {
        let e = Entity::new(3, 1);
        assert_eq!(format!("{e:?}"), "Entity(3v1)");
        assert_eq!(e.to_string(), "3v1");
    }

    #[test]
    fn test_allocate_deallocate() {
        let mut alloc = EntityAllocator::new();

        let e1 = alloc.allocate().unwrap();
        let e2 = alloc.allocate().unwrap();

        assert_eq!(e1.index(), 0);
        assert_eq!(e2.index(), 1);
        assert!(alloc.is_alive(e1));
        assert!(alloc.is_alive(e2));
        assert_eq!(alloc.alive_count(), 2);

        assert!(alloc.deallocate(e1));
        assert!(!alloc.is_alive(e1));
        assert!(!alloc.deallocate(e1));
        assert_eq!(alloc.alive_count(), 1);

        // Reuses slot 0 with the next version
        let e3 = alloc.allocate().unwrap();
        assert_eq!(e3.index(), 0);
        assert_eq!(e3.version(), 1);
        assert!(alloc.is_alive(e3));
        assert!(!alloc.is_alive(e1));
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut alloc = EntityAllocator::new();
        let a = alloc.allocate().unwrap();
        let b = alloc.allocate().unwrap();
        alloc.deallocate(a);
        alloc.deallocate(b);

        assert_eq!(alloc.allocate().unwrap().index(), b.index());
        assert_eq!(alloc.allocate().unwrap().index(), a.index());
        assert_eq!(alloc.allocate().unwrap().index(), 2);
    }

    #[test]
    fn test_version_cycle_returns_to_start() {
        let mut alloc = EntityAllocator::new();
        let first = alloc.allocate().unwrap();
        let mut current = first;

        for step in 1..=ENTITY_VERSION_MASK + 1 {
            assert!(alloc.deallocate(current));
            current = alloc.allocate().unwrap();
            assert_eq!(current.index(), first.index());
            assert_eq!(current.version(), step & ENTITY_VERSION_MASK);
        }

        assert_eq!(current, first);
    }

    #[test]
    fn test_capacity_exceeded() {
        let mut alloc = EntityAllocator::with_limit(4);
        for _ in 0..4 {
            alloc.allocate().unwrap();
        }
        assert!(matches!(
            alloc.allocate(),
            Err(Error::CapacityExceeded { limit: 4 })
        ));
        assert_eq!(alloc.alive_count(), 4);

        // A freed slot is still reusable at the cap
        let victim = alloc.get(0).unwrap();
        alloc.deallocate(victim);
        let reused = alloc.allocate().unwrap();
        assert_eq!(reused.index(), victim.index());
    }

    #[test]
    fn test_revision_tracks_structure() {
        let mut alloc = EntityAllocator::new();
        let before = alloc.revision();
        let e = alloc.allocate().unwrap();
        assert!(alloc.revision() > before);

        let mid = alloc.revision();
        assert!(alloc.is_alive(e));
        assert_eq!(alloc.revision(), mid);
    }
}
