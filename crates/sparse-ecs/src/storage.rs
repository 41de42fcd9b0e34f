//! Per-type component storage.
//!
//! A [`ComponentStorage<T>`] is a sparse map from entity identifier to `T`.
//! The registry owns one per component type behind the [`AnyStorage`]
//! capability trait and downcasts through its own typed accessors.

use std::any::Any;

use crate::{
    component::{Component, ComponentInfo},
    entity::{Entity, EntityId, EntityIndexer},
    error::{Error, Result},
    sparse::SparseMap,
};

/// Dense storage for every instance of one component type.
pub struct ComponentStorage<T> {
    components: SparseMap<EntityId, T, EntityIndexer>,
    clone_fn: Option<fn(&T) -> T>,
    info: ComponentInfo,
}

impl<T: Component> ComponentStorage<T> {
    /// Create an empty storage.
    #[must_use]
    pub fn new(info: ComponentInfo) -> Self {
        Self {
            components: SparseMap::with_indexer(EntityIndexer),
            clone_fn: None,
            info,
        }
    }

    /// Component type information.
    #[must_use]
    pub fn info(&self) -> &ComponentInfo {
        &self.info
    }

    /// Enable entity cloning for this type.
    pub fn set_clone_fn(&mut self, clone_fn: fn(&T) -> T) {
        self.clone_fn = Some(clone_fn);
    }

    /// Construct or overwrite the component of `entity`.
    pub fn assign(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        match self.components.find_index(&entity.id()) {
            Some(slot) => {
                let stored = &mut self.components.values_mut()[slot];
                *stored = value;
                Ok(stored)
            }
            None => self.components.get_or_insert_with(entity.id(), || value),
        }
    }

    /// Existing component of `entity`, or construct it with `f`.
    pub fn ensure_with(&mut self, entity: Entity, f: impl FnOnce() -> T) -> Result<&mut T> {
        self.components.get_or_insert_with(entity.id(), f)
    }

    /// Remove the component of `entity`. Returns whether it existed.
    pub fn remove(&mut self, entity: Entity) -> bool {
        self.components.unordered_erase(&entity.id())
    }

    /// Remove and return the component of `entity`.
    pub fn take(&mut self, entity: Entity) -> Option<T> {
        self.components.take(&entity.id())
    }

    /// Check if `entity` has this component.
    #[must_use]
    pub fn exists(&self, entity: Entity) -> bool {
        self.components.has(&entity.id())
    }

    /// Component of `entity`, if present.
    #[must_use]
    pub fn find(&self, entity: Entity) -> Option<&T> {
        self.components.find(&entity.id())
    }

    /// Mutable component of `entity`, if present.
    pub fn find_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.components.find_mut(&entity.id())
    }

    /// Component of `entity`, failing with [`Error::ComponentNotFound`].
    pub fn get(&self, entity: Entity) -> Result<&T> {
        let name = self.info.name();
        self.find(entity).ok_or(Error::ComponentNotFound {
            entity,
            component: name,
        })
    }

    /// Mutable component of `entity`, failing with [`Error::ComponentNotFound`].
    pub fn get_mut(&mut self, entity: Entity) -> Result<&mut T> {
        let name = self.info.name();
        self.find_mut(entity).ok_or(Error::ComponentNotFound {
            entity,
            component: name,
        })
    }

    /// Number of stored components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Check if the storage is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Owner of the component at a dense position.
    #[must_use]
    pub fn entity_at(&self, position: usize) -> Option<Entity> {
        self.components.keys().get(position).copied().map(Entity::from_id)
    }

    /// Mutable component at a dense position.
    pub fn value_at_mut(&mut self, position: usize) -> Option<&mut T> {
        self.components.values_mut().get_mut(position)
    }

    /// Iterate `(owner, component)` in dense order.
    ///
    /// Order is unspecified and changes after removals.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.components
            .iter()
            .map(|(&id, value)| (Entity::from_id(id), value))
    }

    /// Iterate `(owner, mutable component)` in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> + '_ {
        self.components
            .iter_mut()
            .map(|(&id, value)| (Entity::from_id(id), value))
    }

    /// Structural revision counter.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.components.revision()
    }
}

/// Type-erased capabilities of a component storage.
pub trait AnyStorage: Send + Sync + 'static {
    /// Component type information.
    fn info(&self) -> &ComponentInfo;

    /// Remove the component of `entity`. Returns whether it existed.
    fn remove(&mut self, entity: Entity) -> bool;

    /// Check if `entity` has this component.
    fn exists(&self, entity: Entity) -> bool;

    /// Number of stored components.
    fn len(&self) -> usize;

    /// Remove every component, returning how many were removed.
    fn clear(&mut self) -> usize;

    /// Whether entity cloning is enabled for this type.
    fn is_cloneable(&self) -> bool;

    /// Copy the component of `from` onto `to`.
    ///
    /// Returns `Ok(false)` if `from` has no such component.
    fn clone_component(&mut self, from: Entity, to: Entity) -> Result<bool>;

    /// Bytes held by the storage.
    fn memory_usage(&self) -> usize;

    /// Owners in dense order.
    fn owners(&self) -> &[EntityId];

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> AnyStorage for ComponentStorage<T> {
    fn info(&self) -> &ComponentInfo {
        &self.info
    }

    fn remove(&mut self, entity: Entity) -> bool {
        Self::remove(self, entity)
    }

    fn exists(&self, entity: Entity) -> bool {
        Self::exists(self, entity)
    }

    fn len(&self) -> usize {
        self.components.len()
    }

    fn clear(&mut self) -> usize {
        let removed = self.components.len();
        self.components.clear();
        removed
    }

    fn is_cloneable(&self) -> bool {
        self.clone_fn.is_some()
    }

    fn clone_component(&mut self, from: Entity, to: Entity) -> Result<bool> {
        let Some(source) = self.components.find(&from.id()) else {
            return Ok(false);
        };
        let Some(clone_fn) = self.clone_fn else {
            return Err(Error::NotCloneable {
                component: self.info.name(),
            });
        };
        let copy = clone_fn(source);
        self.components.insert_or_assign(to.id(), copy)?;
        Ok(true)
    }

    fn memory_usage(&self) -> usize {
        self.components.memory_usage()
    }

    fn owners(&self) -> &[EntityId] {
        self.components.keys()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentId;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);

    fn storage() -> ComponentStorage<Health> {
        ComponentStorage::new(ComponentInfo::of::<Health>(ComponentId::from_raw(0)))
    }

    #[test]
    fn test_assign_overwrites() {
        let mut s = storage();
        let e = Entity::new(4, 0);

        assert_eq!(s.assign(e, Health(10)).unwrap(), &Health(10));
        s.assign(e, Health(20)).unwrap().0 += 1;
        assert_eq!(s.get(e).unwrap(), &Health(21));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_ensure_never_overwrites() {
        let mut s = storage();
        let e = Entity::new(1, 0);

        s.ensure_with(e, || Health(5)).unwrap();
        s.ensure_with(e, || Health(99)).unwrap();
        assert_eq!(s.find(e), Some(&Health(5)));
    }

    #[test]
    fn test_remove_and_get_missing() {
        let mut s = storage();
        let e = Entity::new(2, 0);
        s.assign(e, Health(1)).unwrap();

        assert!(s.remove(e));
        assert!(!s.remove(e));
        assert!(!s.exists(e));
        assert!(matches!(
            s.get(e),
            Err(Error::ComponentNotFound { entity, .. }) if entity == e
        ));
    }

    #[test]
    fn test_stale_version_is_absent() {
        let mut s = storage();
        s.assign(Entity::new(7, 0), Health(1)).unwrap();

        assert!(s.exists(Entity::new(7, 0)));
        assert!(!s.exists(Entity::new(7, 1)));
    }

    #[test]
    fn test_clone_component_requires_clone_fn() {
        let mut s = storage();
        let a = Entity::new(0, 0);
        let b = Entity::new(1, 0);
        s.assign(a, Health(3)).unwrap();

        assert!(matches!(
            s.clone_component(a, b),
            Err(Error::NotCloneable { .. })
        ));
        assert!(!s.clone_component(b, a).unwrap());

        s.set_clone_fn(Health::clone);
        assert!(s.clone_component(a, b).unwrap());
        assert_eq!(s.find(b), Some(&Health(3)));
    }

    #[test]
    fn test_erased_clear_reports_count() {
        let mut s = storage();
        for i in 0..3 {
            s.assign(Entity::new(i, 0), Health(i)).unwrap();
        }

        let erased: &mut dyn AnyStorage = &mut s;
        assert_eq!(erased.owners().len(), 3);
        assert_eq!(erased.clear(), 3);
        assert_eq!(erased.len(), 0);
        assert!(erased.as_any().downcast_ref::<ComponentStorage<Health>>().is_some());
    }

    #[test]
    fn test_iter_mut_visits_all() {
        let mut s = storage();
        for i in 0..4 {
            s.assign(Entity::new(i, 0), Health(i)).unwrap();
        }
        for (e, h) in s.iter_mut() {
            h.0 += e.index() * 10;
        }
        let total: u32 = s.iter().map(|(_, h)| h.0).sum();
        assert_eq!(total, (0 + 1 + 2 + 3) * 11);
    }
}
