//! Entity and component handles bound to a registry.
//!
//! Handles own no data: they pair a registry borrow with an identifier and
//! forward every call. Two handles are equal when they point at the same
//! registry and carry the same identifier; mutable and read-only handles
//! compare with each other.

use std::{fmt, marker::PhantomData, ptr};

use crate::{
    component::Component,
    entity::Entity,
    error::Result,
    option::Predicate,
    query::ComponentSet,
    registry::Registry,
};

// ==================== Entity handles ====================

/// Read-only entity handle.
#[derive(Clone, Copy)]
pub struct EntityRef<'r> {
    registry: &'r Registry,
    entity: Entity,
}

impl<'r> EntityRef<'r> {
    #[must_use]
    pub fn new(registry: &'r Registry, entity: Entity) -> Self {
        Self { registry, entity }
    }

    /// The wrapped identifier.
    #[must_use]
    pub fn id(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Check if the entity is alive.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.registry.valid_entity(self.entity)
    }

    #[must_use]
    pub fn exists_component<T: Component>(&self) -> bool {
        self.registry.exists_component::<T>(self.entity)
    }

    #[must_use]
    pub fn find_component<T: Component>(&self) -> Option<&'r T> {
        self.registry.find_component::<T>(self.entity)
    }

    pub fn get_component<T: Component>(&self) -> Result<&'r T> {
        self.registry.get_component::<T>(self.entity)
    }

    #[must_use]
    pub fn find_components<C: ComponentSet>(&self) -> C::Found<'r> {
        self.registry.find_components::<C>(self.entity)
    }

    pub fn get_components<C: ComponentSet>(&self) -> Result<C::Refs<'r>> {
        self.registry.get_components::<C>(self.entity)
    }

    /// Number of components held.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry.entity_component_count(self.entity)
    }

    /// Evaluate a predicate against this entity.
    #[must_use]
    pub fn matches<P: Predicate>(&self, predicate: &P) -> bool {
        predicate.matches(self.registry, self.entity)
    }

    /// Handle to one component of this entity.
    #[must_use]
    pub fn component<T: Component>(&self) -> ComponentRef<'r, T> {
        ComponentRef::new(self.registry, self.entity)
    }
}

/// Mutable entity handle.
pub struct EntityMut<'r> {
    registry: &'r mut Registry,
    entity: Entity,
}

impl<'r> EntityMut<'r> {
    pub fn new(registry: &'r mut Registry, entity: Entity) -> Self {
        Self { registry, entity }
    }

    /// The wrapped identifier.
    #[must_use]
    pub fn id(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        self.registry
    }

    /// Read-only view of this handle.
    #[must_use]
    pub fn as_ref(&self) -> EntityRef<'_> {
        EntityRef::new(self.registry, self.entity)
    }

    /// Check if the entity is alive.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.registry.valid_entity(self.entity)
    }

    #[must_use]
    pub fn exists_component<T: Component>(&self) -> bool {
        self.registry.exists_component::<T>(self.entity)
    }

    #[must_use]
    pub fn find_component<T: Component>(&self) -> Option<&T> {
        self.registry.find_component::<T>(self.entity)
    }

    pub fn find_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.registry.find_component_mut::<T>(self.entity)
    }

    pub fn get_component<T: Component>(&self) -> Result<&T> {
        self.registry.get_component::<T>(self.entity)
    }

    pub fn get_component_mut<T: Component>(&mut self) -> Result<&mut T> {
        self.registry.get_component_mut::<T>(self.entity)
    }

    pub fn get_components_mut<C: ComponentSet>(&mut self) -> Result<C::RefsMut<'_>> {
        self.registry.get_components_mut::<C>(self.entity)
    }

    pub fn assign_component<T: Component>(&mut self, value: T) -> Option<&mut T> {
        self.registry.assign_component(self.entity, value)
    }

    pub fn ensure_component<T: Component>(&mut self, value: T) -> Option<&mut T> {
        self.registry.ensure_component(self.entity, value)
    }

    pub fn remove_component<T: Component>(&mut self) -> bool {
        self.registry.remove_component::<T>(self.entity)
    }

    pub fn remove_all_components(&mut self) -> usize {
        self.registry.remove_all_components(self.entity)
    }

    /// Number of components held.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.registry.entity_component_count(self.entity)
    }

    /// Destroy the entity. Returns `false` if it was already dead.
    pub fn destroy(self) -> bool {
        self.registry.destroy_entity(self.entity)
    }

    /// Clone the entity with all of its components.
    pub fn clone_entity(&mut self) -> Result<Entity> {
        self.registry.clone_entity(self.entity)
    }

    /// Handle to one component of this entity.
    pub fn component_mut<T: Component>(&mut self) -> ComponentMut<'_, T> {
        ComponentMut::new(self.registry, self.entity)
    }
}

impl PartialEq for EntityRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.registry, other.registry) && self.entity == other.entity
    }
}

impl Eq for EntityRef<'_> {}

impl PartialEq for EntityMut<'_> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(&*self.registry, &*other.registry) && self.entity == other.entity
    }
}

impl Eq for EntityMut<'_> {}

impl PartialEq<EntityRef<'_>> for EntityMut<'_> {
    fn eq(&self, other: &EntityRef<'_>) -> bool {
        ptr::eq(&*self.registry, other.registry) && self.entity == other.entity
    }
}

impl PartialEq<EntityMut<'_>> for EntityRef<'_> {
    fn eq(&self, other: &EntityMut<'_>) -> bool {
        other == self
    }
}

impl<'r> From<EntityMut<'r>> for EntityRef<'r> {
    fn from(handle: EntityMut<'r>) -> Self {
        EntityRef::new(handle.registry, handle.entity)
    }
}

impl fmt::Debug for EntityRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityRef({})", self.entity)
    }
}

impl fmt::Debug for EntityMut<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityMut({})", self.entity)
    }
}

// ==================== Component handles ====================

/// Read-only handle to one component type of one entity.
pub struct ComponentRef<'r, T> {
    registry: &'r Registry,
    owner: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Component> ComponentRef<'r, T> {
    #[must_use]
    pub fn new(registry: &'r Registry, owner: Entity) -> Self {
        Self {
            registry,
            owner,
            _marker: PhantomData,
        }
    }

    /// The owning entity.
    #[must_use]
    pub fn owner(&self) -> EntityRef<'r> {
        EntityRef::new(self.registry, self.owner)
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.registry.exists_component::<T>(self.owner)
    }

    #[must_use]
    pub fn find(&self) -> Option<&'r T> {
        self.registry.find_component::<T>(self.owner)
    }

    pub fn get(&self) -> Result<&'r T> {
        self.registry.get_component::<T>(self.owner)
    }
}

impl<T> Clone for ComponentRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ComponentRef<'_, T> {}

/// Mutable handle to one component type of one entity.
pub struct ComponentMut<'r, T> {
    registry: &'r mut Registry,
    owner: Entity,
    _marker: PhantomData<fn() -> T>,
}

impl<'r, T: Component> ComponentMut<'r, T> {
    pub fn new(registry: &'r mut Registry, owner: Entity) -> Self {
        Self {
            registry,
            owner,
            _marker: PhantomData,
        }
    }

    /// The owning entity.
    #[must_use]
    pub fn owner(&self) -> EntityRef<'_> {
        EntityRef::new(self.registry, self.owner)
    }

    /// The owning entity, mutably.
    pub fn owner_mut(&mut self) -> EntityMut<'_> {
        EntityMut::new(self.registry, self.owner)
    }

    /// Read-only view of this handle.
    #[must_use]
    pub fn as_ref(&self) -> ComponentRef<'_, T> {
        ComponentRef::new(self.registry, self.owner)
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.registry.exists_component::<T>(self.owner)
    }

    #[must_use]
    pub fn find(&self) -> Option<&T> {
        self.registry.find_component::<T>(self.owner)
    }

    pub fn find_mut(&mut self) -> Option<&mut T> {
        self.registry.find_component_mut::<T>(self.owner)
    }

    pub fn get(&self) -> Result<&T> {
        self.registry.get_component::<T>(self.owner)
    }

    pub fn get_mut(&mut self) -> Result<&mut T> {
        self.registry.get_component_mut::<T>(self.owner)
    }

    pub fn assign(&mut self, value: T) -> Option<&mut T> {
        self.registry.assign_component(self.owner, value)
    }

    pub fn ensure(&mut self, value: T) -> Option<&mut T> {
        self.registry.ensure_component(self.owner, value)
    }

    pub fn remove(&mut self) -> bool {
        self.registry.remove_component::<T>(self.owner)
    }
}

impl<T> PartialEq for ComponentRef<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.registry, other.registry) && self.owner == other.owner
    }
}

impl<T> Eq for ComponentRef<'_, T> {}

impl<T> PartialEq for ComponentMut<'_, T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(&*self.registry, &*other.registry) && self.owner == other.owner
    }
}

impl<T> PartialEq<ComponentRef<'_, T>> for ComponentMut<'_, T> {
    fn eq(&self, other: &ComponentRef<'_, T>) -> bool {
        ptr::eq(&*self.registry, other.registry) && self.owner == other.owner
    }
}

impl<T> PartialEq<ComponentMut<'_, T>> for ComponentRef<'_, T> {
    fn eq(&self, other: &ComponentMut<'_, T>) -> bool {
        other == self
    }
}

impl<T> fmt::Debug for ComponentRef<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentRef<{}>({})", std::any::type_name::<T>(), self.owner)
    }
}

impl<T> fmt::Debug for ComponentMut<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentMut<{}>({})", std::any::type_name::<T>(), self.owner)
    }
}
