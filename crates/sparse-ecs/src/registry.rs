//! Registry - the container for entities, components and features.
//!
//! The registry owns entity slot allocation, one [`ComponentStorage`] per
//! component type (created the first time the type is written), and an
//! ordered list of [`Feature`]s whose systems receive posted events.
//!
//! # Iteration contract
//!
//! Component storages remove by swapping the last element into the hole, so
//! dense positions move on removal. Closures handed to `for_each_component`
//! and `for_joined_components` only get component references, which keeps
//! the registry borrowed for the whole walk. `for_each_entity` hands out a
//! mutable registry handle instead and fails with
//! [`Error::ConcurrentModification`] as soon as the live entity set changes
//! underneath it.

use std::{
    any::{Any, TypeId, type_name},
    fmt, ptr,
};

use tracing::{debug, trace_span, warn};

use crate::{
    component::{Component, ComponentId, ComponentRegistry},
    config::RegistryConfig,
    entity::{Entity, EntityAllocator},
    error::{Error, Result},
    event::{After, Before, Event},
    handle::{ComponentMut, ComponentRef, EntityMut, EntityRef},
    option::{Always, Predicate},
    prototype::Prototype,
    query::ComponentSet,
    storage::{AnyStorage, ComponentStorage},
    system::{Feature, FeatureTable, Handler},
};

/// Byte counts reported by [`Registry::memory_usage`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryUsage {
    /// Entity bookkeeping: live set, sparse index, free list.
    pub entities: usize,
    /// All component storages combined.
    pub components: usize,
}

/// Entity/component container with event dispatch.
pub struct Registry {
    config: RegistryConfig,
    entities: EntityAllocator,
    components: ComponentRegistry,
    /// Indexed by `ComponentId`; grows together with `components`.
    storages: Vec<Box<dyn AnyStorage>>,
    features: FeatureTable,
    /// Type names of the events currently being dispatched, outermost first.
    dispatch_stack: Vec<&'static str>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        let mut entities = EntityAllocator::with_limit(config.slot_limit());
        entities.reserve(config.entity_capacity);
        Self {
            config,
            entities,
            components: ComponentRegistry::new(),
            storages: Vec::new(),
            features: FeatureTable::default(),
            dispatch_stack: Vec::new(),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // ==================== Entity Operations ====================

    /// Create an empty entity, recycling a destroyed slot if one is free.
    pub fn create_entity(&mut self) -> Result<Entity> {
        self.entities.allocate()
    }

    /// Destroy an entity and all of its components.
    ///
    /// Returns `false` if the entity was already dead or stale.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.entities.is_alive(entity) {
            return false;
        }
        self.strip_components(entity);
        self.entities.deallocate(entity)
    }

    /// Check if an entity is alive.
    #[must_use]
    pub fn valid_entity(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Alias for [`Registry::valid_entity`].
    #[must_use]
    pub fn is_entity_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.alive_count()
    }

    /// Iterate live entities in unspecified order.
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter()
    }

    // ==================== Component Registration ====================

    /// Register a component type, creating its storage.
    pub fn register_component<T: Component>(&mut self) -> ComponentId {
        let id = self.components.register::<T>();
        if id.index() == self.storages.len() {
            if let Some(info) = self.components.get_info(id) {
                debug!(name = info.name(), "created component storage");
                self.storages
                    .push(Box::new(ComponentStorage::<T>::new(info.clone())));
            }
        }
        id
    }

    /// Register a component type and allow [`Registry::clone_entity`] to copy it.
    pub fn register_cloneable<T: Component + Clone>(&mut self) -> ComponentId {
        let id = self.register_component::<T>();
        self.storage_or_create::<T>().set_clone_fn(T::clone);
        id
    }

    /// Tag of a component type, if it has been used.
    #[must_use]
    pub fn component_id<T: Component>(&self) -> Option<ComponentId> {
        self.components.get_id::<T>()
    }

    /// Registered component types.
    #[must_use]
    pub fn components(&self) -> &ComponentRegistry {
        &self.components
    }

    /// Typed storage for `T`, if the type has been used.
    #[must_use]
    pub fn storage<T: Component>(&self) -> Option<&ComponentStorage<T>> {
        let id = self.components.get_id::<T>()?;
        self.storage_by_id(id)
    }

    fn storage_mut<T: Component>(&mut self) -> Option<&mut ComponentStorage<T>> {
        let id = self.components.get_id::<T>()?;
        self.storage_by_id_mut(id)
    }

    fn storage_by_id<T: Component>(&self, id: ComponentId) -> Option<&ComponentStorage<T>> {
        self.storages.get(id.index())?.as_any().downcast_ref()
    }

    fn storage_by_id_mut<T: Component>(
        &mut self,
        id: ComponentId,
    ) -> Option<&mut ComponentStorage<T>> {
        self.storages.get_mut(id.index())?.as_any_mut().downcast_mut()
    }

    fn storage_or_create<T: Component>(&mut self) -> &mut ComponentStorage<T> {
        let id = self.register_component::<T>();
        let Some(storage) = self.storages[id.index()]
            .as_any_mut()
            .downcast_mut::<ComponentStorage<T>>()
        else {
            unreachable!("storage for {} has the wrong type", type_name::<T>());
        };
        storage
    }

    /// Typed storage for `T` reached through a raw registry pointer.
    ///
    /// # Safety
    ///
    /// `registry` must point to a live registry that is not mutably borrowed
    /// elsewhere for `'a`, except through other storages or other entities'
    /// components. No other reference to `T`'s storage may be used while the
    /// returned one is alive.
    pub(crate) unsafe fn storage_raw<'a, T: Component>(
        registry: *mut Registry,
    ) -> Option<&'a mut ComponentStorage<T>> {
        // SAFETY: per the contract above; `storages` elements are separate
        // heap allocations, so distinct `T`s never alias.
        unsafe {
            let components = &(*registry).components;
            let id = components.get_id::<T>()?;
            let storages = &mut (*registry).storages;
            storages
                .get_mut(id.index())?
                .as_any_mut()
                .downcast_mut::<ComponentStorage<T>>()
        }
    }

    // ==================== Component Operations ====================

    /// Construct or overwrite a component.
    ///
    /// Returns `None` if the entity is dead.
    pub fn assign_component<T: Component>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        if !self.valid_entity(entity) {
            return None;
        }
        self.storage_or_create::<T>().assign(entity, value).ok()
    }

    /// Existing component, or assign `value` if absent. Never overwrites.
    pub fn ensure_component<T: Component>(&mut self, entity: Entity, value: T) -> Option<&mut T> {
        self.ensure_component_with(entity, || value)
    }

    /// Existing component, or assign `f()` if absent.
    pub fn ensure_component_with<T: Component>(
        &mut self,
        entity: Entity,
        f: impl FnOnce() -> T,
    ) -> Option<&mut T> {
        if !self.valid_entity(entity) {
            return None;
        }
        self.storage_or_create::<T>().ensure_with(entity, f).ok()
    }

    /// Remove a component. Returns whether it existed.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> bool {
        self.take_component::<T>(entity).is_some()
    }

    /// Remove a component and return it.
    pub fn take_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        if !self.valid_entity(entity) {
            return None;
        }
        self.storage_mut::<T>()?.take(entity)
    }

    /// Check if an entity has a component.
    #[must_use]
    pub fn exists_component<T: Component>(&self, entity: Entity) -> bool {
        self.find_component::<T>(entity).is_some()
    }

    /// Component of an entity, if present.
    #[must_use]
    pub fn find_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        if !self.valid_entity(entity) {
            return None;
        }
        self.storage::<T>()?.find(entity)
    }

    /// Mutable component of an entity, if present.
    pub fn find_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        if !self.valid_entity(entity) {
            return None;
        }
        self.storage_mut::<T>()?.find_mut(entity)
    }

    /// Component of an entity, failing with [`Error::ComponentNotFound`].
    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T> {
        self.find_component::<T>(entity)
            .ok_or_else(|| not_found::<T>(entity))
    }

    /// Mutable component of an entity, failing with [`Error::ComponentNotFound`].
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        self.find_component_mut::<T>(entity)
            .ok_or_else(|| not_found::<T>(entity))
    }

    /// Several components at once; fails if any is missing.
    pub fn get_components<C: ComponentSet>(&self, entity: Entity) -> Result<C::Refs<'_>> {
        C::get(self, entity)
    }

    /// Several components at once, each `None` if missing.
    #[must_use]
    pub fn find_components<C: ComponentSet>(&self, entity: Entity) -> C::Found<'_> {
        C::find(self, entity)
    }

    /// Several mutable components at once; fails if any is missing.
    ///
    /// # Panics
    ///
    /// Panics if `C` lists a type twice.
    pub fn get_components_mut<C: ComponentSet>(&mut self, entity: Entity) -> Result<C::RefsMut<'_>> {
        C::get_mut(self, entity)
    }

    /// Several mutable components at once, each `None` if missing.
    ///
    /// # Panics
    ///
    /// Panics if `C` lists a type twice.
    pub fn find_components_mut<C: ComponentSet>(&mut self, entity: Entity) -> C::FoundMut<'_> {
        C::find_mut(self, entity)
    }

    /// Remove every component of an entity, returning how many were removed.
    pub fn remove_all_components(&mut self, entity: Entity) -> usize {
        if !self.valid_entity(entity) {
            return 0;
        }
        self.strip_components(entity)
    }

    /// Remove every component of type `T`, returning how many were removed.
    pub fn remove_all_components_of<T: Component>(&mut self) -> usize {
        self.storage_mut::<T>()
            .map_or(0, AnyStorage::clear)
    }

    /// Number of entities holding a `T`.
    #[must_use]
    pub fn component_count<T: Component>(&self) -> usize {
        self.storage::<T>().map_or(0, ComponentStorage::len)
    }

    /// Number of components held by an entity.
    #[must_use]
    pub fn entity_component_count(&self, entity: Entity) -> usize {
        if !self.valid_entity(entity) {
            return 0;
        }
        self.storages
            .iter()
            .filter(|storage| storage.exists(entity))
            .count()
    }

    fn strip_components(&mut self, entity: Entity) -> usize {
        self.storages
            .iter_mut()
            .map(|storage| usize::from(storage.remove(entity)))
            .sum()
    }

    // ==================== Iteration ====================

    /// Visit every live entity with a mutable handle.
    ///
    /// Creating or destroying entities from `f` aborts the walk with
    /// [`Error::ConcurrentModification`].
    pub fn for_each_entity<F>(&mut self, f: F) -> Result<()>
    where
        F: FnMut(EntityMut<'_>),
    {
        self.for_each_entity_filtered(Always, f)
    }

    /// Visit every live entity matching `predicate`.
    pub fn for_each_entity_filtered<P, F>(&mut self, predicate: P, mut f: F) -> Result<()>
    where
        P: Predicate,
        F: FnMut(EntityMut<'_>),
    {
        let mut position = 0;
        while let Some(entity) = self.entities.get(position) {
            let expected = self.entities.revision();
            if predicate.matches(self, entity) {
                f(EntityMut::new(self, entity));
            }
            let found = self.entities.revision();
            if found != expected {
                return Err(Error::ConcurrentModification { expected, found });
            }
            position += 1;
        }
        Ok(())
    }

    /// Visit every `T` in storage order.
    pub fn for_each_component<T, F>(&mut self, f: F)
    where
        T: Component,
        F: FnMut(Entity, &mut T),
    {
        self.for_each_component_filtered(Always, f);
    }

    /// Visit every `T` whose owner matches `predicate`.
    pub fn for_each_component_filtered<T, P, F>(&mut self, predicate: P, mut f: F)
    where
        T: Component,
        P: Predicate,
        F: FnMut(Entity, &mut T),
    {
        let Some(id) = self.components.get_id::<T>() else {
            return;
        };
        let mut position = 0;
        while let Some(owner) = self
            .storage_by_id::<T>(id)
            .and_then(|storage| storage.entity_at(position))
        {
            if predicate.matches(self, owner)
                && let Some(value) = self
                    .storage_by_id_mut::<T>(id)
                    .and_then(|storage| storage.value_at_mut(position))
            {
                f(owner, value);
            }
            position += 1;
        }
    }

    /// Visit every live entity that has all of `C`.
    ///
    /// Scans the live set and checks each storage per entity. References
    /// handed to `f` live for one call only:
    ///
    /// ```compile_fail
    /// # use sparse_ecs::Registry;
    /// struct Health(u32);
    ///
    /// let mut registry = Registry::new();
    /// let e = registry.create_entity().unwrap();
    /// registry.assign_component(e, Health(10));
    ///
    /// let mut kept = Vec::new();
    /// registry.for_joined_components::<(Health,), _>(|_, (health,)| kept.push(health));
    /// kept[0].0 = 0;
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `C` lists a type twice.
    pub fn for_joined_components<C, F>(&mut self, f: F)
    where
        C: ComponentSet,
        F: for<'a> FnMut(Entity, C::RefsMut<'a>),
    {
        self.for_joined_components_filtered::<C, Always, F>(Always, f);
    }

    /// Visit every live entity that has all of `C` and matches `predicate`.
    ///
    /// # Panics
    ///
    /// Panics if `C` lists a type twice.
    pub fn for_joined_components_filtered<C, P, F>(&mut self, predicate: P, mut f: F)
    where
        C: ComponentSet,
        P: Predicate,
        F: for<'a> FnMut(Entity, C::RefsMut<'a>),
    {
        C::assert_disjoint();
        let matched: Vec<Entity> = self
            .entities
            .iter()
            .filter(|&entity| C::exists_all(self, entity) && predicate.matches(self, entity))
            .collect();

        let registry = ptr::from_mut(self);
        for entity in matched {
            // SAFETY: `self` is exclusively borrowed for the whole walk, the
            // types in `C` are distinct, and `f` cannot keep the references
            // past its own call, so no two live references alias.
            if let Some(refs) = unsafe { C::fetch_raw(registry, entity) } {
                f(entity, refs);
            }
        }
    }

    /// Iterate `(entity, refs)` for every live entity that has all of `C`.
    pub fn join<C: ComponentSet>(&self) -> impl Iterator<Item = (Entity, C::Refs<'_>)> + '_ {
        self.entities
            .iter()
            .filter_map(move |entity| C::fetch(self, entity).map(|refs| (entity, refs)))
    }

    /// Iterate every `T` with its owner.
    pub fn iter_components<T: Component>(&self) -> impl Iterator<Item = (Entity, &T)> + '_ {
        self.storage::<T>().into_iter().flat_map(ComponentStorage::iter)
    }

    // ==================== Prototypes & Cloning ====================

    /// Create an entity and stamp `prototype` onto it.
    pub fn create_entity_from(&mut self, prototype: &Prototype) -> Result<Entity> {
        let entity = self.create_entity()?;
        prototype.apply_to(self, entity);
        Ok(entity)
    }

    /// Stamp `prototype` onto an existing entity. Returns `false` if it is dead.
    pub fn apply_prototype(&mut self, entity: Entity, prototype: &Prototype) -> bool {
        prototype.apply_to(self, entity)
    }

    /// Create a new entity carrying copies of every component of `source`.
    ///
    /// Every type held by `source` must have been registered with
    /// [`Registry::register_cloneable`]. Nothing is created on failure.
    pub fn clone_entity(&mut self, source: Entity) -> Result<Entity> {
        if !self.valid_entity(source) {
            return Err(Error::InvalidHandle(source));
        }
        if let Some(storage) = self
            .storages
            .iter()
            .find(|storage| storage.exists(source) && !storage.is_cloneable())
        {
            return Err(Error::NotCloneable {
                component: storage.info().name(),
            });
        }

        let target = self.create_entity()?;
        for storage in &mut self.storages {
            storage.clone_component(source, target)?;
        }
        Ok(target)
    }

    // ==================== Handles ====================

    /// Read-only handle to an entity.
    #[must_use]
    pub fn wrap_entity(&self, entity: Entity) -> EntityRef<'_> {
        EntityRef::new(self, entity)
    }

    /// Mutable handle to an entity.
    pub fn wrap_entity_mut(&mut self, entity: Entity) -> EntityMut<'_> {
        EntityMut::new(self, entity)
    }

    /// Read-only handle to one component of an entity.
    #[must_use]
    pub fn wrap_component<T: Component>(&self, entity: Entity) -> ComponentRef<'_, T> {
        ComponentRef::new(self, entity)
    }

    /// Mutable handle to one component of an entity.
    pub fn wrap_component_mut<T: Component>(&mut self, entity: Entity) -> ComponentMut<'_, T> {
        ComponentMut::new(self, entity)
    }

    // ==================== Memory ====================

    /// Bytes held by entity bookkeeping and component storages.
    #[must_use]
    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            entities: self.entities.memory_usage(),
            components: self.storages.iter().map(|s| s.memory_usage()).sum(),
        }
    }

    /// Bytes held by the storage of `T`.
    #[must_use]
    pub fn component_memory_usage<T: Component>(&self) -> usize {
        self.storage::<T>()
            .map_or(0, AnyStorage::memory_usage)
    }

    // ==================== Features ====================

    /// Create a feature, replacing any existing one with the same name.
    pub fn assign_feature(&mut self, name: impl Into<String>) -> &mut Feature {
        self.features.assign(Feature::new(name))
    }

    /// Insert a prepared feature, replacing any existing one with the same name.
    pub fn insert_feature(&mut self, feature: Feature) -> &mut Feature {
        self.features.assign(feature)
    }

    /// Existing feature, or create an empty one.
    pub fn ensure_feature(&mut self, name: &str) -> &mut Feature {
        self.features.ensure(name)
    }

    /// Check if a feature exists.
    #[must_use]
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.get(name).is_some()
    }

    /// Feature by name.
    #[must_use]
    pub fn get_feature(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    /// Mutable feature by name.
    pub fn get_feature_mut(&mut self, name: &str) -> Option<&mut Feature> {
        self.features.get_mut(name)
    }

    /// Remove a feature.
    pub fn remove_feature(&mut self, name: &str) -> Option<Feature> {
        self.features.remove(name)
    }

    /// Features in registration order.
    pub fn features(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.features.iter()
    }

    // ==================== Events ====================

    /// Post an event to every enabled system.
    ///
    /// Visits the enabled features in registration order. Within each
    /// feature, systems for [`Before<E>`] run first, then those for `E`, then
    /// those for [`After<E>`]. Systems may post further events;
    /// those are dispatched to completion before control returns. The first
    /// system error aborts the remaining dispatch and is returned as is.
    pub fn process_event<E: Event>(&mut self, event: E) -> Result<()> {
        let name = type_name::<E>();
        let depth = self.dispatch_stack.len();
        let limit = self.config.max_dispatch_depth;
        if depth >= limit {
            warn!(limit, event = name, "event dispatch depth limit reached");
            return Err(Error::DispatchDepthExceeded { limit, event: name });
        }

        let span = trace_span!("process_event", event = name, depth);
        let _enter = span.enter();

        self.dispatch_stack.push(name);
        let result = self.dispatch_phases(event);
        self.dispatch_stack.pop();
        result
    }

    /// Events currently being dispatched, outermost first.
    #[must_use]
    pub fn dispatch_stack(&self) -> &[&'static str] {
        &self.dispatch_stack
    }

    fn dispatch_phases<E: Event>(&mut self, mut event: E) -> Result<()> {
        let features = self.features.phases_for(
            TypeId::of::<Before<E>>(),
            TypeId::of::<E>(),
            TypeId::of::<After<E>>(),
        );
        for phases in features {
            let before = Before::new(event);
            self.run_handlers(&phases.before, &before)?;
            event = before.event;

            self.run_handlers(&phases.event, &event)?;

            let after = After::new(event);
            self.run_handlers(&phases.after, &after)?;
            event = after.event;
        }
        Ok(())
    }

    fn run_handlers(&mut self, handlers: &[Handler], event: &dyn Any) -> Result<()> {
        for handler in handlers {
            handler(self, event)?;
        }
        Ok(())
    }
}

fn not_found<T>(entity: Entity) -> Error {
    Error::ComponentNotFound {
        entity,
        component: type_name::<T>(),
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("entities", &self.entities.alive_count())
            .field("components", &self.components.len())
            .field("features", &self.features.len())
            .finish()
    }
}
