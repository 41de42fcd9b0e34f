//! Registry shared between threads behind one lock.
//!
//! Every operation takes the same mutex for its whole duration, so access is
//! fully serialized. Suitable for incidental access from background threads,
//! not for parallel iteration.

use std::{fmt, sync::Arc};

use parking_lot::{Mutex, MutexGuard};

use crate::{
    component::Component,
    config::RegistryConfig,
    entity::Entity,
    error::Result,
    event::Event,
    registry::Registry,
};

/// Cloneable handle to a mutex-guarded [`Registry`].
#[derive(Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    /// Create a shared registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::from(Registry::with_config(config))
    }

    /// Lock the registry for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock()
    }

    /// Run `f` with the registry locked.
    pub fn with<R>(&self, f: impl FnOnce(&mut Registry) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn create_entity(&self) -> Result<Entity> {
        self.inner.lock().create_entity()
    }

    pub fn destroy_entity(&self, entity: Entity) -> bool {
        self.inner.lock().destroy_entity(entity)
    }

    pub fn valid_entity(&self, entity: Entity) -> bool {
        self.inner.lock().valid_entity(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.inner.lock().entity_count()
    }

    /// Assign a component. Returns `false` if the entity is dead.
    pub fn assign_component<T: Component>(&self, entity: Entity, value: T) -> bool {
        self.inner.lock().assign_component(entity, value).is_some()
    }

    pub fn remove_component<T: Component>(&self, entity: Entity) -> bool {
        self.inner.lock().remove_component::<T>(entity)
    }

    pub fn exists_component<T: Component>(&self, entity: Entity) -> bool {
        self.inner.lock().exists_component::<T>(entity)
    }

    /// Copy of a component, if present.
    pub fn find_component<T: Component + Clone>(&self, entity: Entity) -> Option<T> {
        self.inner.lock().find_component::<T>(entity).cloned()
    }

    /// Copy of a component, failing with `ComponentNotFound`.
    pub fn get_component<T: Component + Clone>(&self, entity: Entity) -> Result<T> {
        self.inner.lock().get_component::<T>(entity).cloned()
    }

    /// Post an event while holding the lock for the whole dispatch.
    pub fn process_event<E: Event>(&self, event: E) -> Result<()> {
        self.inner.lock().process_event(event)
    }

    /// Take the registry back if this is the last handle.
    pub fn try_unwrap(self) -> Result<Registry, Self> {
        Arc::try_unwrap(self.inner)
            .map(Mutex::into_inner)
            .map_err(|inner| Self { inner })
    }
}

impl fmt::Debug for SharedRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(registry) => f.debug_tuple("SharedRegistry").field(&*registry).finish(),
            None => f.write_str("SharedRegistry(<locked>)"),
        }
    }
}

impl From<Registry> for SharedRegistry {
    fn from(registry: Registry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }
}
