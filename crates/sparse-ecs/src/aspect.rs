//! Aspects: reusable component-type lists.
//!
//! An [`Aspect<C>`] names a fixed set of component types and matches the
//! entities holding all of them. It doubles as a predicate and scopes
//! iteration to its own type list.

use std::{fmt, marker::PhantomData};

use crate::{
    entity::Entity,
    error::Result,
    handle::EntityMut,
    option::{And, ExistsAll, Predicate},
    query::ComponentSet,
    registry::Registry,
};

/// Entities holding every component type in `C`.
pub struct Aspect<C>(PhantomData<fn() -> C>);

impl<C: ComponentSet> Aspect<C> {
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }

    /// Whether `entity` has every type in `C`.
    #[must_use]
    pub fn match_entity(&self, registry: &Registry, entity: Entity) -> bool {
        C::exists_all(registry, entity)
    }

    /// The aspect as a composable predicate.
    #[must_use]
    pub const fn to_option(&self) -> ExistsAll<C> {
        ExistsAll::new()
    }

    /// Visit every matching entity.
    pub fn for_each_entity<F>(&self, registry: &mut Registry, f: F) -> Result<()>
    where
        F: FnMut(EntityMut<'_>),
    {
        registry.for_each_entity_filtered(self.to_option(), f)
    }

    /// Visit every matching entity that also satisfies `predicate`.
    pub fn for_each_entity_filtered<P, F>(
        &self,
        registry: &mut Registry,
        predicate: P,
        f: F,
    ) -> Result<()>
    where
        P: Predicate,
        F: FnMut(EntityMut<'_>),
    {
        registry.for_each_entity_filtered(And(self.to_option(), predicate), f)
    }

    /// Visit the components of every matching entity.
    pub fn for_joined_components<F>(&self, registry: &mut Registry, f: F)
    where
        F: for<'a> FnMut(Entity, C::RefsMut<'a>),
    {
        registry.for_joined_components::<C, F>(f);
    }

    /// Visit the components of every matching entity satisfying `predicate`.
    pub fn for_joined_components_filtered<P, F>(
        &self,
        registry: &mut Registry,
        predicate: P,
        f: F,
    ) where
        P: Predicate,
        F: for<'a> FnMut(Entity, C::RefsMut<'a>),
    {
        registry.for_joined_components_filtered::<C, P, F>(predicate, f);
    }
}

impl<C: ComponentSet> Predicate for Aspect<C> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        self.match_entity(registry, entity)
    }
}

impl<C> Clone for Aspect<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Aspect<C> {}

impl<C: ComponentSet> Default for Aspect<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for Aspect<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Aspect<{}>", std::any::type_name::<C>())
    }
}
