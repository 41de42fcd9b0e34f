//! Multi-component access over tuples of component types.
//!
//! [`ComponentSet`] is implemented for tuples of up to eight component
//! types (including the empty tuple). It backs `get_components`,
//! `find_components`, joined iteration, and the `ExistsAny`/`ExistsAll`
//! predicates.
//!
//! ```ignore
//! let (pos, vel) = registry.get_components::<(Position, Velocity)>(e)?;
//! let (pos, tag) = registry.find_components::<(Position, Tag)>(e);
//! ```

use std::{
    any::{TypeId, type_name},
    ptr,
};

use smallvec::{SmallVec, smallvec};

use crate::{
    component::Component,
    entity::Entity,
    error::{Error, Result},
    registry::Registry,
};

/// A fixed list of component types.
pub trait ComponentSet: 'static {
    /// Shared references, one per type.
    type Refs<'a>;
    /// Mutable references, one per type.
    type RefsMut<'a>;
    /// Optional shared references, one per type.
    type Found<'a>;
    /// Optional mutable references, one per type.
    type FoundMut<'a>;

    /// `TypeId`s of the listed types, in order.
    fn type_ids() -> SmallVec<[TypeId; 8]>;

    /// Whether `entity` has every listed type. True for the empty set.
    fn exists_all(registry: &Registry, entity: Entity) -> bool;

    /// Whether `entity` has at least one listed type. False for the empty set.
    fn exists_any(registry: &Registry, entity: Entity) -> bool;

    /// Name of the first listed type `entity` lacks.
    fn first_missing(registry: &Registry, entity: Entity) -> Option<&'static str>;

    /// All references, or `None` if any is missing.
    fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>>;

    /// Each reference resolved independently.
    fn find(registry: &Registry, entity: Entity) -> Self::Found<'_>;

    /// All references, failing on the first missing type.
    fn get(registry: &Registry, entity: Entity) -> Result<Self::Refs<'_>>;

    /// Each mutable reference resolved independently.
    ///
    /// # Safety
    ///
    /// `registry` must be valid for `'a` with no other live borrow of the
    /// listed storages' components of `entity`, and the listed types must be
    /// pairwise distinct.
    unsafe fn find_raw<'a>(registry: *mut Registry, entity: Entity) -> Self::FoundMut<'a>;

    /// All mutable references, or `None` if any is missing.
    ///
    /// # Safety
    ///
    /// Same as [`ComponentSet::find_raw`].
    unsafe fn fetch_raw<'a>(registry: *mut Registry, entity: Entity) -> Option<Self::RefsMut<'a>>;

    /// Panic if a type is listed twice.
    ///
    /// # Panics
    ///
    /// Panics when two listed types are the same, since handing out two
    /// mutable references to one component would alias.
    fn assert_disjoint() {
        let ids = Self::type_ids();
        for (i, id) in ids.iter().enumerate() {
            assert!(
                !ids[i + 1..].contains(id),
                "component type listed twice in mutable query: {}",
                type_name::<Self>()
            );
        }
    }

    /// Mutable variant of [`ComponentSet::find`].
    fn find_mut(registry: &mut Registry, entity: Entity) -> Self::FoundMut<'_> {
        Self::assert_disjoint();
        // SAFETY: types are distinct and `registry` is exclusively borrowed
        // for the returned lifetime.
        unsafe { Self::find_raw(ptr::from_mut(registry), entity) }
    }

    /// Mutable variant of [`ComponentSet::get`].
    fn get_mut(registry: &mut Registry, entity: Entity) -> Result<Self::RefsMut<'_>> {
        Self::assert_disjoint();
        if let Some(component) = Self::first_missing(registry, entity) {
            return Err(Error::ComponentNotFound { entity, component });
        }
        // SAFETY: as in `find_mut`; every type was just checked present.
        let refs = unsafe { Self::fetch_raw(ptr::from_mut(registry), entity) };
        refs.ok_or(Error::ComponentNotFound {
            entity,
            component: type_name::<Self>(),
        })
    }
}

macro_rules! impl_component_set {
    ($($name:ident),*) => {
        #[allow(unused_variables, clippy::unused_unit)]
        impl<$($name: Component),*> ComponentSet for ($($name,)*) {
            type Refs<'a> = ($(&'a $name,)*);
            type RefsMut<'a> = ($(&'a mut $name,)*);
            type Found<'a> = ($(Option<&'a $name>,)*);
            type FoundMut<'a> = ($(Option<&'a mut $name>,)*);

            fn type_ids() -> SmallVec<[TypeId; 8]> {
                smallvec![$(TypeId::of::<$name>()),*]
            }

            fn exists_all(registry: &Registry, entity: Entity) -> bool {
                true $(&& registry.exists_component::<$name>(entity))*
            }

            fn exists_any(registry: &Registry, entity: Entity) -> bool {
                false $(|| registry.exists_component::<$name>(entity))*
            }

            fn first_missing(registry: &Registry, entity: Entity) -> Option<&'static str> {
                $(
                    if !registry.exists_component::<$name>(entity) {
                        return Some(type_name::<$name>());
                    }
                )*
                None
            }

            fn fetch(registry: &Registry, entity: Entity) -> Option<Self::Refs<'_>> {
                Some(($(registry.find_component::<$name>(entity)?,)*))
            }

            fn find(registry: &Registry, entity: Entity) -> Self::Found<'_> {
                ($(registry.find_component::<$name>(entity),)*)
            }

            fn get(registry: &Registry, entity: Entity) -> Result<Self::Refs<'_>> {
                Ok(($(registry.get_component::<$name>(entity)?,)*))
            }

            unsafe fn find_raw<'a>(registry: *mut Registry, entity: Entity) -> Self::FoundMut<'a> {
                ($(
                    // SAFETY: forwarded from the caller.
                    unsafe { Registry::storage_raw::<$name>(registry) }
                        .and_then(|storage| storage.find_mut(entity)),
                )*)
            }

            unsafe fn fetch_raw<'a>(registry: *mut Registry, entity: Entity) -> Option<Self::RefsMut<'a>> {
                Some(($(
                    // SAFETY: forwarded from the caller.
                    unsafe { Registry::storage_raw::<$name>(registry) }?
                        .find_mut(entity)?,
                )*))
            }
        }
    };
}

impl_component_set!();
impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);
impl_component_set!(A, B, C, D, E, F, G);
impl_component_set!(A, B, C, D, E, F, G, H);
