//! Composable predicates over component presence.
//!
//! Predicates are zero-sized (or small) values combined with `&`, `|` and
//! `!`:
//!
//! ```ignore
//! let moving = exists::<Position>() & exists::<Velocity>() & !exists::<Frozen>();
//! registry.for_each_entity_filtered(moving, |e| { /* ... */ })?;
//! ```
//!
//! Closures `Fn(&Registry, Entity) -> bool` are predicates too, but do not
//! get the operator overloads.

use std::{
    fmt,
    marker::PhantomData,
    ops::{BitAnd, BitOr, Not as NotOp},
};

use crate::{component::Component, entity::Entity, query::ComponentSet, registry::Registry};

/// A boolean test over one entity.
pub trait Predicate {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool;
}

impl<F> Predicate for F
where
    F: Fn(&Registry, Entity) -> bool,
{
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        self(registry, entity)
    }
}

/// Matches every entity.
#[derive(Debug, Clone, Copy, Default)]
pub struct Always;

impl Predicate for Always {
    fn matches(&self, _: &Registry, _: Entity) -> bool {
        true
    }
}

macro_rules! marker_predicate {
    ($(#[$meta:meta])* $name:ident<$param:ident>) => {
        $(#[$meta])*
        pub struct $name<$param>(PhantomData<fn() -> $param>);

        impl<$param> $name<$param> {
            #[must_use]
            pub const fn new() -> Self {
                Self(PhantomData)
            }
        }

        impl<$param> Clone for $name<$param> {
            fn clone(&self) -> Self {
                *self
            }
        }

        impl<$param> Copy for $name<$param> {}

        impl<$param> Default for $name<$param> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<$param> fmt::Debug for $name<$param> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}<{}>", stringify!($name), std::any::type_name::<$param>())
            }
        }
    };
}

marker_predicate!(
    /// Entity has component `T`.
    Exists<T>
);
marker_predicate!(
    /// Entity has at least one component of `C`. Never matches for `()`.
    ExistsAny<C>
);
marker_predicate!(
    /// Entity has every component of `C`. Always matches for `()`.
    ExistsAll<C>
);

impl<T: Component> Predicate for Exists<T> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        registry.exists_component::<T>(entity)
    }
}

impl<C: ComponentSet> Predicate for ExistsAny<C> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        C::exists_any(registry, entity)
    }
}

impl<C: ComponentSet> Predicate for ExistsAll<C> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        C::exists_all(registry, entity)
    }
}

/// Both predicates match.
#[derive(Debug, Clone, Copy, Default)]
pub struct And<A, B>(pub A, pub B);

/// Either predicate matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Or<A, B>(pub A, pub B);

/// The predicate does not match.
#[derive(Debug, Clone, Copy, Default)]
pub struct Not<P>(pub P);

impl<A: Predicate, B: Predicate> Predicate for And<A, B> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        self.0.matches(registry, entity) && self.1.matches(registry, entity)
    }
}

impl<A: Predicate, B: Predicate> Predicate for Or<A, B> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        self.0.matches(registry, entity) || self.1.matches(registry, entity)
    }
}

impl<P: Predicate> Predicate for Not<P> {
    fn matches(&self, registry: &Registry, entity: Entity) -> bool {
        !self.0.matches(registry, entity)
    }
}

macro_rules! predicate_ops {
    ($name:ident<$($param:ident),*>) => {
        impl<$($param,)* Rhs> BitAnd<Rhs> for $name<$($param),*> {
            type Output = And<Self, Rhs>;

            fn bitand(self, rhs: Rhs) -> Self::Output {
                And(self, rhs)
            }
        }

        impl<$($param,)* Rhs> BitOr<Rhs> for $name<$($param),*> {
            type Output = Or<Self, Rhs>;

            fn bitor(self, rhs: Rhs) -> Self::Output {
                Or(self, rhs)
            }
        }

        impl<$($param),*> NotOp for $name<$($param),*> {
            type Output = Not<Self>;

            fn not(self) -> Self::Output {
                Not(self)
            }
        }
    };
}

predicate_ops!(Always<>);
predicate_ops!(Exists<T>);
predicate_ops!(ExistsAny<C>);
predicate_ops!(ExistsAll<C>);
predicate_ops!(And<A, B>);
predicate_ops!(Or<A, B>);
predicate_ops!(Not<P>);

/// Entity has component `T`.
#[must_use]
pub const fn exists<T: Component>() -> Exists<T> {
    Exists::new()
}

/// Entity has at least one component of `C`.
#[must_use]
pub const fn exists_any<C: ComponentSet>() -> ExistsAny<C> {
    ExistsAny::new()
}

/// Entity has every component of `C`.
#[must_use]
pub const fn exists_all<C: ComponentSet>() -> ExistsAll<C> {
    ExistsAll::new()
}

/// Negate a predicate.
#[must_use]
pub const fn not<P: Predicate>(predicate: P) -> Not<P> {
    Not(predicate)
}
