// Raw storage access for multi-component borrows
#![allow(unsafe_code)]
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::should_implement_trait)]
#![allow(clippy::type_complexity)]

//! Sparse ECS - sparse-set entity/component registry
//!
//! Components live in one sparse-set storage per type, keyed by entity
//! slot. Every lookup is O(1) and each type's components sit densely packed
//! for iteration.
//!
//! # Key Concepts
//!
//! - **Entity**: a packed `u32` of slot index and version; destroyed slots
//!   are recycled with the next version, so stale handles stop resolving
//! - **Component**: any `Send + Sync + 'static` value attached to an entity
//! - **Prototype**: a reusable set of component recipes
//! - **Predicate / Aspect**: boolean filters over component presence,
//!   composed with `&`, `|` and `!`
//! - **Feature / System**: named groups of event handlers, dispatched by
//!   [`Registry::process_event`]
//!
//! # Example
//!
//! ```
//! use sparse_ecs::prelude::*;
//!
//! #[derive(Debug, Clone, Copy)]
//! struct Position { x: f32, y: f32 }
//! #[derive(Debug, Clone, Copy)]
//! struct Velocity { x: f32, y: f32 }
//!
//! let mut registry = Registry::new();
//! let e = registry.create_entity().unwrap();
//! registry.assign_component(e, Position { x: 0.0, y: 0.0 });
//! registry.assign_component(e, Velocity { x: 1.0, y: 2.0 });
//!
//! registry.for_joined_components::<(Position, Velocity), _>(|_, (pos, vel)| {
//!     pos.x += vel.x;
//!     pos.y += vel.y;
//! });
//!
//! assert_eq!(registry.get_component::<Position>(e).unwrap().y, 2.0);
//! ```

mod aspect;
mod component;
mod config;
mod entity;
mod error;
mod event;
mod handle;
mod option;
mod prototype;
mod query;
mod registry;
mod sparse;
mod storage;
mod sync;
mod system;

pub use aspect::Aspect;
pub use component::{Component, ComponentId, ComponentInfo, ComponentRegistry};
pub use config::RegistryConfig;
pub use entity::{
    ENTITY_INDEX_BITS, ENTITY_INDEX_MASK, ENTITY_VERSION_MASK, Entity, EntityAllocator, EntityId,
    EntityIndexer, index_of, join, upgrade, version_of,
};
pub use error::{BoxedError, Error, Result};
pub use event::{After, Before, Event};
pub use handle::{ComponentMut, ComponentRef, EntityMut, EntityRef};
pub use option::{
    Always, And, Exists, ExistsAll, ExistsAny, Not, Or, Predicate, exists, exists_all, exists_any,
    not,
};
pub use prototype::Prototype;
pub use query::ComponentSet;
pub use registry::{MemoryUsage, Registry};
pub use sparse::{IdentityIndexer, Indexer, SparseMap, SparseSet};
pub use storage::{AnyStorage, ComponentStorage};
pub use sync::SharedRegistry;
pub use system::{Feature, System};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{
        After, Aspect, Before, Component, Entity, EntityMut, EntityRef, Error, Event, Feature,
        Predicate, Prototype, Registry, RegistryConfig, Result, SharedRegistry, System, exists,
        exists_all, exists_any, not,
    };
}
