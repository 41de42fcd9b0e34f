//! Registry error types.

use thiserror::Error;

use crate::entity::Entity;

/// Boxed error raised by a system while processing an event.
pub type BoxedError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by the registry and its containers.
///
/// Lookups that have a natural "absent" result (`find*`, `exists*`,
/// `remove*`, `destroy_entity`) return `Option`/`bool` instead; only
/// operations that demand presence or capacity surface an `Error`.
#[derive(Debug, Error)]
pub enum Error {
    /// `get*` on an entity that does not hold the requested component,
    /// or on a dead/stale entity.
    #[error("component {component} not found on {entity}")]
    ComponentNotFound {
        entity: Entity,
        component: &'static str,
    },

    /// A sparse container was asked for a key it does not hold.
    #[error("key with index {index} not found")]
    KeyNotFound { index: usize },

    /// A sparse index is held by a different value.
    #[error("sparse index {index} is held by another value")]
    SlotOccupied { index: usize },

    /// Entity slot space or a sparse index domain is exhausted.
    #[error("capacity exceeded (limit {limit})")]
    CapacityExceeded { limit: usize },

    /// The entity handle no longer refers to a live entity.
    #[error("invalid entity handle: {0}")]
    InvalidHandle(Entity),

    /// Entity cloning hit a component type without a clone function.
    #[error("component {component} is not registered as cloneable")]
    NotCloneable { component: &'static str },

    /// A cursor saw its container change structurally mid-iteration.
    #[error("container modified during iteration (revision {expected} -> {found})")]
    ConcurrentModification { expected: u64, found: u64 },

    /// Nested `process_event` calls went deeper than the configured limit.
    #[error("event dispatch depth limit {limit} exceeded while posting {event}")]
    DispatchDepthExceeded { limit: usize, event: &'static str },

    /// Error raised by a system; propagated to the `process_event` caller as is.
    #[error("system failed: {0}")]
    System(#[source] BoxedError),
}

impl Error {
    /// Wrap an arbitrary error raised inside a system.
    pub fn system(err: impl Into<BoxedError>) -> Self {
        Self::System(err.into())
    }
}

/// Result type for registry operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_error_keeps_source() {
        let err = Error::system("gravity went sideways");
        assert!(matches!(err, Error::System(_)));
        assert_eq!(err.to_string(), "system failed: gravity went sideways");
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_component_not_found_message() {
        let err = Error::ComponentNotFound {
            entity: Entity::new(3, 1),
            component: "Position",
        };
        assert_eq!(err.to_string(), "component Position not found on 3v1");
    }
}
