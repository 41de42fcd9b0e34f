//! Registry configuration.

use crate::entity::ENTITY_INDEX_MASK;

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Number of entity slots to reserve up front.
    pub entity_capacity: usize,
    /// Maximum number of distinct entity slots (clamped to `ENTITY_INDEX_MASK`).
    pub max_entities: u32,
    /// Maximum nesting of `process_event` calls made from inside systems.
    pub max_dispatch_depth: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            entity_capacity: 0,
            max_entities: ENTITY_INDEX_MASK,
            max_dispatch_depth: 64,
        }
    }
}

impl RegistryConfig {
    /// Slot cap after clamping to the identifier's index range.
    #[must_use]
    pub fn slot_limit(&self) -> u32 {
        self.max_entities.min(ENTITY_INDEX_MASK)
    }
}
