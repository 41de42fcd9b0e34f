//! Systems and features.
//!
//! A [`System<E>`] reacts to events of type `E`. Systems are grouped into
//! named [`Feature`]s that can be enabled and disabled as a unit; the
//! registry keeps features in registration order and dispatches to the
//! systems of every enabled feature in that order.

use std::{
    any::{Any, TypeId, type_name},
    fmt,
    sync::Arc,
};

use smallvec::SmallVec;
use tracing::debug;

use crate::{error::Result, event::Event, registry::Registry};

/// Type-erased event handler.
pub type Handler = Arc<dyn Fn(&mut Registry, &dyn Any) -> Result<()> + Send + Sync>;

/// Behavior subscribed to events of type `E`.
///
/// A type handling several event types implements `System` once per type
/// and is registered once per type, usually shared through an `Arc`.
pub trait System<E: Event>: Send + Sync + 'static {
    /// Handle one event.
    fn process(&self, registry: &mut Registry, event: &E) -> Result<()>;

    /// Name used in logs.
    fn name(&self) -> &'static str {
        type_name::<Self>()
    }
}

impl<E, F> System<E> for F
where
    E: Event,
    F: Fn(&mut Registry, &E) -> Result<()> + Send + Sync + 'static,
{
    fn process(&self, registry: &mut Registry, event: &E) -> Result<()> {
        self(registry, event)
    }
}

struct SystemEntry {
    event: TypeId,
    event_name: &'static str,
    system_name: &'static str,
    handler: Handler,
}

impl fmt::Debug for SystemEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemEntry")
            .field("event", &self.event_name)
            .field("system", &self.system_name)
            .finish_non_exhaustive()
    }
}

/// Named, ordered group of systems, enabled or disabled as a unit.
pub struct Feature {
    name: String,
    enabled: bool,
    systems: Vec<SystemEntry>,
}

impl Feature {
    /// Create an empty, enabled feature.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            systems: Vec::new(),
        }
    }

    /// Feature name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a system handling `E`.
    pub fn add_system<E: Event, S: System<E>>(&mut self, system: S) -> &mut Self {
        self.add_shared_system::<E, S>(Arc::new(system))
    }

    /// Add a closure handling `E`.
    ///
    /// Same as [`Feature::add_system`], with the closure's argument types
    /// inferred from `E`.
    pub fn add_system_fn<E, F>(&mut self, f: F) -> &mut Self
    where
        E: Event,
        F: Fn(&mut Registry, &E) -> Result<()> + Send + Sync + 'static,
    {
        self.add_system::<E, F>(f)
    }

    /// Add a system shared with other registrations.
    pub fn add_shared_system<E: Event, S: System<E>>(&mut self, system: Arc<S>) -> &mut Self {
        let system_name = <S as System<E>>::name(&system);
        let event_name = type_name::<E>();
        debug!(
            feature = %self.name,
            system = system_name,
            event = event_name,
            "registered system"
        );

        let handler: Handler = Arc::new(move |registry: &mut Registry, event: &dyn Any| {
            match event.downcast_ref::<E>() {
                Some(event) => <S as System<E>>::process(&system, registry, event),
                None => Ok(()),
            }
        });
        self.systems.push(SystemEntry {
            event: TypeId::of::<E>(),
            event_name,
            system_name,
            handler,
        });
        self
    }

    /// Enable the feature.
    pub fn enable(&mut self) -> &mut Self {
        if !self.enabled {
            debug!(feature = %self.name, "feature enabled");
        }
        self.enabled = true;
        self
    }

    /// Disable the feature; its systems are skipped on dispatch.
    pub fn disable(&mut self) -> &mut Self {
        if self.enabled {
            debug!(feature = %self.name, "feature disabled");
        }
        self.enabled = false;
        self
    }

    /// Check if the feature is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if any system handles `E`.
    #[must_use]
    pub fn handles<E: Event>(&self) -> bool {
        let event = TypeId::of::<E>();
        self.systems.iter().any(|entry| entry.event == event)
    }

    fn handlers_for(&self, event: TypeId) -> SmallVec<[Handler; 4]> {
        self.systems
            .iter()
            .filter(|entry| entry.event == event)
            .map(|entry| Arc::clone(&entry.handler))
            .collect()
    }

    /// Number of registered systems.
    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    /// Check if the feature has no systems.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }
}

impl fmt::Debug for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feature")
            .field("name", &self.name)
            .field("enabled", &self.enabled)
            .field("systems", &self.systems)
            .finish()
    }
}

/// Features in registration order, looked up by name.
#[derive(Default)]
pub struct FeatureTable {
    features: Vec<Feature>,
}

impl FeatureTable {
    fn position(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|feature| feature.name == name)
    }

    /// Insert `feature`, replacing a same-named one in place.
    pub fn assign(&mut self, feature: Feature) -> &mut Feature {
        let index = match self.position(&feature.name) {
            Some(index) => {
                debug!(feature = %feature.name, "replaced feature");
                self.features[index] = feature;
                index
            }
            None => {
                debug!(feature = %feature.name, "created feature");
                self.features.push(feature);
                self.features.len() - 1
            }
        };
        &mut self.features[index]
    }

    pub fn ensure(&mut self, name: &str) -> &mut Feature {
        match self.position(name) {
            Some(index) => &mut self.features[index],
            None => self.assign(Feature::new(name)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.iter().find(|feature| feature.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Feature> {
        self.features.iter_mut().find(|feature| feature.name == name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Feature> {
        let index = self.position(name)?;
        Some(self.features.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> + '_ {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Handlers of one enabled feature for each dispatch phase of an event,
    /// in feature order. Features with no matching system are left out.
    pub fn phases_for(&self, before: TypeId, event: TypeId, after: TypeId) -> Vec<PhaseHandlers> {
        self.features
            .iter()
            .filter(|feature| feature.enabled)
            .map(|feature| PhaseHandlers {
                before: feature.handlers_for(before),
                event: feature.handlers_for(event),
                after: feature.handlers_for(after),
            })
            .filter(|phases| !phases.is_empty())
            .collect()
    }
}

/// Snapshot of one feature's handlers for `Before<E>`, `E` and `After<E>`.
pub struct PhaseHandlers {
    pub before: SmallVec<[Handler; 4]>,
    pub event: SmallVec<[Handler; 4]>,
    pub after: SmallVec<[Handler; 4]>,
}

impl PhaseHandlers {
    fn is_empty(&self) -> bool {
        self.before.is_empty() && self.event.is_empty() && self.after.is_empty()
    }
}
