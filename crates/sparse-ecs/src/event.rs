//! Event marker trait and dispatch-phase wrappers.

/// Marker trait for events.
///
/// Any `Send + Sync + 'static` type can be posted with
/// [`Registry::process_event`](crate::Registry::process_event).
pub trait Event: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Event for T {}

/// Delivered to a feature's systems before its handlers of the wrapped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Before<E> {
    pub event: E,
}

impl<E> Before<E> {
    #[must_use]
    pub const fn new(event: E) -> Self {
        Self { event }
    }
}

/// Delivered to a feature's systems after its handlers of the wrapped event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct After<E> {
    pub event: E,
}

impl<E> After<E> {
    #[must_use]
    pub const fn new(event: E) -> Self {
        Self { event }
    }
}
