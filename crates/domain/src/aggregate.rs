//! Core aggregate and domain event traits.

use common::{OrderId, Version};
use serde::{Serialize, de::DeserializeOwned};

/// Trait for domain events.
///
/// Domain events represent facts that have happened in the domain.
/// They are immutable and should be named in past tense.
pub trait DomainEvent: Serialize + DeserializeOwned + Send + Sync + Clone {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;
}

/// Trait for aggregates whose state only changes by applying events.
///
/// Command methods inspect the current state and either reject the request
/// or return the events describing the change. Applying those events is the
/// only way state moves, which keeps validation and mutation separate:
/// - Command methods take `&self` and never mutate
/// - `apply` is pure and deterministic
/// - The caller persists the resulting document under the next version
pub trait Aggregate: Default + Send + Sync + Sized {
    /// The type of events this aggregate produces and consumes.
    type Event: DomainEvent;

    /// The type of errors this aggregate can produce.
    type Error: std::error::Error + Send + Sync;

    /// Returns the aggregate's identifier, or None before it was created.
    fn id(&self) -> Option<OrderId>;

    /// Returns the revision of the stored document.
    fn version(&self) -> Version;

    /// Sets the document revision.
    fn set_version(&mut self, version: Version);

    /// Applies an event to the aggregate, updating its state.
    ///
    /// Must not fail: events represent facts that have already been accepted.
    fn apply(&mut self, event: Self::Event);

    /// Applies multiple events in sequence.
    fn apply_events(&mut self, events: impl IntoIterator<Item = Self::Event>) {
        for event in events {
            self.apply(event);
        }
    }
}
