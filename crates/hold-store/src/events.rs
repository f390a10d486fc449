//! Lifecycle events dispatched after relation mutations commit.
//!
//! Dispatch is fire-and-forget: subscribers cannot fail or veto a mutation
//! that has already been written.

use std::sync::{Arc, Mutex, PoisonError};

use hold_core::entities::Relation;
use hold_core::enums::{LifecycleEvent, RelationKind};
use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationEvent {
    /// Namespaced event name, e.g. `"holdfast.ownership.activated"`.
    pub name: String,
    pub event: LifecycleEvent,
    pub kind: RelationKind,
    pub relation: Relation,
    /// The relation as loaded before the write, for updates.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original: Option<Relation>,
}

impl RelationEvent {
    #[must_use]
    pub fn new(event: LifecycleEvent, relation: Relation, original: Option<Relation>) -> Self {
        Self {
            name: event.event_name(relation.kind),
            event,
            kind: relation.kind,
            relation,
            original,
        }
    }
}

pub trait EventSubscriber: Send + Sync {
    fn on_event(&self, event: &RelationEvent);
}

#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSubscriber>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn dispatch(&self, event: &RelationEvent) {
        debug!(event = %event.name, relation = %event.relation.id, subscribers = self.subscribers.len(), "dispatching relation event");
        for subscriber in &self.subscribers {
            subscriber.on_event(event);
        }
    }
}

/// Logs every event with its JSON payload at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSubscriber;

impl EventSubscriber for LogSubscriber {
    fn on_event(&self, event: &RelationEvent) {
        match serde_json::to_value(event) {
            Ok(payload) => info!(event = %event.name, %payload, "relation event"),
            Err(error) => warn!(event = %event.name, %error, "relation event payload not serializable"),
        }
    }
}

/// Keeps every event it receives. Used by tests and by callers that collect
/// events for a request.
#[derive(Debug, Default)]
pub struct RecordingSubscriber {
    events: Mutex<Vec<RelationEvent>>,
}

impl RecordingSubscriber {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<RelationEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Lifecycle events received so far, in order.
    #[must_use]
    pub fn lifecycle(&self) -> Vec<LifecycleEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|e| e.event)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl EventSubscriber for RecordingSubscriber {
    fn on_event(&self, event: &RelationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
