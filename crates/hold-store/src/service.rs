//! Service layer orchestrating relation mutations with evaluation, lifecycle
//! events and cache invalidation.
//!
//! `RelationService` wraps a `RelationStore` (raw persistence), the validated
//! `RelationTypeRegistry`, the workflow `StateMachine`, an `EventBus` and a
//! `CacheInvalidator`. Repository methods are implemented as
//! `impl RelationService` blocks under `repos/`.

use std::sync::Arc;

use hold_config::HoldConfig;
use hold_core::entities::Relation;
use hold_core::enums::LifecycleEvent;
use hold_core::registry::RelationTypeRegistry;

use crate::cache::{CacheInvalidator, tags_for};
use crate::error::StoreError;
use crate::evaluator::Evaluator;
use crate::events::{EventBus, EventSubscriber, RelationEvent};
use crate::store::RelationStore;
use crate::workflow::StateMachine;

/// Orchestrates relation mutations.
///
/// Every mutation method follows this protocol:
/// 1. Load the original record (updates and deletes)
/// 2. Validate the state transition
/// 3. Run the evaluator; a rejection stops here with nothing written
/// 4. Write to the store
/// 5. Dispatch lifecycle events
/// 6. Invalidate the permissions tag and the touched entity tags
pub struct RelationService {
    registry: Arc<RelationTypeRegistry>,
    store: Arc<dyn RelationStore>,
    workflow: StateMachine,
    events: EventBus,
    cache: Arc<dyn CacheInvalidator>,
    permissions_tag: String,
}

impl RelationService {
    #[must_use]
    pub fn new(
        registry: Arc<RelationTypeRegistry>,
        store: Arc<dyn RelationStore>,
        workflow: StateMachine,
        cache: Arc<dyn CacheInvalidator>,
        permissions_tag: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            store,
            workflow,
            events: EventBus::new(),
            cache,
            permissions_tag: permissions_tag.into(),
        }
    }

    /// Build a service from loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Config` if the configured relation types do not
    /// form a valid registry.
    pub fn from_config(
        config: &HoldConfig,
        store: Arc<dyn RelationStore>,
        cache: Arc<dyn CacheInvalidator>,
    ) -> Result<Self, StoreError> {
        let registry = config.registry()?;
        Ok(Self::new(
            Arc::new(registry),
            store,
            StateMachine::from_config(&config.workflow),
            cache,
            config.cache.permissions_tag.clone(),
        ))
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSubscriber>) {
        self.events.subscribe(subscriber);
    }

    #[must_use]
    pub fn registry(&self) -> &RelationTypeRegistry {
        &self.registry
    }

    /// Shared handle to the registry, for components built next to the service.
    #[must_use]
    pub fn registry_handle(&self) -> Arc<RelationTypeRegistry> {
        Arc::clone(&self.registry)
    }

    #[must_use]
    pub fn store(&self) -> &dyn RelationStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn store_handle(&self) -> Arc<dyn RelationStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub const fn workflow(&self) -> &StateMachine {
        &self.workflow
    }

    #[must_use]
    pub fn permissions_tag(&self) -> &str {
        &self.permissions_tag
    }

    #[must_use]
    pub fn evaluator(&self) -> Evaluator<'_> {
        Evaluator::new(&self.registry, self.store.as_ref())
    }

    /// Post-commit work for a save: events in mapping order, then one
    /// invalidation.
    pub(crate) fn after_save(&self, saved: &Relation, original: Option<Relation>) {
        let events = StateMachine::events_for_save(original.as_ref().map(|r| &r.state), &saved.state);
        for event in events {
            self.events
                .dispatch(&RelationEvent::new(event, saved.clone(), original.clone()));
        }
        self.invalidate(std::iter::once(saved).chain(original.as_ref()));
    }

    /// Post-commit work for a delete: one `Deleted` per relation, one
    /// invalidation for the whole batch.
    pub(crate) fn after_delete(&self, deleted: &[Relation]) {
        if deleted.is_empty() {
            return;
        }
        for relation in deleted {
            self.events
                .dispatch(&RelationEvent::new(LifecycleEvent::Deleted, relation.clone(), None));
        }
        self.invalidate(deleted);
    }

    fn invalidate<'a>(&self, relations: impl IntoIterator<Item = &'a Relation>) {
        self.cache
            .invalidate_tags(&tags_for(&self.permissions_tag, relations));
    }
}
