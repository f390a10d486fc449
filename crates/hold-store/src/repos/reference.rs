//! Generic references between entities, pending references for unsaved
//! sources, and cascade deletion when a host entity goes away.

use serde::Serialize;
use tracing::{info, warn};

use hold_core::entities::{EntityRef, NewRelation, Relation};
use hold_core::enums::RelationKind;
use hold_core::errors::CoreError;
use hold_core::ids::{EntityId, UserId};

use crate::error::StoreError;
use crate::service::RelationService;

/// A reference whose source entity had no id yet when it was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingReference {
    pub draft: NewRelation,
    pub actor: Option<UserId>,
}

impl PendingReference {
    /// The draft with the source id filled in.
    #[must_use]
    pub fn resolve(mut self, source_id: EntityId) -> NewRelation {
        self.draft.source.id = source_id;
        self.draft
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Establish {
    Saved(Relation),
    /// Hand back to [`RelationService::flush_pending`] once the source is saved.
    Deferred(PendingReference),
}

impl RelationService {
    /// Create a reference of `relation_type` from `source` to `target`.
    ///
    /// When `source` is not persisted yet nothing is written; the returned
    /// [`Establish::Deferred`] carries the draft until the caller flushes it.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Core` if the type is unknown or not a reference
    /// type, or any error of [`RelationService::create`].
    pub fn establish_reference(
        &self,
        relation_type: &str,
        source: EntityRef,
        target: EntityRef,
        actor: Option<UserId>,
    ) -> Result<Establish, StoreError> {
        let ty = self.registry().require(relation_type)?;
        if ty.kind != RelationKind::Reference {
            return Err(CoreError::Validation(format!(
                "'{relation_type}' is not a reference type"
            ))
            .into());
        }

        let draft = NewRelation::reference(relation_type, source, target);
        if !draft.source.is_persisted() {
            info!(relation_type, target = %draft.target.cache_tag(), "reference deferred until source is saved");
            return Ok(Establish::Deferred(PendingReference { draft, actor }));
        }
        self.create(draft, actor).map(Establish::Saved)
    }

    /// Create queued references now that their source has `source_id`.
    ///
    /// # Errors
    ///
    /// Stops at and returns the first failing create; references created
    /// before it stay persisted.
    pub fn flush_pending(
        &self,
        pending: impl IntoIterator<Item = PendingReference>,
        source_id: EntityId,
    ) -> Result<Vec<Relation>, StoreError> {
        pending
            .into_iter()
            .map(|reference| {
                let actor = reference.actor;
                self.create(reference.resolve(source_id), actor)
            })
            .collect()
    }

    /// Delete every relation where `entity` is the source or the target.
    ///
    /// Failures are logged and swallowed; the host entity is gone either way.
    /// Returns how many relations were removed.
    pub fn on_entity_deleted(&self, entity: &EntityRef) -> usize {
        let touching = match self.store().find_touching(entity) {
            Ok(relations) => relations,
            Err(error) => {
                warn!(entity = %entity.cache_tag(), %error, "could not look up relations of deleted entity");
                return 0;
            }
        };
        match self.delete_loaded(&touching) {
            Ok(removed) => {
                info!(entity = %entity.cache_tag(), removed, "relations of deleted entity removed");
                removed
            }
            Err(error) => {
                warn!(entity = %entity.cache_tag(), %error, "could not remove relations of deleted entity");
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RelationStore;
    use crate::test_support::helpers::{ownership_type, reference_type, TestService};
    use hold_core::enums::LifecycleEvent;
    use pretty_assertions::assert_eq;

    fn article(id: u64) -> EntityRef {
        EntityRef::new("node", "article", id)
    }

    fn author(id: u64) -> EntityRef {
        EntityRef::new("node", "author", id)
    }

    fn service() -> TestService {
        TestService::new(vec![
            reference_type("authored_by", "node:article", "node:author"),
            ownership_type("claim", "node:author", 0),
        ])
    }

    #[test]
    fn persisted_source_saves_immediately() {
        let t = service();
        let result = t
            .svc
            .establish_reference("authored_by", article(1), author(2), Some(7))
            .unwrap();
        let Establish::Saved(relation) = result else {
            panic!("expected saved reference");
        };
        assert_eq!(relation.owner, Some(7));
        assert_eq!(relation.kind, RelationKind::Reference);
    }

    #[test]
    fn unsaved_source_is_deferred_then_flushed() {
        let t = service();
        let result = t
            .svc
            .establish_reference("authored_by", article(0), author(2), Some(7))
            .unwrap();
        let Establish::Deferred(pending) = result else {
            panic!("expected deferred reference");
        };
        assert!(t.store.is_empty());

        let saved = t.svc.flush_pending([pending], 11).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].source.id, 11);
        assert_eq!(saved[0].owner, Some(7));
    }

    #[test]
    fn ownership_types_cannot_be_established_as_references() {
        let t = service();
        let err = t
            .svc
            .establish_reference("claim", EntityRef::user(1), author(2), None)
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
    }

    #[test]
    fn entity_deletion_cascades_to_both_endpoints() {
        let t = service();
        t.svc
            .establish_reference("authored_by", article(1), author(2), None)
            .unwrap();
        t.svc
            .establish_reference("authored_by", article(3), author(2), None)
            .unwrap();
        t.svc
            .establish_reference("authored_by", article(1), author(4), None)
            .unwrap();
        t.svc
            .create(NewRelation::ownership("claim", 9, author(2)), None)
            .unwrap();
        t.events.clear();
        t.cache.clear();

        assert_eq!(t.svc.on_entity_deleted(&author(2)), 3);
        assert_eq!(t.store.len(), 1);
        assert_eq!(t.events.lifecycle(), vec![LifecycleEvent::Deleted; 3]);
        assert_eq!(t.cache.count("user.permissions"), 1);

        assert_eq!(t.svc.on_entity_deleted(&author(2)), 0);
    }

    #[test]
    fn entity_deletion_removes_ownerships_of_the_entity() {
        let t = service();
        let pending = t
            .svc
            .create(NewRelation::ownership("claim", 9, author(2)), None)
            .unwrap();
        let active = t
            .svc
            .create(NewRelation::ownership("claim", 8, author(2)), None)
            .unwrap();
        t.svc.activate(active.id).unwrap();
        let kept = t
            .svc
            .create(NewRelation::ownership("claim", 9, author(5)), None)
            .unwrap();

        assert_eq!(t.svc.on_entity_deleted(&author(2)), 2);
        for id in [pending.id, active.id] {
            assert!(matches!(t.store.load(id), Err(StoreError::NoResult)), "{id} survived");
        }
        assert_eq!(t.store.load(kept.id).unwrap().target, author(5));
        assert!(t.store.find_touching(&author(2)).unwrap().is_empty());
    }
}
