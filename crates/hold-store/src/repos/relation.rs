//! Relation repository: create, save, transitions and deletion.

use chrono::Utc;
use tracing::{debug, info};

use hold_core::entities::{NewRelation, Relation};
use hold_core::enums::RelationKind;
use hold_core::ids::{RelationId, UserId};
use hold_core::state::RelationState;

use crate::error::StoreError;
use crate::evaluator::Candidate;
use crate::service::RelationService;
use crate::updates::relation::{RelationUpdate, RelationUpdateBuilder};

impl RelationService {
    /// Dry run of [`Self::create`]: the checks a draft must pass, without writing.
    ///
    /// # Errors
    ///
    /// Returns the error `create` would return before writing.
    pub fn validate_new(&self, draft: &NewRelation) -> Result<(), StoreError> {
        let ty = self.registry().require(&draft.relation_type)?;
        let state = draft.state.clone().unwrap_or_else(|| ty.initial_state());
        self.workflow().check_initial(&state)?;
        self.evaluator().check(&Candidate::new(draft))
    }

    /// Create a relation from a draft.
    ///
    /// The state defaults to the type's initial state. A reference without an
    /// owner is owned by `actor`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` if the evaluator refuses the draft,
    /// `StoreError::Core` for an unknown type or state, or the store's error.
    pub fn create(&self, draft: NewRelation, actor: Option<UserId>) -> Result<Relation, StoreError> {
        self.validate_new(&draft)?;
        let ty = self.registry().require(&draft.relation_type)?;

        let now = Utc::now();
        let owner = match ty.kind {
            RelationKind::Reference => draft.owner.or(actor),
            RelationKind::Ownership => draft.owner,
        };
        let relation = Relation {
            id: self.store().generate_id()?,
            state: draft.state.unwrap_or_else(|| ty.initial_state()),
            relation_type: draft.relation_type,
            kind: ty.kind,
            source: draft.source,
            target: draft.target,
            role: draft.role,
            owner,
            created_at: now,
            changed_at: now,
        };

        self.store().insert(&relation)?;
        info!(
            relation = %relation.id,
            relation_type = %relation.relation_type,
            target = %relation.target.cache_tag(),
            state = %relation.state,
            "relation created"
        );

        self.after_save(&relation, None);
        Ok(relation)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoResult` if the relation does not exist.
    pub fn get(&self, id: RelationId) -> Result<Relation, StoreError> {
        self.store().load(id)
    }

    /// Re-save a persisted relation.
    ///
    /// The type and kind are immutable. The state change, if any, must be
    /// allowed by the workflow. The relation is excluded from its own
    /// target count, so saving it unchanged is never rejected by quotas.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidState` for a changed type or kind,
    /// `StoreError::Core` for a disallowed transition, `StoreError::Rejected`
    /// if the evaluator refuses, or the store's error.
    pub fn save(&self, mut relation: Relation) -> Result<Relation, StoreError> {
        let original = self.store().load(relation.id)?;
        if original.relation_type != relation.relation_type || original.kind != relation.kind {
            return Err(StoreError::InvalidState(format!(
                "relation {} cannot change type from '{}' to '{}'",
                relation.id, original.relation_type, relation.relation_type
            )));
        }
        self.workflow()
            .check_transition(relation.id, &original.state, &relation.state)?;
        self.evaluator().check(&Candidate::existing(&relation))?;

        relation.created_at = original.created_at;
        relation.changed_at = Utc::now();
        self.store().update(&relation)?;
        info!(
            relation = %relation.id,
            from = %original.state,
            to = %relation.state,
            "relation saved"
        );

        self.after_save(&relation, Some(original));
        Ok(relation)
    }

    /// Apply a partial update and re-save.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save`].
    pub fn update(&self, id: RelationId, update: RelationUpdate) -> Result<Relation, StoreError> {
        let mut relation = self.get(id)?;
        if update.is_empty() {
            return Ok(relation);
        }
        update.apply_to(&mut relation);
        self.save(relation)
    }

    /// Move a relation to `state`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::save`].
    pub fn transition(&self, id: RelationId, state: RelationState) -> Result<Relation, StoreError> {
        self.update(id, RelationUpdateBuilder::new().state(state).build())
    }

    /// # Errors
    ///
    /// Same as [`Self::save`].
    pub fn activate(&self, id: RelationId) -> Result<Relation, StoreError> {
        self.transition(id, RelationState::ACTIVE)
    }

    /// # Errors
    ///
    /// Same as [`Self::save`].
    pub fn cancel(&self, id: RelationId) -> Result<Relation, StoreError> {
        self.transition(id, RelationState::CANCELED)
    }

    /// # Errors
    ///
    /// Returns `StoreError::NoResult` if the relation does not exist.
    pub fn delete(&self, id: RelationId) -> Result<(), StoreError> {
        self.delete_many(&[id]).map(|_| ())
    }

    /// Delete a batch of relations.
    ///
    /// Emits one `Deleted` per relation and invalidates the permissions tag
    /// once for the whole batch.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoResult` if any id is unknown; nothing is deleted
    /// in that case.
    pub fn delete_many(&self, ids: &[RelationId]) -> Result<usize, StoreError> {
        let relations = ids
            .iter()
            .map(|id| self.store().load(*id))
            .collect::<Result<Vec<_>, _>>()?;
        self.delete_loaded(&relations)
    }

    pub(crate) fn delete_loaded(&self, relations: &[Relation]) -> Result<usize, StoreError> {
        if relations.is_empty() {
            return Ok(0);
        }
        let ids: Vec<RelationId> = relations.iter().map(|r| r.id).collect();
        let removed = self.store().remove(&ids)?;
        debug!(requested = ids.len(), removed, "relations deleted");

        self.after_delete(relations);
        Ok(removed)
    }
}
