//! Conflict and limit evaluation.
//!
//! Pure decision over the registry and the current store contents. Runs
//! strictly before any write; a rejection leaves the store untouched.
//!
//! Checks, in order:
//!
//! 1. the source and target match the type's bundle specs;
//! 2. the role, if any, is one of the type's target roles;
//! 3. a *new* relation with a source user does not push the user's relation
//!    count across the conflict group (any state) to the limit;
//! 4. a new relation, or a saved one that ends up active, does not join a
//!    target that already holds `limit` active relations of the type (the
//!    relation being saved is not counted);
//! 5. references are unique per `(type, source, target)`.

use hold_core::entities::{EntityRef, NewRelation, Relation, RelationType};
use hold_core::ids::RelationId;
use hold_core::registry::RelationTypeRegistry;
use tracing::debug;

use crate::error::{QuotaScope, Rejection, StoreError};
use crate::store::RelationStore;

/// The relation a save would write, borrowed from a draft or a record.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub relation_type: &'a str,
    pub source: &'a EntityRef,
    pub target: &'a EntityRef,
    pub role: Option<&'a str>,
    /// Id of the persisted relation being re-saved; `None` for a new one.
    pub existing: Option<RelationId>,
    /// Whether a re-saved relation ends up active. New relations always
    /// count against the target.
    pub active: bool,
}

impl<'a> Candidate<'a> {
    #[must_use]
    pub fn new(draft: &'a NewRelation) -> Self {
        Self {
            relation_type: &draft.relation_type,
            source: &draft.source,
            target: &draft.target,
            role: draft.role.as_deref(),
            existing: None,
            active: false,
        }
    }

    #[must_use]
    pub fn existing(relation: &'a Relation) -> Self {
        Self {
            relation_type: &relation.relation_type,
            source: &relation.source,
            target: &relation.target,
            role: relation.role.as_deref(),
            existing: Some(relation.id),
            active: relation.is_active(),
        }
    }

    const fn is_new(&self) -> bool {
        self.existing.is_none()
    }

    /// Saves that leave a relation inactive cannot raise the target's
    /// active count.
    const fn joins_target(&self) -> bool {
        self.is_new() || self.active
    }

    fn source_user(&self) -> Option<u64> {
        self.source.is_user().then_some(self.source.id)
    }
}

pub struct Evaluator<'a> {
    registry: &'a RelationTypeRegistry,
    store: &'a dyn RelationStore,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub const fn new(registry: &'a RelationTypeRegistry, store: &'a dyn RelationStore) -> Self {
        Self { registry, store }
    }

    /// Decide whether `candidate` may be written.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Rejected` with the first failed check,
    /// `StoreError::Core` for an unknown relation type, or the store's error
    /// if a count query fails.
    pub fn check(&self, candidate: &Candidate<'_>) -> Result<(), StoreError> {
        let ty = self.registry.require(candidate.relation_type)?;

        let result = check_endpoints(ty, candidate).and_then(|()| {
            self.check_quotas(ty, candidate)?;
            self.check_uniqueness(ty, candidate)
        });
        if let Err(StoreError::Rejected(rejection)) = &result {
            debug!(relation_type = %ty.id, target = %candidate.target.cache_tag(), %rejection, "relation rejected");
        }
        result
    }

    fn check_quotas(&self, ty: &RelationType, candidate: &Candidate<'_>) -> Result<(), StoreError> {
        let Some(limit) = ty.effective_limit() else {
            return Ok(());
        };

        if let (true, Some(user)) = (candidate.is_new(), candidate.source_user()) {
            let count = self
                .store
                .count_for_conflict_group(user, &self.registry.conflict_group(&ty.id))?;
            if count >= limit as usize {
                return Err(Rejection::QuotaExceeded {
                    scope: QuotaScope::UserQuota,
                    relation_type: ty.id.clone(),
                    subject: format!("user:{user}"),
                    count,
                    limit,
                }
                .into());
            }
        }

        if !candidate.joins_target() {
            return Ok(());
        }
        let count = self
            .store
            .count_for_target(candidate.target, &ty.id, candidate.existing)?;
        if count >= limit as usize {
            return Err(Rejection::QuotaExceeded {
                scope: QuotaScope::TargetFull,
                relation_type: ty.id.clone(),
                subject: candidate.target.cache_tag(),
                count,
                limit,
            }
            .into());
        }
        Ok(())
    }

    fn check_uniqueness(&self, ty: &RelationType, candidate: &Candidate<'_>) -> Result<(), StoreError> {
        if !ty.kind.requires_unique_endpoints() {
            return Ok(());
        }
        if self.store.exists_exact(
            candidate.source,
            candidate.target,
            &ty.id,
            candidate.existing,
        )? {
            return Err(Rejection::DuplicateRelation {
                relation_type: ty.id.clone(),
                source_entity: candidate.source.cache_tag(),
                target: candidate.target.cache_tag(),
            }
            .into());
        }
        Ok(())
    }
}

fn check_endpoints(ty: &RelationType, candidate: &Candidate<'_>) -> Result<(), StoreError> {
    let endpoints = [
        ("source", &ty.source_bundle, candidate.source),
        ("target", &ty.target_bundle, candidate.target),
    ];
    for (endpoint, spec, entity) in endpoints {
        if !spec.matches(entity) {
            return Err(Rejection::EndpointMismatch {
                relation_type: ty.id.clone(),
                endpoint,
                entity: entity.bundle_key(),
                expected: spec.to_string(),
            }
            .into());
        }
    }
    if let Some(role) = candidate.role {
        if !ty.allows_role(role) {
            return Err(Rejection::RoleNotAllowed {
                relation_type: ty.id.clone(),
                role: role.to_string(),
            }
            .into());
        }
    }
    Ok(())
}
