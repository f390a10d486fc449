//! Persistence abstraction for relation records.
//!
//! All calls are synchronous. Implementations must be `Send + Sync`; the
//! service shares one store between the write path and the access engine.

use std::collections::BTreeSet;

use hold_core::entities::{EntityRef, Relation};
use hold_core::ids::{RelationId, RoleId, UserId};

use crate::error::StoreError;

/// Optional narrowing applied by the `find_*` queries.
///
/// Empty `types` / `roles` sets do not filter. `only_active` defaults to
/// `true`; when it is `false`, active relations sort before the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationFilter {
    pub types: BTreeSet<String>,
    pub roles: BTreeSet<RoleId>,
    pub only_active: bool,
}

impl Default for RelationFilter {
    fn default() -> Self {
        Self::active()
    }
}

impl RelationFilter {
    #[must_use]
    pub const fn active() -> Self {
        Self {
            types: BTreeSet::new(),
            roles: BTreeSet::new(),
            only_active: true,
        }
    }

    #[must_use]
    pub const fn all_states() -> Self {
        Self {
            types: BTreeSet::new(),
            roles: BTreeSet::new(),
            only_active: false,
        }
    }

    #[must_use]
    pub fn of_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.types.extend(types.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<RoleId>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    /// Whether `relation` passes this filter.
    #[must_use]
    pub fn matches(&self, relation: &Relation) -> bool {
        (!self.only_active || relation.is_active())
            && (self.types.is_empty() || self.types.contains(&relation.relation_type))
            && (self.roles.is_empty()
                || relation
                    .role
                    .as_ref()
                    .is_some_and(|role| self.roles.contains(role)))
    }
}

/// Storage of relation records.
///
/// Queries never fail for "nothing found"; they return empty results. Only
/// [`RelationStore::load`] and [`RelationStore::update`] report
/// `StoreError::NoResult` for a missing id.
pub trait RelationStore: Send + Sync {
    /// Allocate the next relation id. Ids are unique and monotonic.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot allocate an id.
    fn generate_id(&self) -> Result<RelationId, StoreError>;

    /// # Errors
    ///
    /// Returns `StoreError::NoResult` if no relation has this id.
    fn load(&self, id: RelationId) -> Result<Relation, StoreError>;

    /// Relations targeting `target`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn find_active(&self, target: &EntityRef, filter: &RelationFilter)
    -> Result<Vec<Relation>, StoreError>;

    /// Relations whose source is the user `user`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn find_by_user(&self, user: UserId, filter: &RelationFilter) -> Result<Vec<Relation>, StoreError>;

    /// Relations of `user` on `target`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn find_by_user_and_target(
        &self,
        user: UserId,
        target: &EntityRef,
        filter: &RelationFilter,
    ) -> Result<Vec<Relation>, StoreError>;

    /// Relations of any state held by `user` whose type is in `types`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn count_for_conflict_group(&self, user: UserId, types: &BTreeSet<String>) -> Result<usize, StoreError>;

    /// Active relations of `relation_type` on `target`, not counting `exclude`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn count_for_target(
        &self,
        target: &EntityRef,
        relation_type: &str,
        exclude: Option<RelationId>,
    ) -> Result<usize, StoreError>;

    /// Whether another relation with the same `(type, source, target)` exists.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn exists_exact(
        &self,
        source: &EntityRef,
        target: &EntityRef,
        relation_type: &str,
        exclude: Option<RelationId>,
    ) -> Result<bool, StoreError>;

    /// Whether `user` holds a relation on `target`, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn exists(
        &self,
        target: &EntityRef,
        user: UserId,
        relation_type: Option<&str>,
        only_active: bool,
    ) -> Result<bool, StoreError>;

    /// Every relation where `entity` is the source or the target.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend query fails.
    fn find_touching(&self, entity: &EntityRef) -> Result<Vec<Relation>, StoreError>;

    /// Persist a new relation under its already generated id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Query` if the id is already taken.
    fn insert(&self, relation: &Relation) -> Result<(), StoreError>;

    /// Replace a persisted relation.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NoResult` if the relation does not exist.
    fn update(&self, relation: &Relation) -> Result<(), StoreError>;

    /// Remove relations by id; unknown ids are skipped. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend delete fails.
    fn remove(&self, ids: &[RelationId]) -> Result<usize, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hold_core::enums::RelationKind;
    use hold_core::state::RelationState;

    fn relation(role: Option<&str>, state: RelationState) -> Relation {
        Relation {
            id: RelationId(1),
            relation_type: "claim".into(),
            kind: RelationKind::Ownership,
            source: EntityRef::user(1),
            target: EntityRef::new("node", "team", 2),
            role: role.map(String::from),
            state,
            owner: None,
            created_at: Utc::now(),
            changed_at: Utc::now(),
        }
    }

    #[test]
    fn default_filter_requires_active() {
        let filter = RelationFilter::default();
        assert!(filter.matches(&relation(None, RelationState::ACTIVE)));
        assert!(!filter.matches(&relation(None, RelationState::NEW)));
        assert!(RelationFilter::all_states().matches(&relation(None, RelationState::NEW)));
    }

    #[test]
    fn type_and_role_filters() {
        let active = relation(Some("captain"), RelationState::ACTIVE);
        assert!(RelationFilter::active().of_types(["claim"]).matches(&active));
        assert!(!RelationFilter::active().of_types(["member"]).matches(&active));
        assert!(RelationFilter::active().with_roles(["captain"]).matches(&active));
        assert!(!RelationFilter::active().with_roles(["coach"]).matches(&active));

        let roleless = relation(None, RelationState::ACTIVE);
        assert!(!RelationFilter::active().with_roles(["captain"]).matches(&roleless));
    }
}
