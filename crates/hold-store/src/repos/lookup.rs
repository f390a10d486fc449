//! Read-side helpers over the store: existence checks, first matches and
//! default type resolution.

use std::collections::BTreeSet;

use hold_core::entities::{EntityRef, Relation, RelationType};
use hold_core::enums::RelationKind;
use hold_core::ids::UserId;

use crate::error::StoreError;
use crate::service::RelationService;
use crate::store::RelationFilter;

impl RelationService {
    /// Default type of `kind` for relations on `target`.
    #[must_use]
    pub fn default_type(&self, kind: RelationKind, target: &EntityRef) -> Option<&RelationType> {
        self.registry().default_for(kind, target)
    }

    /// Whether `user` holds an ownership on `target`, optionally of one type.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn ownership_exists(
        &self,
        target: &EntityRef,
        user: UserId,
        relation_type: Option<&str>,
        only_active: bool,
    ) -> Result<bool, StoreError> {
        self.store().exists(target, user, relation_type, only_active)
    }

    /// First relation on `target` matching `filter`; active ones come first
    /// when all states are requested.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn first_for_target(
        &self,
        target: &EntityRef,
        filter: &RelationFilter,
    ) -> Result<Option<Relation>, StoreError> {
        Ok(self.store().find_active(target, filter)?.into_iter().next())
    }

    /// First relation of `user` on `target` matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn first_for_user(
        &self,
        user: UserId,
        target: &EntityRef,
        filter: &RelationFilter,
    ) -> Result<Option<Relation>, StoreError> {
        Ok(self
            .store()
            .find_by_user_and_target(user, target, filter)?
            .into_iter()
            .next())
    }

    /// Users that an active relation of a `makes_owner` type makes owners
    /// of `entity`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn entity_owners(&self, entity: &EntityRef) -> Result<BTreeSet<UserId>, StoreError> {
        let types: BTreeSet<String> = self
            .registry()
            .iter()
            .filter(|ty| ty.makes_owner)
            .map(|ty| ty.id.clone())
            .collect();
        if types.is_empty() {
            return Ok(BTreeSet::new());
        }
        Ok(self
            .store()
            .find_active(entity, &RelationFilter::active().of_types(types))?
            .iter()
            .filter_map(Relation::source_user)
            .collect())
    }

    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn is_entity_owner(&self, entity: &EntityRef, user: UserId) -> Result<bool, StoreError> {
        Ok(self.entity_owners(entity)?.contains(&user))
    }
}
