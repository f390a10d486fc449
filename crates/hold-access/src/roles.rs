//! Role resolution: session roles merged with the roles granted by active
//! relations.

use hold_core::entities::{EntityRef, Relation};
use hold_core::ids::{RoleSet, UserId};
use hold_store::{RelationFilter, RelationStore, StoreError};
use tracing::{debug, info};

use crate::account::{Account, AccountSlot, SessionAccount};

/// Outcome of an own-scoped resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnRoles {
    /// Roles of the account's matching active relations, without session roles.
    Roles(RoleSet),
    /// The account holds no matching active relation.
    NoRelation,
}

pub struct RoleResolver<'a> {
    store: &'a dyn RelationStore,
}

impl<'a> RoleResolver<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn RelationStore) -> Self {
        Self { store }
    }

    /// Active relations of `user`, on `target` when given.
    ///
    /// Relations whose role is outside a non-empty `only_roles` are skipped.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn active_relations(
        &self,
        user: UserId,
        target: Option<&EntityRef>,
        only_roles: &RoleSet,
    ) -> Result<Vec<Relation>, StoreError> {
        let filter = RelationFilter::active().with_roles(only_roles.iter().cloned());
        match target {
            Some(target) => self.store.find_by_user_and_target(user, target, &filter),
            None => self.store.find_by_user(user, &filter),
        }
    }

    /// Roles granted by the active relations of `user`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn relation_roles(
        &self,
        user: UserId,
        target: Option<&EntityRef>,
        only_roles: &RoleSet,
    ) -> Result<RoleSet, StoreError> {
        Ok(collect_roles(&self.active_relations(user, target, only_roles)?))
    }

    /// Effective roles of `account` in the context of `target`.
    ///
    /// The base is `main_roles` when non-empty, else the session roles. The
    /// roles of the account's active relations on `target` (all of them when
    /// `target` is `None`) are added.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn effective_roles(
        &self,
        account: &dyn Account,
        target: Option<&EntityRef>,
        main_roles: &RoleSet,
    ) -> Result<RoleSet, StoreError> {
        let mut roles = if main_roles.is_empty() {
            account.roles()
        } else {
            main_roles.clone()
        };
        roles.extend(self.relation_roles(account.id(), target, &RoleSet::new())?);
        debug!(account = account.id(), target = ?target.map(EntityRef::cache_tag), ?roles, "effective roles resolved");
        Ok(roles)
    }

    /// Relation roles only, for own-scoped checks.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn own_roles(
        &self,
        account: &dyn Account,
        target: Option<&EntityRef>,
        main_roles: &RoleSet,
    ) -> Result<OwnRoles, StoreError> {
        let relations = self.active_relations(account.id(), target, main_roles)?;
        if relations.is_empty() {
            return Ok(OwnRoles::NoRelation);
        }
        Ok(OwnRoles::Roles(collect_roles(&relations)))
    }

    /// Merge the roles of every active relation of `account` into its session
    /// roles and install the result in `slot`.
    ///
    /// Runs once per request: an account that was already augmented is
    /// returned unchanged and the slot is left alone.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn augment_session(
        &self,
        account: &SessionAccount,
        slot: &dyn AccountSlot,
    ) -> Result<SessionAccount, StoreError> {
        if account.is_augmented() || account.is_anonymous() {
            return Ok(account.clone());
        }
        let extra = self.relation_roles(account.id(), None, &RoleSet::new())?;
        let augmented = account.augmented_with(extra);
        info!(account = account.id(), roles = ?augmented.roles(), "session roles augmented");
        slot.set_active(augmented.clone());
        Ok(augmented)
    }
}

fn collect_roles(relations: &[Relation]) -> RoleSet {
    relations
        .iter()
        .filter_map(Relation::granted_role)
        .map(str::to_string)
        .collect()
}
