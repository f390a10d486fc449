//! Entry points of the access engine.
//!
//! [`AccessManager`] ties the relation service to the decision engine: it
//! claims entities, answers permission checks against relation-derived roles,
//! and guards listings.

use std::sync::Arc;

use hold_config::{HoldConfig, KindsConfig};
use hold_core::entities::{EntityRef, NewRelation, Relation};
use hold_core::enums::{FieldOperation, Operation, RelationKind};
use hold_core::ids::{RoleSet, UserId};
use hold_core::permissions::{self, PermissionDef};
use hold_store::{RelationFilter, RelationService, StoreError};
use tracing::{debug, info};

use crate::account::{Account, AccountSlot, SessionAccount};
use crate::decision::{AccessHandler, FieldTarget};
use crate::error::AccessError;
use crate::lookup::{PermissionLookup, RolePermissionMap};
use crate::result::{AccessResult, Cacheability};
use crate::roles::{OwnRoles, RoleResolver};

pub struct AccessManager {
    service: Arc<RelationService>,
    handler: AccessHandler,
    lookup: Arc<dyn PermissionLookup>,
    kinds: KindsConfig,
}

impl AccessManager {
    #[must_use]
    pub fn new(
        service: Arc<RelationService>,
        lookup: Arc<dyn PermissionLookup>,
        kinds: KindsConfig,
    ) -> Self {
        let handler = AccessHandler::new(
            service.store_handle(),
            Arc::clone(&lookup),
            kinds.clone(),
            service.permissions_tag(),
        );
        Self {
            service,
            handler,
            lookup,
            kinds,
        }
    }

    /// Build a manager whose permission lookup is the configured `[roles]` map.
    #[must_use]
    pub fn from_config(config: &HoldConfig, service: Arc<RelationService>) -> Self {
        Self::new(
            service,
            Arc::new(RolePermissionMap::from_config(config)),
            config.kinds.clone(),
        )
    }

    #[must_use]
    pub fn service(&self) -> &RelationService {
        &self.service
    }

    #[must_use]
    pub const fn handler(&self) -> &AccessHandler {
        &self.handler
    }

    fn resolver(&self) -> RoleResolver<'_> {
        RoleResolver::new(self.service.store())
    }

    /// Cacheability of results derived from relation roles: per user, until
    /// the entity or any relation changes.
    fn role_cacheability(&self, entity: Option<&EntityRef>) -> Cacheability {
        let mut tags = vec![self.service.permissions_tag().to_string()];
        tags.extend(entity.map(EntityRef::cache_tag));
        Cacheability::per_user(tags)
    }

    // -----------------------------------------------------------------------
    // Roles
    // -----------------------------------------------------------------------

    /// See [`RoleResolver::effective_roles`].
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn effective_roles(
        &self,
        account: &dyn Account,
        target: Option<&EntityRef>,
        main_roles: &RoleSet,
    ) -> Result<RoleSet, AccessError> {
        Ok(self.resolver().effective_roles(account, target, main_roles)?)
    }

    /// See [`RoleResolver::augment_session`].
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn augment_session(
        &self,
        account: &SessionAccount,
        slot: &dyn AccountSlot,
    ) -> Result<SessionAccount, AccessError> {
        Ok(self.resolver().augment_session(account, slot)?)
    }

    /// Whether any of `permissions` is granted to `account` through the roles
    /// it holds on `entity` (or anywhere, without an entity).
    ///
    /// When a permission name contains the word `own`, only relation roles
    /// count and an account without a matching active relation is refused.
    /// Otherwise the session roles are added. A non-empty `main_roles`
    /// restricts which relations are consulted to those granting one of them.
    ///
    /// Never returns `Neutral`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn dynamic_access_check<S: AsRef<str>>(
        &self,
        permissions: &[S],
        entity: Option<&EntityRef>,
        main_roles: &RoleSet,
        account: &dyn Account,
    ) -> Result<AccessResult, AccessError> {
        let cache = self.role_cacheability(entity);
        let is_own = permissions
            .iter()
            .any(|p| p.as_ref().split_whitespace().any(|word| word == "own"));

        let resolver = self.resolver();
        let roles = if is_own {
            match resolver.own_roles(account, entity, main_roles)? {
                OwnRoles::Roles(roles) => roles,
                OwnRoles::NoRelation => {
                    debug!(account = account.id(), entity = ?entity.map(EntityRef::cache_tag), "own check without relation");
                    return Ok(AccessResult::forbidden("no active relation on the entity").cached(cache));
                }
            }
        } else {
            let mut roles = account.roles();
            roles.extend(resolver.relation_roles(account.id(), entity, main_roles)?);
            roles
        };

        let granted = permissions
            .iter()
            .find(|p| self.lookup.any_grants(&roles, p.as_ref()))
            .map(|p| p.as_ref().to_string());
        debug!(account = account.id(), is_own, ?roles, granted = ?granted, "dynamic access check");

        Ok(AccessResult::allowed_if(granted.is_some(), || {
            "none of the permissions is granted".to_string()
        })
        .cached(cache))
    }

    // -----------------------------------------------------------------------
    // Claims
    // -----------------------------------------------------------------------

    /// Whether `account` may claim `entity` through the default ownership
    /// type of its bundle.
    ///
    /// Requires the type's typed create permission and a claim that would
    /// pass the evaluator.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the dry run fails for a reason other than
    /// a rejection.
    pub fn claim_access(&self, entity: &EntityRef, account: &dyn Account) -> Result<AccessResult, AccessError> {
        let cache = self.role_cacheability(Some(entity));
        if account.is_anonymous() {
            return Ok(AccessResult::forbidden("anonymous accounts cannot claim").cached(cache));
        }
        let Some(ty) = self.service.default_type(RelationKind::Ownership, entity) else {
            return Ok(AccessResult::forbidden(format!(
                "no ownership type targets {}",
                entity.bundle_key()
            ))
            .cached(cache));
        };

        let permission = permissions::create_typed(&self.kinds.labels(ty.kind), &ty.id);
        if !account.has_permission(&permission) {
            return Ok(AccessResult::forbidden(format!("missing permission \"{permission}\"")).cached(cache));
        }

        let draft = NewRelation::ownership(ty.id.clone(), account.id(), entity.clone());
        match self.service.validate_new(&draft) {
            Ok(()) => Ok(AccessResult::allowed().cached(cache)),
            Err(StoreError::Rejected(rejection)) => {
                Ok(AccessResult::forbidden(rejection.to_string()).cached(cache))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Claim `entity` for `account` with the default ownership type.
    ///
    /// The ownership starts in the type's initial state.
    ///
    /// # Errors
    ///
    /// Returns `AccessError::Denied` if [`Self::claim_access`] refuses, or the
    /// store's error if the write fails.
    pub fn claim(&self, entity: &EntityRef, account: &dyn Account) -> Result<Relation, AccessError> {
        let access = self.claim_access(entity, account)?;
        if !access.is_allowed() {
            let reason = access.reason().unwrap_or("claim refused").to_string();
            debug!(account = account.id(), entity = %entity.cache_tag(), %reason, "claim denied");
            return Err(AccessError::Denied(reason));
        }
        let ty = self
            .service
            .default_type(RelationKind::Ownership, entity)
            .ok_or_else(|| AccessError::Denied(format!("no ownership type targets {}", entity.bundle_key())))?;

        let draft = NewRelation::ownership(ty.id.clone(), account.id(), entity.clone());
        let relation = self.service.create(draft, Some(account.id()))?;
        info!(
            relation = %relation.id,
            account = account.id(),
            entity = %entity.cache_tag(),
            state = %relation.state,
            "entity claimed"
        );
        Ok(relation)
    }

    // -----------------------------------------------------------------------
    // Instance decisions
    // -----------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns the store's error if the scope query fails.
    pub fn check_access(
        &self,
        relation: &Relation,
        op: Operation,
        account: &dyn Account,
    ) -> Result<AccessResult, AccessError> {
        self.handler.check_access(relation, op, account)
    }

    /// # Errors
    ///
    /// Returns the store's error if the scope query fails.
    pub fn check_field_access(
        &self,
        target: FieldTarget<'_>,
        field_name: &str,
        op: FieldOperation,
        account: &dyn Account,
    ) -> Result<AccessResult, AccessError> {
        self.handler.check_field_access(target, field_name, op, account)
    }

    /// # Errors
    ///
    /// Returns `AccessError::Core` if `relation_type` is not registered.
    pub fn check_create_access(
        &self,
        account: &dyn Account,
        relation_type: &str,
    ) -> Result<AccessResult, AccessError> {
        let ty = self.service.registry().require(relation_type)?;
        Ok(self.handler.check_create_access(account, ty))
    }

    // -----------------------------------------------------------------------
    // Listings
    // -----------------------------------------------------------------------

    /// Whether `account` may list the relations of `kind` held by `user`.
    #[must_use]
    pub fn check_user_listing_access(&self, account: &dyn Account, user: UserId, kind: RelationKind) -> AccessResult {
        let permission = permissions::view_users(&self.kinds.labels(kind));
        let is_self = !account.is_anonymous() && account.id() == user;
        AccessResult::allowed_if(is_self || account.has_permission(&permission), || {
            format!("missing permission \"{permission}\"")
        })
        .cached(Cacheability::per_user([EntityRef::user(user).cache_tag()]))
    }

    /// Whether a route guarded by `permission` is open to `account`, counting
    /// the roles of all its active relations (of `relation_type` only, when
    /// given) next to its session roles.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn route_permission_access(
        &self,
        account: &dyn Account,
        permission: &str,
        relation_type: Option<&str>,
    ) -> Result<AccessResult, AccessError> {
        let mut roles = account.roles();
        if !account.is_anonymous() {
            let filter = RelationFilter::active().of_types(relation_type);
            let held = self.service.store().find_by_user(account.id(), &filter)?;
            roles.extend(held.iter().filter_map(Relation::granted_role).map(str::to_string));
        }
        let granted = self.lookup.any_grants(&roles, permission);
        debug!(account = account.id(), permission, ?relation_type, granted, "route access");
        Ok(AccessResult::allowed_if(granted, || format!("missing permission \"{permission}\""))
            .cached(self.role_cacheability(None)))
    }

    /// Whether a relation item is visible to `account`: always when active,
    /// else with the blanket view permission, or to an owner of the entity it
    /// hangs off with the own view permission.
    ///
    /// `entity_owner` is the host's owner of the relation's source entity;
    /// users made owners of it by a `makes_owner` relation count too.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the owner query fails.
    pub fn relation_visibility(
        &self,
        relation: &Relation,
        account: &dyn Account,
        entity_owner: Option<UserId>,
    ) -> Result<AccessResult, AccessError> {
        let cache = Cacheability::per_user([
            self.service.permissions_tag().to_string(),
            relation.id.cache_tag(),
            relation.source.cache_tag(),
        ]);
        if relation.is_active() || account.has_permission(permissions::VIEW_ANY_RELATION_ITEM) {
            return Ok(AccessResult::allowed().cached(cache));
        }
        let owns_entity = !account.is_anonymous()
            && (entity_owner == Some(account.id())
                || self.service.is_entity_owner(&relation.source, account.id())?);
        let visible = owns_entity && account.has_permission(permissions::VIEW_OWN_RELATION_ITEM);
        Ok(AccessResult::allowed_if(visible, || format!("relation {} is not visible", relation.id)).cached(cache))
    }

    /// Every permission the engine may consult for the registered types,
    /// named with the configured labels.
    #[must_use]
    pub fn permission_catalog(&self) -> Vec<PermissionDef> {
        permissions::catalog(self.service.registry(), |kind| self.kinds.labels(kind))
    }
}
