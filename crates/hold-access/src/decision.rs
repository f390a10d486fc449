//! Instance, field and create access decisions for relations.

use std::sync::Arc;

use hold_config::KindsConfig;
use hold_core::entities::{Relation, RelationType};
use hold_core::enums::{FieldOperation, ManagedField, Operation, RelationKind, Scope};
use hold_core::ids::RoleSet;
use hold_core::permissions::{self, KindLabels};
use hold_store::{RelationFilter, RelationStore};
use tracing::debug;

use crate::account::Account;
use crate::error::AccessError;
use crate::lookup::PermissionLookup;
use crate::result::{AccessResult, Cacheability};

/// The relation a field check is evaluated against.
#[derive(Debug, Clone, Copy)]
pub enum FieldTarget<'a> {
    /// A relation still being created.
    New {
        kind: RelationKind,
        relation_type: &'a str,
    },
    Existing(&'a Relation),
}

impl FieldTarget<'_> {
    const fn kind(&self) -> RelationKind {
        match self {
            Self::New { kind, .. } => *kind,
            Self::Existing(relation) => relation.kind,
        }
    }
}

/// How an account stands towards one relation.
struct Standing {
    scope: Scope,
    /// Session roles, plus relation roles on the target outside `any` scope.
    roles: RoleSet,
}

pub struct AccessHandler {
    store: Arc<dyn RelationStore>,
    lookup: Arc<dyn PermissionLookup>,
    kinds: KindsConfig,
    /// Tag the relation service invalidates on every mutation.
    permissions_tag: String,
}

impl AccessHandler {
    #[must_use]
    pub fn new(
        store: Arc<dyn RelationStore>,
        lookup: Arc<dyn PermissionLookup>,
        kinds: KindsConfig,
        permissions_tag: impl Into<String>,
    ) -> Self {
        Self {
            store,
            lookup,
            kinds,
            permissions_tag: permissions_tag.into(),
        }
    }

    #[must_use]
    pub fn labels(&self, kind: RelationKind) -> KindLabels {
        self.kinds.labels(kind)
    }

    /// `own` for the relation's source user, `inherited` when the account
    /// holds another active relation on the same target, else `any`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the query fails.
    pub fn scope(&self, relation: &Relation, account: &dyn Account) -> Result<Scope, AccessError> {
        Ok(self.standing(relation, account)?.scope)
    }

    fn standing(&self, relation: &Relation, account: &dyn Account) -> Result<Standing, AccessError> {
        let mut roles = account.roles();
        if account.is_anonymous() {
            return Ok(Standing {
                scope: Scope::Any,
                roles,
            });
        }

        let held = self
            .store
            .find_by_user_and_target(account.id(), &relation.target, &RelationFilter::active())?;
        let scope = if relation.source_user() == Some(account.id()) {
            Scope::Own
        } else if held.iter().any(|other| other.id != relation.id) {
            Scope::Inherited
        } else {
            Scope::Any
        };
        if scope != Scope::Any {
            roles.extend(held.iter().filter_map(Relation::granted_role).map(str::to_string));
        }
        Ok(Standing { scope, roles })
    }

    /// Per-user cacheability of a decision on `relation`. The account's
    /// standing rests on its other relations on the target, so the result
    /// also carries the permissions tag.
    fn relation_cacheability(&self, relation: &Relation) -> Cacheability {
        Cacheability::per_user([self.permissions_tag.clone(), relation.id.cache_tag()])
    }

    /// Decide `op` on an existing relation.
    ///
    /// The first instance rule whose gate is open and whose permission the
    /// account's roles grant allows. No match is `Neutral`, as is `Create`,
    /// which is decided per type by [`Self::check_create_access`].
    ///
    /// # Errors
    ///
    /// Returns the store's error if the scope query fails.
    pub fn check_access(
        &self,
        relation: &Relation,
        op: Operation,
        account: &dyn Account,
    ) -> Result<AccessResult, AccessError> {
        match op {
            Operation::Create => return Ok(AccessResult::neutral()),
            Operation::View | Operation::Update | Operation::Delete => {}
        }

        let standing = self.standing(relation, account)?;
        let cache = self.relation_cacheability(relation);
        let labels = self.labels(relation.kind);
        let active = relation.is_active();

        let matched = permissions::instance_rules(op, &labels, &relation.relation_type)
            .into_iter()
            .find(|rule| {
                rule.gate.is_open(standing.scope, active)
                    && self.lookup.any_grants(&standing.roles, &rule.permission)
            });

        if let Some(rule) = matched {
            debug!(
                relation = %relation.id,
                account = account.id(),
                op = %op,
                scope = %standing.scope,
                permission = %rule.permission,
                "access allowed"
            );
            return Ok(AccessResult::allowed().cached(cache));
        }
        debug!(relation = %relation.id, account = account.id(), op = %op, scope = %standing.scope, "no access rule matched");
        Ok(AccessResult::neutral().cached(cache))
    }

    /// Decide an operation on one field of a relation.
    ///
    /// Only `edit` on the managed fields is governed here; anything else is
    /// allowed.
    ///
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
        let Some(field) = ManagedField::from_name(field_name) else {
            return Ok(AccessResult::allowed());
        };
        if op != FieldOperation::Edit {
            return Ok(AccessResult::allowed());
        }

        let kind = target.kind();
        let labels = self.labels(kind);
        let label = field.label(kind);

        let relation = match target {
            FieldTarget::New { relation_type, .. } => {
                let permission = permissions::field_new(op, &labels, label);
                let granted = account.has_permission(&permission);
                debug!(account = account.id(), relation_type, field = label, granted, "new relation field access");
                return Ok(AccessResult::allowed_if(granted, || {
                    format!("missing permission \"{permission}\"")
                }));
            }
            FieldTarget::Existing(relation) => relation,
        };

        let cache = self.relation_cacheability(relation);
        if account.has_permission(&permissions::field_common(op, &labels, label)) {
            return Ok(AccessResult::allowed().cached(cache));
        }

        let standing = self.standing(relation, account)?;
        let mut scopes = vec![Scope::Any];
        if standing.scope != Scope::Any {
            scopes.push(standing.scope);
        }
        let granted = scopes.into_iter().any(|scope| {
            let permission =
                permissions::field_scoped(op, scope, &labels, &relation.relation_type, label);
            self.lookup.any_grants(&standing.roles, &permission)
        });
        debug!(
            relation = %relation.id,
            account = account.id(),
            field = label,
            scope = %standing.scope,
            granted,
            "field access"
        );
        Ok(AccessResult::allowed_if(granted, || {
            format!("may not edit field {label} of relation {}", relation.id)
        })
        .cached(cache))
    }

    /// Whether `account` may create relations of `ty`.
    ///
    /// The kind's two create permissions are combined by its configured rule.
    #[must_use]
    pub fn check_create_access(&self, account: &dyn Account, ty: &RelationType) -> AccessResult {
        let labels = self.labels(ty.kind);
        let names = permissions::create_permissions(ty.kind, &labels, &ty.id);
        let grants = names.each_ref().map(|name| account.has_permission(name));
        let rule = self.kinds.create_rule(ty.kind);
        let granted = rule.combine(&grants);
        debug!(account = account.id(), relation_type = %ty.id, rule = %rule, granted, "create access");

        AccessResult::allowed_if(granted, || {
            format!("requires {rule} of \"{}\", \"{}\"", names[0], names[1])
        })
        .cached(Cacheability::permanent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::helpers::{Fixture, team};
    use hold_config::KindConfig;
    use hold_core::enums::CreateAccessRule;
    use rstest::rstest;

    #[test]
    fn scope_follows_the_account_standing() {
        let f = Fixture::new();
        let mine = f.active_claim(5, team(1), "curator");
        let theirs = f.active_claim(6, team(1), "member");
        let elsewhere = f.active_claim(6, team(2), "member");
        let account = f.account(5, &[]);
        let handler = f.handler();

        assert_eq!(handler.scope(&mine, &account).unwrap(), Scope::Own);
        assert_eq!(handler.scope(&theirs, &account).unwrap(), Scope::Inherited);
        assert_eq!(handler.scope(&elsewhere, &account).unwrap(), Scope::Any);
    }

    #[test]
    fn create_is_neutral_for_instances() {
        let f = Fixture::new();
        let relation = f.active_claim(5, team(1), "curator");
        let account = f.account(1, &["admin"]);
        let result = f.handler().check_access(&relation, Operation::Create, &account).unwrap();
        assert!(result.is_neutral());
    }

    #[test]
    fn unmatched_rules_stay_neutral_and_per_user() {
        let f = Fixture::new();
        let relation = f.active_claim(5, team(1), "curator");
        let result = f
            .handler()
            .check_access(&relation, Operation::Delete, &f.account(9, &["editor"]))
            .unwrap();
        assert!(result.is_neutral());
        assert!(result.cacheability.per_user);
        assert_eq!(
            result.cacheability.tags,
            vec!["user.permissions".to_string(), relation.id.cache_tag()]
        );
    }

    #[rstest]
    #[case::any_permission("edit any user ownership", true, true)]
    #[case::active_only_when_active("edit active user ownership", true, true)]
    #[case::active_gate_closed("edit active user ownership", false, false)]
    #[case::typed_any("edit any ownership: claim", false, true)]
    #[case::administer("administer user ownership types", false, true)]
    fn instance_rules_by_state(#[case] permission: &str, #[case] active: bool, #[case] allowed: bool) {
        let f = Fixture::with_roles(|map| map.with_role("operator", [permission]));
        let relation = if active {
            f.active_claim(5, team(1), "curator")
        } else {
            f.pending_claim(5, team(1))
        };
        let result = f
            .handler()
            .check_access(&relation, Operation::Update, &f.account(9, &["operator"]))
            .unwrap();
        assert_eq!(result.is_allowed(), allowed, "{permission}");
    }

    #[test]
    fn own_rule_needs_own_scope() {
        let f = Fixture::with_roles(|map| map.with_role("member", ["view own ownership: claim"]));
        let mine = f.pending_claim(5, team(1));
        let theirs = f.pending_claim(6, team(2));
        let account = f.account(5, &["member"]);
        let handler = f.handler();

        assert!(handler.check_access(&mine, Operation::View, &account).unwrap().is_allowed());
        assert!(handler.check_access(&theirs, Operation::View, &account).unwrap().is_neutral());
    }

    #[test]
    fn inherited_rule_uses_relation_roles() {
        // Only the curator role, held through a relation, grants the rule.
        let f = Fixture::with_roles(|map| {
            map.with_role("curator", ["delete inherited ownership: claim"])
        });
        f.active_claim(5, team(1), "curator");
        let theirs = f.active_claim(6, team(1), "member");
        let handler = f.handler();

        assert!(
            handler
                .check_access(&theirs, Operation::Delete, &f.account(5, &[]))
                .unwrap()
                .is_allowed()
        );
        assert!(
            handler
                .check_access(&theirs, Operation::Delete, &f.account(7, &["curator"]))
                .unwrap()
                .is_neutral(),
            "session roles alone do not make the scope inherited"
        );
    }

    #[test]
    fn inherited_results_are_dropped_with_the_inheriting_relation() {
        let f = Fixture::with_roles(|map| map.with_role("member", ["view inherited ownership: claim"]));
        let theirs = f.active_claim(6, team(1), "member");
        let mine = f.active_claim(9, team(1), "member");
        let account = f.account(9, &[]);
        let handler = f.handler();

        let cached = handler.check_access(&theirs, Operation::View, &account).unwrap();
        assert!(cached.is_allowed());

        f.cache.clear();
        f.svc.cancel(mine.id).unwrap();
        let invalidated: Vec<String> = f.cache.calls().concat();
        assert!(
            cached.cacheability.tags.iter().any(|tag| invalidated.contains(tag)),
            "cached {:?} survives invalidation of {invalidated:?}",
            cached.cacheability.tags
        );
        assert!(handler.check_access(&theirs, Operation::View, &account).unwrap().is_neutral());
    }

    #[test]
    fn field_access_for_new_relations() {
        let f = Fixture::with_roles(|map| map.with_role("editor", ["edit new user ownership: field node"]));
        let handler = f.handler();
        let target = FieldTarget::New {
            kind: RelationKind::Ownership,
            relation_type: "claim",
        };
        let editor = f.account(5, &["editor"]);

        assert!(handler.check_field_access(target, "entity_id", FieldOperation::Edit, &editor).unwrap().is_allowed());
        assert!(handler.check_field_access(target, "role_id", FieldOperation::Edit, &editor).unwrap().is_forbidden());
        assert!(handler.check_field_access(target, "role_id", FieldOperation::View, &editor).unwrap().is_allowed());
        assert!(handler.check_field_access(target, "created", FieldOperation::Edit, &editor).unwrap().is_allowed());
    }

    #[test]
    fn field_access_for_existing_relations() {
        let f = Fixture::with_roles(|map| {
            map.with_role("editor", ["edit ownership field role"])
                .with_role("member", ["edit own ownership: claim field role"])
        });
        let relation = f.active_claim(5, team(1), "curator");
        let handler = f.handler();
        let target = FieldTarget::Existing(&relation);

        let common = f.account(9, &["editor"]);
        let owner = f.account(5, &["member"]);
        let stranger = f.account(9, &["member"]);

        assert!(handler.check_field_access(target, "role", FieldOperation::Edit, &common).unwrap().is_allowed());
        assert!(handler.check_field_access(target, "role", FieldOperation::Edit, &owner).unwrap().is_allowed());
        let denied = handler
            .check_field_access(target, "role", FieldOperation::Edit, &stranger)
            .unwrap();
        assert!(denied.is_forbidden());
        assert!(denied.reason().is_some());
    }

    #[test]
    fn field_access_through_inherited_scope() {
        let f = Fixture::with_roles(|map| map.with_role("curator", ["edit inherited ownership: claim field role"]));
        let theirs = f.active_claim(6, team(1), "member");
        let elsewhere = f.active_claim(6, team(2), "member");
        f.active_claim(5, team(1), "curator");
        let handler = f.handler();
        let account = f.account(5, &[]);

        let allowed = handler
            .check_field_access(FieldTarget::Existing(&theirs), "role", FieldOperation::Edit, &account)
            .unwrap();
        assert!(allowed.is_allowed());
        assert!(allowed.cacheability.tags.contains(&"user.permissions".to_string()));

        // No relation on the other team, so the curator role is not held there.
        assert!(
            handler
                .check_field_access(FieldTarget::Existing(&elsewhere), "role", FieldOperation::Edit, &account)
                .unwrap()
                .is_forbidden()
        );
    }

    #[rstest]
    #[case::both(&["add user ownership", "create ownership: claim"], true)]
    #[case::blanket_only(&["add user ownership"], false)]
    #[case::typed_only(&["create ownership: claim"], false)]
    fn ownership_create_needs_both(#[case] granted: &[&str], #[case] allowed: bool) {
        let f = Fixture::with_roles(|map| map.with_role("creator", granted.iter().copied()));
        let ty = f.svc.registry().require("claim").unwrap();
        let result = f.handler().check_create_access(&f.account(5, &["creator"]), ty);
        assert_eq!(result.is_allowed(), allowed);
        assert!(result.cacheability.permanent);
    }

    #[rstest]
    #[case::create(&["create stated entity reference"], true)]
    #[case::administer(&["administer stated entity reference types"], true)]
    #[case::neither(&["add user ownership"], false)]
    fn reference_create_needs_either(#[case] granted: &[&str], #[case] allowed: bool) {
        let f = Fixture::with_roles(|map| map.with_role("creator", granted.iter().copied()));
        let ty = f.svc.registry().require("authored_by").unwrap();
        let result = f.handler().check_create_access(&f.account(5, &["creator"]), ty);
        assert_eq!(result.is_allowed(), allowed);
    }

    #[test]
    fn create_rule_is_configurable() {
        let f = Fixture::with_roles(|map| map.with_role("creator", ["add user ownership"]));
        let kinds = KindsConfig {
            ownership: KindConfig {
                create_access: Some(CreateAccessRule::Any),
                ..KindConfig::default()
            },
            ..KindsConfig::default()
        };
        let handler = AccessHandler::new(f.svc.store_handle(), f.lookup.clone(), kinds, "user.permissions");
        let ty = f.svc.registry().require("claim").unwrap();
        assert!(handler.check_create_access(&f.account(5, &["creator"]), ty).is_allowed());
    }
}
