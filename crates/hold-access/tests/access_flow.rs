//! Access decisions driven by a TOML configuration.

use std::sync::Arc;

use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use hold_access::{AccessManager, Account, RequestSlot, RolePermissionMap, SessionAccount, Verdict};
use hold_config::HoldConfig;
use hold_core::entities::{EntityRef, NewRelation};
use hold_core::enums::Operation;
use hold_core::ids::RoleSet;
use hold_core::state::RelationState;
use hold_store::RelationService;
use hold_store::cache::InvalidationLog;
use hold_store::memory::MemoryRelationStore;
use hold_store::updates::relation::RelationUpdateBuilder;
use pretty_assertions::assert_eq;

const CONFIG: &str = r#"
[[relation_types]]
id = "claim"
kind = "ownership"
target_bundle = "node:team"
is_default = true

[[relation_types]]
id = "captain"
kind = "ownership"
target_bundle = "node:team"
auto_approve = true

[roles.editor]
permissions = ["view any user ownership"]

[roles.curator]
permissions = ["edit own team", "edit any ownership: claim"]

[roles.player]
permissions = ["create ownership: claim"]
"#;

struct Setup {
    manager: AccessManager,
    lookup: Arc<RolePermissionMap>,
    cache: Arc<InvalidationLog>,
}

fn setup() -> Setup {
    let figment = Figment::from(Serialized::defaults(HoldConfig::default())).merge(Toml::string(CONFIG));
    let config = HoldConfig::from_figment(&figment).unwrap();
    let cache = Arc::new(InvalidationLog::new());
    let service = RelationService::from_config(&config, Arc::new(MemoryRelationStore::new()), cache.clone()).unwrap();
    Setup {
        manager: AccessManager::from_config(&config, Arc::new(service)),
        lookup: Arc::new(RolePermissionMap::from_config(&config)),
        cache,
    }
}

impl Setup {
    fn account(&self, id: u64, roles: &[&str]) -> SessionAccount {
        SessionAccount::new(id, roles.iter().copied(), self.lookup.clone())
    }
}

fn team(id: u64) -> EntityRef {
    EntityRef::new("node", "team", id)
}

fn roles(names: &[&str]) -> RoleSet {
    names.iter().map(|n| (*n).to_string()).collect()
}

#[test]
fn scenario_d_relation_roles_are_entity_scoped() {
    let s = setup();
    s.manager
        .service()
        .create(NewRelation::ownership("captain", 5, team(1)).with_role("curator"), None)
        .unwrap();
    let account = s.account(5, &["editor"]);

    assert_eq!(
        s.manager.effective_roles(&account, Some(&team(1)), &RoleSet::new()).unwrap(),
        roles(&["curator", "editor"])
    );
    assert_eq!(
        s.manager.effective_roles(&account, Some(&team(2)), &RoleSet::new()).unwrap(),
        roles(&["editor"])
    );
}

#[test]
fn own_scope_without_relations_is_forbidden() {
    let s = setup();
    // Session roles grant the permission, but no relation backs it.
    let account = s.account(5, &["curator"]);
    let result = s
        .manager
        .dynamic_access_check(&["edit own team"], Some(&team(1)), &RoleSet::new(), &account)
        .unwrap();
    assert_eq!(result.verdict, Verdict::Forbidden);
}

#[test]
fn claim_grants_roles_once_active() {
    let s = setup();
    let player = s.account(5, &["player"]);
    let relation = s.manager.claim(&team(3), &player).unwrap();
    assert_eq!(relation.state, RelationState::NEW);

    let check = |account: &SessionAccount| {
        s.manager
            .dynamic_access_check(&["edit own team"], Some(&team(3)), &RoleSet::new(), account)
            .unwrap()
            .verdict
    };
    assert_eq!(check(&player), Verdict::Forbidden);

    let service = s.manager.service();
    service
        .update(
            relation.id,
            RelationUpdateBuilder::new()
                .role(Some("curator".into()))
                .state(RelationState::ACTIVE)
                .build(),
        )
        .unwrap();
    assert_eq!(check(&player), Verdict::Allowed);
    assert!(s.cache.count("user.permissions") >= 2);
}

#[test]
fn instance_access_through_configured_roles() {
    let s = setup();
    let player = s.account(5, &["player"]);
    let relation = s.manager.claim(&team(3), &player).unwrap();

    let editor = s.account(8, &["editor"]);
    assert!(s.manager.check_access(&relation, Operation::View, &editor).unwrap().is_allowed());
    assert!(s.manager.check_access(&relation, Operation::Update, &editor).unwrap().is_neutral());

    let curator = s.account(8, &["curator"]);
    assert!(s.manager.check_access(&relation, Operation::Update, &curator).unwrap().is_allowed());
}

#[test]
fn augmented_session_carries_relation_roles() {
    let s = setup();
    s.manager
        .service()
        .create(NewRelation::ownership("captain", 5, team(1)).with_role("curator"), None)
        .unwrap();
    let account = s.account(5, &["editor"]);
    let slot = RequestSlot::new(account.clone());

    let augmented = s.manager.augment_session(&account, &slot).unwrap();
    assert!(augmented.has_permission("edit any ownership: claim"));
    assert!(!account.has_permission("edit any ownership: claim"));
}
