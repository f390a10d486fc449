//! Integration tests for TOML configuration loading.
//!
//! Uses figment::Jail for safe, sandboxed env var manipulation.

use figment::{
    Figment, Jail,
    providers::{Env, Format, Serialized, Toml},
};
use hold_config::HoldConfig;
use hold_core::enums::{CreateAccessRule, RelationKind};

const TEAM_CONFIG: &str = r#"
[cache]
permissions_tag = "perm.cache"

[[relation_types]]
id = "member"
kind = "ownership"
target_bundle = "node:team"
conflicts_with = ["captain"]
limit = 1
target_roles = ["team_member"]

[[relation_types]]
id = "captain"
label = "Team captain"
kind = "ownership"
target_bundle = "node:team"
is_default = true
auto_approve = true

[[relation_types]]
id = "authored_by"
kind = "reference"
source_bundle = "node:article"
target_bundle = "node:author"

[roles.editor]
permissions = ["view any user ownership", "create stated entity reference"]

[roles.admin]
is_admin = true
"#;

#[test]
fn loads_relation_types_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", TEAM_CONFIG)?;

        let config: HoldConfig = Figment::from(Serialized::defaults(HoldConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        assert_eq!(config.cache.permissions_tag, "perm.cache");
        assert_eq!(config.relation_types.len(), 3);

        let registry = config.registry().map_err(|e| e.to_string())?;
        let member = registry.require("member").map_err(|e| e.to_string())?;
        assert_eq!(member.effective_limit(), Some(1));
        assert!(member.allows_role("team_member"));
        assert!(!member.allows_role("captain"));

        let captain = registry.require("captain").map_err(|e| e.to_string())?;
        assert_eq!(captain.label, "Team captain");
        assert!(captain.initial_state().is_active());

        let reference = registry.require("authored_by").map_err(|e| e.to_string())?;
        assert_eq!(reference.kind, RelationKind::Reference);
        assert_eq!(reference.source_bundle.to_string(), "node:article");
        Ok(())
    });
}

#[test]
fn loads_roles_from_toml() {
    Jail::expect_with(|jail| {
        jail.create_file("config.toml", TEAM_CONFIG)?;

        let config: HoldConfig = Figment::from(Serialized::defaults(HoldConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        let editor = &config.roles["editor"];
        assert!(editor.grants("view any user ownership"));
        assert!(!editor.grants("administer user ownership types"));
        assert!(config.roles["admin"].is_admin);
        Ok(())
    });
}

#[test]
fn malformed_bundle_fails_registry_not_extraction() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[[relation_types]]
id = "broken"
kind = "ownership"
target_bundle = "node:team:extra"
"#,
        )?;

        let config: HoldConfig = Figment::from(Serialized::defaults(HoldConfig::default()))
            .merge(Toml::file("config.toml"))
            .extract()?;

        let err = config.registry().unwrap_err();
        assert!(err.to_string().contains("node:team:extra"), "{err}");
        Ok(())
    });
}

#[test]
fn invalid_workflow_is_rejected_on_load() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[workflow]
states = ["new", "active"]
"#,
        )?;

        let figment = Figment::from(Serialized::defaults(HoldConfig::default()))
            .merge(Toml::file("config.toml"));
        assert!(HoldConfig::from_figment(&figment).is_err());
        Ok(())
    });
}

#[test]
fn env_overrides_toml() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "config.toml",
            r#"
[kinds.ownership]
create_access = "all"
"#,
        )?;
        jail.set_env("HOLDFAST_KINDS__OWNERSHIP__CREATE_ACCESS", "any");

        let config: HoldConfig = Figment::from(Serialized::defaults(HoldConfig::default()))
            .merge(Toml::file("config.toml"))
            .merge(Env::prefixed("HOLDFAST_").split("__"))
            .extract()?;

        assert_eq!(
            config.kinds.create_rule(RelationKind::Ownership),
            CreateAccessRule::Any
        );
        Ok(())
    });
}

#[test]
fn project_config_is_picked_up_by_default_chain() {
    Jail::expect_with(|jail| {
        jail.create_dir(".holdfast")?;
        jail.create_file(".holdfast/config.toml", TEAM_CONFIG)?;

        let config = HoldConfig::load().map_err(|e| e.to_string())?;
        assert_eq!(config.cache.permissions_tag, "perm.cache");
        assert_eq!(config.registry().map_err(|e| e.to_string())?.len(), 3);
        Ok(())
    });
}
