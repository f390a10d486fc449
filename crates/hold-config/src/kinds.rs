//! Per-kind access configuration.

use hold_core::enums::{CreateAccessRule, RelationKind};
use hold_core::permissions::KindLabels;
use serde::{Deserialize, Serialize};

/// Overrides for one relation kind. Unset fields use the kind's defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KindConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_access: Option<CreateAccessRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typed_label: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct KindsConfig {
    #[serde(default)]
    pub ownership: KindConfig,
    #[serde(default)]
    pub reference: KindConfig,
}

impl KindsConfig {
    #[must_use]
    pub const fn get(&self, kind: RelationKind) -> &KindConfig {
        match kind {
            RelationKind::Ownership => &self.ownership,
            RelationKind::Reference => &self.reference,
        }
    }

    /// How the create permissions of `kind` combine. Ownership defaults to
    /// `all`, references to `any`.
    #[must_use]
    pub fn create_rule(&self, kind: RelationKind) -> CreateAccessRule {
        self.get(kind).create_access.unwrap_or(match kind {
            RelationKind::Ownership => CreateAccessRule::All,
            RelationKind::Reference => CreateAccessRule::Any,
        })
    }

    #[must_use]
    pub fn labels(&self, kind: RelationKind) -> KindLabels {
        let defaults = KindLabels::for_kind(kind);
        let config = self.get(kind);
        KindLabels {
            common: config.common_label.clone().unwrap_or(defaults.common),
            typed: config.typed_label.clone().unwrap_or(defaults.typed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_differ_per_kind() {
        let kinds = KindsConfig::default();
        assert_eq!(kinds.create_rule(RelationKind::Ownership), CreateAccessRule::All);
        assert_eq!(kinds.create_rule(RelationKind::Reference), CreateAccessRule::Any);
        assert_eq!(kinds.labels(RelationKind::Ownership).common, "user ownership");
    }

    #[test]
    fn overrides_apply_field_by_field() {
        let kinds = KindsConfig {
            ownership: KindConfig {
                create_access: Some(CreateAccessRule::Any),
                common_label: None,
                typed_label: Some("claim".into()),
            },
            reference: KindConfig::default(),
        };
        assert_eq!(kinds.create_rule(RelationKind::Ownership), CreateAccessRule::Any);
        let labels = kinds.labels(RelationKind::Ownership);
        assert_eq!(labels.common, "user ownership");
        assert_eq!(labels.typed, "claim");
    }
}
