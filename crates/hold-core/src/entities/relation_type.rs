use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::bundle::BundleSpec;
use crate::entities::EntityRef;
use crate::enums::RelationKind;
use crate::errors::CoreError;
use crate::ids::RoleId;
use crate::state::RelationState;

/// Raw relation type as written in configuration.
///
/// Endpoint strings are validated by [`RelationType::from_def`]; nothing
/// downstream ever sees an unparsed bundle string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationTypeDef {
    pub id: String,
    #[serde(default)]
    pub label: String,
    pub kind: RelationKind,
    /// Ignored for ownership types, whose source is always a user.
    #[serde(default)]
    pub source_bundle: Option<String>,
    pub target_bundle: String,
    #[serde(default)]
    pub conflicts_with: BTreeSet<String>,
    /// `0` means unlimited.
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub target_roles: BTreeSet<RoleId>,
    #[serde(default)]
    pub makes_owner: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub auto_approve: bool,
}

/// Validated configuration of a class of relations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationType {
    pub id: String,
    pub label: String,
    pub kind: RelationKind,
    pub source_bundle: BundleSpec,
    pub target_bundle: BundleSpec,
    /// Declared conflicts, excluding the type itself.
    pub conflicts_with: BTreeSet<String>,
    pub limit: u32,
    pub target_roles: BTreeSet<RoleId>,
    pub makes_owner: bool,
    pub is_default: bool,
    pub auto_approve: bool,
}

impl RelationType {
    /// Validate a raw definition.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfiguration` for an empty id, malformed
    /// bundle strings, or a reference type without a source bundle.
    pub fn from_def(def: RelationTypeDef) -> Result<Self, CoreError> {
        if def.id.trim().is_empty() {
            return Err(CoreError::config("relation_types", "relation type id is empty"));
        }
        let source_bundle = match (def.kind, def.source_bundle.as_deref()) {
            (RelationKind::Ownership, _) => BundleSpec::user(),
            (RelationKind::Reference, Some(raw)) => BundleSpec::parse(raw)?,
            (RelationKind::Reference, None) => {
                return Err(CoreError::config(&def.id, "reference types require a source_bundle"));
            }
        };
        let target_bundle = BundleSpec::parse(&def.target_bundle)?;
        let label = if def.label.is_empty() {
            def.id.clone()
        } else {
            def.label
        };
        let mut conflicts_with = def.conflicts_with;
        conflicts_with.remove(&def.id);

        Ok(Self {
            id: def.id,
            label,
            kind: def.kind,
            source_bundle,
            target_bundle,
            conflicts_with,
            limit: def.limit,
            target_roles: def.target_roles,
            makes_owner: def.makes_owner,
            is_default: def.is_default,
            auto_approve: def.auto_approve,
        })
    }

    /// The type plus its declared conflicts; one per-user quota is shared by all.
    #[must_use]
    pub fn conflict_group(&self) -> BTreeSet<String> {
        let mut group = self.conflicts_with.clone();
        group.insert(self.id.clone());
        group
    }

    /// The positive limit, if one constrains this type.
    #[must_use]
    pub const fn effective_limit(&self) -> Option<u32> {
        if self.limit > 0 { Some(self.limit) } else { None }
    }

    /// Whether `role` may be attached to a relation of this type.
    #[must_use]
    pub fn allows_role(&self, role: &str) -> bool {
        self.target_roles.is_empty() || self.target_roles.contains(role)
    }

    #[must_use]
    pub fn accepts_source(&self, entity: &EntityRef) -> bool {
        self.source_bundle.matches(entity)
    }

    #[must_use]
    pub fn accepts_target(&self, entity: &EntityRef) -> bool {
        self.target_bundle.matches(entity)
    }

    /// State new relations of this type start in.
    #[must_use]
    pub const fn initial_state(&self) -> RelationState {
        if self.auto_approve {
            RelationState::ACTIVE
        } else {
            RelationState::NEW
        }
    }
}
