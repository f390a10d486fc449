//! Relation update builder.

use hold_core::entities::{EntityRef, Relation};
use hold_core::ids::{RoleId, UserId};
use hold_core::state::RelationState;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RelationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<EntityRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Option<RoleId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<RelationState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<UserId>>,
}

impl RelationUpdate {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.target.is_none() && self.role.is_none() && self.state.is_none() && self.owner.is_none()
    }

    /// Apply the set fields to `relation`.
    pub fn apply_to(self, relation: &mut Relation) {
        if let Some(target) = self.target {
            relation.target = target;
        }
        if let Some(role) = self.role {
            relation.role = role;
        }
        if let Some(state) = self.state {
            relation.state = state;
        }
        if let Some(owner) = self.owner {
            relation.owner = owner;
        }
    }
}

pub struct RelationUpdateBuilder(RelationUpdate);

impl Default for RelationUpdateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RelationUpdateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(RelationUpdate::default())
    }

    #[must_use]
    pub fn target(mut self, target: EntityRef) -> Self {
        self.0.target = Some(target);
        self
    }

    #[must_use]
    pub fn role(mut self, role: Option<RoleId>) -> Self {
        self.0.role = Some(role);
        self
    }

    #[must_use]
    pub fn state(mut self, state: RelationState) -> Self {
        self.0.state = Some(state);
        self
    }

    #[must_use]
    pub const fn owner(mut self, owner: Option<UserId>) -> Self {
        self.0.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn build(self) -> RelationUpdate {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_set_fields_serialize() {
        let update = RelationUpdateBuilder::new()
            .state(RelationState::ACTIVE)
            .role(None)
            .build();
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["state"], "active");
        assert!(json["role"].is_null());
        assert!(json.get("target").is_none());
        assert!(json.get("owner").is_none());
        assert!(!update.is_empty());
        assert!(RelationUpdate::default().is_empty());
    }
}
