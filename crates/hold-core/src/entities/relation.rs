use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::EntityRef;
use crate::enums::RelationKind;
use crate::ids::{RelationId, RoleId, UserId};
use crate::state::RelationState;

/// A persisted relation linking a user or source entity to a target entity.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Relation {
    pub id: RelationId,
    /// Relation type id. Immutable after creation.
    pub relation_type: String,
    pub kind: RelationKind,
    pub source: EntityRef,
    pub target: EntityRef,
    /// Role granted to the source user while the relation is active.
    pub role: Option<RoleId>,
    pub state: RelationState,
    /// Author of a reference. Ownerships leave this unset.
    pub owner: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub changed_at: DateTime<Utc>,
}

impl Relation {
    /// The user this relation belongs to, if the source is a user.
    #[must_use]
    pub fn source_user(&self) -> Option<UserId> {
        self.source.is_user().then_some(self.source.id)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// The role this relation currently grants: its role while active.
    #[must_use]
    pub fn granted_role(&self) -> Option<&str> {
        if self.is_active() {
            self.role.as_deref()
        } else {
            None
        }
    }
}

/// Draft of a relation that has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct NewRelation {
    pub relation_type: String,
    pub source: EntityRef,
    pub target: EntityRef,
    pub role: Option<RoleId>,
    /// Initial state. `None` uses the relation type's initial state.
    pub state: Option<RelationState>,
    pub owner: Option<UserId>,
}

impl NewRelation {
    /// Draft an ownership of `target` by `user`.
    #[must_use]
    pub fn ownership(relation_type: impl Into<String>, user: UserId, target: EntityRef) -> Self {
        Self::reference(relation_type, EntityRef::user(user), target)
    }

    /// Draft a reference from `source` to `target`.
    #[must_use]
    pub fn reference(relation_type: impl Into<String>, source: EntityRef, target: EntityRef) -> Self {
        Self {
            relation_type: relation_type.into(),
            source,
            target,
            role: None,
            state: None,
            owner: None,
        }
    }

    #[must_use]
    pub fn with_role(mut self, role: impl Into<RoleId>) -> Self {
        self.role = Some(role.into());
        self
    }

    #[must_use]
    pub fn with_state(mut self, state: RelationState) -> Self {
        self.state = Some(state);
        self
    }

    #[must_use]
    pub const fn with_owner(mut self, owner: UserId) -> Self {
        self.owner = Some(owner);
        self
    }

    #[must_use]
    pub fn source_user(&self) -> Option<UserId> {
        self.source.is_user().then_some(self.source.id)
    }
}
