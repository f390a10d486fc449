use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, USER_ENTITY_TYPE};

/// Pointer to a host-platform entity occupying a relation endpoint.
///
/// Identity is `(entity_type, id)`; `bundle` is carried so endpoint specs can
/// be checked without loading the entity. An `id` of `0` marks an entity that
/// has not been persisted yet.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub struct EntityRef {
    pub entity_type: String,
    pub bundle: String,
    pub id: EntityId,
}

impl EntityRef {
    #[must_use]
    pub fn new(entity_type: impl Into<String>, bundle: impl Into<String>, id: EntityId) -> Self {
        Self {
            entity_type: entity_type.into(),
            bundle: bundle.into(),
            id,
        }
    }

    /// A user account as a relation endpoint.
    #[must_use]
    pub fn user(id: EntityId) -> Self {
        Self::new(USER_ENTITY_TYPE, USER_ENTITY_TYPE, id)
    }

    #[must_use]
    pub fn is_user(&self) -> bool {
        self.entity_type == USER_ENTITY_TYPE
    }

    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.id != 0
    }

    /// Same entity, ignoring the bundle.
    #[must_use]
    pub fn same_entity(&self, other: &Self) -> bool {
        self.id == other.id && self.entity_type == other.entity_type
    }

    /// `"entityType:bundle"`, the key default relation types are looked up by.
    #[must_use]
    pub fn bundle_key(&self) -> String {
        format!("{}:{}", self.entity_type, self.bundle)
    }

    /// `"entityType:id"`, the cache tag of the entity itself.
    #[must_use]
    pub fn cache_tag(&self) -> String {
        format!("{}:{}", self.entity_type, self.id)
    }
}
