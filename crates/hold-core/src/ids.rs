//! Identifier types shared across crates.

use std::collections::BTreeSet;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Numeric id of a user account.
pub type UserId = u64;

/// Numeric id of a host-platform entity.
pub type EntityId = u64;

/// Machine name of a role (e.g. `"editor"`).
pub type RoleId = String;

/// De-duplicated, ordered set of role ids.
pub type RoleSet = BTreeSet<RoleId>;

/// Entity type used for user endpoints. Ownership relations always have a
/// source of this type.
pub const USER_ENTITY_TYPE: &str = "user";

/// Generated, monotonic id of a persisted relation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(transparent)]
pub struct RelationId(pub u64);

impl RelationId {
    /// Cache tag that access results for this relation depend on.
    #[must_use]
    pub fn cache_tag(self) -> String {
        format!("relation:{}", self.0)
    }
}

impl fmt::Display for RelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
