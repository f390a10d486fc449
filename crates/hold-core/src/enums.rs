//! Relation kinds, lifecycle events, operations and scopes for Holdfast.
//!
//! All enums use `snake_case` serialization via `#[serde(rename_all = "snake_case")]`
//! and expose `as_str()` for the strings that appear in permission names and
//! event names.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RelationKind
// ---------------------------------------------------------------------------

/// Which subsystem a relation type belongs to.
///
/// Ownership relations link a user to a target entity (claims, co-owners).
/// Reference relations link an arbitrary source entity to a target entity and
/// are unique per `(type, source, target)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Ownership,
    Reference,
}

impl RelationKind {
    pub const ALL: [Self; 2] = [Self::Ownership, Self::Reference];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ownership => "ownership",
            Self::Reference => "reference",
        }
    }

    /// Whether `(type, source, target)` must be unique for this kind.
    #[must_use]
    pub const fn requires_unique_endpoints(self) -> bool {
        matches!(self, Self::Reference)
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// LifecycleEvent
// ---------------------------------------------------------------------------

/// Domain event dispatched after a relation mutation commits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleEvent {
    Created,
    Updated,
    Activated,
    Canceled,
    Deleted,
}

impl LifecycleEvent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Activated => "activated",
            Self::Canceled => "canceled",
            Self::Deleted => "deleted",
        }
    }

    /// Fully qualified event name, e.g. `"holdfast.ownership.created"`.
    #[must_use]
    pub fn event_name(self, kind: RelationKind) -> String {
        format!("holdfast.{}.{}", kind.as_str(), self.as_str())
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// Entity-level operation an access check is evaluated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    View,
    Update,
    Delete,
    Create,
}

impl Operation {
    pub const ALL: [Self; 4] = [Self::View, Self::Update, Self::Delete, Self::Create];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Create => "create",
        }
    }

    /// Verb used in permission names. `Update` is spelled `edit`.
    #[must_use]
    pub const fn verb(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Update => "edit",
            Self::Delete => "delete",
            Self::Create => "create",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// FieldOperation
// ---------------------------------------------------------------------------

/// Field-level operation. Only `Edit` is governed by relation permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldOperation {
    View,
    Edit,
}

impl FieldOperation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::View => "view",
            Self::Edit => "edit",
        }
    }
}

impl fmt::Display for FieldOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ManagedField
// ---------------------------------------------------------------------------

/// Relation fields whose edit access is decided by relation permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ManagedField {
    Source,
    Target,
    Role,
}

impl ManagedField {
    pub const ALL: [Self; 3] = [Self::Source, Self::Target, Self::Role];

    /// Resolve a stored field name. Unknown names are not managed.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "user_id" | "source_entity_id" | "source" => Some(Self::Source),
            "entity_id" | "target_entity_id" | "target" => Some(Self::Target),
            "role_id" | "role" => Some(Self::Role),
            _ => None,
        }
    }

    /// Short label used in permission names, which differs per kind
    /// (`user` / `node` / `role` for ownerships).
    #[must_use]
    pub const fn label(self, kind: RelationKind) -> &'static str {
        match (kind, self) {
            (RelationKind::Ownership, Self::Source) => "user",
            (RelationKind::Ownership, Self::Target) => "node",
            (RelationKind::Reference, Self::Source) => "source",
            (RelationKind::Reference, Self::Target) => "target",
            (_, Self::Role) => "role",
        }
    }
}

// ---------------------------------------------------------------------------
// Scope
// ---------------------------------------------------------------------------

/// How the requesting account relates to the relation being checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// The account is the relation's source user.
    Own,
    /// The account holds a different active relation on the same target.
    Inherited,
    /// Neither; administrative fallback.
    Any,
}

impl Scope {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Inherited => "inherited",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// CreateAccessRule
// ---------------------------------------------------------------------------

/// How the two create permissions of a kind combine.
///
/// Ownership requires both the blanket and the type-specific permission;
/// references accept either the create or the administer permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum CreateAccessRule {
    All,
    Any,
}

impl CreateAccessRule {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Any => "any",
        }
    }

    /// Combine the individual grant results according to this rule.
    #[must_use]
    pub fn combine(self, grants: &[bool]) -> bool {
        match self {
            Self::All => !grants.is_empty() && grants.iter().all(|g| *g),
            Self::Any => grants.iter().any(|g| *g),
        }
    }
}

impl fmt::Display for CreateAccessRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
