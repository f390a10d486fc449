//! Store error types for hold-store.

use std::fmt;

use hold_config::ConfigError;
use hold_core::errors::CoreError;
use thiserror::Error;

/// Which quota a rejected relation would have exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaScope {
    /// Relations of any state held by the source user across the conflict group.
    UserQuota,
    /// Active relations of the type on the target entity.
    TargetFull,
}

impl fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::UserQuota => "already holds the maximum number of relations in this conflict group",
            Self::TargetFull => "already has the maximum number of active relations of this type",
        })
    }
}

/// Reasons the evaluator refuses a relation. Always raised before any write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Quota exceeded for '{relation_type}': {subject} {scope} ({count}/{limit})")]
    QuotaExceeded {
        scope: QuotaScope,
        relation_type: String,
        /// `"user:{id}"` for user quotas, the target's cache tag otherwise.
        subject: String,
        count: usize,
        limit: u32,
    },

    #[error("A '{relation_type}' relation from {source_entity} to {target} already exists")]
    DuplicateRelation {
        relation_type: String,
        source_entity: String,
        target: String,
    },

    #[error("'{relation_type}' does not accept {entity} as {endpoint} (expected {expected})")]
    EndpointMismatch {
        relation_type: String,
        endpoint: &'static str,
        entity: String,
        expected: String,
    },

    #[error("Role '{role}' cannot be attached to '{relation_type}' relations")]
    RoleNotAllowed { relation_type: String, role: String },
}

impl Rejection {
    /// The exceeded quota, for quota rejections.
    #[must_use]
    pub const fn quota_scope(&self) -> Option<QuotaScope> {
        match self {
            Self::QuotaExceeded { scope, .. } => Some(*scope),
            _ => None,
        }
    }
}

/// Errors from relation store and service operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A store query failed.
    #[error("Query failed: {0}")]
    Query(String),

    /// Expected a record but none was found.
    #[error("No result returned")]
    NoResult,

    /// Invalid state encountered (e.g., an immutable field was changed).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The evaluator refused the write.
    #[error("Relation rejected: {0}")]
    Rejected(#[from] Rejection),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl StoreError {
    /// The rejection behind this error, if the evaluator refused the write.
    #[must_use]
    pub const fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Rejected(rejection) => Some(rejection),
            _ => None,
        }
    }

    #[must_use]
    pub fn quota_scope(&self) -> Option<QuotaScope> {
        self.rejection().and_then(Rejection::quota_scope)
    }
}
