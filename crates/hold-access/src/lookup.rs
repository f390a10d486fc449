//! Permission-in-roles lookup.

use std::collections::{BTreeMap, BTreeSet};

use hold_config::{HoldConfig, RoleConfig};
use hold_core::ids::RoleSet;

/// Answers whether a set of roles grants a permission.
pub trait PermissionLookup: Send + Sync {
    fn role_grants(&self, role: &str, permission: &str) -> bool;

    fn any_grants(&self, roles: &RoleSet, permission: &str) -> bool {
        roles.iter().any(|role| self.role_grants(role, permission))
    }
}

/// `PermissionLookup` over the `[roles]` configuration section.
#[derive(Debug, Clone, Default)]
pub struct RolePermissionMap {
    roles: BTreeMap<String, RoleConfig>,
}

impl RolePermissionMap {
    #[must_use]
    pub const fn new(roles: BTreeMap<String, RoleConfig>) -> Self {
        Self { roles }
    }

    #[must_use]
    pub fn from_config(config: &HoldConfig) -> Self {
        Self::new(config.roles.clone())
    }

    /// Add or extend a role with `permissions`.
    #[must_use]
    pub fn with_role<I, S>(mut self, role: impl Into<String>, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles
            .entry(role.into())
            .or_default()
            .permissions
            .extend(permissions.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_admin_role(mut self, role: impl Into<String>) -> Self {
        self.roles.entry(role.into()).or_default().is_admin = true;
        self
    }

    /// Permissions explicitly listed for `role`.
    #[must_use]
    pub fn permissions_of(&self, role: &str) -> BTreeSet<String> {
        self.roles
            .get(role)
            .map(|config| config.permissions.clone())
            .unwrap_or_default()
    }
}

impl PermissionLookup for RolePermissionMap {
    fn role_grants(&self, role: &str, permission: &str) -> bool {
        self.roles
            .get(role)
            .is_some_and(|config| config.grants(permission))
    }
}
