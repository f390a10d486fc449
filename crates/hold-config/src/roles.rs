//! Role to permission mapping for the bundled permission lookup.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct RoleConfig {
    #[serde(default)]
    pub permissions: BTreeSet<String>,

    /// Admin roles hold every permission.
    #[serde(default)]
    pub is_admin: bool,
}

impl RoleConfig {
    #[must_use]
    pub fn grants(&self, permission: &str) -> bool {
        self.is_admin || self.permissions.contains(permission)
    }
}
