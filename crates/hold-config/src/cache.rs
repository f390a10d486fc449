//! Permission cache configuration.

use serde::{Deserialize, Serialize};

fn default_permissions_tag() -> String {
    "user.permissions".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Tag invalidated on every relation mutation.
    #[serde(default = "default_permissions_tag")]
    pub permissions_tag: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            permissions_tag: default_permissions_tag(),
        }
    }
}
