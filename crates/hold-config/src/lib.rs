//! # hold-config
//!
//! Layered configuration loading for Holdfast using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`HOLDFAST_*` prefix, `__` as separator)
//! 2. Project-level `.holdfast/config.toml`
//! 3. User-level `~/.config/holdfast/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `HOLDFAST_CACHE__PERMISSIONS_TAG` -> `cache.permissions_tag`,
//! `HOLDFAST_KINDS__OWNERSHIP__CREATE_ACCESS` -> `kinds.ownership.create_access`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use hold_config::HoldConfig;
//!
//! let config = HoldConfig::load_with_dotenv().expect("config");
//! let registry = config.registry().expect("valid relation types");
//! println!("{} relation types", registry.len());
//! ```

mod cache;
mod error;
mod kinds;
mod roles;
mod workflow;

pub use cache::CacheConfig;
pub use error::ConfigError;
pub use kinds::{KindConfig, KindsConfig};
pub use roles::RoleConfig;
pub use workflow::{TransitionConfig, WorkflowConfig};

use std::collections::BTreeMap;
use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use hold_core::entities::RelationTypeDef;
use hold_core::registry::RelationTypeRegistry;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HoldConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub kinds: KindsConfig,
    #[serde(default)]
    pub relation_types: Vec<RelationTypeDef>,
    #[serde(default)]
    pub roles: BTreeMap<String, RoleConfig>,
}

impl HoldConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy` -- use [`Self::load_with_dotenv`] if you need
    /// `.env` file loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source cannot be read or extracted,
    /// or `ConfigError::InvalidValue` if the workflow section is inconsistent.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(&Self::figment())
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        Self::load_dotenv_from_workspace();
        Self::load()
    }

    /// Extract and validate a configuration from an arbitrary figment.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn from_figment(figment: &Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.workflow.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    #[must_use]
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".holdfast/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("HOLDFAST_").split("__"))
    }

    /// Validate the configured relation types into a registry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Core` wrapping `CoreError::InvalidConfiguration`
    /// for malformed bundle strings, duplicate ids or unknown conflicts.
    pub fn registry(&self) -> Result<RelationTypeRegistry, ConfigError> {
        Ok(RelationTypeRegistry::from_defs(self.relation_types.clone())?)
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("holdfast").join("config.toml"))
    }

    /// Load `.env` from the workspace root.
    ///
    /// Walks up from `CARGO_MANIFEST_DIR` (if available) or current dir looking
    /// for a `.env` file. Silently does nothing if no `.env` is found.
    fn load_dotenv_from_workspace() {
        if let Ok(manifest_dir) = std::env::var("CARGO_MANIFEST_DIR") {
            let mut dir = PathBuf::from(manifest_dir);
            // crate -> crates/ -> workspace root
            for _ in 0..3 {
                let env_path = dir.join(".env");
                if env_path.exists() {
                    let _ = dotenvy::from_path(&env_path);
                    return;
                }
                if !dir.pop() {
                    break;
                }
            }
        }

        let _ = dotenvy::dotenv();
    }
}
