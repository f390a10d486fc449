//! Relation workflow configuration.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_states() -> Vec<String> {
    vec!["new".into(), "active".into(), "canceled".into()]
}

/// An allowed `from → to` state change.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransitionConfig {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
    /// Known states, in display order.
    #[serde(default = "default_states")]
    pub states: Vec<String>,

    /// Allowed transitions. Empty means any known state may move to any other.
    #[serde(default)]
    pub transitions: Vec<TransitionConfig>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            states: default_states(),
            transitions: Vec::new(),
        }
    }
}

impl WorkflowConfig {
    /// Check that states are unique, include the three built-in states, and
    /// that every transition names known states.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for state in &self.states {
            if state.is_empty() || !seen.insert(state.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "workflow.states".into(),
                    reason: format!("state '{state}' is empty or declared twice"),
                });
            }
        }
        for required in ["new", "active", "canceled"] {
            if !seen.contains(required) {
                return Err(ConfigError::InvalidValue {
                    field: "workflow.states".into(),
                    reason: format!("missing built-in state '{required}'"),
                });
            }
        }
        for transition in &self.transitions {
            for state in [&transition.from, &transition.to] {
                if !seen.contains(state.as_str()) {
                    return Err(ConfigError::InvalidValue {
                        field: "workflow.transitions".into(),
                        reason: format!("unknown state '{state}'"),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = WorkflowConfig::default();
        assert_eq!(config.states, vec!["new", "active", "canceled"]);
        assert!(config.transitions.is_empty());
        config.validate().unwrap();
    }

    #[test]
    fn missing_builtin_state_is_invalid() {
        let config = WorkflowConfig {
            states: vec!["new".into(), "active".into()],
            transitions: Vec::new(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn transition_to_unknown_state_is_invalid() {
        let config = WorkflowConfig {
            transitions: vec![TransitionConfig {
                from: "new".into(),
                to: "archived".into(),
            }],
            ..WorkflowConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
