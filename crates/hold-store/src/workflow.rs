//! Relation lifecycle state machine.
//!
//! Validates transitions against the configured workflow and maps a committed
//! save onto lifecycle events. The mapping only distinguishes `canceled` from
//! every other target state: any other state change reports `Activated`.

use std::collections::HashSet;

use hold_config::WorkflowConfig;
use hold_core::enums::LifecycleEvent;
use hold_core::errors::CoreError;
use hold_core::ids::RelationId;
use hold_core::state::RelationState;

#[derive(Debug, Clone)]
pub struct StateMachine {
    states: Vec<RelationState>,
    /// `None` is the open graph: any known state may move to any other.
    transitions: Option<HashSet<(String, String)>>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::from_config(&WorkflowConfig::default())
    }
}

impl StateMachine {
    #[must_use]
    pub fn from_config(config: &WorkflowConfig) -> Self {
        let states = config.states.iter().map(|s| RelationState::named(s.as_str())).collect();
        let transitions = (!config.transitions.is_empty()).then(|| {
            config
                .transitions
                .iter()
                .map(|t| (t.from.clone(), t.to.clone()))
                .collect()
        });
        Self { states, transitions }
    }

    #[must_use]
    pub fn states(&self) -> &[RelationState] {
        &self.states
    }

    #[must_use]
    pub fn knows(&self, state: &RelationState) -> bool {
        self.states.contains(state)
    }

    /// Check the state a new relation starts in.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` (from `none`) for an unknown state.
    pub fn check_initial(&self, state: &RelationState) -> Result<(), CoreError> {
        if self.knows(state) {
            Ok(())
        } else {
            Err(invalid(None, "none", state))
        }
    }

    /// Check a state change of a persisted relation. Keeping the state is
    /// always allowed.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidTransition` if `to` is unknown or the pair is
    /// not among the configured transitions.
    pub fn check_transition(
        &self,
        id: RelationId,
        from: &RelationState,
        to: &RelationState,
    ) -> Result<(), CoreError> {
        if from == to {
            return Ok(());
        }
        if !self.knows(to) {
            return Err(invalid(Some(id), from.as_str(), to));
        }
        if let Some(allowed) = &self.transitions {
            if !allowed.contains(&(from.as_str().to_string(), to.as_str().to_string())) {
                return Err(invalid(Some(id), from.as_str(), to));
            }
        }
        Ok(())
    }

    /// Events a committed save emits, in dispatch order.
    ///
    /// `original` is the state loaded before the write, `None` for an insert.
    #[must_use]
    pub fn events_for_save(original: Option<&RelationState>, saved: &RelationState) -> Vec<LifecycleEvent> {
        match original {
            None => vec![LifecycleEvent::Created],
            Some(before) if before == saved => vec![LifecycleEvent::Updated],
            Some(_) if saved.is_canceled() => vec![LifecycleEvent::Updated, LifecycleEvent::Canceled],
            Some(_) => vec![LifecycleEvent::Updated, LifecycleEvent::Activated],
        }
    }
}

fn invalid(id: Option<RelationId>, from: &str, to: &RelationState) -> CoreError {
    CoreError::InvalidTransition {
        entity_type: "relation".into(),
        id: id.map_or_else(|| "new".to_string(), |id| id.to_string()),
        from: from.to_string(),
        to: to.to_string(),
    }
}
