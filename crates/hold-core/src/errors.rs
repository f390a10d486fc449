//! Cross-cutting error types for Holdfast.
//!
//! This module defines errors that can originate from any crate in the system.
//! Domain-specific errors (e.g., `StoreError`, `AccessError`) are defined in
//! their respective crates.

use thiserror::Error;

/// Errors that can be raised by any Holdfast crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Relation type configuration is malformed. Fatal at load time.
    #[error("Invalid configuration for '{subject}': {reason}")]
    InvalidConfiguration { subject: String, reason: String },

    /// Data failed validation (format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),
}

impl CoreError {
    pub(crate) fn config(subject: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            subject: subject.into(),
            reason: reason.into(),
        }
    }
}
