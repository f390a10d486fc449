//! Access error types for hold-access.

use hold_core::errors::CoreError;
use hold_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    /// The account may not perform the requested operation.
    #[error("Access denied: {0}")]
    Denied(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Core(#[from] CoreError),
}
