//! # hold-store
//!
//! Relation persistence and the write path for Holdfast.
//!
//! Every write goes through [`service::RelationService`]: the
//! [`evaluator::Evaluator`] decides quotas, endpoint and uniqueness rules
//! before anything is written, the [`workflow::StateMachine`] validates
//! state changes, and after the store commits the service dispatches
//! lifecycle events and invalidates the permissions cache tag.
//!
//! All operations are synchronous. [`memory::MemoryRelationStore`] is the
//! bundled `RelationStore`; hosts with their own persistence implement the
//! trait.

pub mod cache;
pub mod error;
pub mod evaluator;
pub mod events;
pub mod memory;
pub mod repos;
pub mod service;
pub mod store;
pub mod updates;
pub mod workflow;

mod test_support;

pub use error::{QuotaScope, Rejection, StoreError};
pub use repos::reference::{Establish, PendingReference};
pub use service::RelationService;
pub use store::{RelationFilter, RelationStore};
