//! Repository modules implementing relation operations.
//!
//! Each module adds methods to `RelationService` via `impl RelationService` blocks.

pub mod lookup;
pub mod reference;
pub mod relation;
