//! Update builder types for relation mutations.
//!
//! Each builder produces an update struct with `Option` fields. Only `Some`
//! fields are applied to the loaded relation before it is re-saved.

pub mod relation;
