//! # hold-core
//!
//! Core types, relation type registry, and error types for Holdfast.
//!
//! This crate provides the foundational types shared across all Holdfast crates:
//! - Entity structs for relations and relation types
//! - Kind, lifecycle, operation and scope enums
//! - Extensible relation states
//! - Validated `entityType:bundle` endpoint specs
//! - The relation type registry (default lookup, conflict groups)
//! - Permission name builders and the permission catalog
//! - Cross-cutting error types

pub mod bundle;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod permissions;
pub mod registry;
pub mod state;
