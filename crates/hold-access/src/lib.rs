//! # hold-access
//!
//! Access decisions over relation-derived roles for Holdfast.
//!
//! An account's roles are its session roles plus the roles granted by its
//! active relations. [`roles::RoleResolver`] computes them per target,
//! [`decision::AccessHandler`] decides instance, field and create access for
//! relations, and [`manager::AccessManager`] exposes the entry points hosts
//! call: claiming an entity, the dynamic permission check, and listing
//! guards.
//!
//! No account is global. Every decision takes the account explicitly; the
//! active account of a request lives in an [`account::AccountSlot`].

pub mod account;
pub mod decision;
pub mod error;
pub mod lookup;
pub mod manager;
pub mod result;
pub mod roles;

mod test_support;

pub use account::{Account, AccountSlot, RequestSlot, SessionAccount};
pub use decision::{AccessHandler, FieldTarget};
pub use error::AccessError;
pub use lookup::{PermissionLookup, RolePermissionMap};
pub use manager::AccessManager;
pub use result::{AccessResult, Cacheability, Verdict};
pub use roles::{OwnRoles, RoleResolver};
