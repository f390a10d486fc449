//! Accounts checked by the access engine.
//!
//! Nothing here is global: every decision takes the account explicitly, and
//! the "current account" of a request lives in an [`AccountSlot`] owned by the
//! caller.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use hold_core::ids::{RoleSet, UserId};

use crate::lookup::PermissionLookup;

pub trait Account: Send + Sync {
    /// `0` is the anonymous account.
    fn id(&self) -> UserId;

    /// Session roles.
    fn roles(&self) -> RoleSet;

    /// Whether the session roles grant `permission`.
    fn has_permission(&self, permission: &str) -> bool;

    fn is_anonymous(&self) -> bool {
        self.id() == 0
    }
}

/// Account of one request: an id, its session roles and the lookup that
/// resolves their permissions.
#[derive(Clone)]
pub struct SessionAccount {
    id: UserId,
    roles: RoleSet,
    lookup: Arc<dyn PermissionLookup>,
    augmented: bool,
}

impl fmt::Debug for SessionAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionAccount")
            .field("id", &self.id)
            .field("roles", &self.roles)
            .field("augmented", &self.augmented)
            .finish_non_exhaustive()
    }
}

impl SessionAccount {
    #[must_use]
    pub fn new<I, S>(id: UserId, roles: I, lookup: Arc<dyn PermissionLookup>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id,
            roles: roles.into_iter().map(Into::into).collect(),
            lookup,
            augmented: false,
        }
    }

    #[must_use]
    pub fn anonymous(lookup: Arc<dyn PermissionLookup>) -> Self {
        Self::new(0, ["anonymous"], lookup)
    }

    /// The same account with relation roles merged into its session roles.
    #[must_use]
    pub fn augmented_with(&self, extra: RoleSet) -> Self {
        let mut roles = self.roles.clone();
        roles.extend(extra);
        Self {
            id: self.id,
            roles,
            lookup: Arc::clone(&self.lookup),
            augmented: true,
        }
    }

    /// Whether relation roles were already merged in for this request.
    #[must_use]
    pub const fn is_augmented(&self) -> bool {
        self.augmented
    }
}

impl Account for SessionAccount {
    fn id(&self) -> UserId {
        self.id
    }

    fn roles(&self) -> RoleSet {
        self.roles.clone()
    }

    fn has_permission(&self, permission: &str) -> bool {
        self.lookup.any_grants(&self.roles, permission)
    }
}

/// Where the active account of a request is installed.
pub trait AccountSlot: Send + Sync {
    fn set_active(&self, account: SessionAccount);
    fn active(&self) -> Option<SessionAccount>;
}

/// `AccountSlot` for a single request.
#[derive(Debug, Default)]
pub struct RequestSlot {
    current: Mutex<Option<SessionAccount>>,
}

impl RequestSlot {
    #[must_use]
    pub fn new(account: SessionAccount) -> Self {
        Self {
            current: Mutex::new(Some(account)),
        }
    }
}

impl AccountSlot for RequestSlot {
    fn set_active(&self, account: SessionAccount) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(account);
    }

    fn active(&self) -> Option<SessionAccount> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lookup::RolePermissionMap;

    fn lookup() -> Arc<dyn PermissionLookup> {
        Arc::new(
            RolePermissionMap::default()
                .with_role("editor", ["edit any user ownership"])
                .with_role("curator", ["view any user ownership"]),
        )
    }

    #[test]
    fn permissions_follow_session_roles() {
        let account = SessionAccount::new(5, ["editor"], lookup());
        assert!(account.has_permission("edit any user ownership"));
        assert!(!account.has_permission("view any user ownership"));
        assert!(!account.is_anonymous());
        assert!(SessionAccount::anonymous(lookup()).is_anonymous());
    }

    #[test]
    fn augmentation_merges_roles() {
        let account = SessionAccount::new(5, ["editor"], lookup());
        let augmented = account.augmented_with(["curator".to_string()].into());
        assert!(augmented.is_augmented());
        assert!(augmented.has_permission("view any user ownership"));
        assert!(!account.is_augmented());
    }

    #[test]
    fn slot_replaces_active_account() {
        let slot = RequestSlot::default();
        assert!(slot.active().is_none());
        slot.set_active(SessionAccount::new(5, ["editor"], lookup()));
        assert_eq!(slot.active().map(|a| a.id()), Some(5));
    }
}
