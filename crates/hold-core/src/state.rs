//! Relation lifecycle states.
//!
//! States are configuration-driven, so unlike the closed enums in
//! [`crate::enums`] a state is an open string newtype. The three states every
//! workflow knows about are provided as constants.
//!
//! ```text
//! new → active → canceled
//!     ↘ canceled
//! ```

use std::borrow::Cow;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RelationState(Cow<'static, str>);

impl RelationState {
    pub const NEW: Self = Self(Cow::Borrowed("new"));
    pub const ACTIVE: Self = Self(Cow::Borrowed("active"));
    pub const CANCELED: Self = Self(Cow::Borrowed("canceled"));

    /// Build a state from a configured name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relations grant their role only while active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.as_str() == Self::ACTIVE.as_str()
    }

    #[must_use]
    pub fn is_canceled(&self) -> bool {
        self.as_str() == Self::CANCELED.as_str()
    }
}

impl Default for RelationState {
    fn default() -> Self {
        Self::NEW
    }
}

impl fmt::Display for RelationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for RelationState {
    fn from(value: &str) -> Self {
        Self::named(value)
    }
}
