//! Access decision results with their cacheability.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of an access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    Forbidden,
    /// The engine has no opinion; the caller's other checks decide.
    Neutral,
}

impl Verdict {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Allowed => "allowed",
            Self::Forbidden => "forbidden",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How long a result may be reused.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cacheability {
    /// The result differs between accounts.
    pub per_user: bool,
    /// Cache tags whose invalidation discards the result.
    pub tags: Vec<String>,
    /// Valid until configuration changes.
    pub permanent: bool,
}

impl Cacheability {
    #[must_use]
    pub fn per_user(tags: impl IntoIterator<Item = String>) -> Self {
        Self {
            per_user: true,
            tags: tags.into_iter().collect(),
            permanent: false,
        }
    }

    #[must_use]
    pub const fn permanent() -> Self {
        Self {
            per_user: false,
            tags: Vec::new(),
            permanent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessResult {
    pub verdict: Verdict,
    pub cacheability: Cacheability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AccessResult {
    #[must_use]
    pub fn allowed() -> Self {
        Self::with_verdict(Verdict::Allowed)
    }

    #[must_use]
    pub fn forbidden(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::with_verdict(Verdict::Forbidden)
        }
    }

    #[must_use]
    pub fn neutral() -> Self {
        Self::with_verdict(Verdict::Neutral)
    }

    /// `Allowed` when `granted`, else `Forbidden` with `reason`.
    #[must_use]
    pub fn allowed_if(granted: bool, reason: impl FnOnce() -> String) -> Self {
        if granted {
            Self::allowed()
        } else {
            Self::forbidden(reason())
        }
    }

    fn with_verdict(verdict: Verdict) -> Self {
        Self {
            verdict,
            cacheability: Cacheability::default(),
            reason: None,
        }
    }

    #[must_use]
    pub fn cached(mut self, cacheability: Cacheability) -> Self {
        self.cacheability = cacheability;
        self
    }

    #[must_use]
    pub fn is_allowed(&self) -> bool {
        self.verdict == Verdict::Allowed
    }

    #[must_use]
    pub fn is_forbidden(&self) -> bool {
        self.verdict == Verdict::Forbidden
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        self.verdict == Verdict::Neutral
    }

    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl From<bool> for AccessResult {
    fn from(granted: bool) -> Self {
        Self::allowed_if(granted, || "access denied".to_string())
    }
}
