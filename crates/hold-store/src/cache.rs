//! Cache tag invalidation.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

use hold_core::entities::Relation;
use hold_core::enums::RelationKind;

/// Receives the cache tags a relation mutation makes stale.
pub trait CacheInvalidator: Send + Sync {
    fn invalidate_tags(&self, tags: &[String]);
}

/// Discards invalidations. For hosts without a tag-aware cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopInvalidator;

impl CacheInvalidator for NoopInvalidator {
    fn invalidate_tags(&self, _tags: &[String]) {}
}

/// Records every invalidation call.
#[derive(Debug, Default)]
pub struct InvalidationLog {
    calls: Mutex<Vec<Vec<String>>>,
}

impl InvalidationLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags of each `invalidate_tags` call, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// How many calls included `tag`.
    #[must_use]
    pub fn count(&self, tag: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|call| call.iter().any(|t| t == tag))
            .count()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl CacheInvalidator for InvalidationLog {
    fn invalidate_tags(&self, tags: &[String]) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tags.to_vec());
    }
}

/// Tags made stale by writing or deleting `relations`: the permissions tag,
/// each relation's own tag, and for references the source and target entity
/// tags. De-duplicated, permissions tag first.
#[must_use]
pub fn tags_for<'a>(permissions_tag: &str, relations: impl IntoIterator<Item = &'a Relation>) -> Vec<String> {
    let mut extra = BTreeSet::new();
    for relation in relations {
        extra.insert(relation.id.cache_tag());
        if relation.kind == RelationKind::Reference {
            extra.insert(relation.source.cache_tag());
            extra.insert(relation.target.cache_tag());
        }
    }
    extra.remove(permissions_tag);
    std::iter::once(permissions_tag.to_string()).chain(extra).collect()
}
