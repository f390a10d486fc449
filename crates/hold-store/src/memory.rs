//! In-memory relation store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use hold_core::entities::{EntityRef, Relation};
use hold_core::ids::{RelationId, UserId};

use crate::error::StoreError;
use crate::store::{RelationFilter, RelationStore};

/// `RelationStore` backed by a `BTreeMap` behind an `RwLock`.
///
/// Iteration follows id order, so results are deterministic.
#[derive(Debug)]
pub struct MemoryRelationStore {
    relations: RwLock<BTreeMap<RelationId, Relation>>,
    next_id: AtomicU64,
}

impl Default for MemoryRelationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryRelationStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            relations: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<RelationId, Relation>> {
        self.relations.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<RelationId, Relation>> {
        self.relations.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn select(
        &self,
        filter: &RelationFilter,
        predicate: impl Fn(&Relation) -> bool,
    ) -> Vec<Relation> {
        let mut found: Vec<Relation> = self
            .read()
            .values()
            .filter(|relation| predicate(relation) && filter.matches(relation))
            .cloned()
            .collect();
        if !filter.only_active {
            // Stable: id order is kept within each group.
            found.sort_by_key(|relation| !relation.is_active());
        }
        found
    }
}

fn is_source_user(relation: &Relation, user: UserId) -> bool {
    relation.source_user() == Some(user)
}

impl RelationStore for MemoryRelationStore {
    fn generate_id(&self) -> Result<RelationId, StoreError> {
        Ok(RelationId(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn load(&self, id: RelationId) -> Result<Relation, StoreError> {
        self.read().get(&id).cloned().ok_or(StoreError::NoResult)
    }

    fn find_active(
        &self,
        target: &EntityRef,
        filter: &RelationFilter,
    ) -> Result<Vec<Relation>, StoreError> {
        Ok(self.select(filter, |relation| relation.target.same_entity(target)))
    }

    fn find_by_user(&self, user: UserId, filter: &RelationFilter) -> Result<Vec<Relation>, StoreError> {
        Ok(self.select(filter, |relation| is_source_user(relation, user)))
    }

    fn find_by_user_and_target(
        &self,
        user: UserId,
        target: &EntityRef,
        filter: &RelationFilter,
    ) -> Result<Vec<Relation>, StoreError> {
        Ok(self.select(filter, |relation| {
            is_source_user(relation, user) && relation.target.same_entity(target)
        }))
    }

    fn count_for_conflict_group(&self, user: UserId, types: &BTreeSet<String>) -> Result<usize, StoreError> {
        Ok(self
            .read()
            .values()
            .filter(|relation| is_source_user(relation, user) && types.contains(&relation.relation_type))
            .count())
    }

    fn count_for_target(
        &self,
        target: &EntityRef,
        relation_type: &str,
        exclude: Option<RelationId>,
    ) -> Result<usize, StoreError> {
        Ok(self
            .read()
            .values()
            .filter(|relation| {
                Some(relation.id) != exclude
                    && relation.is_active()
                    && relation.relation_type == relation_type
                    && relation.target.same_entity(target)
            })
            .count())
    }

    fn exists_exact(
        &self,
        source: &EntityRef,
        target: &EntityRef,
        relation_type: &str,
        exclude: Option<RelationId>,
    ) -> Result<bool, StoreError> {
        Ok(self.read().values().any(|relation| {
            Some(relation.id) != exclude
                && relation.relation_type == relation_type
                && relation.source.same_entity(source)
                && relation.target.same_entity(target)
        }))
    }

    fn exists(
        &self,
        target: &EntityRef,
        user: UserId,
        relation_type: Option<&str>,
        only_active: bool,
    ) -> Result<bool, StoreError> {
        Ok(self.read().values().any(|relation| {
            is_source_user(relation, user)
                && relation.target.same_entity(target)
                && relation_type.is_none_or(|ty| relation.relation_type == ty)
                && (!only_active || relation.is_active())
        }))
    }

    fn find_touching(&self, entity: &EntityRef) -> Result<Vec<Relation>, StoreError> {
        Ok(self.select(&RelationFilter::all_states(), |relation| {
            relation.source.same_entity(entity) || relation.target.same_entity(entity)
        }))
    }

    fn insert(&self, relation: &Relation) -> Result<(), StoreError> {
        let mut relations = self.write();
        if relations.contains_key(&relation.id) {
            return Err(StoreError::Query(format!(
                "relation {} already exists",
                relation.id
            )));
        }
        relations.insert(relation.id, relation.clone());
        Ok(())
    }

    fn update(&self, relation: &Relation) -> Result<(), StoreError> {
        let mut relations = self.write();
        let slot = relations.get_mut(&relation.id).ok_or(StoreError::NoResult)?;
        *slot = relation.clone();
        Ok(())
    }

    fn remove(&self, ids: &[RelationId]) -> Result<usize, StoreError> {
        let mut relations = self.write();
        Ok(ids.iter().filter(|id| relations.remove(id).is_some()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use hold_core::enums::RelationKind;
    use hold_core::state::RelationState;
    use pretty_assertions::assert_eq;

    fn put(
        store: &MemoryRelationStore,
        ty: &str,
        user: UserId,
        target: &EntityRef,
        state: RelationState,
    ) -> Relation {
        let now = Utc::now();
        let relation = Relation {
            id: store.generate_id().unwrap(),
            relation_type: ty.into(),
            kind: RelationKind::Ownership,
            source: EntityRef::user(user),
            target: target.clone(),
            role: None,
            state,
            owner: None,
            created_at: now,
            changed_at: now,
        };
        store.insert(&relation).unwrap();
        relation
    }

    #[test]
    fn ids_are_monotonic() {
        let store = MemoryRelationStore::new();
        let a = store.generate_id().unwrap();
        let b = store.generate_id().unwrap();
        assert!(b > a);
    }

    #[test]
    fn all_states_sorts_active_first() {
        let store = MemoryRelationStore::new();
        let team = EntityRef::new("node", "team", 1);
        let first = put(&store, "claim", 1, &team, RelationState::NEW);
        let second = put(&store, "claim", 2, &team, RelationState::ACTIVE);
        let third = put(&store, "claim", 3, &team, RelationState::CANCELED);

        let ids: Vec<RelationId> = store
            .find_active(&team, &RelationFilter::all_states())
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id, third.id]);

        let active = store.find_active(&team, &RelationFilter::active()).unwrap();
        assert_eq!(active.len(), 1);
    }

    #[test]
    fn conflict_group_counts_every_state() {
        let store = MemoryRelationStore::new();
        put(&store, "claim", 1, &EntityRef::new("node", "team", 1), RelationState::NEW);
        put(&store, "captain", 1, &EntityRef::new("node", "team", 2), RelationState::CANCELED);
        put(&store, "claim", 2, &EntityRef::new("node", "team", 2), RelationState::ACTIVE);

        let group = BTreeSet::from(["claim".to_string(), "captain".to_string()]);
        assert_eq!(store.count_for_conflict_group(1, &group).unwrap(), 2);
        assert_eq!(store.count_for_conflict_group(2, &group).unwrap(), 1);
    }

    #[test]
    fn target_count_excludes_given_relation() {
        let store = MemoryRelationStore::new();
        let team = EntityRef::new("node", "team", 1);
        let active = put(&store, "claim", 1, &team, RelationState::ACTIVE);
        put(&store, "claim", 2, &team, RelationState::NEW);

        assert_eq!(store.count_for_target(&team, "claim", None).unwrap(), 1);
        assert_eq!(store.count_for_target(&team, "claim", Some(active.id)).unwrap(), 0);
    }

    #[test]
    fn exists_respects_type_and_state() {
        let store = MemoryRelationStore::new();
        let team = EntityRef::new("node", "team", 1);
        put(&store, "claim", 1, &team, RelationState::NEW);

        assert!(store.exists(&team, 1, None, false).unwrap());
        assert!(!store.exists(&team, 1, None, true).unwrap());
        assert!(!store.exists(&team, 1, Some("captain"), false).unwrap());
        assert!(!store.exists(&team, 2, None, false).unwrap());
    }

    #[test]
    fn update_and_remove() {
        let store = MemoryRelationStore::new();
        let team = EntityRef::new("node", "team", 1);
        let mut relation = put(&store, "claim", 1, &team, RelationState::NEW);

        relation.state = RelationState::ACTIVE;
        store.update(&relation).unwrap();
        assert!(store.load(relation.id).unwrap().is_active());

        assert_eq!(store.remove(&[relation.id, RelationId(999)]).unwrap(), 1);
        assert!(matches!(store.load(relation.id), Err(StoreError::NoResult)));
        assert!(matches!(store.update(&relation), Err(StoreError::NoResult)));
        assert!(store.is_empty());
    }

    #[test]
    fn duplicate_insert_is_a_query_error() {
        let store = MemoryRelationStore::new();
        let relation = put(&store, "claim", 1, &EntityRef::new("node", "team", 1), RelationState::NEW);
        assert!(matches!(store.insert(&relation), Err(StoreError::Query(_))));
    }
}
