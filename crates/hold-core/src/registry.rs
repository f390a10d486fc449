//! Relation type registry.
//!
//! Built once from configuration. Keeps configuration order so that the
//! default-type fallback ("first type targeting this bundle") is deterministic.

use std::collections::{BTreeSet, HashMap};

use crate::entities::{EntityRef, RelationType, RelationTypeDef};
use crate::enums::RelationKind;
use crate::errors::CoreError;

#[derive(Debug, Clone, Default)]
pub struct RelationTypeRegistry {
    types: Vec<RelationType>,
    index: HashMap<String, usize>,
}

impl RelationTypeRegistry {
    /// Validate and index relation type definitions.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfiguration` if any definition is invalid,
    /// an id is declared twice, or a type conflicts with an unknown type or a
    /// type of another kind.
    pub fn from_defs(defs: impl IntoIterator<Item = RelationTypeDef>) -> Result<Self, CoreError> {
        let types = defs
            .into_iter()
            .map(RelationType::from_def)
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(types)
    }

    /// Index already validated relation types.
    ///
    /// # Errors
    ///
    /// Same cross-type checks as [`Self::from_defs`].
    pub fn new(types: Vec<RelationType>) -> Result<Self, CoreError> {
        let mut index = HashMap::with_capacity(types.len());
        for (position, ty) in types.iter().enumerate() {
            if index.insert(ty.id.clone(), position).is_some() {
                return Err(CoreError::config(&ty.id, "relation type declared twice"));
            }
        }

        for ty in &types {
            for conflict in &ty.conflicts_with {
                let Some(&position) = index.get(conflict) else {
                    return Err(CoreError::config(
                        &ty.id,
                        format!("conflicts with unknown relation type '{conflict}'"),
                    ));
                };
                if types[position].kind != ty.kind {
                    return Err(CoreError::config(
                        &ty.id,
                        format!("conflicts with '{conflict}' of a different kind"),
                    ));
                }
            }
        }

        Ok(Self { types, index })
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RelationType> {
        self.index.get(id).map(|&position| &self.types[position])
    }

    /// Look up a type that must exist.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::NotFound` for an unknown id.
    pub fn require(&self, id: &str) -> Result<&RelationType, CoreError> {
        self.get(id).ok_or_else(|| CoreError::NotFound {
            entity_type: "relation_type".into(),
            id: id.to_string(),
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &RelationType> {
        self.types.iter()
    }

    pub fn of_kind(&self, kind: RelationKind) -> impl Iterator<Item = &RelationType> {
        self.types.iter().filter(move |ty| ty.kind == kind)
    }

    /// Types whose source endpoint accepts `entity`.
    pub fn with_source<'a>(&'a self, entity: &'a EntityRef) -> impl Iterator<Item = &'a RelationType> {
        self.types.iter().filter(move |ty| ty.accepts_source(entity))
    }

    /// Default type of `kind` for relations targeting `target`.
    ///
    /// Prefers a type flagged `is_default`; otherwise the first configured
    /// type accepting the target.
    #[must_use]
    pub fn default_for(&self, kind: RelationKind, target: &EntityRef) -> Option<&RelationType> {
        let mut candidates = self
            .of_kind(kind)
            .filter(|ty| ty.accepts_target(target))
            .peekable();
        let first = candidates.peek().copied();
        candidates.find(|ty| ty.is_default).or(first)
    }

    /// Conflict group of `id`, or just `{id}` for an unknown type.
    #[must_use]
    pub fn conflict_group(&self, id: &str) -> BTreeSet<String> {
        self.get(id)
            .map_or_else(|| BTreeSet::from([id.to_string()]), RelationType::conflict_group)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
