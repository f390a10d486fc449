//! Validated relation endpoint specs.
//!
//! Relation types constrain their endpoints with strings of the form
//! `entityType` or `entityType:bundle`. They are parsed once when the registry
//! is built; anything else is an `InvalidConfiguration` error.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entities::EntityRef;
use crate::errors::CoreError;
use crate::ids::USER_ENTITY_TYPE;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BundleSpec {
    pub entity_type: String,
    /// `None` accepts every bundle of `entity_type`.
    pub bundle: Option<String>,
}

impl BundleSpec {
    /// Parse `entityType` or `entityType:bundle`.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidConfiguration` for empty parts, more than one
    /// separator, or characters outside `[a-z0-9_]`.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let mut parts = raw.split(':');
        let entity_type = parts.next().unwrap_or_default();
        let bundle = parts.next();
        if parts.next().is_some() {
            return Err(CoreError::config(raw, "expected `entityType` or `entityType:bundle`"));
        }
        validate_segment(raw, entity_type)?;
        if let Some(bundle) = bundle {
            validate_segment(raw, bundle)?;
        }
        Ok(Self {
            entity_type: entity_type.to_string(),
            bundle: bundle.map(str::to_string),
        })
    }

    /// The fixed source endpoint of ownership relations.
    #[must_use]
    pub fn user() -> Self {
        Self {
            entity_type: USER_ENTITY_TYPE.to_string(),
            bundle: None,
        }
    }

    /// Whether `entity` may occupy an endpoint constrained by this spec.
    #[must_use]
    pub fn matches(&self, entity: &EntityRef) -> bool {
        self.entity_type == entity.entity_type
            && self.bundle.as_ref().is_none_or(|bundle| *bundle == entity.bundle)
    }
}

fn validate_segment(raw: &str, segment: &str) -> Result<(), CoreError> {
    if segment.is_empty() {
        return Err(CoreError::config(raw, "empty entity type or bundle"));
    }
    if !segment
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    {
        return Err(CoreError::config(
            raw,
            format!("'{segment}' must contain only lowercase letters, digits and '_'"),
        ));
    }
    Ok(())
}

impl fmt::Display for BundleSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.bundle {
            Some(bundle) => write!(f, "{}:{bundle}", self.entity_type),
            None => f.write_str(&self.entity_type),
        }
    }
}

impl TryFrom<String> for BundleSpec {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BundleSpec> for String {
    fn from(value: BundleSpec) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("node", "node", None)]
    #[case("node:article", "node", Some("article"))]
    #[case("taxonomy_term:tags", "taxonomy_term", Some("tags"))]
    fn parses_valid_specs(#[case] raw: &str, #[case] ty: &str, #[case] bundle: Option<&str>) {
        let spec = BundleSpec::parse(raw).unwrap();
        assert_eq!(spec.entity_type, ty);
        assert_eq!(spec.bundle.as_deref(), bundle);
        assert_eq!(spec.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case(":article")]
    #[case("node:")]
    #[case("node:article:extra")]
    #[case("Node:Article")]
    fn rejects_malformed_specs(#[case] raw: &str) {
        let err = BundleSpec::parse(raw).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn matches_entity_type_and_bundle() {
        let article = EntityRef::new("node", "article", 1);
        let page = EntityRef::new("node", "page", 2);
        assert!(BundleSpec::parse("node").unwrap().matches(&page));
        assert!(BundleSpec::parse("node:article").unwrap().matches(&article));
        assert!(!BundleSpec::parse("node:article").unwrap().matches(&page));
        assert!(BundleSpec::user().matches(&EntityRef::user(7)));
    }

    #[test]
    fn deserializes_from_string() {
        let spec: BundleSpec = serde_json::from_str("\"node:author\"").unwrap();
        assert_eq!(spec.bundle.as_deref(), Some("author"));
        assert!(serde_json::from_str::<BundleSpec>("\"a:b:c\"").is_err());
    }
}
