//! Entity structs for Holdfast domain objects.
//!
//! `Relation` and `EntityRef` derive `Serialize`, `Deserialize`, and
//! `JsonSchema` for JSON roundtrip and schema validation. `RelationType` is
//! configuration and is only built through the registry.

mod entity_ref;
mod relation;
mod relation_type;

pub use entity_ref::EntityRef;
pub use relation::{NewRelation, Relation};
pub use relation_type::{RelationType, RelationTypeDef};
