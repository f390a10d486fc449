//! Permission names consulted by the access engine, and the catalog of all of
//! them for a registry.
//!
//! Every permission string is produced here so the decision engine and the
//! catalog can never drift apart.

use serde::{Deserialize, Serialize};

use crate::entities::RelationType;
use crate::enums::{FieldOperation, ManagedField, Operation, RelationKind, Scope};
use crate::registry::RelationTypeRegistry;

/// Nouns a kind uses in its permission names.
///
/// `common` appears in blanket permissions (`"view any user ownership"`),
/// `typed` in per-type permissions (`"view own ownership: claim"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindLabels {
    pub common: String,
    pub typed: String,
}

impl KindLabels {
    #[must_use]
    pub fn for_kind(kind: RelationKind) -> Self {
        match kind {
            RelationKind::Ownership => Self {
                common: "user ownership".into(),
                typed: "ownership".into(),
            },
            RelationKind::Reference => Self {
                common: "stated entity reference".into(),
                typed: "stated reference".into(),
            },
        }
    }
}

/// Condition under which an instance permission is consulted at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Always,
    /// Only while the relation is in the `active` state.
    WhenActive,
    WhenInherited,
    WhenOwn,
}

impl Gate {
    #[must_use]
    pub const fn is_open(self, scope: Scope, active: bool) -> bool {
        match self {
            Self::Always => true,
            Self::WhenActive => active,
            Self::WhenInherited => matches!(scope, Scope::Inherited),
            Self::WhenOwn => matches!(scope, Scope::Own),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRule {
    pub permission: String,
    pub gate: Gate,
}

impl PermissionRule {
    fn new(permission: String, gate: Gate) -> Self {
        Self { permission, gate }
    }
}

/// Ordered instance rules for `op` on a relation of `type_id`.
///
/// `Create` has no instance rules; see [`create_permissions`].
#[must_use]
pub fn instance_rules(op: Operation, labels: &KindLabels, type_id: &str) -> Vec<PermissionRule> {
    let verb = match op {
        Operation::View | Operation::Update | Operation::Delete => op.verb(),
        Operation::Create => return Vec::new(),
    };
    let KindLabels { common, typed } = labels;
    vec![
        PermissionRule::new(administer(labels), Gate::Always),
        PermissionRule::new(format!("{verb} any {common}"), Gate::Always),
        PermissionRule::new(format!("{verb} active {common}"), Gate::WhenActive),
        PermissionRule::new(format!("{verb} any {typed}: {type_id}"), Gate::Always),
        PermissionRule::new(format!("{verb} inherited {typed}: {type_id}"), Gate::WhenInherited),
        PermissionRule::new(format!("{verb} own {typed}: {type_id}"), Gate::WhenOwn),
    ]
}

#[must_use]
pub fn administer(labels: &KindLabels) -> String {
    format!("administer {} types", labels.common)
}

/// The two create permissions of a kind, combined by its `CreateAccessRule`.
///
/// Ownerships pair the blanket `"add …"` with the typed `"create …: type"`;
/// references pair `"create …"` with the administer permission.
#[must_use]
pub fn create_permissions(kind: RelationKind, labels: &KindLabels, type_id: &str) -> [String; 2] {
    match kind {
        RelationKind::Ownership => [
            format!("add {}", labels.common),
            create_typed(labels, type_id),
        ],
        RelationKind::Reference => [format!("create {}", labels.common), administer(labels)],
    }
}

/// `"create {typed}: {type}"`, also required to claim an entity.
#[must_use]
pub fn create_typed(labels: &KindLabels, type_id: &str) -> String {
    format!("create {}: {type_id}", labels.typed)
}

/// `"{op} {typed} field {f}"`, the field permission for every type of a kind.
#[must_use]
pub fn field_common(op: FieldOperation, labels: &KindLabels, field: &str) -> String {
    format!("{op} {} field {field}", labels.typed)
}

#[must_use]
pub fn field_new(op: FieldOperation, labels: &KindLabels, field: &str) -> String {
    format!("{op} new {}: field {field}", labels.common)
}

#[must_use]
pub fn field_scoped(
    op: FieldOperation,
    scope: Scope,
    labels: &KindLabels,
    type_id: &str,
    field: &str,
) -> String {
    format!("{op} {scope} {}: {type_id} field {field}", labels.typed)
}

/// Allows listing the relations of any user.
#[must_use]
pub fn view_users(labels: &KindLabels) -> String {
    format!("view users {}", labels.common)
}

pub const VIEW_ANY_RELATION_ITEM: &str = "view any entity reference relation";
pub const VIEW_OWN_RELATION_ITEM: &str = "view own entity reference relation";

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// A permission the engine may consult, with a human-readable title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PermissionDef {
    pub name: String,
    pub title: String,
}

impl PermissionDef {
    fn new(name: String, title: String) -> Self {
        Self { name, title }
    }
}

/// Every permission the engine may consult for relations in `registry`.
///
/// `labels` supplies the nouns per kind; duplicates are removed while keeping
/// first-seen order.
#[must_use]
pub fn catalog(
    registry: &RelationTypeRegistry,
    labels: impl Fn(RelationKind) -> KindLabels,
) -> Vec<PermissionDef> {
    let mut defs = Vec::new();

    for kind in RelationKind::ALL {
        let kind_labels = labels(kind);
        defs.extend(common_permissions(kind, &kind_labels));
    }
    for ty in registry.iter() {
        defs.extend(type_permissions(ty, &labels(ty.kind)));
    }

    let mut seen = std::collections::HashSet::new();
    defs.retain(|def| seen.insert(def.name.clone()));
    defs
}

fn common_permissions(kind: RelationKind, labels: &KindLabels) -> Vec<PermissionDef> {
    let common = &labels.common;
    let mut defs = vec![
        PermissionDef::new(administer(labels), format!("Administer {common} types")),
        PermissionDef::new(view_users(labels), format!("View {common} listings of any user")),
    ];
    for op in [Operation::View, Operation::Update, Operation::Delete] {
        let verb = op.verb();
        defs.push(PermissionDef::new(
            format!("{verb} any {common}"),
            format!("{verb} any {common}"),
        ));
        defs.push(PermissionDef::new(
            format!("{verb} active {common}"),
            format!("{verb} active {common}"),
        ));
    }
    for field in ManagedField::ALL {
        let field = field.label(kind);
        defs.push(PermissionDef::new(
            field_common(FieldOperation::Edit, labels, field),
            format!("Edit {} field {field}", labels.typed),
        ));
        defs.push(PermissionDef::new(
            field_new(FieldOperation::Edit, labels, field),
            format!("Edit new {common} field {field}"),
        ));
    }
    defs
}

fn type_permissions(ty: &RelationType, labels: &KindLabels) -> Vec<PermissionDef> {
    let typed = &labels.typed;
    let mut defs: Vec<PermissionDef> = create_permissions(ty.kind, labels, &ty.id)
        .into_iter()
        .map(|name| {
            let title = format!("Create {typed} of type: {}", ty.label);
            PermissionDef::new(name, title)
        })
        .collect();

    for op in [Operation::View, Operation::Update, Operation::Delete] {
        for scope in [Scope::Own, Scope::Inherited, Scope::Any] {
            defs.push(PermissionDef::new(
                format!("{} {scope} {typed}: {}", op.verb(), ty.id),
                format!("{} {scope} {typed} of type: {}", op.verb(), ty.label),
            ));
        }
    }
    for scope in [Scope::Own, Scope::Inherited, Scope::Any] {
        for field in ManagedField::ALL {
            let field = field.label(ty.kind);
            defs.push(PermissionDef::new(
                field_scoped(FieldOperation::Edit, scope, labels, &ty.id, field),
                format!("Edit {scope} {typed}: {} field {field}", ty.label),
            ));
        }
    }
    defs
}
