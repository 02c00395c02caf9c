//! Brick descriptors
//!
//! A descriptor is the static metadata of a brick. Static bricks get theirs
//! at registration; synthesized bricks get one built from their backing
//! configuration row at request time. Descriptors are never persisted.

use crate::{PanelId, RecordType, RelationTypeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Closed set of brick variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelKind {
    Simple,
    Paginated,
    QuerysetBacked,
    InstanceBound,
    RelationBound,
    CustomFieldBound,
    Forbidden,
    Void,
}

impl PanelKind {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, PanelKind::Forbidden | PanelKind::Void)
    }

    /// Kinds which can only be rendered against a host record.
    pub fn requires_record(&self) -> bool {
        matches!(self, PanelKind::RelationBound | PanelKind::CustomFieldBound)
    }
}

impl std::fmt::Display for PanelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PanelKind::Simple => "simple",
            PanelKind::Paginated => "paginated",
            PanelKind::QuerysetBacked => "queryset",
            PanelKind::InstanceBound => "instance",
            PanelKind::RelationBound => "relation",
            PanelKind::CustomFieldBound => "custom",
            PanelKind::Forbidden => "forbidden",
            PanelKind::Void => "void",
        };
        write!(f, "{}", name)
    }
}

/// Declared data dependency of a brick
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dependency {
    /// The brick shows data of this record type
    Model(RecordType),
    /// The brick may show anything
    Wildcard,
}

/// Comparable dependency key, see [`PanelDescriptor::dependency_keys`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DependencyKey {
    Model(RecordType),
    RelationType(RelationTypeId),
}

/// Effective dependency keys of one brick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyKeys {
    Wildcard,
    Keys(BTreeSet<DependencyKey>),
}

impl DependencyKeys {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, DependencyKeys::Wildcard)
    }

    /// Whether two key sets share at least one key. Wildcards match anything.
    pub fn intersects(&self, other: &DependencyKeys) -> bool {
        match (self, other) {
            (DependencyKeys::Wildcard, _) | (_, DependencyKeys::Wildcard) => true,
            (DependencyKeys::Keys(a), DependencyKeys::Keys(b)) => !a.is_disjoint(b),
        }
    }
}

/// Static metadata of a brick
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelDescriptor {
    pub id: PanelId,
    pub kind: PanelKind,

    /// Human readable name, shown on configuration screens
    #[serde(default)]
    pub verbose_name: String,

    #[serde(default)]
    pub dependencies: BTreeSet<Dependency>,

    #[serde(default)]
    pub relation_type_dependencies: BTreeSet<RelationTypeId>,

    /// Whether administrators may place this brick
    #[serde(default = "default_true")]
    pub configurable: bool,

    /// Read-only bricks never trigger the reload of other bricks
    #[serde(default)]
    pub read_only: bool,

    /// Record types this brick can be displayed on; empty means any
    #[serde(default)]
    pub target_record_types: BTreeSet<RecordType>,

    /// Permission specs a user must hold to see this brick
    #[serde(default)]
    pub permissions: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl PanelDescriptor {
    pub fn new(id: impl Into<PanelId>, kind: PanelKind) -> Self {
        Self {
            id: id.into(),
            kind,
            verbose_name: String::new(),
            dependencies: BTreeSet::new(),
            relation_type_dependencies: BTreeSet::new(),
            configurable: true,
            read_only: false,
            target_record_types: BTreeSet::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    pub fn depends_on(mut self, record_type: impl Into<RecordType>) -> Self {
        self.dependencies.insert(Dependency::Model(record_type.into()));
        self
    }

    pub fn depends_on_everything(mut self) -> Self {
        self.dependencies.insert(Dependency::Wildcard);
        self
    }

    pub fn depends_on_relation_type(mut self, relation_type: impl Into<RelationTypeId>) -> Self {
        self.relation_type_dependencies.insert(relation_type.into());
        self
    }

    pub fn targeting(mut self, record_type: impl Into<RecordType>) -> Self {
        self.target_record_types.insert(record_type.into());
        self
    }

    pub fn requiring(mut self, permission: impl Into<String>) -> Self {
        self.permissions.push(permission.into());
        self
    }

    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn not_configurable(mut self) -> Self {
        self.configurable = false;
        self
    }

    pub fn is_compatible_with(&self, record_type: &RecordType) -> bool {
        self.target_record_types.is_empty() || self.target_record_types.contains(record_type)
    }

    /// Effective dependency keys.
    ///
    /// Relation-type dependencies are compared by exact identifier: when a
    /// brick declares some, the generic relation model dependency is replaced
    /// by them.
    pub fn dependency_keys(&self) -> DependencyKeys {
        if self.dependencies.contains(&Dependency::Wildcard) {
            return DependencyKeys::Wildcard;
        }

        let refine_relations = !self.relation_type_dependencies.is_empty();
        let mut keys: BTreeSet<DependencyKey> = self
            .dependencies
            .iter()
            .filter_map(|dep| match dep {
                Dependency::Model(rt) if refine_relations && rt.is_relation() => None,
                Dependency::Model(rt) => Some(DependencyKey::Model(rt.clone())),
                Dependency::Wildcard => None,
            })
            .collect();

        keys.extend(
            self.relation_type_dependencies
                .iter()
                .cloned()
                .map(DependencyKey::RelationType),
        );

        DependencyKeys::Keys(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relation_type_refines_generic_relation() {
        let desc = PanelDescriptor::new("persons-employees", PanelKind::Simple)
            .depends_on(RecordType::relation())
            .depends_on_relation_type("persons-employed_by");

        let DependencyKeys::Keys(keys) = desc.dependency_keys() else {
            panic!("unexpected wildcard");
        };
        assert_eq!(keys.len(), 1);
        assert!(keys.contains(&DependencyKey::RelationType("persons-employed_by".into())));
    }

    #[test]
    fn test_generic_relation_kept_without_refinement() {
        let desc = PanelDescriptor::new("core-relations", PanelKind::Simple)
            .depends_on(RecordType::relation());

        let DependencyKeys::Keys(keys) = desc.dependency_keys() else {
            panic!("unexpected wildcard");
        };
        assert!(keys.contains(&DependencyKey::Model(RecordType::relation())));
    }

    #[test]
    fn test_distinct_relation_types_do_not_intersect() {
        let a = PanelDescriptor::new("a", PanelKind::Simple).depends_on_relation_type("rt-1");
        let b = PanelDescriptor::new("b", PanelKind::Simple).depends_on_relation_type("rt-2");
        let generic =
            PanelDescriptor::new("c", PanelKind::Simple).depends_on(RecordType::relation());

        assert!(!a.dependency_keys().intersects(&b.dependency_keys()));
        assert!(!a.dependency_keys().intersects(&generic.dependency_keys()));
    }

    #[test]
    fn test_wildcard_intersects_everything() {
        let wild = PanelDescriptor::new("w", PanelKind::Simple).depends_on_everything();
        let none = PanelDescriptor::new("n", PanelKind::Simple);

        assert!(wild.dependency_keys().is_wildcard());
        assert!(wild.dependency_keys().intersects(&none.dependency_keys()));
        assert!(none.dependency_keys().intersects(&wild.dependency_keys()));
    }

    #[test]
    fn test_compatibility() {
        let any = PanelDescriptor::new("a", PanelKind::Simple);
        let contact_only = PanelDescriptor::new("b", PanelKind::Simple).targeting("persons.contact");

        assert!(any.is_compatible_with(&"billing.invoice".into()));
        assert!(contact_only.is_compatible_with(&"persons.contact".into()));
        assert!(!contact_only.is_compatible_with(&"billing.invoice".into()));
    }
}
