//! Dependency resolution
//!
//! For the bricks displayed together on one page, computes which bricks
//! must be reloaded when one of them changes data. Two bricks depend on each
//! other when their declared dependency keys intersect; a wildcard
//! intersects everything. The relation is symmetric, except that read-only
//! bricks never trigger the reload of others.
//!
//! Resolution works on descriptors only and issues no storage queries.

use brick_types::{DependencyKeys, PanelDescriptor, PanelId};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::debug;

/// brick id → bricks to reload along with it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DependencyMap(BTreeMap<PanelId, BTreeSet<PanelId>>);

impl DependencyMap {
    pub fn dependents(&self, id: &PanelId) -> impl Iterator<Item = &PanelId> {
        self.0.get(id).into_iter().flatten()
    }

    pub fn depends(&self, source: &PanelId, target: &PanelId) -> bool {
        self.0.get(source).is_some_and(|deps| deps.contains(target))
    }

    /// The brick itself followed by its dependents, as sent back by the
    /// client on its next reload.
    pub fn reload_set(&self, id: &PanelId) -> Vec<PanelId> {
        std::iter::once(id.clone())
            .chain(self.dependents(id).cloned())
            .collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &PanelId> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Computes page-scoped dependency maps
#[derive(Debug, Default, Clone, Copy)]
pub struct DependencyResolver;

impl DependencyResolver {
    pub fn new() -> Self {
        Self
    }

    /// Every given brick gets an entry, possibly empty. Repeated ids are
    /// considered once.
    pub fn resolve<'a>(&self, descriptors: impl IntoIterator<Item = &'a PanelDescriptor>) -> DependencyMap {
        let mut seen = HashSet::new();
        let entries: Vec<(&PanelDescriptor, DependencyKeys)> = descriptors
            .into_iter()
            .filter(|d| seen.insert(&d.id))
            .map(|d| (d, d.dependency_keys()))
            .collect();

        let mut map = BTreeMap::new();
        for (source, source_keys) in &entries {
            let mut deps = BTreeSet::new();
            if !source.read_only {
                for (target, target_keys) in &entries {
                    if target.id != source.id && source_keys.intersects(target_keys) {
                        deps.insert(target.id.clone());
                    }
                }
            }
            map.insert(source.id.clone(), deps);
        }

        debug!(bricks = map.len(), "Resolved brick dependencies");
        DependencyMap(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brick_types::{PanelKind, RecordType};
    use proptest::prelude::*;

    fn brick(id: &str) -> PanelDescriptor {
        PanelDescriptor::new(id, PanelKind::Simple)
    }

    #[test]
    fn test_shared_model_links_both_ways() {
        let a = brick("a").depends_on("persons.contact");
        let b = brick("b").depends_on("persons.contact").depends_on("billing.invoice");
        let c = brick("c").depends_on("billing.invoice");
        let d = brick("d").depends_on("assistants.todo");

        let map = DependencyResolver::new().resolve([&a, &b, &c, &d]);
        assert!(map.depends(&a.id, &b.id) && map.depends(&b.id, &a.id));
        assert!(map.depends(&b.id, &c.id) && map.depends(&c.id, &b.id));
        assert!(!map.depends(&a.id, &c.id));
        assert_eq!(map.dependents(&d.id).count(), 0);
    }

    #[test]
    fn test_read_only_bricks_are_targets_only() {
        let writer = brick("writer").depends_on("persons.contact");
        let viewer = brick("viewer").depends_on("persons.contact").read_only();
        let wild = brick("wild").depends_on_everything();

        let map = DependencyResolver::new().resolve([&writer, &viewer, &wild]);
        assert!(map.depends(&writer.id, &viewer.id));
        assert!(!map.depends(&viewer.id, &writer.id));
        assert!(map.depends(&wild.id, &viewer.id));
        assert_eq!(map.dependents(&viewer.id).count(), 0);
    }

    #[test]
    fn test_wildcard_links_everything() {
        let wild = brick("wild").depends_on_everything();
        let none = brick("none");

        let map = DependencyResolver::new().resolve([&wild, &none]);
        assert!(map.depends(&wild.id, &none.id));
        assert!(map.depends(&none.id, &wild.id));
    }

    #[test]
    fn test_relation_types_compare_exactly() {
        let employs = brick("employs")
            .depends_on(RecordType::relation())
            .depends_on_relation_type("employs");
        let customers = brick("customers")
            .depends_on(RecordType::relation())
            .depends_on_relation_type("customer_of");
        let employs_too = brick("employs-too").depends_on_relation_type("employs");
        let all_relations = brick("relations").depends_on(RecordType::relation());

        let map = DependencyResolver::new().resolve([&employs, &customers, &employs_too, &all_relations]);
        assert!(!map.depends(&employs.id, &customers.id));
        assert!(map.depends(&employs.id, &employs_too.id));
        assert!(!map.depends(&employs.id, &all_relations.id));
    }

    #[test]
    fn test_repeated_ids_and_reload_set() {
        let a = brick("a").depends_on("persons.contact");
        let b = brick("b").depends_on("persons.contact");

        let map = DependencyResolver::new().resolve([&a, &b, &a]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.reload_set(&a.id), vec![a.id.clone(), b.id.clone()]);
        assert!(!map.depends(&a.id, &a.id));
    }

    const MODELS: [&str; 3] = ["persons.contact", "billing.invoice", "relation"];
    const RTYPES: [&str; 2] = ["employs", "customer_of"];

    fn arb_descriptor(index: usize) -> impl Strategy<Value = PanelDescriptor> {
        (
            proptest::collection::vec(0..MODELS.len(), 0..3),
            proptest::collection::vec(0..RTYPES.len(), 0..2),
            any::<bool>(),
            prop::bool::weighted(0.1),
        )
            .prop_map(move |(models, rtypes, read_only, wildcard)| {
                let mut desc = brick(&format!("brick-{}", index));
                for m in models {
                    desc = desc.depends_on(MODELS[m]);
                }
                for r in rtypes {
                    desc = desc.depends_on_relation_type(RTYPES[r]);
                }
                if wildcard {
                    desc = desc.depends_on_everything();
                }
                if read_only {
                    desc = desc.read_only();
                }
                desc
            })
    }

    fn arb_page() -> impl Strategy<Value = Vec<PanelDescriptor>> {
        (1usize..8).prop_flat_map(|n| (0..n).map(arb_descriptor).collect::<Vec<_>>())
    }

    proptest! {
        #[test]
        fn prop_symmetric_except_read_only(page in arb_page()) {
            let map = DependencyResolver::new().resolve(&page);

            for a in &page {
                if a.read_only {
                    prop_assert_eq!(map.dependents(&a.id).count(), 0);
                }
                for b in &page {
                    if a.id == b.id || a.read_only || b.read_only {
                        continue;
                    }
                    prop_assert_eq!(map.depends(&a.id, &b.id), map.depends(&b.id, &a.id));
                }
            }
        }
    }
}
