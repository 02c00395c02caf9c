//! Brick registry
//!
//! Static bricks, record-fields overrides, hat bricks and instance classes
//! are registered once through a [`PanelRegistryBuilder`]. The built
//! [`PanelRegistry`] is immutable and shared behind an `Arc`; a clone can be
//! turned back into a builder to extend it in isolation.

use crate::error::{RegistryError, Result};
use crate::panel::{InstanceClass, Panel, Templates};
use crate::render::Surface;
use brick_types::{InstanceClassId, PanelDescriptor, PanelId, PanelKind, RecordType};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Template of the generic record-fields brick
pub const GENERIC_RECORD_TEMPLATE: &str = "bricks/generic/info.html";
/// Template of the generic hat brick
pub const GENERIC_HAT_TEMPLATE: &str = "bricks/generic/hat-bar.html";

/// Read-only catalog of registered bricks
#[derive(Debug, Clone)]
pub struct PanelRegistry {
    panels: HashMap<PanelId, Panel>,
    /// Registration order, for stable listings
    order: Vec<PanelId>,
    instance_classes: HashMap<InstanceClassId, InstanceClass>,
    record_panels: HashMap<RecordType, Panel>,
    main_hats: HashMap<RecordType, Panel>,
    secondary_hats: HashMap<RecordType, Vec<Panel>>,
    invalid: HashMap<RecordType, HashSet<PanelId>>,
    generic_record_panel: Panel,
    generic_hat: Panel,
}

impl Default for PanelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelRegistry {
    /// Empty registry holding only the generic record-fields and hat bricks.
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
            order: Vec::new(),
            instance_classes: HashMap::new(),
            record_panels: HashMap::new(),
            main_hats: HashMap::new(),
            secondary_hats: HashMap::new(),
            invalid: HashMap::new(),
            generic_record_panel: Panel::simple(
                PanelDescriptor::new(PanelId::RECORD_FIELDS, PanelKind::Simple)
                    .with_verbose_name("Information on the record"),
                Templates::detail(GENERIC_RECORD_TEMPLATE),
            ),
            generic_hat: Panel::simple(
                PanelDescriptor::new(PanelId::GENERIC_HAT, PanelKind::Simple)
                    .with_verbose_name("Title bar"),
                Templates::detail(GENERIC_HAT_TEMPLATE),
            ),
        }
    }

    pub fn builder() -> PanelRegistryBuilder {
        PanelRegistryBuilder {
            registry: Self::new(),
        }
    }

    /// Reopen a (cloned) registry for further registrations.
    pub fn into_builder(self) -> PanelRegistryBuilder {
        PanelRegistryBuilder { registry: self }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// A static brick.
    pub fn get(&self, id: &PanelId) -> Result<&Panel> {
        self.panels
            .get(id)
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    /// Any non-synthesized brick: statics, the record-fields brick and hat
    /// bricks, the latter resolved for `record_type` when given.
    pub fn get_for_record(&self, id: &PanelId, record_type: Option<&RecordType>) -> Result<&Panel> {
        if id.as_str() == PanelId::RECORD_FIELDS {
            return Ok(match record_type {
                Some(rt) => self.record_panel(rt),
                None => &self.generic_record_panel,
            });
        }

        if id.as_str() == PanelId::GENERIC_HAT {
            return Ok(record_type
                .and_then(|rt| self.main_hats.get(rt))
                .unwrap_or(&self.generic_hat));
        }

        if id.is_hat() {
            return record_type
                .and_then(|rt| self.secondary_hats.get(rt))
                .and_then(|hats| hats.iter().find(|p| p.id() == id))
                .ok_or_else(|| RegistryError::NotFound(id.clone()));
        }

        self.get(id)
    }

    pub fn instance_class(&self, id: &InstanceClassId) -> Option<&InstanceClass> {
        self.instance_classes.get(id)
    }

    pub fn instance_classes(&self) -> impl Iterator<Item = &InstanceClass> {
        self.instance_classes.values()
    }

    /// Record-fields brick of a record type: the registered override or the
    /// generic one.
    pub fn record_panel(&self, record_type: &RecordType) -> &Panel {
        self.record_panels
            .get(record_type)
            .unwrap_or(&self.generic_record_panel)
    }

    pub fn has_record_panel_override(&self, record_type: &RecordType) -> bool {
        self.record_panels.contains_key(record_type)
    }

    pub fn is_invalid_for(&self, id: &PanelId, record_type: &RecordType) -> bool {
        self.invalid
            .get(record_type)
            .is_some_and(|ids| ids.contains(id))
    }

    /// Configurable static bricks displayable on detail pages of a record
    /// type, in registration order.
    pub fn compatible_static(&self, record_type: &RecordType) -> Vec<&Panel> {
        self.ordered()
            .filter(|p| p.descriptor().configurable)
            .filter(|p| p.supports(Surface::Detail))
            .filter(|p| p.is_compatible_with(record_type))
            .filter(|p| !self.is_invalid_for(p.id(), record_type))
            .collect()
    }

    /// Configurable static bricks displayable on detail pages of any record
    /// type, for the layers shared by every type.
    pub fn generic_static(&self) -> Vec<&Panel> {
        self.ordered()
            .filter(|p| p.descriptor().configurable)
            .filter(|p| p.supports(Surface::Detail))
            .filter(|p| p.descriptor().target_record_types.is_empty())
            .collect()
    }

    /// Configurable static bricks displayable on home and my-page.
    pub fn home_panels(&self) -> Vec<&Panel> {
        self.ordered()
            .filter(|p| p.descriptor().configurable)
            .filter(|p| p.supports(Surface::Home))
            .collect()
    }

    /// Hat bricks available for a record type: the main one (registered or
    /// generic) first, then the secondary ones.
    pub fn resolve_hat_panels(&self, record_type: &RecordType) -> Vec<&Panel> {
        let main = self.main_hats.get(record_type).unwrap_or(&self.generic_hat);
        std::iter::once(main)
            .chain(self.secondary_hats.get(record_type).into_iter().flatten())
            .collect()
    }

    fn ordered(&self) -> impl Iterator<Item = &Panel> {
        self.order.iter().filter_map(|id| self.panels.get(id))
    }
}

/// Registration phase of a [`PanelRegistry`]
#[derive(Debug)]
pub struct PanelRegistryBuilder {
    registry: PanelRegistry,
}

impl Default for PanelRegistryBuilder {
    fn default() -> Self {
        PanelRegistry::builder()
    }
}

fn check_static_kind(panel: &Panel) -> Result<()> {
    match panel.kind() {
        PanelKind::Simple | PanelKind::Paginated | PanelKind::QuerysetBacked => Ok(()),
        kind => Err(RegistryError::InvalidKind {
            id: panel.id().clone(),
            kind,
        }),
    }
}

impl PanelRegistryBuilder {
    /// Register a static brick.
    pub fn register(&mut self, panel: Panel) -> Result<&mut Self> {
        check_static_kind(&panel)?;

        let id = panel.id().clone();
        if id.is_empty_slot() || id.is_reserved() {
            return Err(RegistryError::MalformedId(id));
        }
        if self.registry.panels.contains_key(&id) {
            return Err(RegistryError::DuplicateId(id));
        }

        debug!(panel_id = %id, kind = %panel.kind(), "Registered brick");
        self.registry.order.push(id.clone());
        self.registry.panels.insert(id, panel);
        Ok(self)
    }

    pub fn register_many(&mut self, panels: impl IntoIterator<Item = Panel>) -> Result<&mut Self> {
        for panel in panels {
            self.register(panel)?;
        }
        Ok(self)
    }

    pub fn register_instance_class(&mut self, class: InstanceClass) -> Result<&mut Self> {
        if self.registry.instance_classes.contains_key(&class.id) {
            return Err(RegistryError::DuplicateInstanceClass(class.id));
        }
        debug!(class_id = %class.id, "Registered instance brick class");
        self.registry
            .instance_classes
            .insert(class.id.clone(), class);
        Ok(self)
    }

    /// Override the generic record-fields brick for one record type.
    pub fn register_record_panel(
        &mut self,
        record_type: impl Into<RecordType>,
        panel: Panel,
    ) -> Result<&mut Self> {
        check_static_kind(&panel)?;
        if panel.id().as_str() != PanelId::RECORD_FIELDS {
            return Err(RegistryError::MalformedId(panel.id().clone()));
        }

        let record_type = record_type.into();
        if self.registry.record_panels.contains_key(&record_type) {
            return Err(RegistryError::DuplicateId(panel.id().clone()));
        }
        self.registry.record_panels.insert(record_type, panel);
        Ok(self)
    }

    /// Register hat bricks of a record type. The main hat must use the
    /// generic hat id; secondary hats the reserved hat prefix. Nothing is
    /// registered when any of them is rejected.
    pub fn register_hat(
        &mut self,
        record_type: impl Into<RecordType>,
        main: Option<Panel>,
        secondaries: Vec<Panel>,
    ) -> Result<&mut Self> {
        let record_type = record_type.into();

        if let Some(main) = &main {
            check_static_kind(main)?;
            if main.id().as_str() != PanelId::GENERIC_HAT {
                return Err(RegistryError::MalformedHatId(main.id().clone()));
            }
            if self.registry.main_hats.contains_key(&record_type) {
                return Err(RegistryError::DuplicateMainHat(record_type));
            }
        }

        let existing = self.registry.secondary_hats.get(&record_type);
        let mut seen: HashSet<&PanelId> = existing
            .into_iter()
            .flatten()
            .map(|p| p.id())
            .collect();
        for hat in &secondaries {
            check_static_kind(hat)?;
            let id = hat.id();
            if !id.as_str().starts_with(PanelId::HAT_PREFIX) || id.as_str() == PanelId::HAT_PREFIX {
                return Err(RegistryError::MalformedHatId(id.clone()));
            }
            if !seen.insert(id) {
                return Err(RegistryError::DuplicateId(id.clone()));
            }
        }

        if let Some(main) = main {
            self.registry.main_hats.insert(record_type.clone(), main);
        }
        self.registry
            .secondary_hats
            .entry(record_type)
            .or_default()
            .extend(secondaries);
        Ok(self)
    }

    /// Declare bricks never displayable on a record type.
    pub fn register_invalid_record_types(
        &mut self,
        record_type: impl Into<RecordType>,
        ids: impl IntoIterator<Item = PanelId>,
    ) -> &mut Self {
        self.registry
            .invalid
            .entry(record_type.into())
            .or_default()
            .extend(ids);
        self
    }

    pub fn build(self) -> PanelRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simple(id: &str) -> Panel {
        Panel::simple(
            PanelDescriptor::new(id, PanelKind::Simple),
            Templates::detail(format!("{}.html", id)),
        )
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut builder = PanelRegistry::builder();
        builder.register(simple("persons-card")).unwrap();

        let err = builder.register(simple("persons-card")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateId(_)));
        assert!(err.is_registration());
    }

    #[test]
    fn test_reserved_ids_rejected() {
        let mut builder = PanelRegistry::builder();
        for id in ["", "model", "hat", "hat-x", "rtype-foo"] {
            assert!(
                matches!(builder.register(simple(id)), Err(RegistryError::MalformedId(_))),
                "{:?} should be rejected",
                id
            );
        }
    }

    #[test]
    fn test_synthesized_kinds_cannot_be_registered() {
        let mut builder = PanelRegistry::builder();
        let err = builder
            .register(Panel::void("persons-void".into(), crate::VoidReason::Unknown))
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidKind { .. }));
    }

    #[test]
    fn test_hat_registration() {
        let mut builder = PanelRegistry::builder();
        builder
            .register_hat("persons.contact", Some(simple("hat")), vec![simple("hat-card")])
            .unwrap();

        assert!(matches!(
            builder.register_hat("persons.contact", Some(simple("hat")), vec![]),
            Err(RegistryError::DuplicateMainHat(_))
        ));
        assert!(matches!(
            builder.register_hat("persons.organisation", None, vec![simple("card")]),
            Err(RegistryError::MalformedHatId(_))
        ));
        assert!(matches!(
            builder.register_hat("persons.organisation", Some(simple("hat-main")), vec![]),
            Err(RegistryError::MalformedHatId(_))
        ));

        let registry = builder.build();
        let contact: RecordType = "persons.contact".into();
        let hats = registry.resolve_hat_panels(&contact);
        let ids: Vec<_> = hats.iter().map(|p| p.id().as_str()).collect();
        assert_eq!(ids, vec!["hat", "hat-card"]);
        assert_eq!(
            hats[0].templates().and_then(|t| t.detail.as_deref()),
            Some("hat.html")
        );

        let orga: RecordType = "persons.organisation".into();
        let hats = registry.resolve_hat_panels(&orga);
        assert_eq!(hats.len(), 1);
        assert_eq!(
            hats[0].templates().and_then(|t| t.detail.as_deref()),
            Some(GENERIC_HAT_TEMPLATE)
        );
        assert!(registry
            .get_for_record(&"hat-card".into(), Some(&orga))
            .is_err());
    }

    #[test]
    fn test_compatible_static_filters() {
        let mut builder = PanelRegistry::builder();
        builder
            .register_many([
                simple("persons-card"),
                Panel::simple(
                    PanelDescriptor::new("billing-totals", PanelKind::Simple)
                        .targeting("billing.invoice"),
                    Templates::detail("totals.html"),
                ),
                Panel::simple(
                    PanelDescriptor::new("core-history", PanelKind::Simple),
                    Templates::home("history.html"),
                ),
                Panel::simple(
                    PanelDescriptor::new("core-internal", PanelKind::Simple).not_configurable(),
                    Templates::detail("internal.html"),
                ),
                simple("core-properties"),
            ])
            .unwrap();
        builder.register_invalid_record_types("persons.contact", ["core-properties".into()]);
        let registry = builder.build();

        let contact: RecordType = "persons.contact".into();
        let ids: Vec<_> = registry
            .compatible_static(&contact)
            .iter()
            .map(|p| p.id().as_str())
            .collect();
        assert_eq!(ids, vec!["persons-card"]);

        let home: Vec<_> = registry.home_panels().iter().map(|p| p.id().as_str()).collect();
        assert_eq!(home, vec!["core-history"]);

        let generic: Vec<_> = registry.generic_static().iter().map(|p| p.id().as_str()).collect();
        assert_eq!(generic, vec!["persons-card", "core-properties"]);
    }

    #[test]
    fn test_record_panel_override() {
        let mut builder = PanelRegistry::builder();
        assert!(matches!(
            builder.register_record_panel("persons.contact", simple("persons-info")),
            Err(RegistryError::MalformedId(_))
        ));
        builder
            .register_record_panel(
                "persons.contact",
                Panel::simple(
                    PanelDescriptor::new("model", PanelKind::Simple),
                    Templates::detail("persons/contact-info.html"),
                ),
            )
            .unwrap();
        let registry = builder.build();

        let contact: RecordType = "persons.contact".into();
        let invoice: RecordType = "billing.invoice".into();
        assert!(registry.has_record_panel_override(&contact));
        assert_eq!(
            registry.record_panel(&invoice).templates().and_then(|t| t.detail.as_deref()),
            Some(GENERIC_RECORD_TEMPLATE)
        );
        assert!(registry.get_for_record(&"model".into(), None).is_ok());
    }

    #[test]
    fn test_clone_is_isolated() {
        let mut builder = PanelRegistry::builder();
        builder.register(simple("persons-card")).unwrap();
        let shared = builder.build();

        let mut extended = shared.clone().into_builder();
        extended.register(simple("persons-extra")).unwrap();
        let extended = extended.build();

        assert_eq!(shared.len(), 1);
        assert_eq!(extended.len(), 2);
    }
}
