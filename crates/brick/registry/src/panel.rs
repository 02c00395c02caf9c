//! Brick variants
//!
//! [`Panel`] pairs a descriptor with a variant-specific body. The set of
//! variants is closed; callers dispatch on [`PanelBody`].

use crate::render::Surface;
use crate::source::{OrderBy, RecordQuery};
use brick_types::{
    CustomFieldConfigItem, Dependency, InstanceClassId, InstanceConfigItem, PanelDescriptor,
    PanelId, PanelKind, Record, RecordType, RelationConfigItem, RelationTypeId,
};
use std::collections::BTreeSet;

/// Default number of rows per page of list bricks
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Template names per surface. A brick without a template for a surface
/// cannot be displayed there.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Templates {
    pub detail: Option<String>,
    pub home: Option<String>,
}

impl Templates {
    pub fn detail(template: impl Into<String>) -> Self {
        Self {
            detail: Some(template.into()),
            home: None,
        }
    }

    pub fn home(template: impl Into<String>) -> Self {
        Self {
            detail: None,
            home: Some(template.into()),
        }
    }

    pub fn both(detail: impl Into<String>, home: impl Into<String>) -> Self {
        Self {
            detail: Some(detail.into()),
            home: Some(home.into()),
        }
    }

    /// My-page uses the home template.
    pub fn for_surface(&self, surface: Surface) -> Option<&str> {
        match surface {
            Surface::Detail => self.detail.as_deref(),
            Surface::Home | Surface::MyPage => self.home.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimplePanel {
    pub templates: Templates,
}

/// What a paginated brick lists
#[derive(Debug, Clone, PartialEq)]
pub enum ListSource {
    /// Relations of the host record; an empty list means every type.
    /// Clients may narrow it with include/exclude filters.
    Relations { relation_types: Vec<RelationTypeId> },
    /// Records matching a fixed query
    Records(RecordQuery),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedPanel {
    pub templates: Templates,
    pub source: ListSource,
    pub page_size: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuerysetPanel {
    pub templates: Templates,
    pub query: RecordQuery,
    pub page_size: usize,
    /// Columns the client may sort on
    pub sortable: Vec<String>,
    pub default_order: Option<OrderBy>,
}

impl QuerysetPanel {
    pub fn is_sortable(&self, order: &OrderBy) -> bool {
        self.sortable.iter().any(|col| col == &order.field)
    }
}

/// A registered class of instance bricks. Instances are created by
/// administrators, each anchored on one record.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceClass {
    pub id: InstanceClassId,
    pub verbose_name: String,
    pub templates: Templates,
    pub dependencies: BTreeSet<Dependency>,
    pub target_record_types: BTreeSet<RecordType>,
    pub permissions: Vec<String>,
}

impl InstanceClass {
    pub fn new(id: impl Into<InstanceClassId>, templates: Templates) -> Self {
        Self {
            id: id.into(),
            verbose_name: String::new(),
            templates,
            dependencies: BTreeSet::new(),
            target_record_types: BTreeSet::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    pub fn depends_on(mut self, record_type: impl Into<RecordType>) -> Self {
        self.dependencies
            .insert(Dependency::Model(record_type.into()));
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

    pub fn descriptor_for(&self, item: &InstanceConfigItem) -> PanelDescriptor {
        let mut descriptor = PanelDescriptor::new(item.panel_id(), PanelKind::InstanceBound)
            .with_verbose_name(self.verbose_name.clone());
        descriptor.dependencies = self.dependencies.clone();
        descriptor.target_record_types = self.target_record_types.clone();
        descriptor.permissions = self.permissions.clone();
        descriptor
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InstancePanel {
    pub class: InstanceClass,
    pub item: InstanceConfigItem,
    pub anchor: Record,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationPanel {
    pub item: RelationConfigItem,
    pub page_size: usize,
}

impl RelationPanel {
    pub const TEMPLATE: &'static str = "bricks/relations.html";

    pub fn descriptor_for(item: &RelationConfigItem) -> PanelDescriptor {
        PanelDescriptor::new(item.panel_id(), PanelKind::RelationBound)
            .with_verbose_name(format!("Relations: {}", item.relation_type))
            .depends_on(RecordType::relation())
            .depends_on_relation_type(item.relation_type.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CustomPanel {
    pub item: CustomFieldConfigItem,
}

impl CustomPanel {
    pub const TEMPLATE: &'static str = "bricks/custom-fields.html";

    pub fn descriptor_for(item: &CustomFieldConfigItem) -> PanelDescriptor {
        PanelDescriptor::new(item.panel_id(), PanelKind::CustomFieldBound)
            .with_verbose_name(item.name.clone())
            .depends_on(item.record_type.clone())
            .targeting(item.record_type.clone())
    }
}

/// Why a requested brick could not be built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoidReason {
    /// Id unknown to the registry and the config stores
    Unknown,
    /// Known, but not displayable on this record type or surface
    Incompatible,
    /// Backing data is gone (anchor record, instance class)
    Unavailable,
}

impl VoidReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoidReason::Unknown => "unknown",
            VoidReason::Incompatible => "incompatible",
            VoidReason::Unavailable => "unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Simple(SimplePanel),
    Paginated(PaginatedPanel),
    Queryset(QuerysetPanel),
    Instance(InstancePanel),
    Relation(RelationPanel),
    Custom(CustomPanel),
    /// Placeholder for a brick the user may not see
    Forbidden { reason: String },
    /// Placeholder for a brick that cannot be built
    Void(VoidReason),
}

impl PanelBody {
    pub fn kind(&self) -> PanelKind {
        match self {
            PanelBody::Simple(_) => PanelKind::Simple,
            PanelBody::Paginated(_) => PanelKind::Paginated,
            PanelBody::Queryset(_) => PanelKind::QuerysetBacked,
            PanelBody::Instance(_) => PanelKind::InstanceBound,
            PanelBody::Relation(_) => PanelKind::RelationBound,
            PanelBody::Custom(_) => PanelKind::CustomFieldBound,
            PanelBody::Forbidden { .. } => PanelKind::Forbidden,
            PanelBody::Void(_) => PanelKind::Void,
        }
    }
}

/// A renderable brick
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    descriptor: PanelDescriptor,
    body: PanelBody,
}

impl Panel {
    /// Build a brick; the descriptor kind is taken from the body.
    pub fn new(mut descriptor: PanelDescriptor, body: PanelBody) -> Self {
        descriptor.kind = body.kind();
        if descriptor.kind.is_placeholder() {
            descriptor.read_only = true;
        }
        Self { descriptor, body }
    }

    pub fn simple(descriptor: PanelDescriptor, templates: Templates) -> Self {
        Self::new(descriptor, PanelBody::Simple(SimplePanel { templates }))
    }

    pub fn paginated(descriptor: PanelDescriptor, source: ListSource, templates: Templates) -> Self {
        Self::new(
            descriptor,
            PanelBody::Paginated(PaginatedPanel {
                templates,
                source,
                page_size: DEFAULT_PAGE_SIZE,
            }),
        )
    }

    pub fn queryset(
        descriptor: PanelDescriptor,
        query: RecordQuery,
        sortable: Vec<String>,
        templates: Templates,
    ) -> Self {
        let default_order = query.order_by.first().cloned();
        Self::new(
            descriptor,
            PanelBody::Queryset(QuerysetPanel {
                templates,
                query,
                page_size: DEFAULT_PAGE_SIZE,
                sortable,
                default_order,
            }),
        )
    }

    pub fn instance(class: InstanceClass, item: InstanceConfigItem, anchor: Record) -> Self {
        let descriptor = class.descriptor_for(&item);
        Self::new(
            descriptor,
            PanelBody::Instance(InstancePanel {
                class,
                item,
                anchor,
            }),
        )
    }

    pub fn relation(item: RelationConfigItem, page_size: usize) -> Self {
        Self::new(
            RelationPanel::descriptor_for(&item),
            PanelBody::Relation(RelationPanel { item, page_size }),
        )
    }

    pub fn custom(item: CustomFieldConfigItem) -> Self {
        Self::new(
            CustomPanel::descriptor_for(&item),
            PanelBody::Custom(CustomPanel { item }),
        )
    }

    pub fn forbidden(
        id: PanelId,
        verbose_name: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(
            PanelDescriptor::new(id, PanelKind::Forbidden)
                .with_verbose_name(verbose_name)
                .not_configurable(),
            PanelBody::Forbidden {
                reason: reason.into(),
            },
        )
    }

    pub fn void(id: PanelId, reason: VoidReason) -> Self {
        Self::new(
            PanelDescriptor::new(id, PanelKind::Void).not_configurable(),
            PanelBody::Void(reason),
        )
    }

    /// Override the page size of list bricks.
    pub fn with_page_size(mut self, size: usize) -> Self {
        let size = size.max(1);
        match &mut self.body {
            PanelBody::Paginated(p) => p.page_size = size,
            PanelBody::Queryset(q) => q.page_size = size,
            PanelBody::Relation(r) => r.page_size = size,
            _ => {}
        }
        self
    }

    pub fn id(&self) -> &PanelId {
        &self.descriptor.id
    }

    pub fn kind(&self) -> PanelKind {
        self.descriptor.kind
    }

    pub fn descriptor(&self) -> &PanelDescriptor {
        &self.descriptor
    }

    pub fn body(&self) -> &PanelBody {
        &self.body
    }

    /// Void bricks for unknown ids are dropped from reload responses.
    pub fn is_unknown(&self) -> bool {
        matches!(self.body, PanelBody::Void(VoidReason::Unknown))
    }

    /// Templates of template-driven variants.
    pub fn templates(&self) -> Option<&Templates> {
        match &self.body {
            PanelBody::Simple(p) => Some(&p.templates),
            PanelBody::Paginated(p) => Some(&p.templates),
            PanelBody::Queryset(p) => Some(&p.templates),
            PanelBody::Instance(p) => Some(&p.class.templates),
            PanelBody::Relation(_)
            | PanelBody::Custom(_)
            | PanelBody::Forbidden { .. }
            | PanelBody::Void(_) => None,
        }
    }

    /// Whether the brick can be displayed on a surface.
    pub fn supports(&self, surface: Surface) -> bool {
        match self.templates() {
            Some(templates) => templates.for_surface(surface).is_some(),
            None => match self.body {
                // Record-bound bricks only exist on detail pages.
                PanelBody::Relation(_) | PanelBody::Custom(_) => surface == Surface::Detail,
                _ => true,
            },
        }
    }

    /// Whether the brick can be displayed on a record of the given type.
    pub fn is_compatible_with(&self, record_type: &RecordType) -> bool {
        self.descriptor.is_compatible_with(record_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_follows_body() {
        let panel = Panel::simple(
            PanelDescriptor::new("persons-card", PanelKind::Paginated),
            Templates::detail("card.html"),
        );
        assert_eq!(panel.kind(), PanelKind::Simple);
    }

    #[test]
    fn test_placeholders_are_read_only() {
        let forbidden = Panel::forbidden("billing-totals".into(), "Totals", "missing billing");
        let void = Panel::void("nope".into(), VoidReason::Unknown);

        assert!(forbidden.descriptor().read_only);
        assert!(void.descriptor().read_only);
        assert!(void.is_unknown());
        assert!(!forbidden.is_unknown());
    }

    #[test]
    fn test_surface_support() {
        let detail_only = Panel::simple(
            PanelDescriptor::new("a", PanelKind::Simple),
            Templates::detail("a.html"),
        );
        assert!(detail_only.supports(Surface::Detail));
        assert!(!detail_only.supports(Surface::Home));
        assert!(!detail_only.supports(Surface::MyPage));

        let relation = Panel::relation(RelationConfigItem::new("employs"), DEFAULT_PAGE_SIZE);
        assert!(relation.supports(Surface::Detail));
        assert!(!relation.supports(Surface::Home));
    }

    #[test]
    fn test_synthesized_descriptors() {
        let item = RelationConfigItem::new("persons-employed_by");
        let panel = Panel::relation(item.clone(), DEFAULT_PAGE_SIZE);
        assert_eq!(panel.id(), &item.panel_id());
        assert!(panel
            .descriptor()
            .relation_type_dependencies
            .contains(&RelationTypeId::new("persons-employed_by")));

        let custom = CustomFieldConfigItem::new("persons.contact", "Social", vec!["twitter".into()]);
        let panel = Panel::custom(custom);
        assert!(panel.is_compatible_with(&"persons.contact".into()));
        assert!(!panel.is_compatible_with(&"billing.invoice".into()));
    }
}
