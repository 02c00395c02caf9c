//! Demonstration catalog
//!
//! A handful of bricks over contacts, organisations and invoices, with
//! matching records, so that a fresh daemon has something to place and
//! render. Hosts embedding the brick crates register their own catalog.

use crate::error::DaemonResult;
use crate::templates::HtmlTemplates;
use brick_registry::{
    InMemoryRecordSource, InstanceClass, ListSource, OrderBy, Panel, PanelRegistry, RecordQuery,
    Templates,
};
use brick_types::{PanelDescriptor, PanelKind, Record, Relation};
use serde_json::json;
use tracing::info;

/// Build the demonstration brick registry.
pub fn demo_registry() -> DaemonResult<PanelRegistry> {
    let mut builder = PanelRegistry::builder();
    builder
        .register(Panel::simple(
            PanelDescriptor::new("persons-card", PanelKind::Simple)
                .with_verbose_name("Contact card")
                .depends_on("persons.contact")
                .targeting("persons.contact"),
            Templates::detail("persons/card.html"),
        ))?
        .register(Panel::simple(
            PanelDescriptor::new("core-history", PanelKind::Simple)
                .with_verbose_name("History")
                .depends_on_everything(),
            Templates::both("core/history.html", "core/history-home.html"),
        ))?
        .register(
            Panel::paginated(
                PanelDescriptor::new("persons-employees", PanelKind::Paginated)
                    .with_verbose_name("Employees")
                    .depends_on("persons.contact")
                    .depends_on_relation_type("persons.employed_by")
                    .targeting("persons.organisation"),
                ListSource::Relations {
                    relation_types: vec!["persons.employs".into()],
                },
                Templates::detail("persons/employees.html"),
            )
            .with_page_size(5),
        )?
        .register(Panel::queryset(
            PanelDescriptor::new("billing-invoices", PanelKind::QuerysetBacked)
                .with_verbose_name("Latest invoices")
                .depends_on("billing.invoice")
                .requiring("billing.view"),
            RecordQuery::new("billing.invoice").ordered_by(OrderBy::desc("number")),
            vec!["number".to_string(), "total".to_string()],
            Templates::both("billing/invoices.html", "billing/invoices-home.html"),
        ))?
        .register_hat(
            "persons.contact",
            Some(Panel::simple(
                PanelDescriptor::new("hat", PanelKind::Simple).with_verbose_name("Contact title bar"),
                Templates::detail("persons/hat-bar.html"),
            )),
            vec![Panel::simple(
                PanelDescriptor::new("hat-persons-card", PanelKind::Simple)
                    .with_verbose_name("Contact summary"),
                Templates::detail("persons/hat-card.html"),
            )],
        )?
        .register_instance_class(
            InstanceClass::new("reports-chart", Templates::home("reports/chart.html"))
                .with_verbose_name("Report chart")
                .depends_on("billing.invoice")
                .requiring("billing.view"),
        )?;

    let registry = builder.build();
    info!(bricks = registry.len(), "Loaded demonstration brick catalog");
    Ok(registry)
}

/// Templates of the demonstration bricks.
pub fn demo_templates() -> HtmlTemplates {
    HtmlTemplates::new()
        .with_template(
            "persons/card.html",
            r#"<div class="brick" id="brick-{{ brick.id }}"><h3>{{ record.label }}</h3><p>{{ record.fields.email }}</p></div>"#,
        )
        .with_template(
            "persons/hat-bar.html",
            r#"<div class="brick hat" id="brick-{{ brick.id }}"><h1>{{ record.label }}</h1></div>"#,
        )
        .with_template(
            "persons/employees.html",
            r#"<div class="brick" id="brick-{{ brick.id }}"><h3>{{ brick.verbose_name }}</h3><span class="pager">{{ page.number }}/{{ page.count }}</span></div>"#,
        )
        .with_template(
            "billing/invoices-home.html",
            r#"<div class="brick" id="brick-{{ brick.id }}"><h3>{{ brick.verbose_name }}</h3><span class="order">{{ order_by }}</span><span class="pager">{{ page.number }}/{{ page.count }}</span></div>"#,
        )
}

/// Seed the record source with demonstration records.
pub async fn seed_records(records: &InMemoryRecordSource) {
    records
        .insert_record(
            Record::new("c1", "persons.contact", "Ada Lovelace")
                .with_field("email", json!("ada@example.org")),
        )
        .await;
    records
        .insert_record(
            Record::new("c2", "persons.contact", "Charles Babbage")
                .with_field("email", json!("charles@example.org")),
        )
        .await;
    records
        .insert_record(Record::new("o1", "persons.organisation", "Analytical Engines Ltd"))
        .await;

    for contact in ["c1", "c2"] {
        records
            .insert_relation(Relation {
                subject: "o1".into(),
                relation_type: "persons.employs".into(),
                object: contact.into(),
            })
            .await;
        records
            .insert_relation(Relation {
                subject: contact.into(),
                relation_type: "persons.employed_by".into(),
                object: "o1".into(),
            })
            .await;
    }

    for n in 1..=12 {
        records
            .insert_record(
                Record::new(format!("inv{}", n), "billing.invoice", format!("Invoice #{}", n))
                    .with_field("number", json!(n))
                    .with_field("total", json!(n * 100)),
            )
            .await;
    }
}
