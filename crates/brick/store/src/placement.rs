//! Layered placement resolution
//!
//! Detail-view placement is resolved by precedence, first non-empty layer
//! wins:
//!
//! 1. the record type's layer for the user's audience
//! 2. the global layer (no record type) for the same audience
//! 3. the record type's default-audience layer
//! 4. the global default-audience layer
//!
//! A layer is taken as a whole: zones it leaves empty resolve to nothing
//! rather than being inherited from a lower layer.

use crate::error::{ConflictReason, Result, StoreError};
use crate::storage::PlacementStorage;
use brick_types::{
    Audience, HomePlacementRule, MyPagePlacementRule, PanelId, PlacementRule, RecordType, UserId,
    Zone, ZoneLayout,
};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Identity of a detail placement layer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayerKey {
    pub record_type: Option<RecordType>,
    pub audience: Audience,
}

impl LayerKey {
    pub fn new(record_type: Option<RecordType>, audience: Audience) -> Self {
        Self {
            record_type,
            audience,
        }
    }

    pub fn global_default() -> Self {
        Self::new(None, Audience::Default)
    }
}

/// Outcome of a detail placement lookup
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Layer the rows come from; None when nothing is configured at all
    pub layer: Option<LayerKey>,
    /// Rows ordered by (zone, order), empty-slot rows included
    pub rules: Vec<PlacementRule>,
}

impl Resolution {
    pub fn layout(&self) -> ZoneLayout {
        ZoneLayout::from_rules(&self.rules)
    }

    /// Brick ids of one zone, in display order.
    pub fn zone(&self, zone: Zone) -> Vec<PanelId> {
        self.rules
            .iter()
            .filter(|r| r.zone == zone && !r.is_empty_slot())
            .map(|r| r.panel_id.clone())
            .collect()
    }

    /// Whether the zone has rows, possibly only the empty-slot sentinel.
    pub fn is_configured(&self, zone: Zone) -> bool {
        self.rules.iter().any(|r| r.zone == zone)
    }
}

/// Outcome of a home or "my page" lookup
#[derive(Debug, Clone, PartialEq)]
pub struct HomeResolution {
    pub panel_ids: Vec<PanelId>,
    /// Whether a dedicated (non-default) layer was used
    pub specific: bool,
}

/// Placement configuration service
pub struct PlacementService {
    storage: Arc<dyn PlacementStorage>,
}

impl PlacementService {
    pub fn new(storage: Arc<dyn PlacementStorage>) -> Self {
        Self { storage }
    }

    /// Resolve the detail placement of a record type for an audience.
    pub async fn placements_for(
        &self,
        record_type: &RecordType,
        audience: &Audience,
    ) -> Result<Resolution> {
        let mut audiences = vec![audience.clone()];
        if !audience.is_default() {
            audiences.push(Audience::Default);
        }

        // One query for every candidate layer.
        let rows = self
            .storage
            .detail_rules(&[Some(record_type.clone()), None], &audiences)
            .await?;

        let precedence = [
            LayerKey::new(Some(record_type.clone()), audience.clone()),
            LayerKey::new(None, audience.clone()),
            LayerKey::new(Some(record_type.clone()), Audience::Default),
            LayerKey::global_default(),
        ];

        for key in precedence {
            let mut rules: Vec<PlacementRule> = rows
                .iter()
                .filter(|r| r.belongs_to(key.record_type.as_ref(), &key.audience))
                .cloned()
                .collect();

            if !rules.is_empty() {
                rules.sort_by_key(|r| (r.zone, r.order));
                debug!(
                    record_type = %record_type,
                    audience = %audience,
                    layer_audience = %key.audience,
                    global = key.record_type.is_none(),
                    "Resolved detail placement"
                );
                return Ok(Resolution {
                    layer: Some(key),
                    rules,
                });
            }
        }

        Ok(Resolution {
            layer: None,
            rules: Vec::new(),
        })
    }

    /// Rows of exactly one layer, without fallback.
    pub async fn layer(&self, key: &LayerKey) -> Result<Vec<PlacementRule>> {
        let mut rules = self
            .storage
            .detail_rules(&[key.record_type.clone()], &[key.audience.clone()])
            .await?;
        rules.sort_by_key(|r| (r.zone, r.order));
        Ok(rules)
    }

    /// Replace one detail layer.
    ///
    /// A brick may appear only once across the zones of a layer.
    pub async fn set_detail_layer(
        &self,
        record_type: Option<&RecordType>,
        audience: &Audience,
        layout: &ZoneLayout,
    ) -> Result<Vec<PlacementRule>> {
        if let Some(panel_id) = layout.duplicate_ids().into_iter().next() {
            return Err(StoreError::Conflict(ConflictReason::DuplicatePlacement {
                panel_id,
                record_type: record_type.cloned(),
                audience: audience.clone(),
            }));
        }

        let rules = layout.to_rules(record_type, audience);
        self.storage
            .replace_detail_layer(record_type, audience, rules.clone())
            .await?;

        info!(
            record_type = record_type.map(RecordType::as_str).unwrap_or("*"),
            audience = %audience,
            rows = rules.len(),
            "Stored detail placement layer"
        );
        Ok(rules)
    }

    /// Delete one detail layer; lookups fall back to lower layers afterwards.
    ///
    /// The global default layer cannot be deleted.
    pub async fn delete_detail_layer(
        &self,
        record_type: Option<&RecordType>,
        audience: &Audience,
    ) -> Result<usize> {
        if record_type.is_none() && audience.is_default() {
            return Err(StoreError::Conflict(ConflictReason::DefaultLayerProtected));
        }

        let removed = self
            .storage
            .delete_detail_layer(record_type, audience)
            .await?;
        info!(
            record_type = record_type.map(RecordType::as_str).unwrap_or("*"),
            audience = %audience,
            removed,
            "Deleted detail placement layer"
        );
        Ok(removed)
    }

    /// Give a record type its own default layer, copied from the global
    /// default one. Does nothing if the record type is already configured
    /// or if there is no global default layer to copy.
    pub async fn ensure_record_type_layer(&self, record_type: &RecordType) -> Result<bool> {
        let key = LayerKey::new(Some(record_type.clone()), Audience::Default);
        if !self.layer(&key).await?.is_empty() {
            return Ok(false);
        }

        let global = self.layer(&LayerKey::global_default()).await?;
        if global.is_empty() {
            debug!(record_type = %record_type, "No global default layer to copy");
            return Ok(false);
        }
        let layout = ZoneLayout::from_rules(&global);
        self.set_detail_layer(Some(record_type), &Audience::Default, &layout)
            .await?;
        Ok(true)
    }

    /// Resolve home page bricks: the audience's layer, else the default one.
    pub async fn home_placements(&self, audience: &Audience) -> Result<HomeResolution> {
        let mut audiences = vec![audience.clone()];
        if !audience.is_default() {
            audiences.push(Audience::Default);
        }
        let rows = self.storage.home_rules(&audiences).await?;

        let pick = |wanted: &Audience| {
            let mut layer: Vec<&HomePlacementRule> =
                rows.iter().filter(|r| &r.audience == wanted).collect();
            layer.sort_by_key(|r| r.order);
            layer
        };

        let specific = pick(audience);
        let (layer, is_specific) = if !specific.is_empty() {
            (specific, !audience.is_default())
        } else {
            (pick(&Audience::Default), false)
        };

        Ok(HomeResolution {
            panel_ids: non_empty_ids(layer.into_iter().map(|r| &r.panel_id)),
            specific: is_specific,
        })
    }

    pub async fn set_home_layer(&self, audience: &Audience, panel_ids: &[PanelId]) -> Result<()> {
        ensure_unique(panel_ids, None, audience)?;

        let rules = ordered_rows(panel_ids)
            .map(|(panel_id, order)| HomePlacementRule {
                audience: audience.clone(),
                panel_id,
                order,
            })
            .collect();
        self.storage.replace_home_layer(audience, rules).await?;
        info!(audience = %audience, "Stored home placement layer");
        Ok(())
    }

    pub async fn delete_home_layer(&self, audience: &Audience) -> Result<usize> {
        if audience.is_default() {
            return Err(StoreError::Conflict(ConflictReason::DefaultLayerProtected));
        }
        self.storage.delete_home_layer(audience).await
    }

    /// Resolve "my page" bricks: the user's own rows, else the default ones.
    pub async fn mypage_placements(&self, user: &UserId) -> Result<HomeResolution> {
        let rows = self
            .storage
            .mypage_rules(&[Some(user.clone()), None])
            .await?;

        let pick = |wanted: Option<&UserId>| {
            let mut layer: Vec<&MyPagePlacementRule> =
                rows.iter().filter(|r| r.user.as_ref() == wanted).collect();
            layer.sort_by_key(|r| r.order);
            layer
        };

        let own = pick(Some(user));
        let (layer, specific) = if own.is_empty() {
            (pick(None), false)
        } else {
            (own, true)
        };

        Ok(HomeResolution {
            panel_ids: non_empty_ids(layer.into_iter().map(|r| &r.panel_id)),
            specific,
        })
    }

    pub async fn set_mypage_layer(&self, user: Option<&UserId>, panel_ids: &[PanelId]) -> Result<()> {
        ensure_unique(panel_ids, None, &Audience::Default)?;

        let rules = ordered_rows(panel_ids)
            .map(|(panel_id, order)| MyPagePlacementRule {
                user: user.cloned(),
                panel_id,
                order,
            })
            .collect();
        self.storage
            .replace_mypage_layer(user, rules)
            .await?;
        info!(user = user.map(UserId::as_str).unwrap_or("*"), "Stored my-page placement layer");
        Ok(())
    }
}

fn non_empty_ids<'a>(ids: impl Iterator<Item = &'a PanelId>) -> Vec<PanelId> {
    ids.filter(|id| !id.is_empty_slot()).cloned().collect()
}

fn ensure_unique(
    panel_ids: &[PanelId],
    record_type: Option<&RecordType>,
    audience: &Audience,
) -> Result<()> {
    let mut seen = HashSet::new();
    for id in panel_ids.iter().filter(|id| !id.is_empty_slot()) {
        if !seen.insert(id) {
            return Err(StoreError::Conflict(ConflictReason::DuplicatePlacement {
                panel_id: id.clone(),
                record_type: record_type.cloned(),
                audience: audience.clone(),
            }));
        }
    }
    Ok(())
}

/// Numbered rows; an empty list yields the empty-slot sentinel.
fn ordered_rows(panel_ids: &[PanelId]) -> impl Iterator<Item = (PanelId, u32)> + '_ {
    let sentinel = panel_ids.is_empty().then(PanelId::empty_slot);
    panel_ids
        .iter()
        .cloned()
        .chain(sentinel)
        .enumerate()
        .map(|(idx, id)| (id, idx as u32 + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use brick_types::RoleId;
    use proptest::prelude::*;

    fn contact() -> RecordType {
        RecordType::new("persons.contact")
    }

    fn service() -> PlacementService {
        PlacementService::new(Arc::new(InMemoryStorage::new()))
    }

    fn default_contact_layout() -> ZoneLayout {
        ZoneLayout::new()
            .with_zone(Zone::Top, Vec::<PanelId>::new())
            .with_zone(Zone::Left, ["left-props"])
            .with_zone(Zone::Right, ["right-rel"])
            .with_zone(Zone::Bottom, Vec::<PanelId>::new())
    }

    #[tokio::test]
    async fn test_superuser_layer_does_not_inherit_zones() {
        let svc = service();
        svc.set_detail_layer(Some(&contact()), &Audience::Default, &default_contact_layout())
            .await
            .unwrap();
        svc.set_detail_layer(
            Some(&contact()),
            &Audience::Superuser,
            &ZoneLayout::new().with_zone(Zone::Top, ["x"]),
        )
        .await
        .unwrap();

        let res = svc.placements_for(&contact(), &Audience::Superuser).await.unwrap();
        assert_eq!(res.layer, Some(LayerKey::new(Some(contact()), Audience::Superuser)));
        assert_eq!(res.zone(Zone::Top), vec![PanelId::new("x")]);
        for zone in [Zone::Left, Zone::Right, Zone::Bottom] {
            assert!(res.zone(zone).is_empty());
            assert!(res.is_configured(zone));
            let sentinel = res.rules.iter().find(|r| r.zone == zone).unwrap();
            assert!(sentinel.is_empty_slot());
        }

        let res = svc.placements_for(&contact(), &Audience::Default).await.unwrap();
        assert_eq!(res.zone(Zone::Left), vec![PanelId::new("left-props")]);
    }

    #[tokio::test]
    async fn test_precedence_order() {
        let svc = service();
        let sales = Audience::Role(RoleId::new("sales"));
        let one = |id: &str| ZoneLayout::new().with_zone(Zone::Top, [id]);

        svc.set_detail_layer(None, &Audience::Default, &one("global-default"))
            .await
            .unwrap();
        let res = svc.placements_for(&contact(), &sales).await.unwrap();
        assert_eq!(res.zone(Zone::Top), vec![PanelId::new("global-default")]);

        svc.set_detail_layer(Some(&contact()), &Audience::Default, &one("type-default"))
            .await
            .unwrap();
        let res = svc.placements_for(&contact(), &sales).await.unwrap();
        assert_eq!(res.zone(Zone::Top), vec![PanelId::new("type-default")]);

        svc.set_detail_layer(None, &sales, &one("global-role"))
            .await
            .unwrap();
        let res = svc.placements_for(&contact(), &sales).await.unwrap();
        assert_eq!(res.zone(Zone::Top), vec![PanelId::new("global-role")]);

        svc.set_detail_layer(Some(&contact()), &sales, &one("type-role"))
            .await
            .unwrap();
        let res = svc.placements_for(&contact(), &sales).await.unwrap();
        assert_eq!(res.zone(Zone::Top), vec![PanelId::new("type-role")]);
    }

    #[tokio::test]
    async fn test_unconfigured_resolves_to_nothing() {
        let res = service()
            .placements_for(&contact(), &Audience::Default)
            .await
            .unwrap();
        assert!(res.layer.is_none());
        assert!(res.rules.is_empty());
    }

    #[tokio::test]
    async fn test_global_default_layer_is_protected() {
        let svc = service();
        svc.set_detail_layer(None, &Audience::Default, &default_contact_layout())
            .await
            .unwrap();

        let err = svc
            .delete_detail_layer(None, &Audience::Default)
            .await
            .unwrap_err();
        assert_eq!(err.conflict_reason(), Some(&ConflictReason::DefaultLayerProtected));
    }

    #[tokio::test]
    async fn test_deleting_audience_layer_falls_back() {
        let svc = service();
        let sales = Audience::Role(RoleId::new("sales"));
        svc.set_detail_layer(Some(&contact()), &Audience::Default, &default_contact_layout())
            .await
            .unwrap();
        svc.set_detail_layer(
            Some(&contact()),
            &sales,
            &ZoneLayout::new().with_zone(Zone::Top, ["x"]),
        )
        .await
        .unwrap();
        svc.set_detail_layer(
            Some(&contact()),
            &Audience::Superuser,
            &ZoneLayout::new().with_zone(Zone::Top, ["y"]),
        )
        .await
        .unwrap();

        assert!(svc.delete_detail_layer(Some(&contact()), &sales).await.unwrap() > 0);
        assert!(
            svc.delete_detail_layer(Some(&contact()), &Audience::Superuser)
                .await
                .unwrap()
                > 0
        );
        // Deleting an absent layer still succeeds.
        assert_eq!(svc.delete_detail_layer(Some(&contact()), &sales).await.unwrap(), 0);

        for audience in [sales, Audience::Superuser] {
            let res = svc.placements_for(&contact(), &audience).await.unwrap();
            assert_eq!(res.layer, Some(LayerKey::new(Some(contact()), Audience::Default)));
            assert_eq!(res.zone(Zone::Left), vec![PanelId::new("left-props")]);
        }
    }

    #[tokio::test]
    async fn test_duplicate_placement_rejected_at_store_level() {
        let svc = service();
        let layout = ZoneLayout::new()
            .with_zone(Zone::Top, ["a"])
            .with_zone(Zone::Bottom, ["a"]);

        let err = svc
            .set_detail_layer(Some(&contact()), &Audience::Default, &layout)
            .await
            .unwrap_err();
        assert!(matches!(
            err.conflict_reason(),
            Some(ConflictReason::DuplicatePlacement { .. })
        ));
    }

    #[tokio::test]
    async fn test_ensure_record_type_layer_copies_global() {
        let svc = service();
        svc.set_detail_layer(None, &Audience::Default, &default_contact_layout())
            .await
            .unwrap();

        assert!(svc.ensure_record_type_layer(&contact()).await.unwrap());
        assert!(!svc.ensure_record_type_layer(&contact()).await.unwrap());

        let own = svc
            .layer(&LayerKey::new(Some(contact()), Audience::Default))
            .await
            .unwrap();
        assert_eq!(ZoneLayout::from_rules(&own).zone(Zone::Right), [PanelId::new("right-rel")]);
    }

    #[tokio::test]
    async fn test_ensure_without_global_default_keeps_type_unconfigured() {
        let svc = service();
        assert!(!svc.ensure_record_type_layer(&contact()).await.unwrap());
        assert!(svc
            .layer(&LayerKey::new(Some(contact()), Audience::Default))
            .await
            .unwrap()
            .is_empty());

        svc.set_detail_layer(
            Some(&contact()),
            &Audience::Superuser,
            &ZoneLayout::new().with_zone(Zone::Top, ["x"]),
        )
        .await
        .unwrap();
        svc.set_detail_layer(
            None,
            &Audience::Default,
            &ZoneLayout::new().with_zone(Zone::Left, ["model"]),
        )
        .await
        .unwrap();

        let res = svc.placements_for(&contact(), &Audience::Default).await.unwrap();
        assert_eq!(res.layer, Some(LayerKey::global_default()));
        assert_eq!(res.zone(Zone::Left), vec![PanelId::new("model")]);
    }

    #[tokio::test]
    async fn test_home_resolution() {
        let svc = service();
        let sales = Audience::Role(RoleId::new("sales"));
        svc.set_home_layer(&Audience::Default, &[PanelId::new("a"), PanelId::new("b")])
            .await
            .unwrap();

        let res = svc.home_placements(&sales).await.unwrap();
        assert_eq!(res.panel_ids, vec![PanelId::new("a"), PanelId::new("b")]);
        assert!(!res.specific);

        svc.set_home_layer(&sales, &[]).await.unwrap();
        let res = svc.home_placements(&sales).await.unwrap();
        assert!(res.panel_ids.is_empty());
        assert!(res.specific);

        assert!(svc.delete_home_layer(&Audience::Default).await.is_err());
        svc.delete_home_layer(&sales).await.unwrap();
        let res = svc.home_placements(&sales).await.unwrap();
        assert_eq!(res.panel_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_mypage_resolution() {
        let svc = service();
        let alice = UserId::new("alice");
        svc.set_mypage_layer(None, &[PanelId::new("a")]).await.unwrap();

        let res = svc.mypage_placements(&alice).await.unwrap();
        assert_eq!(res.panel_ids, vec![PanelId::new("a")]);
        assert!(!res.specific);

        svc.set_mypage_layer(Some(&alice), &[PanelId::new("b"), PanelId::new("a")])
            .await
            .unwrap();
        let res = svc.mypage_placements(&alice).await.unwrap();
        assert_eq!(res.panel_ids, vec![PanelId::new("b"), PanelId::new("a")]);

        let err = svc
            .set_mypage_layer(Some(&alice), &[PanelId::new("b"), PanelId::new("b")])
            .await
            .unwrap_err();
        assert!(err.conflict_reason().is_some());
    }

    fn arb_layout() -> impl Strategy<Value = ZoneLayout> {
        let ids = prop::collection::vec(prop_oneof![
            Just("a"), Just("b"), Just("c"), Just("d"), Just("e"), Just("f")
        ], 0..4);
        (ids.clone(), ids.clone(), ids.clone(), ids).prop_map(|(top, left, right, bottom)| {
            ZoneLayout::new()
                .with_zone(Zone::Top, top)
                .with_zone(Zone::Left, left)
                .with_zone(Zone::Right, right)
                .with_zone(Zone::Bottom, bottom)
        })
    }

    proptest! {
        #[test]
        fn prop_resolved_placements_never_repeat(layout in arb_layout(), superuser in any::<bool>()) {
            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            rt.block_on(async {
                let svc = service();
                let audience = if superuser { Audience::Superuser } else { Audience::Default };
                let stored = svc.set_detail_layer(Some(&contact()), &audience, &layout).await;

                let res = svc.placements_for(&contact(), &audience).await.unwrap();
                let ids: Vec<&PanelId> = res.rules.iter()
                    .filter(|r| !r.is_empty_slot())
                    .map(|r| &r.panel_id)
                    .collect();
                let unique: HashSet<&PanelId> = ids.iter().copied().collect();
                prop_assert_eq!(ids.len(), unique.len());

                if stored.is_ok() {
                    // Written layers read back identically.
                    for zone in Zone::BODY {
                        let got = res.zone(zone);
                        prop_assert_eq!(got.as_slice(), layout.zone(zone));
                    }
                } else {
                    prop_assert!(!layout.duplicate_ids().is_empty());
                }
                Ok::<(), TestCaseError>(())
            })?;
        }
    }
}
