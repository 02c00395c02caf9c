//! Placement rows
//!
//! Placement is layered along two dimensions: the record type (or none for
//! the global layer) and the audience (a role, superusers, or the default
//! audience). A layer is the set of rows sharing one (record type, audience)
//! pair; zones configured empty are stored as a single empty-slot row so that
//! "configured empty" is distinguishable from "unconfigured".

use crate::{PanelId, RecordType, RoleId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Named region of a detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    Hat,
    Top,
    Left,
    Right,
    Bottom,
}

impl Zone {
    pub const ALL: [Zone; 5] = [Zone::Hat, Zone::Top, Zone::Left, Zone::Right, Zone::Bottom];

    /// Zones holding regular bricks; these get an empty-slot row when empty.
    pub const BODY: [Zone; 4] = [Zone::Top, Zone::Left, Zone::Right, Zone::Bottom];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Hat => "hat",
            Zone::Top => "top",
            Zone::Left => "left",
            Zone::Right => "right",
            Zone::Bottom => "bottom",
        }
    }
}

impl std::fmt::Display for Zone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown zone: {0}")]
pub struct ZoneParseError(pub String);

impl std::str::FromStr for Zone {
    type Err = ZoneParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hat" => Ok(Zone::Hat),
            "top" => Ok(Zone::Top),
            "left" => Ok(Zone::Left),
            "right" => Ok(Zone::Right),
            "bottom" => Ok(Zone::Bottom),
            other => Err(ZoneParseError(other.to_string())),
        }
    }
}

/// Who a placement layer applies to.
///
/// Being an enum, a layer's audience is exactly one of role, superuser or
/// neither.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "role", rename_all = "snake_case")]
pub enum Audience {
    Default,
    Role(RoleId),
    Superuser,
}

impl Audience {
    pub fn for_user(user: &User) -> Self {
        if user.is_superuser {
            Audience::Superuser
        } else if let Some(role) = &user.role {
            Audience::Role(role.clone())
        } else {
            Audience::Default
        }
    }

    pub fn is_default(&self) -> bool {
        matches!(self, Audience::Default)
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Audience::Default => write!(f, "default"),
            Audience::Role(role) => write!(f, "role:{}", role),
            Audience::Superuser => write!(f, "superuser"),
        }
    }
}

/// Detail-view placement row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRule {
    /// None for the global layer
    pub record_type: Option<RecordType>,
    pub zone: Zone,
    pub audience: Audience,
    pub panel_id: PanelId,
    pub order: u32,
}

impl PlacementRule {
    pub fn is_empty_slot(&self) -> bool {
        self.panel_id.is_empty_slot()
    }

    pub fn belongs_to(&self, record_type: Option<&RecordType>, audience: &Audience) -> bool {
        self.record_type.as_ref() == record_type && &self.audience == audience
    }
}

/// Home page placement row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HomePlacementRule {
    pub audience: Audience,
    pub panel_id: PanelId,
    pub order: u32,
}

/// "My page" placement row; `user == None` is the template for every user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MyPagePlacementRule {
    pub user: Option<UserId>,
    pub panel_id: PanelId,
    pub order: u32,
}

/// Ordered brick ids per zone
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneLayout(BTreeMap<Zone, Vec<PanelId>>);

impl ZoneLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone<I, P>(mut self, zone: Zone, ids: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PanelId>,
    {
        self.set_zone(zone, ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn set_zone(&mut self, zone: Zone, ids: Vec<PanelId>) {
        self.0.insert(zone, ids);
    }

    /// Bricks of a zone; unconfigured and configured-empty zones both yield
    /// an empty slice.
    pub fn zone(&self, zone: Zone) -> &[PanelId] {
        self.0.get(&zone).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_zone(&self, zone: Zone) -> bool {
        self.0.contains_key(&zone)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Zone, &[PanelId])> {
        self.0.iter().map(|(zone, ids)| (*zone, ids.as_slice()))
    }

    pub fn panel_ids(&self) -> impl Iterator<Item = &PanelId> {
        self.0.values().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    /// Ids placed more than once across all zones, in first-seen order.
    pub fn duplicate_ids(&self) -> Vec<PanelId> {
        let mut seen = HashSet::new();
        let mut duplicates = Vec::new();

        for id in self.panel_ids() {
            if id.is_empty_slot() {
                continue;
            }
            if !seen.insert(id) && !duplicates.contains(id) {
                duplicates.push(id.clone());
            }
        }

        duplicates
    }

    /// Rebuild a layout from the rows of one layer.
    pub fn from_rules<'a>(rules: impl IntoIterator<Item = &'a PlacementRule>) -> Self {
        let mut sorted: Vec<&PlacementRule> = rules.into_iter().collect();
        sorted.sort_by_key(|rule| (rule.zone, rule.order));

        let mut layout = ZoneLayout::new();
        for rule in sorted {
            let ids = layout.0.entry(rule.zone).or_default();
            if !rule.is_empty_slot() {
                ids.push(rule.panel_id.clone());
            }
        }
        layout
    }

    /// Rows for one layer. Empty body zones get an empty-slot row.
    pub fn to_rules(&self, record_type: Option<&RecordType>, audience: &Audience) -> Vec<PlacementRule> {
        let rule = |zone: Zone, panel_id: PanelId, order: u32| PlacementRule {
            record_type: record_type.cloned(),
            zone,
            audience: audience.clone(),
            panel_id,
            order,
        };

        let mut rules = Vec::new();
        for zone in Zone::ALL {
            let ids = self.zone(zone);
            if ids.is_empty() {
                if zone != Zone::Hat {
                    rules.push(rule(zone, PanelId::empty_slot(), 1));
                }
                continue;
            }
            for (idx, id) in ids.iter().enumerate() {
                rules.push(rule(zone, id.clone(), idx as u32 + 1));
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_round_trip_through_str() {
        for zone in Zone::ALL {
            assert_eq!(zone.as_str().parse::<Zone>().unwrap(), zone);
        }
        assert!("middle".parse::<Zone>().is_err());
    }

    #[test]
    fn test_audience_for_user() {
        let mut user = User::new("u1");
        assert_eq!(Audience::for_user(&user), Audience::Default);

        user.role = Some(RoleId::new("sales"));
        assert_eq!(Audience::for_user(&user), Audience::Role(RoleId::new("sales")));

        user.is_superuser = true;
        assert_eq!(Audience::for_user(&user), Audience::Superuser);
    }

    #[test]
    fn test_empty_zones_get_sentinel_rows() {
        let layout = ZoneLayout::new().with_zone(Zone::Top, ["x"]);
        let rules = layout.to_rules(None, &Audience::Superuser);

        let sentinels: Vec<Zone> = rules
            .iter()
            .filter(|r| r.is_empty_slot())
            .map(|r| r.zone)
            .collect();
        assert_eq!(sentinels, vec![Zone::Left, Zone::Right, Zone::Bottom]);
        assert!(rules.iter().all(|r| r.zone != Zone::Hat));
    }

    #[test]
    fn test_from_rules_orders_and_drops_sentinels() {
        let layout = ZoneLayout::new()
            .with_zone(Zone::Left, ["a", "b", "c"])
            .with_zone(Zone::Right, Vec::<PanelId>::new());
        let mut rules = layout.to_rules(Some(&"persons.contact".into()), &Audience::Default);
        rules.reverse();

        let rebuilt = ZoneLayout::from_rules(&rules);
        assert_eq!(rebuilt.zone(Zone::Left), layout.zone(Zone::Left));
        assert!(rebuilt.has_zone(Zone::Right));
        assert!(rebuilt.zone(Zone::Right).is_empty());
        assert!(!rebuilt.has_zone(Zone::Hat));
    }

    #[test]
    fn test_duplicate_ids() {
        let layout = ZoneLayout::new()
            .with_zone(Zone::Top, ["a", "b"])
            .with_zone(Zone::Bottom, ["b", "c", "a", "b"]);

        assert_eq!(layout.duplicate_ids(), vec![PanelId::new("b"), PanelId::new("a")]);
    }
}
