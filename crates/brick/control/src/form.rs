//! Placement form validation
//!
//! Configuration screens submit `{zone: [brick id, ...]}` either as a JSON
//! object or as a JSON-encoded string field. Validation reports field-level
//! errors; nothing is written until the whole form is valid.

use crate::error::{FieldErrorCode, FieldErrors};
use brick_types::{PanelId, Zone, ZoneLayout};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

/// Form field carrying the whole layout
pub const LAYOUT_FIELD: &str = "bricks";

/// Bricks an administrator may choose from
#[derive(Debug, Clone, Default)]
pub struct PlacementChoices {
    pub body: BTreeSet<PanelId>,
    pub hats: BTreeSet<PanelId>,
}

impl PlacementChoices {
    pub fn new(body: impl IntoIterator<Item = PanelId>, hats: impl IntoIterator<Item = PanelId>) -> Self {
        Self {
            body: body.into_iter().collect(),
            hats: hats.into_iter().collect(),
        }
    }
}

enum Decoded {
    Object(Map<String, Value>),
    Array(Vec<Value>),
}

fn decode(input: &Value, errors: &mut FieldErrors) -> Option<Decoded> {
    let parsed;
    let value = match input {
        Value::Null => {
            errors.push(LAYOUT_FIELD, FieldErrorCode::Empty, "The configuration is empty.");
            return None;
        }
        Value::String(raw) if raw.trim().is_empty() => {
            errors.push(LAYOUT_FIELD, FieldErrorCode::Empty, "The configuration is empty.");
            return None;
        }
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(e) => {
                errors.push(
                    LAYOUT_FIELD,
                    FieldErrorCode::MalformedJson,
                    format!("The configuration is not valid JSON ({}).", e),
                );
                return None;
            }
        },
        value => value,
    };

    match value {
        Value::Object(map) => Some(Decoded::Object(map.clone())),
        Value::Array(items) => Some(Decoded::Array(items.clone())),
        _ => {
            errors.push(LAYOUT_FIELD, FieldErrorCode::WrongShape, "The configuration has a wrong shape.");
            None
        }
    }
}

fn decode_ids(field: &str, value: &Value, errors: &mut FieldErrors) -> Option<Vec<PanelId>> {
    let Value::Array(items) = value else {
        errors.push(field, FieldErrorCode::WrongShape, "A list of brick ids is expected.");
        return None;
    };

    let mut ids = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(id) if !id.is_empty() => ids.push(PanelId::new(id.clone())),
            _ => {
                errors.push(field, FieldErrorCode::WrongShape, "Brick ids must be non-empty strings.");
                return None;
            }
        }
    }
    Some(ids)
}

/// Validate a detail layout.
///
/// Zones absent from the input are configured empty.
pub fn parse_zone_layout(input: &Value, choices: &PlacementChoices) -> Result<ZoneLayout, FieldErrors> {
    let mut errors = FieldErrors::new();
    let zones = match decode(input, &mut errors) {
        Some(Decoded::Object(zones)) => zones,
        Some(Decoded::Array(_)) => {
            errors.push(LAYOUT_FIELD, FieldErrorCode::WrongShape, "An object of zones is expected.");
            return Err(errors);
        }
        None => return Err(errors),
    };

    let mut layout = ZoneLayout::new();
    for (name, value) in &zones {
        let Ok(zone) = name.parse::<Zone>() else {
            errors.push(name.as_str(), FieldErrorCode::WrongShape, format!("Unknown zone \"{}\".", name));
            continue;
        };
        if let Some(ids) = decode_ids(name, value, &mut errors) {
            layout.set_zone(zone, ids);
        }
    }
    if !errors.is_empty() {
        return Err(errors);
    }

    if layout.is_empty() {
        errors.push(LAYOUT_FIELD, FieldErrorCode::Empty, "The configuration is empty.");
        return Err(errors);
    }

    let hats = layout.zone(Zone::Hat);
    if hats.len() > 1 {
        errors.push(Zone::Hat.as_str(), FieldErrorCode::InvalidHat, "Only one hat brick can be used.");
    }
    for id in hats {
        if !choices.hats.contains(id) {
            errors.push(
                Zone::Hat.as_str(),
                FieldErrorCode::InvalidHat,
                format!("\"{}\" is not a hat brick of this type.", id),
            );
        }
    }

    let mut first_zone: HashMap<&PanelId, Zone> = HashMap::new();
    for zone in Zone::BODY {
        for id in layout.zone(zone) {
            if let Some(previous) = first_zone.insert(id, zone) {
                errors.push(
                    zone.as_str(),
                    FieldErrorCode::UsedTwice,
                    format!("The brick \"{}\" is used twice (also in \"{}\").", id, previous.as_str()),
                );
                continue;
            }
            if !choices.body.contains(id) {
                errors.push(
                    zone.as_str(),
                    FieldErrorCode::InvalidChoice,
                    format!("\"{}\" is not a valid choice.", id),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(layout)
    } else {
        Err(errors)
    }
}

/// Validate a home or my-page brick list.
pub fn parse_panel_list(input: &Value, choices: &BTreeSet<PanelId>) -> Result<Vec<PanelId>, FieldErrors> {
    let mut errors = FieldErrors::new();
    let items = match decode(input, &mut errors) {
        Some(Decoded::Array(items)) => Value::Array(items),
        Some(Decoded::Object(_)) => {
            errors.push(LAYOUT_FIELD, FieldErrorCode::WrongShape, "A list of brick ids is expected.");
            return Err(errors);
        }
        None => return Err(errors),
    };

    let Some(ids) = decode_ids(LAYOUT_FIELD, &items, &mut errors) else {
        return Err(errors);
    };
    if ids.is_empty() {
        errors.push(LAYOUT_FIELD, FieldErrorCode::Empty, "The configuration is empty.");
        return Err(errors);
    }

    let mut seen = BTreeSet::new();
    for id in &ids {
        if !seen.insert(id) {
            errors.push(
                LAYOUT_FIELD,
                FieldErrorCode::UsedTwice,
                format!("The brick \"{}\" is used twice.", id),
            );
        } else if !choices.contains(id) {
            errors.push(LAYOUT_FIELD, FieldErrorCode::InvalidChoice, format!("\"{}\" is not a valid choice.", id));
        }
    }

    if errors.is_empty() {
        Ok(ids)
    } else {
        Err(errors)
    }
}
