//! Identifier types
//!
//! All identifiers are opaque strings. Panel ids additionally encode their
//! origin: synthesized panels carry a reserved prefix followed by the uuid of
//! the configuration row backing them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Stable, globally unique brick identifier
    PanelId
);
string_id!(
    /// Business record type, e.g. `persons.contact`
    RecordType
);
string_id!(
    /// Business record identifier
    RecordId
);
string_id!(
    /// Permission role reference
    RoleId
);
string_id!(
    /// User identifier
    UserId
);
string_id!(
    /// Relation type identifier, e.g. `persons-subject_employed_by`
    RelationTypeId
);
string_id!(
    /// Identifier of a registered instance-brick class
    InstanceClassId
);

impl PanelId {
    /// Id of the generic record-fields brick.
    pub const RECORD_FIELDS: &'static str = "model";
    /// Id of the generic title-bar (hat) brick.
    pub const GENERIC_HAT: &'static str = "hat";
    /// Reserved prefix of secondary hat bricks.
    pub const HAT_PREFIX: &'static str = "hat-";
    pub const INSTANCE_PREFIX: &'static str = "instance-";
    pub const RELATION_PREFIX: &'static str = "rtype-";
    pub const CUSTOM_PREFIX: &'static str = "custom-";

    /// Build a static brick id from an app label and a brick name.
    pub fn generate(app: &str, name: &str) -> Self {
        Self(format!("{}-{}", app, name))
    }

    /// The empty-slot sentinel stored for a configured-but-empty zone.
    pub fn empty_slot() -> Self {
        Self(String::new())
    }

    pub fn is_empty_slot(&self) -> bool {
        self.0.is_empty()
    }

    pub fn for_instance(token: Uuid) -> Self {
        Self(format!("{}{}", Self::INSTANCE_PREFIX, token))
    }

    pub fn for_relation(token: Uuid) -> Self {
        Self(format!("{}{}", Self::RELATION_PREFIX, token))
    }

    pub fn for_custom(token: Uuid) -> Self {
        Self(format!("{}{}", Self::CUSTOM_PREFIX, token))
    }

    pub fn is_hat(&self) -> bool {
        self.0 == Self::GENERIC_HAT || self.0.starts_with(Self::HAT_PREFIX)
    }

    /// Where a brick with this id comes from.
    ///
    /// Ids with a synthesized prefix but an unparsable token are reported as
    /// static; the registry will not know them and they degrade later on.
    pub fn origin(&self) -> PanelOrigin {
        let parse = |prefix: &str| {
            self.0
                .strip_prefix(prefix)
                .and_then(|token| Uuid::parse_str(token).ok())
        };

        if let Some(token) = parse(Self::INSTANCE_PREFIX) {
            PanelOrigin::Instance(token)
        } else if let Some(token) = parse(Self::RELATION_PREFIX) {
            PanelOrigin::Relation(token)
        } else if let Some(token) = parse(Self::CUSTOM_PREFIX) {
            PanelOrigin::Custom(token)
        } else {
            PanelOrigin::Static
        }
    }

    /// Whether the id uses one of the prefixes reserved for synthesized or
    /// hat bricks, or one of the generic ids.
    pub fn is_reserved(&self) -> bool {
        self.0 == Self::RECORD_FIELDS
            || self.is_hat()
            || self.0.starts_with(Self::INSTANCE_PREFIX)
            || self.0.starts_with(Self::RELATION_PREFIX)
            || self.0.starts_with(Self::CUSTOM_PREFIX)
    }
}

/// Origin of a brick, derived from its id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelOrigin {
    /// Registered at startup
    Static,
    /// Synthesized from an instance configuration row
    Instance(Uuid),
    /// Synthesized from a relation configuration row
    Relation(Uuid),
    /// Synthesized from a custom-fields configuration row
    Custom(Uuid),
}

impl RecordType {
    /// Generic relation model; relation-type dependencies refine it.
    pub const RELATION: &'static str = "relation";

    pub fn relation() -> Self {
        Self(Self::RELATION.to_string())
    }

    pub fn is_relation(&self) -> bool {
        self.0 == Self::RELATION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_from_prefix() {
        let token = Uuid::new_v4();

        assert_eq!(PanelId::for_instance(token).origin(), PanelOrigin::Instance(token));
        assert_eq!(PanelId::for_relation(token).origin(), PanelOrigin::Relation(token));
        assert_eq!(PanelId::for_custom(token).origin(), PanelOrigin::Custom(token));
        assert_eq!(PanelId::generate("persons", "card").origin(), PanelOrigin::Static);
    }

    #[test]
    fn test_malformed_token_is_static() {
        assert_eq!(PanelId::new("rtype-not-a-uuid").origin(), PanelOrigin::Static);
        assert!(PanelId::new("rtype-not-a-uuid").is_reserved());
    }

    #[test]
    fn test_hat_ids() {
        assert!(PanelId::new("hat").is_hat());
        assert!(PanelId::new("hat-contact-card").is_hat());
        assert!(!PanelId::new("hatbox").is_hat());
    }

    #[test]
    fn test_empty_slot() {
        assert!(PanelId::empty_slot().is_empty_slot());
        assert!(!PanelId::generate("a", "b").is_empty_slot());
        assert_eq!(PanelId::generate("persons", "card").as_str(), "persons-card");
    }
}
