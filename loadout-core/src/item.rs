//! Core inventory model: items, bearers, parties, and the closed
//! category/bulk enumerations.
//!
//! Wire field names are camelCase (`bearerId`, `partyId`) to match the
//! snapshot and event payloads produced by the persistence layer.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Server-assigned item identity.
pub type ItemId = i64;
/// Bearer identity.
pub type BearerId = i64;
/// Party identity.
pub type PartyId = i64;

/// Item category.
///
/// The variant order is the display order; the view projector iterates
/// [`Category::ORDER`] when bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Weapon,
    Ammo,
    Armor,
    Consumable,
    Misc,
}

impl Category {
    /// All categories, in display order.
    pub const ORDER: [Category; 5] = [
        Category::Weapon,
        Category::Ammo,
        Category::Armor,
        Category::Consumable,
        Category::Misc,
    ];

    /// Parse a wire name (`"WEAPON"`, `"AMMO"`, …).
    pub fn parse(name: &str) -> Option<Category> {
        match name {
            "WEAPON" => Some(Category::Weapon),
            "AMMO" => Some(Category::Ammo),
            "ARMOR" => Some(Category::Armor),
            "CONSUMABLE" => Some(Category::Consumable),
            "MISC" => Some(Category::Misc),
            _ => None,
        }
    }

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Weapon => "WEAPON",
            Category::Ammo => "AMMO",
            Category::Armor => "ARMOR",
            Category::Consumable => "CONSUMABLE",
            Category::Misc => "MISC",
        }
    }

    /// Position within [`Category::ORDER`].
    pub fn display_index(self) -> usize {
        match self {
            Category::Weapon => 0,
            Category::Ammo => 1,
            Category::Armor => 2,
            Category::Consumable => 3,
            Category::Misc => 4,
        }
    }
}

/// Quantized weight tier.
///
/// The wire form is a bare number: `0` (negligible), `0.1` (light), or an
/// integer rating `1..=9`. Any other value fails classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bulk {
    Negligible,
    Light,
    Rated(u8),
}

impl Bulk {
    /// Highest integer rating.
    pub const MAX_RATING: u8 = 9;

    /// Map a numeric value onto the tier set.
    pub fn from_number(value: f64) -> Option<Bulk> {
        if value == 0.0 {
            return Some(Bulk::Negligible);
        }
        if (value - 0.1).abs() < 1e-9 {
            return Some(Bulk::Light);
        }
        if value.fract() == 0.0 && value >= 1.0 && value <= f64::from(Self::MAX_RATING) {
            return Some(Bulk::Rated(value as u8));
        }
        None
    }

    /// Numeric wire value.
    pub fn as_number(&self) -> f64 {
        match self {
            Bulk::Negligible => 0.0,
            Bulk::Light => 0.1,
            Bulk::Rated(rating) => f64::from(*rating),
        }
    }
}

impl Serialize for Bulk {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bulk::Negligible => serializer.serialize_u8(0),
            Bulk::Light => serializer.serialize_f64(0.1),
            Bulk::Rated(rating) => serializer.serialize_u8(*rating),
        }
    }
}

impl<'de> Deserialize<'de> for Bulk {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BulkVisitor;

        impl Visitor<'_> for BulkVisitor {
            type Value = Bulk;

            fn expecting(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str("a bulk tier: 0, 0.1, or an integer 1..=9")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Bulk, E> {
                Bulk::from_number(value as f64)
                    .ok_or_else(|| E::custom(format!("bulk {value} is outside the tier set")))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Bulk, E> {
                Bulk::from_number(value as f64)
                    .ok_or_else(|| E::custom(format!("bulk {value} is outside the tier set")))
            }

            fn visit_f64<E: de::Error>(self, value: f64) -> Result<Bulk, E> {
                Bulk::from_number(value)
                    .ok_or_else(|| E::custom(format!("bulk {value} is outside the tier set")))
            }
        }

        deserializer.deserialize_any(BulkVisitor)
    }
}

/// A single inventory row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub category: Category,
    pub description: String,
    pub bulk: Bulk,
    pub count: u32,
    #[serde(default)]
    pub bearer_id: Option<BearerId>,
    /// None = the unpartitioned default.
    #[serde(default)]
    pub party_id: Option<PartyId>,
}

/// Someone carrying items.
///
/// Items reference bearers by id; a reference left dangling by bearer
/// removal is tolerated and reads as unassigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bearer {
    pub id: BearerId,
    pub name: String,
    #[serde(default)]
    pub party_id: Option<PartyId>,
}

/// A partition: scopes item/bearer visibility and names the broadcast room.
///
/// Addressed from the outside by an opaque grant key; the key doubles as
/// the room key of the party's event stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
}

/// The active bearer filter. Empty = no filtering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BearerFilter {
    #[serde(rename = "bearerId", default)]
    pub bearer_id: Vec<BearerId>,
}

impl BearerFilter {
    pub fn new(ids: impl IntoIterator<Item = BearerId>) -> Self {
        Self {
            bearer_id: ids.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bearer_id.is_empty()
    }

    /// Whether an item assigned to `bearer` passes the filter.
    ///
    /// An unassigned item never matches a non-empty filter.
    pub fn matches(&self, bearer: Option<BearerId>) -> bool {
        if self.bearer_id.is_empty() {
            return true;
        }
        bearer.is_some_and(|id| self.bearer_id.contains(&id))
    }
}
