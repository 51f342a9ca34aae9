//! Change events and their classification.
//!
//! Mutations travel as untyped JSON — HTML form submissions on the way in,
//! room-stream payloads on the way back out — so every numeric field may
//! arrive as a number or as a numeric string. Classification turns such a
//! payload into a closed tagged variant or a [`ValidationError`]; callers
//! drop a malformed payload and keep processing the rest of the stream.
//!
//! Wire shape of a confirmed event:
//!
//! ```text
//! { "action": "newItem" | "updateItem" | "deleteItem",
//!   "timestamp": 1722470400000,
//!   "id": 7,                 // updateItem/deleteItem; newItem once stored
//!   "category": "WEAPON", "description": "…", "bulk": 1,
//!   "count": 2, "bearerId": 3 | "" | null }
//! ```

use serde_json::{Map, Value};

use crate::item::{BearerId, Bulk, Category, Item, ItemId};

/// Epoch milliseconds, stamped by the persistence layer at the moment a
/// mutation is confirmed (not at client submission).
pub type Timestamp = u64;

/// Current wall-clock time in epoch milliseconds.
pub fn now_millis() -> Timestamp {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as Timestamp)
        .unwrap_or(0)
}

/// The mutable item fields carried by create/update payloads.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub category: Category,
    pub description: String,
    pub bulk: Bulk,
    pub count: u32,
    pub bearer_id: Option<BearerId>,
}

impl ItemDraft {
    pub fn from_item(item: &Item) -> Self {
        Self {
            category: item.category,
            description: item.description.clone(),
            bulk: item.bulk,
            count: item.count,
            bearer_id: item.bearer_id,
        }
    }
}

/// One classified mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemChange {
    /// `newItem`. Confirmed events carry the assigned id; a speculative
    /// creation does not have one yet.
    Created { id: Option<ItemId>, draft: ItemDraft },
    /// `updateItem`.
    Updated { id: ItemId, draft: ItemDraft },
    /// `deleteItem`.
    Deleted { id: ItemId },
}

impl ItemChange {
    /// Classify an untyped payload against the three known shapes.
    pub fn classify(payload: &Value) -> Result<ItemChange, ValidationError> {
        let map = payload.as_object().ok_or(ValidationError::NotAnObject)?;
        let action = map
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ValidationError::MissingField("action"))?;

        match action {
            "newItem" => {
                let id = match map.get("id") {
                    None | Some(Value::Null) => None,
                    Some(value) => Some(coerce_i64(value, "id")?),
                };
                Ok(ItemChange::Created {
                    id,
                    draft: classify_draft(map, true)?,
                })
            }
            "updateItem" => Ok(ItemChange::Updated {
                id: require_item_id(map)?,
                draft: classify_draft(map, false)?,
            }),
            "deleteItem" => Ok(ItemChange::Deleted {
                id: require_item_id(map)?,
            }),
            other => Err(ValidationError::UnknownAction(other.to_string())),
        }
    }

    /// The wire discriminant for this variant.
    pub fn action(&self) -> &'static str {
        match self {
            ItemChange::Created { .. } => "newItem",
            ItemChange::Updated { .. } => "updateItem",
            ItemChange::Deleted { .. } => "deleteItem",
        }
    }
}

/// A confirmed mutation as delivered on a party's room stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub change: ItemChange,
    pub published_at: Timestamp,
}

impl ChangeEvent {
    /// Event for a stored creation (the row carries its assigned id).
    pub fn created(item: &Item, published_at: Timestamp) -> Self {
        Self {
            change: ItemChange::Created {
                id: Some(item.id),
                draft: ItemDraft::from_item(item),
            },
            published_at,
        }
    }

    /// Event for a stored update.
    pub fn updated(item: &Item, published_at: Timestamp) -> Self {
        Self {
            change: ItemChange::Updated {
                id: item.id,
                draft: ItemDraft::from_item(item),
            },
            published_at,
        }
    }

    /// Event for a deletion.
    pub fn deleted(id: ItemId, published_at: Timestamp) -> Self {
        Self {
            change: ItemChange::Deleted { id },
            published_at,
        }
    }

    /// Classify an untyped payload; a confirmed event must carry its
    /// publish timestamp.
    pub fn classify(payload: &Value) -> Result<ChangeEvent, ValidationError> {
        let change = ItemChange::classify(payload)?;
        let map = payload.as_object().ok_or(ValidationError::NotAnObject)?;
        let published_at = coerce_u64(require(map, "timestamp")?, "timestamp")?;
        Ok(ChangeEvent { change, published_at })
    }

    /// Serialize to the wire shape.
    pub fn to_wire(&self) -> Value {
        let mut map = Map::new();
        map.insert("action".to_string(), Value::from(self.change.action()));
        map.insert("timestamp".to_string(), Value::from(self.published_at));
        match &self.change {
            ItemChange::Created { id, draft } => {
                if let Some(id) = id {
                    map.insert("id".to_string(), Value::from(*id));
                }
                insert_draft(&mut map, draft);
            }
            ItemChange::Updated { id, draft } => {
                map.insert("id".to_string(), Value::from(*id));
                insert_draft(&mut map, draft);
            }
            ItemChange::Deleted { id } => {
                map.insert("id".to_string(), Value::from(*id));
            }
        }
        Value::Object(map)
    }
}

/// A client-local stand-in for a mutation still in flight.
///
/// Lives for exactly one mutation round trip; the owner drops it when the
/// round trip settles, success or failure alike.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeculativeAction {
    change: ItemChange,
}

impl SpeculativeAction {
    /// A creation awaiting confirmation. Never carries an id.
    pub fn create(draft: ItemDraft) -> Self {
        Self {
            change: ItemChange::Created { id: None, draft },
        }
    }

    /// An update awaiting confirmation.
    pub fn update(id: ItemId, draft: ItemDraft) -> Self {
        Self {
            change: ItemChange::Updated { id, draft },
        }
    }

    /// A deletion awaiting confirmation.
    pub fn delete(id: ItemId) -> Self {
        Self {
            change: ItemChange::Deleted { id },
        }
    }

    /// Classify a submitted form payload (no timestamp yet; a creation's
    /// id, if any slipped in, is discarded).
    pub fn classify(payload: &Value) -> Result<SpeculativeAction, ValidationError> {
        let change = match ItemChange::classify(payload)? {
            ItemChange::Created { draft, .. } => ItemChange::Created { id: None, draft },
            other => other,
        };
        Ok(SpeculativeAction { change })
    }

    pub fn change(&self) -> &ItemChange {
        &self.change
    }
}

/// Classification failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    NotAnObject,
    MissingField(&'static str),
    UnknownAction(String),
    UnknownCategory(String),
    InvalidBulk(String),
    InvalidNumber(&'static str),
    EmptyDescription,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "Payload is not a JSON object"),
            Self::MissingField(name) => write!(f, "Missing field: {name}"),
            Self::UnknownAction(action) => write!(f, "Unknown action: {action}"),
            Self::UnknownCategory(category) => write!(f, "Unknown category: {category}"),
            Self::InvalidBulk(value) => write!(f, "Bulk outside the tier set: {value}"),
            Self::InvalidNumber(name) => write!(f, "Expected a number for field: {name}"),
            Self::EmptyDescription => write!(f, "Description must not be empty"),
        }
    }
}

impl std::error::Error for ValidationError {}

fn classify_draft(
    map: &Map<String, Value>,
    is_create: bool,
) -> Result<ItemDraft, ValidationError> {
    let category = match require(map, "category")? {
        Value::String(name) => Category::parse(name)
            .ok_or_else(|| ValidationError::UnknownCategory(name.clone()))?,
        other => return Err(ValidationError::UnknownCategory(other.to_string())),
    };

    let description = require(map, "description")?
        .as_str()
        .ok_or(ValidationError::MissingField("description"))?
        .to_string();
    if description.is_empty() {
        return Err(ValidationError::EmptyDescription);
    }

    let bulk_raw = coerce_f64(require(map, "bulk")?, "bulk")?;
    let bulk = Bulk::from_number(bulk_raw)
        .ok_or_else(|| ValidationError::InvalidBulk(bulk_raw.to_string()))?;

    // Creations default to a single item; updates must restate the count.
    let count = match map.get("count") {
        None | Some(Value::Null) if is_create => 1,
        None | Some(Value::Null) => return Err(ValidationError::MissingField("count")),
        Some(value) => coerce_u32(value, "count")?,
    };

    let bearer_id = match map.get("bearerId") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) if text.is_empty() => None,
        Some(value) => Some(coerce_i64(value, "bearerId")?),
    };

    Ok(ItemDraft {
        category,
        description,
        bulk,
        count,
        bearer_id,
    })
}

// Update/delete payloads name their target `id`; some publishers say
// `itemId`. Either spelling resolves.
fn require_item_id(map: &Map<String, Value>) -> Result<ItemId, ValidationError> {
    match map.get("id").or_else(|| map.get("itemId")) {
        None | Some(Value::Null) => Err(ValidationError::MissingField("id")),
        Some(value) => coerce_i64(value, "id"),
    }
}

fn require<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
) -> Result<&'a Value, ValidationError> {
    match map.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField(field)),
        Some(value) => Ok(value),
    }
}

fn coerce_i64(value: &Value, field: &'static str) -> Result<i64, ValidationError> {
    match value {
        Value::Number(number) => number.as_i64().ok_or(ValidationError::InvalidNumber(field)),
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidNumber(field)),
        _ => Err(ValidationError::InvalidNumber(field)),
    }
}

fn coerce_u64(value: &Value, field: &'static str) -> Result<u64, ValidationError> {
    match value {
        Value::Number(number) => number.as_u64().ok_or(ValidationError::InvalidNumber(field)),
        Value::String(text) => text
            .trim()
            .parse::<u64>()
            .map_err(|_| ValidationError::InvalidNumber(field)),
        _ => Err(ValidationError::InvalidNumber(field)),
    }
}

fn coerce_u32(value: &Value, field: &'static str) -> Result<u32, ValidationError> {
    let raw = coerce_i64(value, field)?;
    u32::try_from(raw).map_err(|_| ValidationError::InvalidNumber(field))
}

fn coerce_f64(value: &Value, field: &'static str) -> Result<f64, ValidationError> {
    match value {
        Value::Number(number) => number.as_f64().ok_or(ValidationError::InvalidNumber(field)),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| ValidationError::InvalidNumber(field)),
        _ => Err(ValidationError::InvalidNumber(field)),
    }
}

fn insert_draft(map: &mut Map<String, Value>, draft: &ItemDraft) {
    map.insert("category".to_string(), Value::from(draft.category.as_str()));
    map.insert(
        "description".to_string(),
        Value::from(draft.description.clone()),
    );
    let bulk = match draft.bulk {
        Bulk::Negligible => Value::from(0u8),
        Bulk::Light => Value::from(0.1),
        Bulk::Rated(rating) => Value::from(rating),
    };
    map.insert("bulk".to_string(), bulk);
    map.insert("count".to_string(), Value::from(draft.count));
    map.insert(
        "bearerId".to_string(),
        draft.bearer_id.map_or(Value::Null, Value::from),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rope_draft() -> ItemDraft {
        ItemDraft {
            category: Category::Misc,
            description: "Rope".to_string(),
            bulk: Bulk::Rated(1),
            count: 1,
            bearer_id: None,
        }
    }

    #[test]
    fn test_classify_new_item() {
        let payload = json!({
            "action": "newItem",
            "category": "MISC",
            "description": "Rope",
            "bulk": 1,
            "count": 1,
            "bearerId": null,
        });
        let change = ItemChange::classify(&payload).unwrap();
        assert_eq!(
            change,
            ItemChange::Created {
                id: None,
                draft: rope_draft()
            }
        );
    }

    #[test]
    fn test_classify_coerces_numbers_from_text() {
        // Form submissions arrive with every value as a string.
        let payload = json!({
            "action": "updateItem",
            "id": "7",
            "category": "AMMO",
            "description": "Rounds",
            "bulk": "0.1",
            "count": "30",
            "bearerId": "2",
        });
        let change = ItemChange::classify(&payload).unwrap();
        assert_eq!(
            change,
            ItemChange::Updated {
                id: 7,
                draft: ItemDraft {
                    category: Category::Ammo,
                    description: "Rounds".to_string(),
                    bulk: Bulk::Light,
                    count: 30,
                    bearer_id: Some(2),
                },
            }
        );
    }

    #[test]
    fn test_classify_count_defaults_on_create_only() {
        let create = json!({
            "action": "newItem",
            "category": "MISC",
            "description": "Flare",
            "bulk": 0,
        });
        match ItemChange::classify(&create).unwrap() {
            ItemChange::Created { draft, .. } => assert_eq!(draft.count, 1),
            other => panic!("expected creation, got {other:?}"),
        }

        let update = json!({
            "action": "updateItem",
            "id": 1,
            "category": "MISC",
            "description": "Flare",
            "bulk": 0,
        });
        assert_eq!(
            ItemChange::classify(&update),
            Err(ValidationError::MissingField("count"))
        );
    }

    #[test]
    fn test_classify_blank_bearer_reads_unassigned() {
        let payload = json!({
            "action": "newItem",
            "category": "ARMOR",
            "description": "Vest",
            "bulk": 2,
            "bearerId": "",
        });
        match ItemChange::classify(&payload).unwrap() {
            ItemChange::Created { draft, .. } => assert_eq!(draft.bearer_id, None),
            other => panic!("expected creation, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_confirmed_creation_keeps_id() {
        let payload = json!({
            "action": "newItem",
            "id": 42,
            "category": "MISC",
            "description": "Rope",
            "bulk": 1,
            "count": 1,
        });
        match ItemChange::classify(&payload).unwrap() {
            ItemChange::Created { id, .. } => assert_eq!(id, Some(42)),
            other => panic!("expected creation, got {other:?}"),
        }
    }

    #[test]
    fn test_classify_rejects_unknown_action() {
        let payload = json!({"action": "renameItem", "id": 1});
        assert_eq!(
            ItemChange::classify(&payload),
            Err(ValidationError::UnknownAction("renameItem".to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_missing_discriminant() {
        let payload = json!({"id": 1});
        assert_eq!(
            ItemChange::classify(&payload),
            Err(ValidationError::MissingField("action"))
        );
    }

    #[test]
    fn test_classify_rejects_unknown_category() {
        let payload = json!({
            "action": "newItem",
            "category": "TRINKET",
            "description": "Bauble",
            "bulk": 0,
        });
        assert_eq!(
            ItemChange::classify(&payload),
            Err(ValidationError::UnknownCategory("TRINKET".to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_off_tier_bulk() {
        let payload = json!({
            "action": "newItem",
            "category": "MISC",
            "description": "Odd weight",
            "bulk": 0.5,
        });
        assert_eq!(
            ItemChange::classify(&payload),
            Err(ValidationError::InvalidBulk("0.5".to_string()))
        );
    }

    #[test]
    fn test_classify_rejects_empty_description() {
        let payload = json!({
            "action": "newItem",
            "category": "MISC",
            "description": "",
            "bulk": 0,
        });
        assert_eq!(
            ItemChange::classify(&payload),
            Err(ValidationError::EmptyDescription)
        );
    }

    #[test]
    fn test_classify_rejects_negative_count() {
        let payload = json!({
            "action": "updateItem",
            "id": 1,
            "category": "MISC",
            "description": "Rope",
            "bulk": 1,
            "count": -2,
        });
        assert_eq!(
            ItemChange::classify(&payload),
            Err(ValidationError::InvalidNumber("count"))
        );
    }

    #[test]
    fn test_classify_delete_needs_only_id() {
        let payload = json!({"action": "deleteItem", "id": "9"});
        assert_eq!(
            ItemChange::classify(&payload).unwrap(),
            ItemChange::Deleted { id: 9 }
        );

        let missing = json!({"action": "deleteItem"});
        assert_eq!(
            ItemChange::classify(&missing),
            Err(ValidationError::MissingField("id"))
        );
    }

    #[test]
    fn test_classify_accepts_item_id_alias() {
        let payload = json!({"action": "deleteItem", "itemId": 9});
        assert_eq!(
            ItemChange::classify(&payload).unwrap(),
            ItemChange::Deleted { id: 9 }
        );
    }

    #[test]
    fn test_change_event_requires_timestamp() {
        let payload = json!({"action": "deleteItem", "id": 1});
        assert_eq!(
            ChangeEvent::classify(&payload),
            Err(ValidationError::MissingField("timestamp"))
        );

        let stamped = json!({"action": "deleteItem", "id": 1, "timestamp": 150});
        let event = ChangeEvent::classify(&stamped).unwrap();
        assert_eq!(event.published_at, 150);
        assert_eq!(event.change, ItemChange::Deleted { id: 1 });
    }

    #[test]
    fn test_event_wire_roundtrip() {
        let item = Item {
            id: 12,
            category: Category::Consumable,
            description: "Medpatch".to_string(),
            bulk: Bulk::Light,
            count: 4,
            bearer_id: Some(2),
            party_id: Some(1),
        };
        for event in [
            ChangeEvent::created(&item, 1_000),
            ChangeEvent::updated(&item, 2_000),
            ChangeEvent::deleted(item.id, 3_000),
        ] {
            let wire = event.to_wire();
            let parsed = ChangeEvent::classify(&wire).unwrap();
            assert_eq!(parsed, event);
        }
    }

    #[test]
    fn test_wire_ignores_extra_fields() {
        // Confirmed events spread the stored row; unknown columns pass
        // through classification untouched.
        let payload = json!({
            "action": "updateItem",
            "timestamp": 150,
            "id": 1,
            "category": "MISC",
            "description": "Rope (50ft)",
            "bulk": 1,
            "count": 2,
            "bearerId": null,
            "partyId": 8,
        });
        let event = ChangeEvent::classify(&payload).unwrap();
        assert_eq!(event.published_at, 150);
    }

    #[test]
    fn test_speculative_creation_never_has_id() {
        let payload = json!({
            "action": "newItem",
            "id": 42,
            "category": "MISC",
            "description": "Rope",
            "bulk": 1,
        });
        let action = SpeculativeAction::classify(&payload).unwrap();
        match action.change() {
            ItemChange::Created { id, .. } => assert_eq!(*id, None),
            other => panic!("expected creation, got {other:?}"),
        }
    }

    #[test]
    fn test_malformed_payload_is_a_value_not_a_panic() {
        for payload in [json!(null), json!("newItem"), json!([1, 2, 3]), json!(42)] {
            assert_eq!(
                ItemChange::classify(&payload),
                Err(ValidationError::NotAnObject)
            );
        }
    }
}
